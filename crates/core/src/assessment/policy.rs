/// Phrases that suggest the assistant is wrapping up.
pub const DEFAULT_CLOSING_PHRASES: [&str; 6] = [
    "great job",
    "nice work",
    "well done",
    "that's all",
    "thank you for",
    "good understanding",
];

/// Inputs that end a session early.
const QUIT_KEYWORDS: [&str; 2] = ["quit", "exit"];

/// When a conversation ends on its own.
///
/// Phrase matching is a heuristic: a closing phrase may appear incidentally,
/// and the model may conclude without using one. The minimum turn floor keeps
/// it from firing early, the turn ceiling guarantees termination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnPolicy {
    /// The session completes once the student has typed this many turns.
    pub max_student_turns: usize,
    /// Closing phrases are ignored before this many student turns.
    pub wrap_up_min_turns: usize,
    /// Case-insensitive substrings that signal a wrap-up.
    pub closing_phrases: Vec<String>,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            max_student_turns: 8,
            wrap_up_min_turns: 5,
            closing_phrases: DEFAULT_CLOSING_PHRASES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

impl TurnPolicy {
    /// Returns `true` if `reply` should end the session after
    /// `student_turns` student turns.
    pub fn is_wrap_up(&self, reply: &str, student_turns: usize) -> bool {
        if student_turns < self.wrap_up_min_turns {
            return false;
        }
        let reply = reply.to_lowercase();
        self.closing_phrases
            .iter()
            .any(|phrase| reply.contains(&phrase.to_lowercase()))
    }

    /// Returns `true` if the student asked to end the session.
    pub fn is_quit(input: &str) -> bool {
        let input = input.trim();
        QUIT_KEYWORDS
            .iter()
            .any(|keyword| input.eq_ignore_ascii_case(keyword))
    }
}
