use std::collections::VecDeque;
use std::future::pending;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use viva_test_model::{PresetFailure, PresetResponse, TestModelProvider};

use super::*;
use crate::conversation::{Speaker, Turn};
use crate::relay::DirectRelay;
use crate::session::{SourceLanguage, Submission};

struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    fn new<const N: usize>(lines: [&str; N]) -> Self {
        Self {
            lines: lines.iter().map(|l| (*l).to_owned()).collect(),
        }
    }
}

impl StudentInput for ScriptedInput {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// A student who never answers.
struct SilentInput;

impl StudentInput for SilentInput {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        pending().await
    }
}

#[derive(Default)]
struct RecordedEvents {
    relay_calls: usize,
    replies: Vec<String>,
    prompts: usize,
    failures: Vec<RelayError>,
}

impl SessionEvents for RecordedEvents {
    fn relay_started(&mut self) {
        self.relay_calls += 1;
    }

    fn assistant_replied(&mut self, reply: &str) {
        self.replies.push(reply.to_owned());
    }

    fn input_requested(&mut self) {
        self.prompts += 1;
    }

    fn relay_failed(&mut self, err: &RelayError) {
        self.failures.push(err.clone());
    }
}

/// Always rejects with a quota error.
struct ExhaustedQuotaRelay;

#[async_trait]
impl Relay for ExhaustedQuotaRelay {
    async fn send(
        &self,
        _submission: &Submission,
        _history: &[Turn],
    ) -> Result<String, RelayError> {
        Err(RelayError::RateLimited(
            "Rate limit exceeded: 100 requests per hour".to_owned(),
        ))
    }
}

fn session(name: &str) -> Session {
    Session::new(Submission {
        student_name: name.to_owned(),
        code_path: "loop.py".into(),
        source_code: "total = 0\nfor n in range(10):\n    total += n\n"
            .to_owned(),
        language: SourceLanguage::Python,
    })
}

fn questions(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| format!("Question {i}: what happens on line {i}?"))
        .collect()
}

fn assert_alternating(history: &[Turn]) {
    for pair in history.windows(2) {
        assert_ne!(pair[0].role, pair[1].role, "{history:#?}");
    }
}

#[tokio::test]
async fn test_wrap_up_after_five_answers() {
    let mut replies = questions(5);
    replies.push("Great job explaining your loop!".to_owned());
    let provider = TestModelProvider::with_replies(replies);
    let assessment = Assessment::new(DirectRelay::new(provider.clone()));

    let mut session = session("Ada Lovelace");
    let mut input = ScriptedInput::new([
        "It adds numbers",
        "A for loop",
        "range stops before 10",
        "total starts at zero",
        "iteration",
        "never read",
    ]);
    let mut events = RecordedEvents::default();
    let status = assessment
        .run(&mut session, &mut input, &mut events, pending())
        .await;

    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(session.end_reason(), Some(&EndReason::WrapUp));
    assert_eq!(session.student_turns(), 5);

    let history = session.history();
    assert_eq!(history.count_by(Speaker::Assistant), 6);
    // Five answers plus the seed turn.
    assert_eq!(history.count_by(Speaker::Student), 6);
    assert_eq!(
        history.turns()[0].content,
        "Hi! My name is Ada Lovelace. I'm ready to discuss my code."
    );
    assert_eq!(
        history.last().unwrap().content,
        "Great job explaining your loop!"
    );
    assert_alternating(history.turns());

    assert_eq!(provider.request_count(), 6);
    assert_eq!(events.replies.len(), 6);
    assert_eq!(input.lines.len(), 1);
}

#[tokio::test]
async fn test_closing_phrase_ignored_before_five_answers() {
    let replies = vec!["Well done! Next question: why a list?"; 8];
    let provider = TestModelProvider::with_replies(replies);
    let assessment = Assessment::new(DirectRelay::new(provider));

    let mut session = session("Grace");
    let mut input = ScriptedInput::new(["a", "b", "c", "d", "e", "f"]);
    assessment
        .run(&mut session, &mut input, &mut (), pending())
        .await;

    assert_eq!(session.end_reason(), Some(&EndReason::WrapUp));
    // The first five replies contain a closing phrase and are not final.
    assert_eq!(session.history().count_by(Speaker::Assistant), 6);
    assert_eq!(session.student_turns(), 5);
}

#[tokio::test]
async fn test_turn_limit() {
    let provider = TestModelProvider::with_replies(questions(12));
    let assessment = Assessment::new(DirectRelay::new(provider.clone()));

    let mut session = session("Linus");
    let mut input =
        ScriptedInput::new(["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);
    let status = assessment
        .run(&mut session, &mut input, &mut (), pending())
        .await;

    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(session.end_reason(), Some(&EndReason::TurnLimit));
    assert_eq!(session.student_turns(), 8);
    assert_eq!(provider.request_count(), 8);
    assert_eq!(session.history().last().unwrap().role, Speaker::Student);
    assert_eq!(input.lines.len(), 2);
    assert_alternating(session.history().turns());
}

#[tokio::test]
async fn test_custom_turn_limit() {
    let provider = TestModelProvider::with_replies(questions(4));
    let assessment = Assessment::new(DirectRelay::new(provider))
        .with_policy(TurnPolicy {
            max_student_turns: 2,
            ..TurnPolicy::default()
        });
    let mut session = session("Linus");
    let mut input = ScriptedInput::new(["1", "2", "3"]);
    assessment
        .run(&mut session, &mut input, &mut (), pending())
        .await;
    assert_eq!(session.end_reason(), Some(&EndReason::TurnLimit));
    assert_eq!(session.student_turns(), 2);
}

#[tokio::test]
async fn test_quit_keywords() {
    for keyword in ["quit", "  QuiT  ", "exit", "\tEXIT\n"] {
        let provider = TestModelProvider::with_replies(questions(3));
        let assessment = Assessment::new(DirectRelay::new(provider.clone()));

        let mut session = session("Ada");
        let mut input = ScriptedInput::new(["A loop", keyword, "unused"]);
        let status = assessment
            .run(&mut session, &mut input, &mut (), pending())
            .await;

        assert_eq!(status, SessionStatus::Aborted, "{keyword:?}");
        assert_eq!(session.end_reason(), Some(&EndReason::Quit));
        assert_eq!(session.student_turns(), 1);
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history().last().unwrap().role, Speaker::Assistant);
        assert_eq!(provider.request_count(), 2);
    }
}

#[tokio::test]
async fn test_empty_input_is_discarded() {
    let provider = TestModelProvider::with_replies(questions(3));
    let assessment = Assessment::new(DirectRelay::new(provider.clone()));

    let mut session = session("Ada");
    let mut input = ScriptedInput::new(["", "   ", "\n", "  it counts  ", "exit"]);
    let mut events = RecordedEvents::default();
    assessment
        .run(&mut session, &mut input, &mut events, pending())
        .await;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(events.relay_calls, 2);
    assert_eq!(events.prompts, 5);
    assert_eq!(session.student_turns(), 1);
    let turns = session.history().turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[2], Turn::student("it counts"));
}

#[tokio::test]
async fn test_end_of_input() {
    let provider = TestModelProvider::with_replies(questions(3));
    let assessment = Assessment::new(DirectRelay::new(provider));

    let mut session = session("Ada");
    let mut input = ScriptedInput::new(["first answer"]);
    let status = assessment
        .run(&mut session, &mut input, &mut (), pending())
        .await;

    assert_eq!(status, SessionStatus::Aborted);
    assert_eq!(session.end_reason(), Some(&EndReason::EndOfInput));
    assert_eq!(session.history().last().unwrap().role, Speaker::Assistant);
}

#[tokio::test]
async fn test_relay_failure_keeps_history() {
    let mut provider = TestModelProvider::default();
    provider.add_user_turn();
    provider.add_assistant_turn(PresetResponse::reply("What is `total`?"));
    provider.add_user_turn();
    provider.add_assistant_turn(PresetResponse::failure(PresetFailure::Server));
    let assessment = Assessment::new(DirectRelay::new(provider));

    let mut session = session("Ada");
    let mut input = ScriptedInput::new(["a running sum", "unused"]);
    let mut events = RecordedEvents::default();
    let status = assessment
        .run(&mut session, &mut input, &mut events, pending())
        .await;

    assert_eq!(status, SessionStatus::Errored);
    assert!(matches!(
        session.end_reason(),
        Some(EndReason::RelayFailure(RelayError::Server(_)))
    ));
    assert_eq!(events.failures.len(), 1);
    let turns = session.history().turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[2], Turn::student("a running sum"));
}

#[tokio::test]
async fn test_rate_limited() {
    let assessment = Assessment::new(ExhaustedQuotaRelay);
    let mut session = session("Ada");
    let mut events = RecordedEvents::default();
    let status = assessment
        .run(&mut session, &mut ScriptedInput::new([]), &mut events, pending())
        .await;

    assert_eq!(status, SessionStatus::Errored);
    assert!(events.failures[0].is_rate_limited());
    assert_eq!(events.prompts, 0);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_waiting_for_relay() {
    let mut provider = TestModelProvider::with_replies(questions(1));
    provider.set_delay(Duration::from_secs(60));
    let assessment = Assessment::new(
        DirectRelay::new(provider).with_timeout(Duration::from_secs(120)),
    );

    let mut session = session("Ada");
    let mut events = RecordedEvents::default();
    let status = assessment
        .run(
            &mut session,
            &mut ScriptedInput::new(["never read"]),
            &mut events,
            sleep(Duration::from_secs(1)),
        )
        .await;

    assert_eq!(status, SessionStatus::Aborted);
    assert_eq!(session.end_reason(), Some(&EndReason::Interrupted));
    assert_eq!(session.history().len(), 1);
    assert!(events.replies.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_waiting_for_input() {
    let provider = TestModelProvider::with_replies(questions(2));
    let assessment = Assessment::new(DirectRelay::new(provider));

    let mut session = session("Ada");
    let status = assessment
        .run(
            &mut session,
            &mut SilentInput,
            &mut (),
            sleep(Duration::from_secs(600)),
        )
        .await;

    assert_eq!(status, SessionStatus::Aborted);
    assert_eq!(session.end_reason(), Some(&EndReason::Interrupted));
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history().last().unwrap().role, Speaker::Assistant);
}

#[tokio::test]
async fn test_termination_bound() {
    // However the student answers, the loop ends within the turn limit and
    // turns keep alternating.
    let scripts: [&[&str]; 4] = [
        &["", "a", "", "b", "c", "d", "e", "f", "g", "h", "i", "j"],
        &["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"],
        &["a", "", "", "", "b"],
        &[],
    ];
    for lines in scripts {
        let provider = TestModelProvider::with_replies(questions(10));
        let assessment = Assessment::new(DirectRelay::new(provider));
        let mut session = session("Ada");
        let mut input = ScriptedInput {
            lines: lines.iter().map(|l| (*l).to_owned()).collect(),
        };
        let status = assessment
            .run(&mut session, &mut input, &mut (), pending())
            .await;
        assert!(status.is_terminal());
        assert!(session.student_turns() <= 8);
        assert_alternating(session.history().turns());
    }
}
