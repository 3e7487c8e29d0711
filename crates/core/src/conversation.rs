//! Conversation-related types.

use serde::{Deserialize, Serialize};
use viva_model::ModelMessage;

/// Who authored a turn.
///
/// On the wire and in transcripts the student is called `user`, matching the
/// role names chat backends use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// The student taking the assessment.
    #[serde(rename = "user")]
    Student,
    /// The model conducting the assessment.
    #[serde(rename = "assistant")]
    Assistant,
}

/// One message within a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// The author of this turn.
    pub role: Speaker,
    /// The text of this turn.
    pub content: String,
}

impl Turn {
    /// Creates a student turn.
    #[inline]
    pub fn student<S: Into<String>>(content: S) -> Self {
        Self {
            role: Speaker::Student,
            content: content.into(),
        }
    }

    /// Creates an assistant turn.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Speaker::Assistant,
            content: content.into(),
        }
    }

    #[inline]
    pub(crate) fn to_model_message(&self) -> ModelMessage {
        match self.role {
            Speaker::Student => ModelMessage::User(self.content.clone()),
            Speaker::Assistant => ModelMessage::Assistant(self.content.clone()),
        }
    }
}

/// The ordered sequence of turns in a session.
///
/// Insertion order is significant: the history is the transcript. Turns can
/// only be appended.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// Returns all turns, oldest first.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the latest turn.
    #[inline]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if there are no turns yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Counts the turns authored by `speaker`.
    pub fn count_by(&self, speaker: Speaker) -> usize {
        self.turns.iter().filter(|t| t.role == speaker).count()
    }

    #[inline]
    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

impl From<Vec<Turn>> for History {
    #[inline]
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_roles() {
        let history = History::from(vec![
            Turn::student("Hi!"),
            Turn::assistant("Hello, what does line 1 do?"),
        ]);
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "role": "user", "content": "Hi!" },
                { "role": "assistant", "content": "Hello, what does line 1 do?" },
            ])
        );
        assert_eq!(history.count_by(Speaker::Student), 1);
        assert_eq!(history.last().unwrap().role, Speaker::Assistant);
    }
}
