//! Core logic of a code assessment: session bootstrap, the conversation
//! loop, model relays and transcript persistence.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod assessment;
pub mod conversation;
mod prompt;
pub mod relay;
pub mod session;
pub mod transcript;
pub mod wire;

pub use assessment::{Assessment, SessionEvents, StudentInput, TurnPolicy};
pub use conversation::{History, Speaker, Turn};
pub use prompt::system_prompt;
pub use relay::{DirectRelay, Relay, RelayError, RemoteRelay};
pub use session::{
    BootstrapError, EndReason, Session, SessionStatus, SourceFile,
    SourceLanguage, Submission,
};
pub use transcript::{PersistError, Transcript, TranscriptStore};
