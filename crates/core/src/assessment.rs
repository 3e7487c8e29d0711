//! The turn-by-turn conversation loop.

mod policy;
#[cfg(test)]
mod tests;

use std::io;
use std::pin::{Pin, pin};

use tokio::select;

use crate::relay::{Relay, RelayError};
use crate::session::{EndReason, Session, SessionStatus};
pub use policy::{DEFAULT_CLOSING_PHRASES, TurnPolicy};

/// A source of student input lines.
pub trait StudentInput {
    /// Reads one line. Returns `Ok(None)` when the input is closed.
    ///
    /// This may block for as long as the student takes to answer.
    fn read_line(&mut self) -> impl Future<Output = io::Result<Option<String>>>;
}

/// Hooks for presenting a session as it progresses.
///
/// All methods default to doing nothing.
pub trait SessionEvents {
    /// A relay call is about to start.
    fn relay_started(&mut self) {}

    /// The relay call returned, failed or was interrupted.
    fn relay_finished(&mut self) {}

    /// The assistant replied.
    fn assistant_replied(&mut self, _reply: &str) {}

    /// The student is expected to type an answer.
    fn input_requested(&mut self) {}

    /// The relay failed and the session is ending.
    fn relay_failed(&mut self, _err: &RelayError) {}
}

impl SessionEvents for () {}

enum StudentReply {
    Answer(String),
    Ended(EndReason),
}

/// The conversation loop.
///
/// An assessment alternates assistant and student turns, strictly one step
/// at a time: a relay call and a line read never overlap. It stops when the
/// assistant wraps up, the turn limit is reached, the student quits, the
/// relay fails or the interrupt fires.
pub struct Assessment<R> {
    relay: R,
    policy: TurnPolicy,
}

impl<R: Relay> Assessment<R> {
    /// Creates an assessment with the default [`TurnPolicy`].
    #[inline]
    pub fn new(relay: R) -> Self {
        Self {
            relay,
            policy: TurnPolicy::default(),
        }
    }

    /// Replaces the turn policy.
    #[inline]
    pub fn with_policy(mut self, policy: TurnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drives `session` from bootstrapping to a terminal state.
    ///
    /// `interrupt` is raced against both suspension points. When it resolves
    /// the session is aborted with whatever history it has; an in-flight
    /// relay call is dropped and its reply never recorded.
    pub async fn run<I, E, F>(
        &self,
        session: &mut Session,
        input: &mut I,
        events: &mut E,
        interrupt: F,
    ) -> SessionStatus
    where
        I: StudentInput,
        E: SessionEvents,
        F: Future<Output = ()>,
    {
        let mut interrupt = pin!(interrupt);
        session.begin();
        info!(
            "assessment started for {} ({})",
            session.submission().student_name,
            session.submission().language
        );

        loop {
            if session.student_turns() >= self.policy.max_student_turns {
                info!("reached {} student turns", session.student_turns());
                session.finish(EndReason::TurnLimit);
                break;
            }

            events.relay_started();
            let result = select! {
                biased;
                _ = interrupt.as_mut() => None,
                result = self.relay.send(
                    session.submission(),
                    session.history().turns(),
                ) => Some(result),
            };
            events.relay_finished();

            let reply = match result {
                Some(Ok(reply)) => reply,
                Some(Err(err)) => {
                    error!("relay failed: {err}");
                    events.relay_failed(&err);
                    session.finish(EndReason::RelayFailure(err));
                    break;
                }
                None => {
                    info!("interrupted while waiting for the assistant");
                    session.finish(EndReason::Interrupted);
                    break;
                }
            };

            events.assistant_replied(&reply);
            let wrap_up =
                self.policy.is_wrap_up(&reply, session.student_turns());
            session.push_assistant(reply);
            if wrap_up {
                info!("assistant wrapped up");
                session.finish(EndReason::WrapUp);
                break;
            }

            match Self::read_reply(input, events, interrupt.as_mut()).await {
                StudentReply::Answer(answer) => session.push_student(answer),
                StudentReply::Ended(reason) => {
                    info!("student left: {}", reason.as_str());
                    session.finish(reason);
                    break;
                }
            }
        }

        session.status()
    }

    /// Reads lines until a non-empty one arrives. Empty lines are discarded
    /// and never reach the relay.
    async fn read_reply<I, E, F>(
        input: &mut I,
        events: &mut E,
        mut interrupt: Pin<&mut F>,
    ) -> StudentReply
    where
        I: StudentInput,
        E: SessionEvents,
        F: Future<Output = ()>,
    {
        loop {
            events.input_requested();
            let line = select! {
                biased;
                _ = interrupt.as_mut() => {
                    return StudentReply::Ended(EndReason::Interrupted);
                }
                line = input.read_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => return StudentReply::Ended(EndReason::EndOfInput),
                Err(err) => {
                    error!("error reading input: {err}");
                    return StudentReply::Ended(EndReason::EndOfInput);
                }
            };

            if TurnPolicy::is_quit(&line) {
                return StudentReply::Ended(EndReason::Quit);
            }
            let answer = line.trim();
            if answer.is_empty() {
                continue;
            }
            return StudentReply::Answer(answer.to_owned());
        }
    }
}
