//! An abstraction layer for the chat models behind an assessment.
//!
//! This crate establishes a small protocol between the conversation engine
//! and the hosted models it talks to: a request is the whole message
//! history, and a response is exactly one assistant message. Backends are
//! stateless from the caller's perspective, so the full history travels
//! with every request.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
