//! Persisting finished sessions.
//!
//! A transcript is one pretty-printed JSON document per session. It is the
//! only durable artifact of an assessment and is handed to the teacher as
//! is, so its keys stay stable.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::conversation::History;
use crate::session::{Session, SessionStatus, SourceLanguage};

/// Errors from writing a transcript.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The file could not be created or written.
    #[error("failed to write transcript to '{}': {source}", .path.display())]
    Io {
        /// The intended destination.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
    /// The transcript could not be encoded.
    #[error("failed to encode transcript: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The persisted form of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// The display name of the student.
    pub student_name: String,
    /// The path of the submitted file, as given.
    pub code_file: String,
    /// The language of the submitted file.
    pub language: SourceLanguage,
    /// When the transcript was written.
    pub timestamp: DateTime<Local>,
    /// The submitted source code.
    pub code: String,
    /// A verbatim copy of the session history.
    pub conversation: History,
    /// How the session ended.
    pub status: SessionStatus,
    /// Why the session ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
}

impl Transcript {
    /// Captures a session at `timestamp`.
    pub fn from_session(session: &Session, timestamp: DateTime<Local>) -> Self {
        let submission = session.submission();
        Self {
            student_name: submission.student_name.clone(),
            code_file: submission.code_path.display().to_string(),
            language: submission.language,
            timestamp,
            code: submission.source_code.clone(),
            conversation: session.history().clone(),
            status: session.status(),
            end_reason: session.end_reason().map(|r| r.as_str().to_owned()),
        }
    }

    /// Reads a transcript back from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| PersistError::Io {
                path: path.to_owned(),
                source,
            })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Returns `assessment_<name>_<YYYYmmdd_HHMMSS>.json`, with whitespace and
/// path separators in the name replaced by `_`.
pub fn transcript_file_name(
    student_name: &str,
    timestamp: &DateTime<Local>,
) -> String {
    let name: String = student_name
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '/' | '\\' | ':') {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!(
        "assessment_{name}_{}.json",
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Writes transcripts into a directory.
#[derive(Clone, Debug)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    /// Creates a store writing into `dir`.
    #[inline]
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Persists `session` and returns the path of the new file.
    ///
    /// The document is written to a temporary file in the same directory
    /// and renamed into place, so either the whole transcript lands or no
    /// file is left behind. An existing file is never overwritten.
    pub fn persist(&self, session: &Session) -> Result<PathBuf, PersistError> {
        let now = Local::now();
        let transcript = Transcript::from_session(session, now);
        let path = self
            .dir
            .join(transcript_file_name(&transcript.student_name, &now));
        let content = serde_json::to_string_pretty(&transcript)?;

        let io_error = |source: io::Error| PersistError::Io {
            path: path.clone(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        file.write_all(content.as_bytes()).map_err(io_error)?;
        file.write_all(b"\n").map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        // Dropping the temporary file on failure removes it.
        file.persist_noclobber(&path)
            .map_err(|err| io_error(err.error))?;

        info!("transcript written to {}", path.display());
        Ok(path)
    }
}
