//! Session bootstrap and session state.

use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conversation::{History, Speaker, Turn};
use crate::relay::RelayError;

/// The name used when the student doesn't give one.
pub const DEFAULT_STUDENT_NAME: &str = "Student";

/// Source files above this size are rejected before a session starts.
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 100 * 1024;

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The source file doesn't exist.
    #[error("File '{}' not found.", .0.display())]
    FileNotFound(PathBuf),
    /// The source file exists but couldn't be read.
    #[error("Error reading file '{}': {source}", .path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
    /// The file extension doesn't name a supported language.
    #[error("Unsupported file type: .{0}")]
    UnsupportedLanguage(String),
    /// The source file is larger than the configured limit.
    #[error("File '{}' is {size} bytes, the limit is {limit} bytes.", .path.display())]
    SourceTooLarge {
        /// The file being read.
        path: PathBuf,
        /// The size of the file.
        size: u64,
        /// The configured limit.
        limit: u64,
    },
}

/// The language of a submitted source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    /// A `.py` file.
    Python,
    /// A `.c` file.
    C,
}

impl SourceLanguage {
    /// Derives the language from a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("py") {
            Some(Self::Python)
        } else if ext.eq_ignore_ascii_case("c") {
            Some(Self::C)
        } else {
            None
        }
    }

    /// Returns the lowercase name used in prompts and on the wire.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::C => "c",
        }
    }
}

impl Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Self::Python),
            "c" => Ok(Self::C),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// A source file that passed bootstrap validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// The path as given by the student.
    pub path: PathBuf,
    /// The file contents.
    pub code: String,
    /// The language derived from the extension.
    pub language: SourceLanguage,
}

impl SourceFile {
    /// Validates and reads a source file.
    ///
    /// The language is checked first, so an unsupported file is rejected
    /// without touching the file system.
    pub fn read<P: AsRef<Path>>(
        path: P,
        max_bytes: u64,
    ) -> Result<Self, BootstrapError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let language = SourceLanguage::from_extension(&ext)
            .ok_or(BootstrapError::UnsupportedLanguage(ext))?;

        let io_error = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                BootstrapError::FileNotFound(path.to_owned())
            } else {
                BootstrapError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        };

        let size = fs::metadata(path).map_err(io_error)?.len();
        if size > max_bytes {
            return Err(BootstrapError::SourceTooLarge {
                path: path.to_owned(),
                size,
                limit: max_bytes,
            });
        }
        let code = fs::read_to_string(path).map_err(io_error)?;
        debug!("read {} bytes of {language} from {}", code.len(), path.display());

        Ok(Self {
            path: path.to_owned(),
            code,
            language,
        })
    }
}

/// Returns the trimmed name, or [`DEFAULT_STUDENT_NAME`] if it is empty.
pub fn normalize_student_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() {
        DEFAULT_STUDENT_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

/// Everything the model needs to know about what is being assessed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// The display name of the student.
    pub student_name: String,
    /// The path of the submitted file.
    pub code_path: PathBuf,
    /// The submitted source code.
    pub source_code: String,
    /// The language of the source code.
    pub language: SourceLanguage,
}

impl Submission {
    /// Combines a validated source file with a student name.
    pub fn new(source: SourceFile, student_name: &str) -> Self {
        Self {
            student_name: normalize_student_name(student_name),
            code_path: source.path,
            source_code: source.code,
            language: source.language,
        }
    }
}

/// The lifecycle of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, the conversation hasn't started.
    #[default]
    Bootstrapping,
    /// The conversation is in progress.
    Active,
    /// The assessment reached its natural end or the turn limit.
    Completed,
    /// The student left early.
    Aborted,
    /// The relay failed.
    Errored,
}

impl SessionStatus {
    /// Returns `true` for the final states.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Errored)
    }
}

/// Why a session reached its terminal state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The assistant wrapped up after enough student turns.
    WrapUp,
    /// The student turn limit was reached.
    TurnLimit,
    /// The student typed a quit keyword.
    Quit,
    /// The process was interrupted.
    Interrupted,
    /// The input stream was closed.
    EndOfInput,
    /// The relay failed.
    RelayFailure(RelayError),
}

impl EndReason {
    /// The status this reason leads to.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::WrapUp | Self::TurnLimit => SessionStatus::Completed,
            Self::Quit | Self::Interrupted | Self::EndOfInput => {
                SessionStatus::Aborted
            }
            Self::RelayFailure(_) => SessionStatus::Errored,
        }
    }

    /// A stable identifier for transcripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrapUp => "wrap_up",
            Self::TurnLimit => "turn_limit",
            Self::Quit => "quit",
            Self::Interrupted => "interrupted",
            Self::EndOfInput => "end_of_input",
            Self::RelayFailure(_) => "relay_error",
        }
    }
}

/// One run of the assessment, exclusively owned by one conversation loop.
#[derive(Clone, Debug)]
pub struct Session {
    submission: Submission,
    history: History,
    student_turns: usize,
    status: SessionStatus,
    end_reason: Option<EndReason>,
}

impl Session {
    /// Creates a session in the bootstrapping state.
    pub fn new(submission: Submission) -> Self {
        Self {
            submission,
            history: History::default(),
            student_turns: 0,
            status: SessionStatus::Bootstrapping,
            end_reason: None,
        }
    }

    /// Returns what is being assessed.
    #[inline]
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Returns the number of turns the student typed. The seed turn is not
    /// counted.
    #[inline]
    pub fn student_turns(&self) -> usize {
        self.student_turns
    }

    /// Returns the current status.
    #[inline]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns why the session ended, if it did.
    #[inline]
    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    /// Moves from bootstrapping to active, seeding the history with the
    /// fixed opening turn.
    pub(crate) fn begin(&mut self) {
        debug_assert_eq!(self.status, SessionStatus::Bootstrapping);
        let seed = format!(
            "Hi! My name is {}. I'm ready to discuss my code.",
            self.submission.student_name
        );
        self.history.push(Turn::student(seed));
        self.status = SessionStatus::Active;
    }

    pub(crate) fn push_assistant(&mut self, content: String) {
        debug_assert_eq!(self.status, SessionStatus::Active);
        self.history.push(Turn::assistant(content));
    }

    pub(crate) fn push_student(&mut self, content: String) {
        debug_assert_eq!(self.status, SessionStatus::Active);
        debug_assert_eq!(
            self.history.last().map(|t| t.role),
            Some(Speaker::Assistant)
        );
        self.history.push(Turn::student(content));
        self.student_turns += 1;
    }

    /// Moves to the terminal state implied by `reason`. A terminal state is
    /// final, later calls are ignored.
    pub(crate) fn finish(&mut self, reason: EndReason) {
        if self.status.is_terminal() {
            warn!("session already ended, ignoring {}", reason.as_str());
            return;
        }
        self.status = reason.status();
        self.end_reason = Some(reason);
    }
}
