//! The system instructions sent with every model call.

use crate::session::Submission;

const TEMPLATE: &str = include_str!("./system_prompt.md");

/// Renders the system prompt for a submission.
///
/// The code is substituted last so that placeholders appearing inside the
/// student's code are left alone.
pub fn system_prompt(submission: &Submission) -> String {
    TEMPLATE
        .trim_end()
        .replace("{{LANGUAGE}}", submission.language.as_str())
        .replace("{{CODE}}", &submission.source_code)
}
