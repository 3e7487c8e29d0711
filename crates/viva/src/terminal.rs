use std::io::{self, BufRead, Write as _};
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use viva_core::{RelayError, SessionEvents, StudentInput};

use crate::display;

/// Student answers read line by line on a dedicated thread.
///
/// A blocked read can't be cancelled. Keeping it off the runtime means an
/// interrupted session can still exit while the reader thread waits.
pub struct LineInput {
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl LineInput {
    /// Reads from stdin.
    pub fn stdin() -> Self {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    pub fn spawn<R: BufRead + Send + 'static>(mut reader: R) -> Self {
        let (line_tx, lines) = mpsc::unbounded_channel();
        thread::spawn(move || {
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if line_tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        line_tx.send(Err(err)).ok();
                        break;
                    }
                }
            }
        });
        Self { lines }
    }
}

impl StudentInput for LineInput {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        // The sender is dropped on end of input.
        self.lines.recv().await.transpose()
    }
}

/// Prints the conversation as it happens.
pub struct TerminalEvents {
    progress_style: ProgressStyle,
    progress_bar: Option<ProgressBar>,
}

impl TerminalEvents {
    pub fn new() -> Self {
        let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        Self {
            progress_style,
            progress_bar: None,
        }
    }
}

impl SessionEvents for TerminalEvents {
    fn relay_started(&mut self) {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(self.progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        self.progress_bar = Some(progress_bar);
    }

    fn relay_finished(&mut self) {
        // Clear the spinner before printing anything else.
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }

    fn assistant_replied(&mut self, reply: &str) {
        println!("\n{}", display::assistant(reply));
    }

    fn input_requested(&mut self) {
        print!("{}", display::student_prompt());
        io::stdout().flush().ok();
    }

    fn relay_failed(&mut self, err: &RelayError) {
        println!("{}", display::error(err));
        if let Some(help) = display::relay_failure_help(err) {
            println!("\n{help}");
        }
    }
}
