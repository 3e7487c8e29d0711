//! Talk through a source file with an AI examiner and save the transcript.

#[macro_use]
extern crate tracing;

mod display;
mod terminal;

use std::env;
use std::future::pending;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use viva_anthropic_model::{AnthropicConfigBuilder, AnthropicProvider};
use viva_core::session::DEFAULT_MAX_SOURCE_BYTES;
use viva_core::{
    Assessment, DirectRelay, EndReason, Relay, RelayError, RemoteRelay,
    Session, SourceFile, StudentInput, Submission, TranscriptStore,
};

use crate::terminal::{LineInput, TerminalEvents};

/// Discuss your code with Claude. The conversation is saved as a transcript
/// for your teacher.
#[derive(Debug, Parser)]
#[command(
    name = "viva",
    version,
    after_help = "Examples:\n  viva mario.py \"John Smith\"\n  viva hello.c"
)]
struct Args {
    /// The Python (.py) or C (.c) file to discuss.
    code_file: PathBuf,

    /// Your name. Asked for interactively when omitted.
    student_name: Option<String>,

    /// URL of your teacher's relay server. Without it the model is called
    /// directly with ANTHROPIC_API_KEY.
    #[arg(long, env = "VIVA_SERVER_URL")]
    server: Option<String>,

    /// Directory the transcript is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Model to use when calling it directly.
    #[arg(long, env = "ANTHROPIC_MODEL")]
    model: Option<String>,

    /// Seconds to wait for each reply.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(
            env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            err.print().ok();
            // `--help` and `--version` are not failures.
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let mut input = LineInput::stdin();
    let (submission, relay) = match prepare(&args, &mut input).await {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    let started_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    println!(
        "{}",
        display::header(&submission.student_name, &started_at.to_string())
    );

    let assessment = Assessment::new(relay);
    let mut session = Session::new(submission);
    let mut events = TerminalEvents::new();
    assessment
        .run(&mut session, &mut input, &mut events, interrupted())
        .await;
    report_end(&session);

    println!("\n{}", display::rule());
    let store = TranscriptStore::new(&args.output_dir);
    match store.persist(&session) {
        Ok(path) => {
            println!(
                "{}",
                display::success(&format!(
                    "Transcript saved to: {}",
                    path.display()
                ))
            );
            println!("{}", display::submit_hint(&path));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("failed to save transcript: {err}");
            println!(
                "{}",
                display::error("Failed to save transcript. Please try again.")
            );
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Logging is off unless `RUST_LOG` asks for it, so log lines never land in
/// the middle of the conversation.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("off"))
}

/// Validates the source file, resolves the student name and connects.
///
/// The file is checked before anything touches the network. On failure the
/// guidance has already been printed.
async fn prepare<I: StudentInput>(
    args: &Args,
    input: &mut I,
) -> Result<(Submission, Box<dyn Relay>), ExitCode> {
    let source = match SourceFile::read(&args.code_file, DEFAULT_MAX_SOURCE_BYTES)
    {
        Ok(source) => source,
        Err(err) => {
            println!("{}", display::error(&err));
            if let Some(help) = display::bootstrap_help(&err) {
                println!("{help}");
            }
            return Err(ExitCode::FAILURE);
        }
    };

    let student_name = match &args.student_name {
        Some(name) => name.clone(),
        None => ask_name(input).await,
    };
    let relay = connect(args).await?;
    Ok((Submission::new(source, &student_name), relay))
}

/// Picks the relay and checks it can be used. On failure the guidance has
/// already been printed.
async fn connect(args: &Args) -> Result<Box<dyn Relay>, ExitCode> {
    let timeout = Duration::from_secs(args.timeout);

    if let Some(server_url) = &args.server {
        println!("Connecting to assessment server...");
        let relay = RemoteRelay::new(server_url.as_str())
            .with_request_timeout(timeout);
        if let Err(err) = relay.check_liveness().await {
            warn!("liveness check failed: {err}");
            println!(
                "{}",
                display::error(&format!(
                    "Cannot connect to server at {}",
                    relay.base_url()
                ))
            );
            println!("{}", display::unreachable_server_help(relay.base_url()));
            return Err(ExitCode::FAILURE);
        }
        println!("{}", display::success("Connected to server!"));
        return Ok(Box::new(relay));
    }

    let Ok(api_key) = env::var("ANTHROPIC_API_KEY") else {
        println!(
            "{}",
            display::error("ANTHROPIC_API_KEY environment variable not set.")
        );
        println!("{}", display::missing_api_key_help());
        return Err(ExitCode::FAILURE);
    };
    let mut builder =
        AnthropicConfigBuilder::with_api_key(api_key).with_timeout(timeout);
    if let Some(model) = &args.model {
        builder = builder.with_model(model);
    }
    match AnthropicProvider::new(builder.build()) {
        Ok(provider) => {
            Ok(Box::new(DirectRelay::new(provider).with_timeout(timeout)))
        }
        Err(err) => {
            let err = RelayError::BackendInit(err.to_string());
            println!("{}", display::error(&err));
            Err(ExitCode::FAILURE)
        }
    }
}

async fn ask_name<I: StudentInput>(input: &mut I) -> String {
    print!("Enter your name: ");
    std::io::stdout().flush().ok();
    match input.read_line().await {
        Ok(Some(line)) => line,
        Ok(None) => String::new(),
        Err(err) => {
            error!("error reading input: {err}");
            String::new()
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler can't be installed.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        pending::<()>().await;
    }
}

fn report_end(session: &Session) {
    match session.end_reason() {
        Some(EndReason::WrapUp | EndReason::TurnLimit) => {
            println!("\n{}", display::rule());
            println!("{}", display::success("Assessment complete!"));
        }
        Some(EndReason::Quit | EndReason::EndOfInput) => {
            println!("\nEnding assessment early...");
        }
        Some(EndReason::Interrupted) => {
            println!("\n\nAssessment interrupted by user.");
        }
        // Already reported as it happened.
        Some(EndReason::RelayFailure(_)) | None => {}
    }
}
