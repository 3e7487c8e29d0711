#[macro_use]
extern crate tracing;

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use viva_anthropic_model::{AnthropicConfigBuilder, AnthropicProvider};
use viva_core::DirectRelay;
use viva_server::{AppState, RateLimiter, ServerConfig, router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viva_server=info,viva_core=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    let Some(api_key) = config.api_key.clone() else {
        eprintln!("ANTHROPIC_API_KEY is not set.");
        eprintln!("Set it before starting the server:");
        eprintln!("    export ANTHROPIC_API_KEY=your-key-here");
        return ExitCode::FAILURE;
    };

    match serve(config, api_key).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("server failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(
    config: ServerConfig,
    api_key: String,
) -> Result<(), Box<dyn Error>> {
    let mut builder = AnthropicConfigBuilder::with_api_key(api_key)
        .with_timeout(config.timeout());
    if let Some(model) = &config.model {
        builder = builder.with_model(model);
    }
    if let Some(base_url) = &config.base_url {
        builder = builder.with_base_url(base_url);
    }
    let provider = AnthropicProvider::new(builder.build())?;
    info!(model = provider.config().model(), "model backend ready");

    let relay = DirectRelay::new(provider).with_timeout(config.timeout());
    let limiter = RateLimiter::new(config.rate_limit_policy());
    let state = AppState::new(relay, limiter, config.max_code_bytes);

    let listener = TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        max_requests = config.max_requests,
        window_secs = config.window_secs,
        "listening"
    );
    println!("Relay server listening on http://{addr}");
    println!(
        "Students connect with: viva <file> --server http://<this-host>:{}",
        addr.port()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
