//! nlplan binary: HTTP service (`serve`) or a one-shot plan (`plan`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nlplan::bootstrap::build_planner;
use nlplan::config::Config;
use nlplan::gateway::{GatewayState, start_server};
use nlplan::logging::{TracingOptions, init_tracing};
use nlplan::planner::{Mode, PlanOptions, PlanRequest};

#[derive(Parser, Debug)]
#[command(name = "nlplan", version, about = "Natural-language Solana action planner")]
struct Cli {
    /// TOML settings file (defaults to ./nlplan.toml when present).
    #[arg(long, global = true, env = "NLPLAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,

    /// Plan a single prompt and print the response JSON.
    Plan {
        #[arg(long)]
        prompt: String,

        /// "lite" or "pro"; anything else falls back to lite.
        #[arg(long, default_value = "lite")]
        mode: String,

        #[arg(long)]
        wallet: Option<String>,

        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env_with_toml(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Plan {
            prompt,
            mode,
            wallet,
            no_cache,
        } => plan_once(config, prompt, &mode, wallet, no_cache).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    init_tracing(TracingOptions::service(config.log_format)).map_err(anyhow::Error::msg)?;

    let planner = Arc::new(build_planner(&config)?);
    let state = Arc::new(GatewayState::new(planner, config.server.rate_limit_rpm));

    start_server(
        config.server.socket_addr(),
        state,
        config.server.body_limit_bytes,
        shutdown_signal(),
    )
    .await?;
    Ok(())
}

async fn plan_once(
    config: Config,
    prompt: String,
    mode: &str,
    wallet: Option<String>,
    no_cache: bool,
) -> anyhow::Result<()> {
    init_tracing(TracingOptions::cli(config.log_format)).map_err(anyhow::Error::msg)?;

    let planner = build_planner(&config)?;
    planner.registry().refresh().await;

    let mut request = PlanRequest::new(prompt).with_mode(Mode::parse_lenient(Some(mode)));
    if let Some(wallet) = wallet.filter(|w| !w.is_empty()) {
        request = request.with_wallet(wallet);
    }

    let response = planner
        .process_plan(&request, PlanOptions { no_cache })
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e.public_message(), e.code().as_str()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    tracing::info!(signal, "shutdown_signal");
}
