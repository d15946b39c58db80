mod analysis;
mod command;
mod config;
mod error;
mod indicator;
mod levels;
mod model;
mod provider;
mod report;
mod series;
mod server;
mod trend;

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use analysis::AnalysisSettings;
use config::AppConfig;
use provider::MarketDataProvider;
use provider::coingecko::CoinGeckoProvider;
use server::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("provider setup error")]
    Provider,
    #[display("invalid command")]
    Command,
    #[display("analysis failed")]
    Analysis,
    #[display("server error")]
    Server,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(name = "coin-analyst", about = "Crypto technical analysis for a chat terminal")]
struct Cli {
    /// Path to the TOML configuration file [default: config.toml]
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web terminal and the /analyze endpoint
    Serve,
    /// Analyze one asset and print the report
    Analyze {
        /// Free-text command, e.g. `full breakdown btc`
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,

        /// Print the structured report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(Path::new(path)),
        None => config::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
    }
    .change_context(AppError::Config)?;

    init_tracing(&config);

    let provider: Arc<dyn MarketDataProvider> = Arc::new(
        CoinGeckoProvider::new(&config.provider).change_context(AppError::Provider)?,
    );
    let settings = AnalysisSettings::from_config(&config.analysis, config.provider.history_window())
        .change_context(AppError::Config)?;

    let window = settings.window();
    info!(
        provider = provider.name(),
        days = window.days,
        granularity = %window.granularity,
        "analysis engine ready"
    );

    match cli.command {
        Command::Serve => serve(provider, settings, &config).await,
        Command::Analyze { words, json } => {
            analyze_once(provider.as_ref(), &settings, &words.join(" "), json).await
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn serve(
    provider: Arc<dyn MarketDataProvider>,
    settings: AnalysisSettings,
    config: &AppConfig,
) -> Result<(), Report<AppError>> {
    let state = Arc::new(AppState { provider, settings });

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        info!("ctrl+c received, shutting down");
        shutdown.cancel();
    });

    server::serve(state, &config.server, cancel)
        .await
        .change_context(AppError::Server)?;

    info!("shutdown complete");
    Ok(())
}

async fn analyze_once(
    provider: &dyn MarketDataProvider,
    settings: &AnalysisSettings,
    input: &str,
    json: bool,
) -> Result<(), Report<AppError>> {
    let command = command::parse(input)
        .change_context(AppError::Command)
        .attach_with(|| format!("input: {input:?}"))?;

    let report = analysis::run(provider, &command.symbol, settings)
        .await
        .change_context(AppError::Analysis)?;

    if json {
        let body = serde_json::to_string_pretty(&report).change_context(AppError::Runtime)?;
        println!("{body}");
    } else {
        println!("{}", report::render(&report, command.mode));
    }
    Ok(())
}
