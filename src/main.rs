// Copyright 2026 Marketscribe Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use marketscribe::browser::cdp::CdpSession;
use marketscribe::config::Config;
use marketscribe::coordinator::{RunCoordinator, RunReport};
use marketscribe::error::ScribeError;
use marketscribe::model::Submission;
use marketscribe::queue::{RunExecutor, RunQueue};
use marketscribe::server::{self, AppState};
use marketscribe::sheets::auth::TokenProvider;
use marketscribe::sheets::client::SheetsClient;

#[derive(Parser)]
#[command(
    name = "marketscribe",
    about = "Marketplace research scribe: overlay extraction into spreadsheet ledgers",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the submission API and run worker
    Serve {
        /// Port for the HTTP API (overrides HTTP_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Execute one submission from a JSON file and print the report
    Run {
        /// Path to the submission JSON
        file: PathBuf,
    },
}

/// Production run executor: per run, acquire the shared browser session
/// and drive the coordinator against the REST spreadsheet backend.
struct ScribeExecutor {
    cfg: Config,
    sheets: SheetsClient,
}

impl ScribeExecutor {
    fn new(cfg: Config) -> Result<Self, ScribeError> {
        let auth = Arc::new(TokenProvider::new(&cfg.client_email, &cfg.private_key)?);
        let sheets = SheetsClient::new(auth);
        Ok(ScribeExecutor { cfg, sheets })
    }

    async fn run(&self, submission: Submission) -> Result<RunReport> {
        let session = CdpSession::acquire(&self.cfg)
            .await
            .context("browser session unavailable")?;
        let coordinator = RunCoordinator::new(&self.cfg, &self.sheets, &session);
        let report = coordinator.execute(submission).await?;
        Ok(report)
    }
}

#[async_trait]
impl RunExecutor for ScribeExecutor {
    async fn execute(&self, submission: Submission) {
        match self.run(submission).await {
            Ok(report) => {
                let failed = report.outcomes.iter().filter(|o| o.error.is_some()).count();
                tracing::info!(
                    products = report.outcomes.len(),
                    failed,
                    "run completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "run failed");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "marketscribe=debug"
    } else {
        "marketscribe=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Serve { port } => {
            let cfg = Config::from_env().context("configuration invalid")?;
            let port = port.unwrap_or(cfg.http_port);
            let executor = Arc::new(ScribeExecutor::new(cfg)?);
            let queue = RunQueue::start(executor);
            let state = Arc::new(AppState { queue });
            server::start(port, state).await
        }
        Commands::Run { file } => {
            let cfg = Config::from_env().context("configuration invalid")?;
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let submission: Submission =
                serde_json::from_str(&raw).context("submission JSON invalid")?;
            let executor = ScribeExecutor::new(cfg)?;
            let report = executor.run(submission).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
