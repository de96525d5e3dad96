//! ---
//! tpf_section: "01-core-functionality"
//! tpf_subsection: "binary"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Binary entrypoint for the TPF Sync CLI."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tpf_client::capabilities::CollectionSource;
use tpf_client::RestClient;
use tpf_common::config::{AppConfig, FailurePolicy};
use tpf_common::logging::{init_tracing, shutdown_tracing};
use tpf_core::report::StdoutSink;
use tpf_core::run::RunOrchestrator;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Team project feature provisioning CLI",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Override the collection name filter from the config file"
    )]
    collection: Option<String>,

    #[arg(
        long,
        help = "Report a failing project and continue instead of aborting the run"
    )]
    keep_going: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Sweep the configured collection and provision features")]
    Run,
    #[command(about = "List the collections visible on the server")]
    Collections,
}

// The sweep is strictly sequential; a single-threaded runtime is all it needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // An explicit --config path wins outright: it is neither beaten by
    // the TPF_CONFIG override nor allowed to fall through to candidates
    // when the file is missing.
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_path(path)?,
        None => AppConfig::load_with_source(&[
            PathBuf::from("configs/tpf.toml"),
            PathBuf::from("configs/example.toml"),
        ])?,
    };
    let mut config = loaded.config;
    if let Some(name) = cli.collection {
        config.run.collection = name;
    }
    if cli.keep_going {
        config.run.failure_policy = FailurePolicy::Isolate;
    }

    init_tracing("tpfctl", &config.logging)?;
    info!(config_path = %loaded.source.display(), server = %config.server.url, "configuration loaded");

    let client = Arc::new(
        RestClient::new(
            config.server_url()?,
            &config.server.api_version,
            &config.server.config_db,
        )
        .context("failed to construct server client")?,
    );

    let code = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let orchestrator =
                RunOrchestrator::new(client, Arc::new(StdoutSink), config.run.clone());
            let summary = orchestrator
                .run()
                .await
                .context("provisioning run failed")?;
            if summary.has_failures() {
                warn!(failed = summary.failed, "run finished with failures");
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Commands::Collections => {
            println!("Collections:");
            for collection in client.list_collections().await? {
                println!("{}", collection.name);
            }
            ExitCode::SUCCESS
        }
    };

    // Drop the non-blocking appender guards so buffered log lines reach
    // their writers before the process exits.
    shutdown_tracing();
    Ok(code)
}
