//! Main entry point for the CLI: answers one JSON GraphQL request per line of stdin.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tower::Service;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

use crate::calculator;
use crate::configuration::generate_config_schema;
use crate::configuration::Configuration;
use crate::graphql;

/// Options for the calculator
#[derive(Parser, Debug)]
#[command(
    name = "graphql-calculator",
    about = "GraphQL calculator reading requests from stdin, one JSON object per line",
    version
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "CALCULATOR_LOG"
    )]
    log_level: String,

    /// Configuration location relative to the current directory.
    #[arg(short, long = "config", env = "CALCULATOR_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    /// Prints the calculator schema (SDL).
    #[arg(long)]
    sdl: bool,
}

/// This is the main calculator entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("CALCULATOR_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }
    if opt.sdl {
        print!("{}", calculator::SDL);
        return Ok(());
    }

    // stdout carries the responses, logs go to stderr
    let builder = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?,
        )
        .with_writer(std::io::stderr);
    if std::io::stderr().is_terminal() {
        builder.try_init()
    } else {
        builder.json().try_init()
    }
    .map_err(|error| anyhow!("could not set the global subscriber: {error}"))?;

    let configuration = match &opt.config_path {
        Some(path) => {
            let path = if path.is_relative() {
                std::env::current_dir()?.join(path)
            } else {
                path.clone()
            };
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read configuration at {}", path.display()))?;
            content
                .parse::<Configuration>()
                .with_context(|| format!("invalid configuration at {}", path.display()))?
        }
        None => Configuration::default(),
    };
    tracing::debug!(?configuration, "configuration loaded");

    let mut service = calculator::service(configuration).context("invalid calculator schema")?;
    tracing::info!(
        "graphql-calculator v{} reading requests from stdin",
        std::env!("CARGO_PKG_VERSION")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<graphql::Request>(&line) {
            Ok(request) => service
                .ready()
                .await
                .map_err(|error| anyhow!(error))?
                .call(request)
                .await
                .map_err(|error| anyhow!(error))?,
            Err(error) => {
                tracing::debug!(%error, "malformed request");
                graphql::Response::builder()
                    .error(
                        graphql::Error::builder()
                            .message(format!("invalid GraphQL request: {error}"))
                            .extension_code("MALFORMED_REQUEST")
                            .build(),
                    )
                    .build()
            }
        };

        let mut output = serde_json::to_vec(&response)?;
        output.push(b'\n');
        stdout.write_all(&output).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
