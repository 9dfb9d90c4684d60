//! sdkforge CLI entrypoint
//! Parses command-line arguments and runs the HTTP service or a one-shot setup.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use sdkforge::{
    application::SetupRequestBody,
    server::{self, AppState},
    settings::{AppConfig, PublisherKind},
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdkforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to <config dir>/sdkforge/config.toml)
    #[arg(long, global = true, env = "SDKFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one setup from a local spec file and print the JSON response
    Setup {
        /// Company name used to namespace repositories
        #[arg(long)]
        company: String,
        /// Path to the OpenAPI document (.json, .yaml or .yml)
        #[arg(long)]
        spec: PathBuf,
        /// Target language; repeat for several
        #[arg(long = "language", short = 'l', required = true)]
        languages: Vec<String>,
        /// Publisher to use, overriding the config file
        #[arg(long, value_parser = parse_publisher)]
        publisher: Option<PublisherKind>,
        /// Root directory for the filesystem publisher
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_publisher(value: &str) -> Result<PublisherKind, String> {
    value.parse().map_err(|e: sdkforge::settings::SettingsError| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting sdkforge");
    let cli = Cli::parse();
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            run_serve(config).await?
        }
        Commands::Setup {
            company,
            spec,
            languages,
            publisher,
            output_dir,
        } => {
            if let Some(publisher) = publisher {
                config.publisher.kind = publisher;
            }
            if let Some(output_dir) = output_dir {
                config.publisher.filesystem.root = output_dir;
            }
            config.validate().context("Invalid configuration")?;
            run_setup(config, company, &spec, languages).await?
        }
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, shutting down");
            token.cancel();
        }
    });
}

/// Runtime handler for the serve command
async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).context("Failed to configure publisher")?;
    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    server::serve(listener, server::create_router(state), shutdown)
        .await
        .context("HTTP server failed")
}

/// Runtime handler for the one-shot setup command
async fn run_setup(
    config: AppConfig,
    company: String,
    spec: &Path,
    languages: Vec<String>,
) -> anyhow::Result<()> {
    let openapi_spec = tokio::fs::read_to_string(spec)
        .await
        .with_context(|| format!("Failed to read spec file {}", spec.display()))?;
    let filename = spec
        .file_name()
        .map(|name| name.to_string_lossy().to_string());

    let state = AppState::from_config(&config).context("Failed to configure publisher")?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let body = SetupRequestBody {
        company_name: company,
        openapi_spec,
        languages,
        filename,
    };
    match state.setup_use_case().execute(body, cancel).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(error) => {
            println!("{}", serde_json::to_string_pretty(&error.body())?);
            Err(error).context("Setup was rejected")
        }
    }
}
