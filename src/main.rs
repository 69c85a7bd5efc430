//! upcloud-image-builder - build UpCloud storage templates from a server
//!
//! Focused on:
//! - Multi-zone template replication
//! - Reclaiming intermediate storage on failure
//! - Validating configuration before touching any resource

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use upcloud_image_builder::artifact::Artifact;
use upcloud_image_builder::config::{Config, loader::load_raw_config};
use upcloud_image_builder::driver::upcloud::{UPCLOUD_API_URL, UpCloudDriver};
use upcloud_image_builder::ui::{ConsoleUi, Ui};
use upcloud_image_builder::{BuilderError, build_templates};

#[derive(Parser)]
#[command(name = "upcloud-image-builder")]
#[command(author, version, about = "Build UpCloud storage templates from a running server", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// UpCloud API base URL
    #[arg(long, env = "UPCLOUD_API_URL", default_value = UPCLOUD_API_URL, global = true)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create templates from the disk of an existing server
    Build {
        /// Build configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Server whose disk becomes the template
        #[arg(long)]
        server_uuid: String,
    },
    /// Check a build configuration and report every problem
    Validate {
        /// Build configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Delete templates produced by an earlier build
    Destroy {
        /// Build configuration file providing the API credentials
        #[arg(short, long)]
        config: PathBuf,

        /// Template identifiers to delete
        #[arg(required = true)]
        templates: Vec<String>,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

async fn load_config(path: &Path) -> Result<Config, BuilderError> {
    let raw = load_raw_config(path).await?;
    Config::prepare_from_env(raw).await
}

fn upcloud_driver(api_url: &str, config: &Config) -> Result<UpCloudDriver, BuilderError> {
    UpCloudDriver::with_base_url(api_url, &config.username, &config.password, config.timeout)
}

async fn run(cli: Cli, ui: Arc<dyn Ui>) -> Result<(), BuilderError> {
    match cli.command {
        Commands::Build {
            config,
            server_uuid,
        } => {
            let config = load_config(&config).await?;
            let driver = upcloud_driver(&cli.api_url, &config)?;

            let artifact = build_templates(&config, &server_uuid, Arc::new(driver), ui.clone()).await?;
            ui.say(&artifact.to_string());
        }
        Commands::Validate { config } => {
            info!("Validating {}", config.display());
            load_config(&config).await?;
            ui.say("Configuration is valid");
        }
        Commands::Destroy { config, templates } => {
            let config = load_config(&config).await?;
            let driver = upcloud_driver(&cli.api_url, &config)?;

            let artifact = Artifact::from_ids(templates);
            ui.say(&format!("Deleting template(s) {}...", artifact.id()));
            artifact.destroy(&driver).await?;
            ui.say("Template(s) deleted");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ui: Arc<dyn Ui> = Arc::new(ConsoleUi);
    match run(cli, ui.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
