use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quoting_config::{ConfigLoader, LogFormat, QuotingConfig};
use quoting_service::QuotingService;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "quoting-service")]
#[command(about = "FSPIOP quoting service", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/quoting.toml")]
	config: PathBuf,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long)]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the quoting service
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = load_config(&cli.config).await?;
	let log_level = cli
		.log_level
		.clone()
		.unwrap_or_else(|| config.service.log_level.clone());
	setup_tracing(&log_level, config.service.log_format)?;

	match cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => {
			validate_config(&cli.config, &config);
			Ok(())
		}
	}
}

async fn load_config(path: &Path) -> Result<QuotingConfig> {
	ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", path))
}

async fn start_service(config: QuotingConfig) -> Result<()> {
	info!("Starting quoting service");
	info!("Service name: {}", config.service.name);
	info!("HTTP port: {}", config.service.http_port);
	info!("Pass-through mode: {}", config.service.pass_through_mode);

	let service = QuotingService::new(config)?;
	service.run().await
}

fn validate_config(path: &Path, config: &QuotingConfig) {
	info!("Configuration {:?} is valid", path);
	info!("Service name: {}", config.service.name);
	info!("Storage backend: {}", config.storage.backend);
	info!("Participants backend: {}", config.participants.backend);
	info!("Account lookup backend: {}", config.account_lookup.backend);
	if config.scheme_rules.currencies.is_empty() {
		info!("Scheme currencies: any");
	} else {
		info!(
			"Scheme currencies: {}",
			config.scheme_rules.currencies.join(", ")
		);
	}
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

	let registry = tracing_subscriber::registry().with(env_filter);
	let initialized = match format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
	};

	initialized.context("Failed to initialize tracing")
}
