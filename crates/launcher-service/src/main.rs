//! Main entry point for the launcher API service.
//!
//! Configuration comes from the environment (after loading `.env` if present)
//! or, with `--config`, from a TOML file with `${VAR}` substitution.
//!
//! ```bash
//! JWT_SECRET_KEY=... MASTER_PASSWORD=... launcher
//! launcher --config launcher.toml --log-level debug
//! ```

use clap::Parser;
use launcher_config::Config;
use launcher_service::server;
use std::path::PathBuf;

/// Command-line arguments for the launcher service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to a TOML configuration file
	///
	/// When omitted, configuration is read from environment variables.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the launcher service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file or environment
/// 4. Runs the API server until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// A missing .env file is not an error
	dotenvy::dotenv().ok();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started launcher");

	let config = load_config(&args).await?;
	tracing::info!(
		production = config.production,
		backend = ?config.storage.backend,
		"Loaded configuration"
	);

	server::start_server(config).await?;

	tracing::info!("Stopped launcher");
	Ok(())
}

async fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
	match &args.config {
		Some(path) => {
			tracing::info!("Loading configuration from file: {:?}", path);
			Ok(Config::from_file(path).await?)
		},
		None => {
			tracing::info!("Loading configuration from environment");
			Ok(Config::from_env()?)
		},
	}
}
