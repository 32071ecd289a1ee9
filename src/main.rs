//! Entry point for the site builder.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use i18n_site_builder::build;
use i18n_site_builder::config::{
    BuildSettings,
    ConfigManager,
};
use tracing_subscriber::EnvFilter;

/// Builds the localized site from templates and translation catalogs.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (see --example)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration with every default and exit
    #[arg(long)]
    example: bool,
}

/// Parses arguments, sets up logging and runs the build.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ログは stderr へ。guard はプロセス終了までフラッシュを保証する
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .init();

    if cli.example {
        return print_example();
    }

    let mut config_manager = ConfigManager::new();
    if let Err(error) = config_manager.load_settings(cli.config) {
        tracing::error!("{error}");
        return ExitCode::FAILURE;
    }
    match config_manager.config_path() {
        Some(path) => tracing::info!(config = %path.display(), "Loaded configuration"),
        None => tracing::info!("No configuration file given; using defaults"),
    }

    match build::run(config_manager.into_settings()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("Build failed: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Prints the default configuration.
#[allow(clippy::print_stdout)]
fn print_example() -> ExitCode {
    match BuildSettings::example() {
        Ok(example) => {
            println!("{example}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}
