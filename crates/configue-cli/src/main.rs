//! configue CLI - load a configuration file and print a value as JSON

use anyhow::{Context, Result};
use clap::Parser;
use configue::{Environment, LoadOptions, load};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "configue")]
#[command(version)]
#[command(about = "Load a configue file and print the value at a path as JSON", long_about = None)]
struct Cli {
    /// Configuration file (YAML or JSON)
    file: PathBuf,

    /// Dotted path of the value to print (the whole document if omitted)
    #[arg(default_value = "")]
    path: String,

    /// Path of a logging section to apply before loading
    #[arg(long)]
    logging_config: Option<String>,

    /// Environment variable override (KEY=VALUE)
    #[arg(short = 'e', long = "env", value_parser = parse_env_var)]
    env: Vec<(String, String)>,

    /// Print compact JSON instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

fn parse_env_var(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {arg:?}")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The logging section installs its own subscriber.
    if cli.logging_config.is_none() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "configue=warn".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let environment = cli
        .env
        .iter()
        .fold(Environment::process(), |environment, (key, value)| {
            environment.with_var(key, value)
        });

    let mut options = LoadOptions::new().environment(environment);
    if let Some(logging_config) = &cli.logging_config {
        options = options.logging_config_path(logging_config.as_str());
    }

    debug!(file = %cli.file.display(), path = %cli.path, "loading configuration");
    let value = load(&cli.file, cli.path.as_str(), options)
        .with_context(|| format!("Failed to load {}", cli.file.display()))?;
    let json = value
        .to_json()
        .context("Failed to convert the loaded value to JSON")?;

    let output = if cli.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{output}");
    Ok(())
}
