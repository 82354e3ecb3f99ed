mod config;
mod script;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::script::{Script, ScriptRunner};

#[derive(Parser)]
#[command(name = "overdub")]
#[command(about = "Headless multitrack overdub timeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session script and print the resulting timeline as JSON
    Run {
        /// Script file path
        script: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the time ruler for the configured scale
    Ruler {
        /// Ruler length in seconds (defaults to the configured transport length)
        #[arg(long)]
        length: Option<f64>,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the default config location
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Run { script, pretty } => run_script(&config, &script, pretty),
        Commands::Ruler { length } => {
            print_ruler(&config, length);
            Ok(())
        }
        Commands::Config { write } => {
            print!("{}", config.to_toml()?);
            if write {
                config.save().context("writing config")?;
                if let Some(path) = Config::config_path() {
                    tracing::info!(path = %path.display(), "config written");
                }
            }
            Ok(())
        }
    }
}

fn run_script(config: &Config, path: &Path, pretty: bool) -> Result<()> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
    let script = Script::parse(&source).with_context(|| format!("parsing {}", path.display()))?;
    tracing::info!(?path, steps = script.len(), "running script");

    let snapshot = ScriptRunner::new(config).run(&script)?;

    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");
    Ok(())
}

fn print_ruler(config: &Config, length: Option<f64>) {
    let options = config.session_options();
    let length = length.unwrap_or(options.transport_length);

    for mark in options.scale.ruler(length) {
        let tick = if mark.major { "|" } else { "." };
        println!("{:>8}  {tick} {}", mark.pixels, mark.label().unwrap_or_default());
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}
