//! Command-line entry point: runs one named operation and prints its payload.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use statekv::{Config, StateDb};
use tracing_subscriber::EnvFilter;

/// CLI arguments for statekv.
#[derive(Parser, Debug)]
#[command(about = "Ledger state key-value operations")]
struct Args {
    /// Path to config file (TOML). Defaults to an in-memory store.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Operation name, e.g. `put` or `scanByPartialCompositeKey`.
    operation: String,

    /// Positional arguments for the operation.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&contents)?)
            }
            None => Ok(Config::default()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let db = StateDb::open(args.load_config()?).await?;
    let response = db.invoke(&args.operation, &args.args).await;
    db.close().await?;

    if response.is_success() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&response.payload)?;
        stdout.flush()?;
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", response.message);
        Ok(ExitCode::FAILURE)
    }
}
