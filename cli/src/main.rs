//! # `truthmark` command-line client
//!
//! Thin wrapper over `truthmark-core` for embedding and extracting
//! invisible watermarks from the shell.
//!
//! ```bash
//! truthmark encode photo.png "made by a human" --output photo_marked.png
//! truthmark decode photo_marked.png
//! TRUTHMARK_API_KEY=sk_live_... truthmark --base-url https://api.example.com decode photo.png
//! ```
//!
//! Results are printed to stdout as JSON. `decode` exits with status 2 when
//! no watermark is found; any error exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use truthmark_core::{ClientConfig, ImageSource, WatermarkClient, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(author, version, about = "Embed and extract invisible image watermarks", long_about = None)]
struct Args {
    /// Watermark API endpoint
    #[arg(long, env = "TRUTHMARK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "TRUTHMARK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "TRUTHMARK_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Log request details to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed MESSAGE into IMAGE
    Encode {
        image: PathBuf,
        message: String,
        /// Save the watermarked image here; a failed save is logged as a
        /// warning and does not change the exit status
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract a watermark from IMAGE
    Decode { image: PathBuf },
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url).with_timeout(Duration::from_secs(self.timeout));
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "truthmark_core=debug,info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let client = WatermarkClient::new(args.client_config()).context("invalid client configuration")?;

    match args.command {
        Command::Encode {
            image,
            message,
            output,
        } => {
            let result = client
                .encode(&ImageSource::path(&image), &message)
                .with_context(|| format!("failed to encode {}", image.display()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(output) = output {
                match client.download(&result, &output) {
                    Ok(bytes) => tracing::info!(path = %output.display(), bytes, "watermarked image saved"),
                    Err(err) => tracing::warn!(
                        path = %output.display(),
                        error = %err,
                        "encoded, but could not save the watermarked image"
                    ),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Decode { image } => {
            let result = client
                .decode(&ImageSource::path(&image))
                .with_context(|| format!("failed to decode {}", image.display()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.found {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
