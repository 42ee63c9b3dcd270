use anyhow::{Context, Result};
use std::sync::Arc;

use chunked_uploader::cli::{Cli, Command};
use chunked_uploader::config::{self, validate_config};
use chunked_uploader::relay::{self, RelayState};
use chunked_uploader::uploader::{ChunkedUploader, FileSource, LogProgressObserver};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse_args();

    let mut config = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    validate_config(&config)?;

    // Initialize logging; RUST_LOG still takes precedence
    env_logger::Builder::new()
        .filter_level(config.log_filter())
        .parse_default_env()
        .init();

    match args.command {
        Command::Upload { path, .. } => {
            let source = FileSource::open(&path)
                .await
                .with_context(|| format!("Cannot read {}", path.display()))?;

            let uploader = ChunkedUploader::from_config(&config)?
                .with_observer(Arc::new(LogProgressObserver));

            match uploader.upload_file(&source).await {
                Ok(outcome) => {
                    println!(
                        "Uploaded {} ({} chunks, upload id {}): {}",
                        outcome.file_name,
                        outcome.total_chunks,
                        outcome.upload_id,
                        outcome.completion.message
                    );
                }
                Err(e) => {
                    log::error!("Upload failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Command::Relay { .. } => {
            let state = RelayState::from_config(&config)?;
            relay::serve(&config.relay_bind_addr, state).await?;
        }
    }

    Ok(())
}
