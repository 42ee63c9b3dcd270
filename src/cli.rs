use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chunked file uploader and pass-through relay")]
pub struct Cli {
    /// Path to a JSON config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file chunk by chunk through the relay
    Upload {
        path: PathBuf,
        /// Relay base URL, e.g. https://example.netlify.app
        #[arg(long)]
        relay_url: Option<String>,
        /// Chunk size in bytes
        #[arg(long)]
        chunk_size: Option<u64>,
    },
    /// Run the relay endpoints, forwarding to upstream storage
    Relay {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        upstream_url: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Command-line flags win over values from the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        match &self.command {
            Command::Upload {
                relay_url,
                chunk_size,
                ..
            } => {
                if let Some(url) = relay_url {
                    config.relay_url = url.clone();
                }
                if let Some(size) = chunk_size {
                    config.chunk_size_bytes = *size;
                }
            }
            Command::Relay { bind, upstream_url } => {
                if let Some(bind) = bind {
                    config.relay_bind_addr = bind.clone();
                }
                if let Some(url) = upstream_url {
                    config.upstream_url = url.clone();
                }
            }
        }
    }
}
