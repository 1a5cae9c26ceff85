//! Process configuration, read from the environment at startup.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
    /// Port to listen on. Defaults to 3000.
    pub port: u16,
    /// Directory holding the SQLite database. Defaults to the working
    /// directory.
    pub state_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let webhook_secret =
            env::var("WEBHOOK_SECRET").context("WEBHOOK_SECRET environment variable not set")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            webhook_secret,
            port,
            state_dir,
        })
    }
}
