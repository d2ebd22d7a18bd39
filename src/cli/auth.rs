use crate::config::Config;
use clap::Args;
use ohsheet::Result;
use ohsheet::auth::{LoopbackReceiver, clear_tokens};
use ohsheet::sheets::Connector;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Delete the cached token and authorize again
    #[arg(long)]
    pub reset: bool,

    /// Receive the authorization code on this local port instead of pasting it
    #[arg(long)]
    pub port: Option<u16>,

    /// Give up waiting for authorization after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl AuthArgs {
    pub async fn execute(&self, config: &Config, cancel: CancellationToken) -> Result<()> {
        let token_path = config.token_path()?;
        if self.reset {
            clear_tokens(&token_path)?;
        }

        let mut connector = Connector::new(config.access_config()?).cancellation_token(cancel);
        if let Some(port) = self.port {
            connector = connector.code_receiver(LoopbackReceiver::bind(port)?);
        }
        if let Some(secs) = self.timeout {
            connector = connector.authorization_timeout(Duration::from_secs(secs));
        }
        let _session = connector.connect().await?;

        info!(path = ?token_path, "Google Sheets authentication verified");

        Ok(())
    }
}
