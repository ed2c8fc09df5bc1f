//! `devopscli explain <query>`

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::client::ChatTransport;
use crate::config::Config;
use crate::protocol::Turn;

pub async fn handle_explain(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Please provide a query to explain");
    }

    let client = super::connect(config)?;
    let reply = explain(&client, query).await?;
    super::print_markdown(&reply);
    Ok(())
}

/// Ask the backend a one-off question with no conversation history.
pub async fn explain<T>(transport: &T, query: &str) -> Result<String>
where
    T: ChatTransport + ?Sized,
{
    debug!("explain: using {} model", transport.model());
    transport
        .send_chat(&[Turn::user(query)])
        .await
        .context("Error from OpenWebUI")
}
