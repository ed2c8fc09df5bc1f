//! Client side of the OpenWebUI exchange.
//!
//! Command handlers talk to the backend through [`ChatTransport`] so they can
//! be exercised without a network.

pub mod openwebui;

use async_trait::async_trait;

use crate::protocol::Turn;

pub use openwebui::{ClientError, OpenWebUiClient};

/// One request/response exchange with a chat-completion backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the conversation so far and return the assistant's reply.
    async fn send_chat(&self, messages: &[Turn]) -> Result<String, ClientError>;

    /// Model the requests are sent to.
    fn model(&self) -> &str;
}
