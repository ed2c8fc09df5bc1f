//! Handlers for each CLI verb.
//!
//! Handlers validate their inputs, talk to the backend through
//! [`ChatTransport`](crate::client::ChatTransport), and print rendered output.
//! Fatal problems are returned as errors; `main` turns them into a non-zero
//! exit.

pub mod explain;
pub mod init;
pub mod optimize;
pub mod query;
pub mod render;
pub mod verify;
pub mod version;

use anyhow::{Context, Result};

use crate::client::OpenWebUiClient;
use crate::config::Config;
use crate::render::MarkdownRenderer;

/// Build the backend client, failing early if host or key is missing.
pub fn connect(config: &Config) -> Result<OpenWebUiClient> {
    let settings = config.api_settings()?;
    OpenWebUiClient::new(&settings).context("Failed to initialize OpenWebUI client")
}

/// Render Markdown and print it to stdout.
pub fn print_markdown(markdown: &str) {
    println!("{}", MarkdownRenderer::for_stdout().render(markdown));
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::client::{ChatTransport, ClientError};
    use crate::protocol::Turn;

    /// Transport that replays canned replies and records what it was sent.
    /// A `None` reply fails the request.
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Option<String>>>,
        sent: Mutex<Vec<Vec<Turn>>>,
    }

    impl ScriptedTransport {
        pub fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(reply: &str) -> Self {
            Self::new(vec![Some(reply)])
        }

        pub fn failing() -> Self {
            Self::new(vec![None])
        }

        pub fn sent(&self) -> Vec<Vec<Turn>> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send_chat(&self, messages: &[Turn]) -> Result<String, ClientError> {
            self.sent.lock().unwrap().push(messages.to_vec());
            match self.replies.lock().unwrap().pop_front().flatten() {
                Some(reply) => Ok(reply),
                None => Err(ClientError::Status {
                    status: StatusCode::BAD_GATEWAY,
                    body: "scripted failure".to_string(),
                }),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }
}
