use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Shown when the backend answers but leaves the reply field out.
pub const DEFAULT_REPLY: &str = "I received your message!";

/// Shown when the backend cannot be reached at all.
pub const OFFLINE_REPLY: &str = "Could not connect to server...";

#[derive(Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct BotReply {
    reply: Option<String>,
}

/// HTTP gateway to the bot backend. One POST per sent message, no retries,
/// no timeout beyond the transport default.
#[derive(Clone)]
pub struct BotGateway {
    client: Client,
    endpoint: String,
}

impl BotGateway {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Send one user message and return the bot's reply text.
    ///
    /// Any response body that parses as JSON counts as an answer, whatever
    /// the status code; a missing `reply` field degrades to [`DEFAULT_REPLY`].
    /// Only transport and parse failures surface as errors.
    pub async fn send(&self, from: &str, text: &str) -> Result<String> {
        let request = OutboundMessage { from, text };

        tracing::debug!(%from, "posting message to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let reply: BotReply = response.json().await?;
        Ok(reply.reply.unwrap_or_else(|| DEFAULT_REPLY.to_string()))
    }
}
