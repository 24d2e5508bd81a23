use futures::StreamExt;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::base::{FragmentStream, Provider};
use super::configs::OllamaProviderConfig;
use super::utils::{build_client, check_response, ollama_ndjson_fragments};
use crate::errors::MauResult;
use crate::models::message::Message;

pub const OLLAMA_HOST: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> MauResult<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }
}

impl Provider for OllamaProvider {
    fn stream(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        context_size: u32,
    ) -> FragmentStream<'static> {
        let payload = json!({
            "model": model,
            "messages": messages,
            "stream": true,
            "options": {
                "num_ctx": context_size,
                "temperature": temperature,
            },
        });
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        Box::pin(async_stream::try_stream! {
            debug!(%url, context_size, "requesting streamed chat");
            let response = client.post(&url).json(&payload).send().await?;
            let response = check_response(response).await?;

            let mut fragments = ollama_ndjson_fragments(response);
            while let Some(fragment) = fragments.next().await {
                yield fragment?;
            }
        })
    }
}
