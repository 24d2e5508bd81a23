use futures::StreamExt;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::base::{FragmentStream, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{build_client, chat_completions_url, check_response, openai_sse_fragments};
use crate::errors::MauResult;
use crate::models::message::Message;

pub const OPENAI_HOST: &str = "https://api.openai.com/v1";

/// Token streaming backend speaking the OpenAI chat completions SSE protocol
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> MauResult<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }
}

impl Provider for OpenAiProvider {
    fn stream(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        _context_size: u32,
    ) -> FragmentStream<'static> {
        // The context window is fixed per model on the OpenAI side
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "stream": true,
        });
        let client = self.client.clone();
        let url = chat_completions_url(&self.config.host);
        let api_key = self.config.api_key.clone();
        let model = model.to_string();

        Box::pin(async_stream::try_stream! {
            debug!(%url, %model, "requesting streamed completion");
            let response = client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&payload)
                .send()
                .await?;
            let response = check_response(response).await?;

            let mut fragments = openai_sse_fragments(response);
            while let Some(fragment) = fragments.next().await {
                yield fragment?;
            }
        })
    }
}
