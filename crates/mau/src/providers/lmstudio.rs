use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::base::{FragmentStream, Provider};
use super::configs::LmStudioProviderConfig;
use super::utils::{
    build_client, chat_completions_url, check_response, openai_response_text,
    openai_sse_fragments,
};
use crate::errors::MauResult;
use crate::models::message::Message;

pub const LMSTUDIO_HOST: &str = "http://localhost:1234/v1";

/// Backend for a local LM Studio server.
///
/// By default the whole completion is requested at once and delivered as a single
/// fragment; with `stream` enabled it behaves like the OpenAI backend.
pub struct LmStudioProvider {
    client: Client,
    config: LmStudioProviderConfig,
}

impl LmStudioProvider {
    pub fn new(config: LmStudioProviderConfig) -> MauResult<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }
}

impl Provider for LmStudioProvider {
    fn stream(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        _context_size: u32,
    ) -> FragmentStream<'static> {
        let streaming = self.config.stream;
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "stream": streaming,
        });
        let client = self.client.clone();
        let url = chat_completions_url(&self.config.host);
        let api_key = self.config.api_key.clone();

        Box::pin(async_stream::try_stream! {
            debug!(%url, streaming, "requesting completion");
            let mut request = client.post(&url).json(&payload);
            if !api_key.is_empty() {
                request = request.header("Authorization", format!("Bearer {}", api_key));
            }
            let response = check_response(request.send().await?).await?;

            if streaming {
                let mut fragments = openai_sse_fragments(response);
                while let Some(fragment) = fragments.next().await {
                    yield fragment?;
                }
            } else {
                let body: Value = response.json().await?;
                yield openai_response_text(&body)?;
            }
        })
    }
}
