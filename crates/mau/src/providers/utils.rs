use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::base::FragmentStream;
use crate::errors::{MauError, MauResult};

pub fn build_client() -> MauResult<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(600)) // 10 minutes timeout
        .build()?;
    Ok(client)
}

/// Chat completion endpoint of an OpenAI compatible server. The host is expected to
/// carry the API version already, e.g. `https://api.openai.com/v1`.
pub fn chat_completions_url(host: &str) -> String {
    format!("{}/chat/completions", host.trim_end_matches('/'))
}

/// Turn a non-200 response into a provider error
pub async fn check_response(response: Response) -> MauResult<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(MauError::provider(format!("Server error: {}", status)))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(MauError::provider(format!(
                "Request failed: {}\n{}",
                status, body
            )))
        }
    }
}

/// Split a streaming response body into trimmed, non-empty lines.
///
/// Bytes are buffered until a full line is available so multi-byte characters
/// split across network chunks decode correctly.
pub fn response_lines(response: Response) -> BoxStream<'static, MauResult<String>> {
    Box::pin(async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&line).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield rest;
        }
    })
}

/// Parse an OpenAI server-sent event stream into content fragments
pub fn openai_sse_fragments(response: Response) -> FragmentStream<'static> {
    Box::pin(async_stream::try_stream! {
        let mut lines = response_lines(response);
        let mut finished = false;

        while let Some(line) = lines.next().await {
            let line = line?;
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                finished = true;
                break;
            }

            let chunk: Value = serde_json::from_str(data)?;
            if let Some(error) = chunk.get("error") {
                Err(MauError::provider(format!("API error: {}", error)))?;
            }
            if let Some(content) = chunk["choices"][0]["delta"]["content"].as_str() {
                // Role-only and finish chunks carry no text
                if !content.is_empty() {
                    yield content.to_string();
                }
            }
        }

        if !finished {
            Err(MauError::provider("stream ended before completion"))?;
        }
    })
}

/// Parse Ollama's newline-delimited JSON chat stream into content fragments
pub fn ollama_ndjson_fragments(response: Response) -> FragmentStream<'static> {
    Box::pin(async_stream::try_stream! {
        let mut lines = response_lines(response);
        let mut finished = false;

        while let Some(line) = lines.next().await {
            let line = line?;
            let chunk: Value = serde_json::from_str(&line)?;
            if let Some(error) = chunk.get("error") {
                Err(MauError::provider(format!("Ollama error: {}", error)))?;
            }
            if let Some(content) = chunk["message"]["content"].as_str() {
                if !content.is_empty() {
                    yield content.to_string();
                }
            }
            if chunk["done"].as_bool().unwrap_or(false) {
                finished = true;
                break;
            }
        }

        if !finished {
            Err(MauError::provider("stream ended before completion"))?;
        }
    })
}

/// Extract the reply text from a complete (non-streaming) OpenAI chat completion
pub fn openai_response_text(response: &Value) -> MauResult<String> {
    if let Some(error) = response.get("error") {
        return Err(MauError::provider(format!("API error: {}", error)));
    }
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MauError::provider("No message content in response"))
}
