use futures::StreamExt;
use tracing::{debug, warn};

use crate::errors::{MauError, MauResult};
use crate::models::message::Message;
use crate::providers::base::{FragmentStream, Provider};

/// Agent is one participant of a conversation: a named persona bound to a single
/// backend, holding its own private view of the exchange.
///
/// The first entry of the history is always the system prompt, and it is the
/// only system message. The history only ever grows, by whole turns.
pub struct Agent {
    name: String,
    model: String,
    temperature: f32,
    context_size: u32,
    provider: Box<dyn Provider>,
    messages: Vec<Message>,
}

impl Agent {
    /// Create a new Agent whose history starts with `system_prompt`
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        context_size: u32,
        system_prompt: impl Into<String>,
        provider: Box<dyn Provider>,
    ) -> MauResult<Self> {
        let name = name.into();
        let model = model.into();

        if name.trim().is_empty() {
            return Err(MauError::Configuration("agent name must not be empty".into()));
        }
        if model.trim().is_empty() {
            return Err(MauError::Configuration(format!(
                "agent '{}' has no model",
                name
            )));
        }
        if !(0.0..=1.0).contains(&temperature) {
            return Err(MauError::Configuration(format!(
                "agent '{}' temperature {} is outside [0, 1]",
                name, temperature
            )));
        }

        Ok(Self {
            name,
            model,
            temperature,
            context_size,
            provider,
            messages: vec![Message::system(system_prompt)],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn context_size(&self) -> u32 {
        self.context_size
    }

    /// A copy of the full history, system prompt first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn system_prompt(&self) -> String {
        self.messages[0].content.clone()
    }

    /// Append `text` to the system prompt.
    ///
    /// This is not idempotent: each call appends again. It is meant to be called
    /// once, while setting up a conversation.
    pub fn append_instruction(&mut self, text: &str) {
        if self.messages.len() > 1 {
            warn!(agent = %self.name, "instruction appended after the conversation started");
        }
        self.messages[0].content.push_str(text);
    }

    /// Record a reply that did not come from the backend
    pub(crate) fn record_reply(&mut self, text: &str) {
        self.messages.push(Message::assistant(text));
    }

    /// Send `input` (if any) and stream the reply back fragment by fragment.
    ///
    /// Once the stream is exhausted the input and the trimmed reply are appended
    /// to the history. If the backend fails, or the stream is dropped before it
    /// finishes, the history is left untouched.
    pub fn send(&mut self, input: Option<String>) -> FragmentStream<'_> {
        let input = input.map(Message::user);
        let mut request = self.messages.clone();
        request.extend(input.clone());

        debug!(agent = %self.name, model = %self.model, messages = request.len(), "sending turn");
        let mut fragments =
            self.provider
                .stream(&self.model, &request, self.temperature, self.context_size);
        let messages = &mut self.messages;

        Box::pin(async_stream::try_stream! {
            let mut reply = String::new();
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                reply.push_str(&fragment);
                yield fragment;
            }

            messages.extend(input);
            messages.push(Message::assistant(reply.trim()));
        })
    }
}
