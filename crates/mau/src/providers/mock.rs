use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::MauError;
use crate::models::message::Message;
use crate::providers::base::{FragmentStream, Provider};

#[derive(Debug, Clone)]
pub enum MockReply {
    /// Stream these fragments and finish
    Fragments(Vec<String>),
    /// Stream these fragments, then fail with the given cause
    FailAfter(Vec<String>, String),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        MockReply::Fragments(vec![text.to_string()])
    }

    pub fn fragments(fragments: &[&str]) -> Self {
        MockReply::Fragments(fragments.iter().map(|f| f.to_string()).collect())
    }

    pub fn fail_after(fragments: &[&str], cause: &str) -> Self {
        MockReply::FailAfter(
            fragments.iter().map(|f| f.to_string()).collect(),
            cause.to_string(),
        )
    }
}

/// A mock provider that returns pre-configured replies for testing.
///
/// Clones share state, so a test can keep a handle after boxing the provider
/// into an agent and inspect how many requests were issued.
#[derive(Clone)]
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    repeat: Option<MockReply>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of replies
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            repeat: None,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider that gives the same reply to every request
    pub fn repeating(reply: MockReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    /// Number of requests actually issued, i.e. streams that were polled
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The message lists sent with each issued request, in order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provider for MockProvider {
    fn stream(
        &self,
        _model: &str,
        messages: &[Message],
        _temperature: f32,
        _context_size: u32,
    ) -> FragmentStream<'static> {
        let provider = self.clone();
        let messages = messages.to_vec();

        Box::pin(async_stream::try_stream! {
            provider.calls.fetch_add(1, Ordering::SeqCst);
            provider.requests.lock().unwrap().push(messages);

            let reply = provider
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| provider.repeat.clone())
                // Empty reply if no more pre-configured replies
                .unwrap_or(MockReply::Fragments(Vec::new()));

            match reply {
                MockReply::Fragments(fragments) => {
                    for fragment in fragments {
                        yield fragment;
                    }
                }
                MockReply::FailAfter(fragments, cause) => {
                    for fragment in fragments {
                        yield fragment;
                    }
                    Err(MauError::provider(cause))?;
                }
            }
        })
    }
}
