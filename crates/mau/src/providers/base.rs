use futures::stream::BoxStream;

use crate::errors::MauResult;
use crate::models::message::Message;

/// An incremental piece of a response, in order. Concatenating every fragment
/// of one stream gives the complete response text.
pub type FragmentStream<'a> = BoxStream<'a, MauResult<String>>;

/// Base trait for chat backends (LM Studio, OpenAI, Ollama)
pub trait Provider: Send + Sync {
    /// Request a reply to `messages` and stream it back as text fragments.
    ///
    /// The request is only issued once the returned stream is first polled, and
    /// the stream can be consumed once. A transport or backend failure ends the
    /// stream with `MauError::Provider`; fragments yielded before that point
    /// are still valid.
    fn stream(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        context_size: u32,
    ) -> FragmentStream<'static>;
}
