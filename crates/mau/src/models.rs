//! These models represent the messages exchanged between an agent and its backend
//!
//! The OpenAI and Ollama chat endpoints both accept `{"role": ..., "content": ...}`
//! objects, so the internal message serializes directly into that shape and no
//! per-backend conversion is needed.
pub mod message;
pub mod role;
