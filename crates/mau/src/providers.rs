pub mod base;
pub mod configs;
pub mod factory;
pub mod lmstudio;
pub mod ollama;
pub mod openai;
pub mod utils;

#[cfg(test)]
pub mod mock;
