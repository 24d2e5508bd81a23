use super::{
    base::Provider, configs::ProviderConfig, lmstudio::LmStudioProvider,
    ollama::OllamaProvider, openai::OpenAiProvider,
};
use crate::errors::{MauError, MauResult};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderType {
    LmStudio,
    OpenAi,
    Ollama,
}

impl ProviderType {
    /// Resolve a backend selector such as `"ollama"` or `"OpenAI"`
    pub fn from_selector(selector: &str) -> MauResult<Self> {
        ProviderType::from_str(selector.trim())
            .map_err(|_| MauError::UnknownProvider(selector.to_string()))
    }
}

pub fn get_provider(config: ProviderConfig) -> MauResult<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::LmStudio(lmstudio_config) => {
            Ok(Box::new(LmStudioProvider::new(lmstudio_config)?))
        }
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Ollama(ollama_config) => Ok(Box::new(OllamaProvider::new(ollama_config)?)),
    }
}
