use super::factory::ProviderType;
use super::lmstudio::LMSTUDIO_HOST;
use super::ollama::OLLAMA_HOST;
use super::openai::OPENAI_HOST;

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    LmStudio(LmStudioProviderConfig),
    OpenAi(OpenAiProviderConfig),
    Ollama(OllamaProviderConfig),
}

#[derive(Debug, Clone)]
pub struct LmStudioProviderConfig {
    pub host: String,
    pub api_key: String,
    /// Ask the server for an SSE stream instead of one complete response
    pub stream: bool,
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct OllamaProviderConfig {
    pub host: String,
}

impl ProviderConfig {
    /// Build the configuration for `provider_type`, filling in each backend's
    /// default endpoint when `host` is not given. The credential and stream
    /// flag are ignored by backends that have no use for them.
    pub fn new(
        provider_type: ProviderType,
        host: Option<String>,
        api_key: Option<String>,
        stream: Option<bool>,
    ) -> Self {
        match provider_type {
            ProviderType::LmStudio => ProviderConfig::LmStudio(LmStudioProviderConfig {
                host: host.unwrap_or_else(|| LMSTUDIO_HOST.to_string()),
                api_key: api_key.unwrap_or_default(),
                stream: stream.unwrap_or(false),
            }),
            ProviderType::OpenAi => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: host.unwrap_or_else(|| OPENAI_HOST.to_string()),
                api_key: api_key.unwrap_or_default(),
            }),
            ProviderType::Ollama => ProviderConfig::Ollama(OllamaProviderConfig {
                host: host.unwrap_or_else(|| OLLAMA_HOST.to_string()),
            }),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::LmStudio(_) => ProviderType::LmStudio,
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
            ProviderConfig::Ollama(_) => ProviderType::Ollama,
        }
    }
}
