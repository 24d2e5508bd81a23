use std::path::Path;

use config::{Config, Environment, File};
use mau::{
    agent::Agent,
    conversation::{Conversation, ConversationSettings},
    errors::MauResult,
    providers::{
        base::Provider,
        configs::ProviderConfig,
        factory::{get_provider, ProviderType},
    },
};
use serde::Deserialize;

use crate::error::{to_env_var, ConfigError};

fn default_temperature() -> f32 {
    0.8
}

fn default_ctx_size() -> u32 {
    2048
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub name: String,
    pub provider: String,
    pub model: String,
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_ctx_size")]
    pub ctx_size: u32,
    #[serde(default)]
    pub provider_config: Option<ProviderSettings>,
}

impl AgentSettings {
    pub fn provider_config(&self) -> MauResult<ProviderConfig> {
        let provider_type = ProviderType::from_selector(&self.provider)?;
        let settings = self.provider_config.clone().unwrap_or_default();
        Ok(ProviderConfig::new(
            provider_type,
            settings.base_url,
            settings.api_key,
            settings.stream,
        ))
    }

    fn into_agent(self, provider: Box<dyn Provider + Send + Sync>) -> MauResult<Agent> {
        Agent::new(
            self.name,
            self.model,
            self.temperature,
            self.ctx_size,
            self.system_prompt,
            provider,
        )
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "{}.temperature must be between 0 and 1, got {}",
                key, self.temperature
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    pub agent1: AgentSettings,
    pub agent2: AgentSettings,
    #[serde(default)]
    pub settings: ConversationSettings,
}

impl ConversationConfig {
    /// Build both agents and the conversation between them. Both provider
    /// selectors are resolved before either agent is created.
    pub fn into_conversation(self) -> MauResult<Conversation> {
        let provider1 = get_provider(self.agent1.provider_config()?)?;
        let provider2 = get_provider(self.agent2.provider_config()?)?;

        let agent1 = self.agent1.into_agent(provider1)?;
        let agent2 = self.agent2.into_agent(provider2)?;

        Ok(Conversation::new(agent1, agent2, self.settings))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub conversation: ConversationConfig,
}

impl Settings {
    /// Load settings from `path` (JSON or TOML by extension), then apply
    /// `MAU_` environment overrides on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("MAU")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize().map_err(missing_field)?;
        settings.conversation.agent1.validate("conversation.agent1")?;
        settings.conversation.agent2.validate("conversation.agent2")?;
        Ok(settings)
    }
}

// Rewrite serde's "missing field `x`" into an error naming the override variable
fn missing_field(err: config::ConfigError) -> ConfigError {
    let message = err.to_string();
    let Some(rest) = message.strip_prefix("missing field `") else {
        return ConfigError::Other(err);
    };
    let Some((field, rest)) = rest.split_once('`') else {
        return ConfigError::Other(err);
    };

    let key = rest
        .split_once("for key `")
        .and_then(|(_, key)| key.split_once('`'))
        .map(|(key, _)| format!("{}.{}", key, field))
        .unwrap_or_else(|| field.to_string());

    ConfigError::MissingField {
        field: field.to_string(),
        env_var: to_env_var(&key),
    }
}
