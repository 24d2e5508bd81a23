use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("Missing required field `{field}`, set it in the configuration file or via {env_var}")]
    MissingField { field: String, env_var: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Environment variable that overrides the given dotted configuration key
pub fn to_env_var(key: &str) -> String {
    let path: Vec<String> = key
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_uppercase())
        .collect();
    format!("MAU_{}", path.join("__"))
}
