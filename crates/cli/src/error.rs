use connectors::error::AdapterError;
use engine_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid transfer configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build adapter: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
