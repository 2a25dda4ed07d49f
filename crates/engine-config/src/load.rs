use crate::{error::ConfigError, settings::connection::TransferConfig};
use std::path::Path;
use tracing::debug;

/// Reads a JSON transfer description from disk. Validation of the run
/// options is left to the caller.
pub async fn load_transfer_config(path: impl AsRef<Path>) -> Result<TransferConfig, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let config: TransferConfig = serde_json::from_str(&content)?;
    debug!(path = %path.display(), table = %config.run.destination_table, "Loaded transfer config");
    Ok(config)
}
