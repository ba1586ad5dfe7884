use std::path::Path;
use tokio::fs;

use super::OptimizerConfig;
use crate::error::{OptimizerError, Result};

/// Load configuration from an optional TOML file, then apply environment
/// overrides. A missing path yields the defaults.
pub async fn load_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).await.map_err(|e| {
                OptimizerError::Config(format!("failed to read {}: {e}", path.display()))
            })?;
            tracing::debug!("Loaded optimizer config from {}", path.display());
            OptimizerConfig::from_toml_str(&content)?
        }
        None => OptimizerConfig::default(),
    };

    config.merge_env_vars()?;
    Ok(config)
}
