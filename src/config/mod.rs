//! Configuration types and loading.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{GateError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasegateConfig {
    pub routing: RoutingConfig,
    pub spawn: SpawnConfig,
    pub decisions: DecisionConfig,
    pub notification: NotificationConfig,
}

impl PhasegateConfig {
    pub async fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, config_dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = config_dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| GateError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.routing.cache_capacity == 0 {
            return Err(GateError::Config(
                "routing.cache_capacity must be at least 1".into(),
            ));
        }
        if self.spawn.wait_ms == 0 {
            return Err(GateError::Config("spawn.wait_ms must be at least 1".into()));
        }
        if self.decisions.page_limit == 0 {
            return Err(GateError::Config(
                "decisions.page_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Tenant backend cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum number of concurrently open tenant backends.
    pub cache_capacity: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            cache_capacity: crate::routing::DEFAULT_CAPACITY,
        }
    }
}

/// Bounded-wait spawn settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// How long to wait for an immediate spawn failure, in milliseconds.
    pub wait_ms: u64,
}

impl SpawnConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            wait_ms: crate::spawn::DEFAULT_SPAWN_WAIT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Default page size for resolved-decision history.
    pub page_limit: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            page_limit: crate::decision::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Buffer size of the broadcast event channel.
    pub broadcast_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broadcast_capacity: 64,
        }
    }
}
