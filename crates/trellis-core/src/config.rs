//! Core configuration loaded from environment variables.

use chrono::Duration;
use trellis_shared::constants::{DEFAULT_TRASH_RETENTION_DAYS, ENV_TRASH_RETENTION_DAYS};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// How long a trashed kanban element is kept before it becomes eligible
    /// for final deletion.
    /// Env: `TRELLIS_TRASH_RETENTION_DAYS`
    /// Default: `30`
    pub trash_retention_days: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            trash_retention_days: DEFAULT_TRASH_RETENTION_DAYS,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(ENV_TRASH_RETENTION_DAYS) {
            match val.trim().parse::<i64>() {
                Ok(days) if days >= 0 => config.trash_retention_days = days,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid {}, using default",
                        ENV_TRASH_RETENTION_DAYS
                    );
                }
            }
        }

        config
    }

    pub fn trash_retention(&self) -> Duration {
        Duration::days(self.trash_retention_days)
    }
}
