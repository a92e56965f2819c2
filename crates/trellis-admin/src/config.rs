//! Admin tool configuration loaded from environment variables.

use std::path::PathBuf;

use trellis_core::CoreConfig;
use trellis_shared::constants::ENV_DB_PATH;

#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// SQLite database to operate on.
    /// Env: `TRELLIS_DB_PATH`
    /// Default: `trellis.db` in the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Settings shared with the core (trash retention).
    pub core: CoreConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            db_path: None,
            core: CoreConfig::from_env(),
        };

        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            if path.trim().is_empty() {
                tracing::warn!("Empty {}, using default location", ENV_DB_PATH);
            } else {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        // Log filtering reads RUST_LOG in main.

        config
    }
}
