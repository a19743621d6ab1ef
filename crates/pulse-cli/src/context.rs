use anyhow::Context as _;
use pulse_core::config::Config;
use pulse_core::db::PulseDb;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "pulse.yaml";

/// Resolved config and database location for one invocation.
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    pub db_path: PathBuf,
}

impl Context {
    /// Priority for the config file: `--config` / `PULSE_CONFIG`, then
    /// `pulse.yaml` in the working directory. A missing file means defaults.
    ///
    /// The database is `--db` / `PULSE_DB`, else `server.db_path` resolved
    /// against the config file's directory.
    pub fn resolve(config: Option<&Path>, db: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = config
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let loaded = Config::load(&config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;

        let db_path = match db {
            Some(p) => p.to_path_buf(),
            None => {
                let configured = PathBuf::from(&loaded.server.db_path);
                if configured.is_absolute() {
                    configured
                } else {
                    config_path
                        .parent()
                        .unwrap_or_else(|| Path::new(""))
                        .join(configured)
                }
            }
        };

        Ok(Self {
            config_path,
            config: loaded,
            db_path,
        })
    }

    pub fn open_db(&self) -> anyhow::Result<PulseDb> {
        PulseDb::open(&self.db_path)
            .with_context(|| format!("failed to open database {}", self.db_path.display()))
    }
}
