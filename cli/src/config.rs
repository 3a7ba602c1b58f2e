use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use larder_core::config::{ImportConfig, Settings, SourceConfig};

const ENV_PREFIX: &str = "LARDER";
const FALLBACK_KEY_VAR: &str = "USDA_API_KEY";

pub struct Config {
    pub db_path: PathBuf,
    /// Wait for locks held by other connections before failing a statement.
    pub busy_timeout: Option<Duration>,
    pub settings: Settings,
}

/// Shape of `larder.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    database: DatabaseSection,
    source: SourceConfig,
    import: ImportConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    path: Option<PathBuf>,
    busy_timeout_ms: Option<u64>,
}

impl Config {
    /// Resolve settings from the config file, `LARDER_*` variables and the
    /// command line, in increasing priority.
    pub fn load(config_path: Option<&Path>, db_override: Option<PathBuf>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;

        let file = match config_path {
            Some(path) => read_file_config(path, true, ENV_PREFIX)?,
            None => read_file_config(
                &proj_dirs.config_dir().join("larder.toml"),
                false,
                ENV_PREFIX,
            )?,
        };

        let busy_timeout = file.database.busy_timeout_ms.map(Duration::from_millis);
        let db_path = match db_override.or(file.database.path) {
            Some(path) => path,
            None => {
                let data_dir = proj_dirs.data_dir().to_path_buf();
                std::fs::create_dir_all(&data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", data_dir.display())
                })?;
                data_dir.join("larder.db")
            }
        };

        let mut settings = Settings {
            source: file.source,
            import: file.import,
        };
        if settings.source.api_key.is_none() {
            settings.source.api_key = std::env::var(FALLBACK_KEY_VAR).ok();
        }

        Ok(Config {
            db_path,
            busy_timeout,
            settings,
        })
    }
}

fn read_file_config(path: &Path, required: bool, env_prefix: &str) -> Result<FileConfig> {
    let raw = config::Config::builder()
        .add_source(config::File::from(path).required(required))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("import.search_terms"),
        )
        .build()
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    raw.try_deserialize()
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}
