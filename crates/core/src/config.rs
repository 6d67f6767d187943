use std::path::Path;

use serde::Deserialize;

use crate::error::KollektorResult;
use crate::options::TrackerOptions;

/// Root application configuration. Loaded from an optional TOML/JSON file
/// and environment variables with the prefix `KOLLEKTOR__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub tracker: TrackerOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "kollektor=info,kollektor_web_sdk=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file and the environment.
    pub fn load(path: Option<&Path>) -> KollektorResult<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: config::Environment) -> KollektorResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder.add_source(env).build()?;
        Ok(config.try_deserialize()?)
    }
}

/// `KOLLEKTOR__*` variables. Only `tracker.scroll_distances` is split on
/// commas; every other value, such as a `log.filter` directive list, is
/// kept whole.
fn environment() -> config::Environment {
    config::Environment::with_prefix("KOLLEKTOR")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tracker.scroll_distances")
}
