use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AuthError, Result};

const APP_DIR: &str = "apiauth";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_OAUTH_PORT: u16 = 3333;
pub const DEFAULT_OAUTH_TIMEOUT: Duration = Duration::from_secs(300);

/// Optional config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    credentials_dir: Option<PathBuf>,
    integrations_dir: Option<PathBuf>,
    oauth_port: Option<u16>,
    oauth_timeout_secs: Option<u64>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub credentials_dir: Option<PathBuf>,
    pub integrations_dir: Option<PathBuf>,
    pub oauth_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub credentials_dir: PathBuf,
    pub integrations_dir: PathBuf,
    pub oauth_port: u16,
    pub oauth_timeout: Duration,
}

impl Settings {
    pub fn defaults_in(base: &Path) -> Self {
        Self {
            credentials_dir: base.join("credentials"),
            integrations_dir: base.join("integrations"),
            oauth_port: DEFAULT_OAUTH_PORT,
            oauth_timeout: DEFAULT_OAUTH_TIMEOUT,
        }
    }

    pub fn load(overrides: Overrides) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            AuthError::configuration(format!("could not determine working directory: {}", e))
        })?;
        let default_config = dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE));
        Self::resolve(&cwd, overrides, default_config)
    }

    fn resolve(base: &Path, overrides: Overrides, default_config: Option<PathBuf>) -> Result<Self> {
        let file = match overrides.config.as_deref() {
            Some(path) => read_config(path)?,
            None => match default_config.filter(|path| path.is_file()) {
                Some(path) => read_config(&path)?,
                None => FileConfig::default(),
            },
        };

        let mut settings = Self::defaults_in(base);
        if let Some(dir) = overrides.credentials_dir.or(file.credentials_dir) {
            settings.credentials_dir = base.join(dir);
        }
        if let Some(dir) = overrides.integrations_dir.or(file.integrations_dir) {
            settings.integrations_dir = base.join(dir);
        }
        if let Some(port) = overrides.oauth_port.or(file.oauth_port) {
            settings.oauth_port = port;
        }
        if let Some(secs) = file.oauth_timeout_secs {
            settings.oauth_timeout = Duration::from_secs(secs);
        }

        debug!(?settings, "resolved settings");
        Ok(settings)
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        AuthError::configuration(format!("failed to read config {}: {}", path.display(), e))
    })?;
    toml::from_str(&contents).map_err(|e| {
        AuthError::configuration(format!("invalid config {}: {}", path.display(), e))
    })
}
