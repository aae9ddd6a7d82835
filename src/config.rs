use std::path::{Path, PathBuf};

use bili_api::ApiConfig;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "cn.vjoi.bili-live-api";
const CONFIG_FILE: &str = "Conf.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    /// Session cookie used for WBI signing and sent as the `Cookie` header
    #[serde(default)]
    pub cookie: String,
    #[serde(default)]
    pub api: ApiConfig,
}

pub fn default_path() -> Option<PathBuf> {
    AppDirs::new(Some(APP_NAME), false).map(|dirs| dirs.config_dir.join(CONFIG_FILE))
}

impl Config {
    /// Load the config file, writing the defaults if there is none yet.
    ///
    /// An existing file that cannot be read or parsed is an error and is left
    /// untouched.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        match std::fs::read_to_string(path) {
            Ok(content) => return Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let config = Config::default();
        if let Err(e) = config.save(path) {
            log::warn!("Failed to write default config to {}: {e}", path.display());
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string(&self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The api config with the cookie folded into its headers.
    pub fn api_config(&self) -> ApiConfig {
        let mut api = self.api.clone();
        if !self.cookie.is_empty() {
            api.headers
                .insert("Cookie".to_string(), self.cookie.clone());
        }
        api
    }
}
