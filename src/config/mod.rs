use serde::Deserialize;
use std::path::PathBuf;

fn default_delay_secs() -> u64 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_strict() -> bool {
    false
}

/// Settings loadable from a TOML config file. Command-line arguments
/// override these field by field.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Seconds to wait between batch calls.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("propfetch.toml"));
    paths.push(PathBuf::from(".propfetch.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("propfetch").join("config.toml"));
        paths.push(config_dir.join("propfetch.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".propfetch.toml"));
        paths.push(home.join(".config").join("propfetch").join("config.toml"));
    }

    paths
}
