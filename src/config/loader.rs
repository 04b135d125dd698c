//! Configuration loading and persistence

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};

use super::types::DeploymentConfig;

/// Keys accepted by `config set`.
pub const VALID_KEYS: [&str; 5] = [
    "remote_server",
    "remote_share",
    "target_dir_pattern",
    "username",
    "password",
];

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
}

/// Default persisted config location:
/// `<config_dir>/netdeploy/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netdeploy/config.toml"))
}

/// Load the persisted config, returning defaults when no file exists.
///
/// Parse failures fall back to defaults with a warning rather than
/// aborting - a corrupt config file must not brick the tool.
pub fn load_or_default(path: Option<&Path>) -> (DeploymentConfig, Vec<ConfigWarning>) {
    let resolved = match path.map(Path::to_path_buf).or_else(config_path) {
        Some(p) => p,
        None => return (DeploymentConfig::default(), Vec::new()),
    };
    if !resolved.exists() {
        return (DeploymentConfig::default(), Vec::new());
    }

    match load_with_warnings(&resolved) {
        Ok((config, warnings)) => (config, warnings),
        Err(_) => (
            DeploymentConfig::default(),
            vec![ConfigWarning {
                key: "(unparseable file, using defaults)".to_string(),
                file: resolved,
            }],
        ),
    }
}

/// Load configuration and collect unknown-key warnings.
pub fn load_with_warnings(path: &Path) -> DeployResult<(DeploymentConfig, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: DeploymentConfig = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| DeployError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|key| ConfigWarning {
            key,
            file: path.to_path_buf(),
        })
        .collect();

    Ok((config, warnings))
}

/// Persist the configuration to `path`, creating parent directories.
pub fn save_to(config: &DeploymentConfig, path: &Path) -> DeployResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config).map_err(|e| DeployError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Set a single configuration value and persist the result.
pub fn set_value_at(path: &Path, key: &str, value: &str) -> DeployResult<DeploymentConfig> {
    let (mut config, _) = load_or_default(Some(path));

    match key {
        "remote_server" => config.remote_server = value.to_string(),
        "remote_share" => config.remote_share = value.to_string(),
        "target_dir_pattern" => config.target_dir_pattern = value.to_string(),
        "username" => config.username = value.to_string(),
        "password" => config.password = value.to_string(),
        _ => {
            return Err(DeployError::InvalidConfigKey {
                key: key.to_string(),
                valid_keys: VALID_KEYS.join(", "),
            })
        }
    }

    save_to(&config, path)?;
    Ok(config)
}

/// Delete the persisted config file, restoring defaults.
///
/// Returns whether a file actually existed.
pub fn reset_at(path: &Path) -> DeployResult<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Apply environment variable overrides (NETDEPLOY_* prefix).
///
/// Sits between the persisted file and CLI flags in priority.
pub fn with_env_overrides(mut config: DeploymentConfig) -> DeploymentConfig {
    if let Ok(server) = std::env::var("NETDEPLOY_SERVER") {
        config.remote_server = server;
    }
    if let Ok(share) = std::env::var("NETDEPLOY_SHARE") {
        config.remote_share = share;
    }
    if let Ok(pattern) = std::env::var("NETDEPLOY_TARGET_DIR") {
        config.target_dir_pattern = pattern;
    }
    if let Ok(username) = std::env::var("NETDEPLOY_USERNAME") {
        config.username = username;
    }
    if let Ok(password) = std::env::var("NETDEPLOY_PASSWORD") {
        config.password = password;
    }
    config
}
