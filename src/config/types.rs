//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Resolved deployment configuration.
///
/// Built once per run by layering CLI overrides over environment
/// variables over the persisted file over defaults; never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Remote server IP or hostname
    #[serde(default = "default_server")]
    pub remote_server: String,

    /// Network share name (e.g. `e$`)
    #[serde(default = "default_share")]
    pub remote_share: String,

    /// Target directory pattern with `{SITE_NAME}`/`{APP_NAME}` placeholders
    #[serde(default = "default_pattern")]
    pub target_dir_pattern: String,

    /// Username for authenticated share mapping (empty = prompt)
    #[serde(default)]
    pub username: String,

    /// Password for authenticated share mapping (empty = prompt)
    #[serde(default)]
    pub password: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            remote_server: default_server(),
            remote_share: default_share(),
            target_dir_pattern: default_pattern(),
            username: String::new(),
            password: String::new(),
        }
    }
}

fn default_server() -> String {
    "172.20.3.119".to_string()
}

fn default_share() -> String {
    "e$".to_string()
}

fn default_pattern() -> String {
    "IISDeployments/{SITE_NAME}/{APP_NAME}".to_string()
}

impl DeploymentConfig {
    /// UNC path of the configured share.
    pub fn unc_path(&self) -> String {
        format!("\\\\{}\\{}", self.remote_server, self.remote_share)
    }

    /// Apply CLI-supplied values; present values win over the config.
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(server) = overrides.server {
            self.remote_server = server;
        }
        if let Some(share) = overrides.share {
            self.remote_share = share;
        }
        if let Some(pattern) = overrides.target_dir {
            self.target_dir_pattern = pattern;
        }
        if let Some(username) = overrides.username {
            self.username = username;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        self
    }
}

/// Optional CLI-level overrides for the persisted configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub share: Option<String>,
    pub target_dir: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_values() {
        let config = DeploymentConfig::default();
        assert_eq!(config.remote_server, "172.20.3.119");
        assert_eq!(config.remote_share, "e$");
        assert_eq!(
            config.target_dir_pattern,
            "IISDeployments/{SITE_NAME}/{APP_NAME}"
        );
        assert!(config.username.is_empty());
        assert!(config.password.is_empty());
    }

    #[test]
    fn unc_path_is_double_backslashed() {
        let config = DeploymentConfig::default();
        assert_eq!(config.unc_path(), "\\\\172.20.3.119\\e$");
    }

    #[test]
    fn overrides_win_over_persisted_values() {
        let config = DeploymentConfig::default().apply_overrides(ConfigOverrides {
            server: Some("10.0.0.5".to_string()),
            username: Some("deployer".to_string()),
            ..Default::default()
        });

        assert_eq!(config.remote_server, "10.0.0.5");
        assert_eq!(config.username, "deployer");
        // Untouched fields keep their defaults.
        assert_eq!(config.remote_share, "e$");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: DeploymentConfig = toml::from_str("remote_server = \"10.1.1.1\"").unwrap();
        assert_eq!(config.remote_server, "10.1.1.1");
        assert_eq!(config.remote_share, "e$");
    }
}
