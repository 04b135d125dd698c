//! Configuration module for netdeploy
//!
//! Configuration hierarchy, highest priority first:
//! 1. CLI flags
//! 2. Environment variables (NETDEPLOY_*)
//! 3. User config (<config_dir>/netdeploy/config.toml)
//! 4. Built-in defaults

mod loader;
mod types;

pub use loader::{
    config_path, load_or_default, load_with_warnings, reset_at, save_to, set_value_at,
    with_env_overrides, ConfigWarning, VALID_KEYS,
};
pub use types::{ConfigOverrides, DeploymentConfig};
