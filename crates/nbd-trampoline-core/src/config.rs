use anyhow::Context;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bounds for the server readiness poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Pause between two looks at the transport endpoint (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up once this much time has been spent polling (in milliseconds)
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl ReadinessConfig {
    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be greater than zero"));
        }

        if self.poll_interval_ms > self.max_wait_ms {
            return Err(anyhow::anyhow!(
                "poll_interval_ms cannot be greater than max_wait_ms"
            ));
        }

        if self.max_wait_ms > 60_000 {
            return Err(anyhow::anyhow!("max_wait_ms should not exceed 60 seconds"));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Deployment constants: which executables to run, where endpoints live and how
/// the plugin parameters are spelled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrampolineSettings {
    #[serde(default = "default_server_executable")]
    pub server_executable: String,

    #[serde(default = "default_client_executable")]
    pub client_executable: String,

    /// Plugin the server loads to reach the backing store
    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,

    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Prefix prepended to every pass-through plugin parameter
    #[serde(default = "default_param_prefix")]
    pub param_prefix: String,

    #[serde(default = "default_bucket_param")]
    pub bucket_param: String,

    /// Server filter that makes it exit once its last client disconnects
    #[serde(default = "default_exit_filter")]
    pub exit_filter: String,

    #[serde(default = "default_client_block_size")]
    pub client_block_size: u32,

    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl Default for TrampolineSettings {
    fn default() -> Self {
        Self {
            server_executable: default_server_executable(),
            client_executable: default_client_executable(),
            plugin_name: default_plugin_name(),
            socket_dir: default_socket_dir(),
            param_prefix: default_param_prefix(),
            bucket_param: default_bucket_param(),
            exit_filter: default_exit_filter(),
            client_block_size: default_client_block_size(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl TrampolineSettings {
    /// Read settings from a JSON file; absent fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_executable.is_empty() || self.client_executable.is_empty() {
            return Err(anyhow::anyhow!("executable names must not be empty"));
        }
        if self.client_block_size == 0 || !self.client_block_size.is_power_of_two() {
            return Err(anyhow::anyhow!(
                "client_block_size must be a power of two, got {}",
                self.client_block_size
            ));
        }
        self.readiness.validate().context("invalid readiness settings")
    }
}

/// Mode flags derived once from the command line
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[builder(default, build_fn(private, name = "fallible_build"))]
pub struct TrampolineConfig {
    pub debug: bool,
    pub foreground: bool,
    pub read_only: bool,
}

impl TrampolineConfig {
    pub fn builder() -> TrampolineConfigBuilder {
        TrampolineConfigBuilder::default()
    }
}

impl TrampolineConfigBuilder {
    pub fn build(&self) -> TrampolineConfig {
        // Every field has a default, so the generated build cannot fail
        self.fallible_build().unwrap_or_default()
    }
}

// Default value functions for serde
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_max_wait_ms() -> u64 {
    1_000
}
fn default_server_executable() -> String {
    "nbdkit".to_string()
}
fn default_client_executable() -> String {
    "nbd-client".to_string()
}
fn default_plugin_name() -> String {
    "s3backer".to_string()
}
fn default_socket_dir() -> PathBuf {
    PathBuf::from("/run/s3backer-nbd")
}
fn default_param_prefix() -> String {
    "s3b_".to_string()
}
fn default_bucket_param() -> String {
    "bucket".to_string()
}
fn default_exit_filter() -> String {
    "exitlast".to_string()
}
fn default_client_block_size() -> u32 {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = TrampolineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server_executable, "nbdkit");
        assert_eq!(settings.client_executable, "nbd-client");
        assert_eq!(settings.readiness.poll_interval_ms, 50);
        assert_eq!(settings.readiness.max_wait_ms, 1_000);
    }

    #[test]
    fn test_invalid_readiness() {
        let mut config = ReadinessConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.poll_interval_ms = 2_000;
        config.max_wait_ms = 1_000;
        assert!(config.validate().is_err());

        config.poll_interval_ms = 100;
        config.max_wait_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_block_size_must_be_power_of_two() {
        let settings = TrampolineSettings {
            client_block_size: 3000,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"serverExecutable": "/opt/bin/nbdkit", "readiness": {{"maxWaitMs": 250}}}}"#
        )
        .unwrap();

        let settings = TrampolineSettings::load(file.path()).unwrap();
        assert_eq!(settings.server_executable, "/opt/bin/nbdkit");
        assert_eq!(settings.client_executable, "nbd-client");
        assert_eq!(settings.readiness.max_wait_ms, 250);
        assert_eq!(settings.readiness.poll_interval_ms, 50);
    }

    #[test]
    fn test_missing_settings_file() {
        let err = TrampolineSettings::load("/nonexistent/settings.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }

    #[test]
    fn test_config_builder() {
        let config = TrampolineConfig::builder()
            .foreground(true)
            .build();
        assert!(config.foreground);
        assert!(!config.debug);
        assert!(!config.read_only);
    }
}
