use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult as Result};
use crate::mru::is_valid_label;

/// Default usage-ping endpoint
pub const DEFAULT_TELEMETRY_ENDPOINT: &str = "https://add-row-vpsokyejka-uc.a.run.app";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// User settings for the Taxi API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URI of the Taxi for Email API, e.g. `https://myaccount.taxiforemail.com`
    pub uri: Option<String>,
    /// Value sent as `X-API-KEY`
    pub api_key: Option<String>,
    /// Value sent as `X-KEY-ID`
    pub key_id: Option<String>,
    /// Append a summary diagnostic after each call
    pub show_summary: bool,
    /// Legacy single design system id, superseded by the MRU list
    #[serde(deserialize_with = "id_text", skip_serializing_if = "Option::is_none")]
    pub design_system_id: Option<String>,
    /// Legacy description for `design_system_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_system_descr: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    pub telemetry: TelemetryConfig,
    pub update: UpdateOptions,
}

/// Usage ping settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
}

/// Extra form fields sent with an update call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateOptions {
    pub import_images: bool,
    pub without_review: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri: None,
            api_key: None,
            key_id: None,
            show_summary: false,
            design_system_id: None,
            design_system_descr: None,
            timeout_seconds: 30,
            telemetry: TelemetryConfig::default(),
            update: UpdateOptions::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_TELEMETRY_ENDPOINT.to_string(),
        }
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            import_images: false,
            without_review: true,
        }
    }
}

impl Config {
    /// Full URL for an API path, e.g. `/api/v1/eds/check`
    pub fn endpoint_url(&self, path: &str) -> Result<String> {
        let base = self
            .uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "uri".to_string(),
            })?;
        Ok(format!("{}{}", base.trim_end_matches('/'), path))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Legacy ids were stored as numbers in older settings files
fn id_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    }))
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment
    pub async fn load_config_with<E: EnvProvider + ?Sized>(
        explicit_path: Option<&Path>,
        env: &E,
    ) -> Result<Config> {
        let config = match explicit_path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        let config = Self::apply_environment_overrides_with(env, config)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        debug!("loading configuration from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "taxi-eds.toml",
            "taxi-eds.json",
            ".taxi-eds.toml",
            ".taxi-eds.json",
        ];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("taxi-eds");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with<E: EnvProvider + ?Sized>(
        env: &E,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(uri) = env.get("TAXI_URI") {
            config.uri = Some(uri);
        }
        if let Some(api_key) = env.get("TAXI_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Some(key_id) = env.get("TAXI_KEY_ID") {
            config.key_id = Some(key_id);
        }

        if let Some(show_summary) = env.get("TAXI_SHOW_SUMMARY") {
            config.show_summary = show_summary.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid TAXI_SHOW_SUMMARY value: {}",
                    show_summary
                ))
            })?;
        }

        if let Some(timeout) = env.get("TAXI_TIMEOUT") {
            config.timeout_seconds = timeout.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid TAXI_TIMEOUT value: {}", timeout))
            })?;
        }

        if let Some(telemetry) = env.get("TAXI_TELEMETRY") {
            config.telemetry.enabled = telemetry.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid TAXI_TELEMETRY value: {}", telemetry))
            })?;
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds".to_string(),
                value: "0".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if let Some(uri) = &config.uri
            && !(uri.starts_with("http://") || uri.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "uri".to_string(),
                value: uri.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }

        if let Some(id) = &config.design_system_id
            && !is_valid_label(id)
        {
            return Err(ConfigError::InvalidValue {
                field: "design_system_id".to_string(),
                value: id.clone(),
                reason: "must be numeric".to_string(),
            });
        }

        Ok(())
    }
}

/// Where settings come from. Loaded fresh before every action so edits made
/// between invocations are always picked up.
#[derive(Clone)]
pub struct ConfigSource {
    path: Option<PathBuf>,
    env: Arc<dyn EnvProvider + Send + Sync>,
}

impl ConfigSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self::with_env(path, Arc::new(SystemEnvProvider))
    }

    pub fn with_env(path: Option<PathBuf>, env: Arc<dyn EnvProvider + Send + Sync>) -> Self {
        Self { path, env }
    }

    pub async fn load(&self) -> Result<Config> {
        ConfigManager::load_config_with(self.path.as_deref(), self.env.as_ref()).await
    }
}

impl std::fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.uri, None);
        assert_eq!(config.api_key, None);
        assert_eq!(config.key_id, None);
        assert!(!config.show_summary);
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.endpoint, DEFAULT_TELEMETRY_ENDPOINT);
        assert!(!config.update.import_images);
        assert!(config.update.without_review);
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
uri = "https://example.taxiforemail.com"
api_key = "secret"
key_id = "key-1"
show_summary = true
design_system_id = 123456
timeout_seconds = 60

[telemetry]
enabled = false

[update]
import_images = true
"#;

        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.uri.as_deref(), Some("https://example.taxiforemail.com"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.key_id.as_deref(), Some("key-1"));
        assert!(config.show_summary);
        assert_eq!(config.design_system_id.as_deref(), Some("123456"));
        assert_eq!(config.timeout_seconds, 60);
        assert!(!config.telemetry.enabled);
        assert_eq!(config.telemetry.endpoint, DEFAULT_TELEMETRY_ENDPOINT);
        assert!(config.update.import_images);
        assert!(config.update.without_review);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json_content = r#"{
  "uri": "https://example.taxiforemail.com",
  "key_id": "key-2",
  "design_system_id": "42",
  "design_system_descr": "Newsletter"
}"#;

        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.key_id.as_deref(), Some("key-2"));
        assert_eq!(config.api_key, None);
        assert_eq!(config.design_system_id.as_deref(), Some("42"));
        assert_eq!(config.design_system_descr.as_deref(), Some("Newsletter"));
        assert!(!config.show_summary);
    }

    #[tokio::test]
    async fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "invalid: yaml").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        match result.unwrap_err() {
            ConfigError::UnsupportedFormat(ext) => assert_eq!(ext, "yaml"),
            _ => panic!("Expected UnsupportedFormat error"),
        }
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("TAXI_URI", "https://env.example.com");
        mock_env.set("TAXI_API_KEY", "env-key");
        mock_env.set("TAXI_KEY_ID", "env-id");
        mock_env.set("TAXI_SHOW_SUMMARY", "true");
        mock_env.set("TAXI_TIMEOUT", "5");
        mock_env.set("TAXI_TELEMETRY", "false");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.uri.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.key_id.as_deref(), Some("env-id"));
        assert!(config.show_summary);
        assert_eq!(config.timeout_seconds, 5);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("TAXI_TIMEOUT", "soon");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.timeout_seconds = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.timeout_seconds = 30;

        config.uri = Some("ftp://example.com".to_string());
        assert!(ConfigManager::validate_config(&config).is_err());
        config.uri = Some("https://example.com".to_string());
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.design_system_id = Some("abc".to_string());
        assert!(ConfigManager::validate_config(&config).is_err());

        config.design_system_id = Some("+7".to_string());
        assert!(ConfigManager::validate_config(&config).is_err());
        config.design_system_id = Some("7".to_string());
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_endpoint_url() {
        let mut config = Config::default();
        assert!(matches!(
            config.endpoint_url("/api/v1/eds/check").unwrap_err(),
            ConfigError::MissingField { .. }
        ));

        config.uri = Some("https://example.com/".to_string());
        assert_eq!(
            config.endpoint_url("/api/v1/eds/check").unwrap(),
            "https://example.com/api/v1/eds/check"
        );
    }

    #[tokio::test]
    async fn test_config_source_reads_fresh_each_time() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("taxi.toml");
        fs::write(&config_path, "show_summary = false\n").unwrap();

        let source = ConfigSource::with_env(
            Some(config_path.clone()),
            Arc::new(MockEnvProvider::default()),
        );
        assert!(!source.load().await.unwrap().show_summary);

        fs::write(&config_path, "show_summary = true\n").unwrap();
        assert!(source.load().await.unwrap().show_summary);
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("taxi.toml");
        fs::write(&config_path, "uri = \"https://file.example.com\"\n").unwrap();

        let mut mock_env = MockEnvProvider::new();
        mock_env.set("TAXI_URI", "https://env.example.com");

        let config = ConfigManager::load_config_with(Some(&config_path), &mock_env)
            .await
            .unwrap();
        assert_eq!(config.uri.as_deref(), Some("https://env.example.com"));
    }
}
