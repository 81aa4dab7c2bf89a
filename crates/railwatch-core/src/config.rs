//! Railwatch configuration system.
//!
//! Resolution order: TOML file, then environment overrides, then CLI flags
//! (applied by the binary). The result is validated once before the batch
//! starts and passed by reference into the reconciliation loop.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::TrackedEntity;

pub const ENV_PNR_LIST: &str = "PNR_LIST";
pub const ENV_RECIPIENT_EMAILS: &str = "RECIPIENT_EMAILS";
pub const ENV_NOTIF_QUEUES: &str = "NOTIF_QUEUES";
pub const ENV_NOTIF_SERVICE_PROVIDER: &str = "NOTIF_SERVICE_PROVIDER";
pub const ENV_API_KEY: &str = "RAILWATCH_API_KEY";
pub const ENV_STATE_DIR: &str = "RAILWATCH_STATE_DIR";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Reservation identifiers, in batch order.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Recipient slot per entity; a slot may hold several `;`-separated addresses.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Queue/topic suffix per entity, appended to `notify_base_uri`.
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub notify_base_uri: String,
    /// Entities processed at once. 1 = strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Offset used for the checked-at timestamp (default IST, +05:30).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

fn default_concurrency() -> usize { 1 }
fn default_utc_offset_minutes() -> i32 { 330 }

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            recipients: Vec::new(),
            queues: Vec::new(),
            notify_base_uri: String::new(),
            concurrency: default_concurrency(),
            utc_offset_minutes: default_utc_offset_minutes(),
            provider: ProviderConfig::default(),
            notify: NotifyConfig::default(),
            store: StoreConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Load config from the default path (~/.railwatch/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Railwatch home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".railwatch")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source. Unset variables leave the
    /// file value in place; a set-but-empty list variable clears the list.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_PNR_LIST) {
            self.entities = split_list(&v);
        }
        if let Some(v) = lookup(ENV_RECIPIENT_EMAILS) {
            self.recipients = split_list(&v);
        }
        if let Some(v) = lookup(ENV_NOTIF_QUEUES) {
            self.queues = split_list(&v);
        }
        if let Some(v) = lookup(ENV_NOTIF_SERVICE_PROVIDER) {
            self.notify_base_uri = v.trim().to_string();
        }
        if let Some(v) = lookup(ENV_API_KEY) {
            self.provider.api_key = v;
        }
        if let Some(v) = lookup(ENV_STATE_DIR) {
            self.store.dir = v;
        }
    }

    /// Check the configuration and build the entity batch.
    ///
    /// Fails on an empty batch, an identifier that cannot produce a CacheKey,
    /// two identifiers sharing a CacheKey, or missing required settings.
    pub fn validate(&self) -> Result<Vec<TrackedEntity>, ConfigError> {
        if self.entities.is_empty() {
            return Err(ConfigError::Invalid("no entities to watch".into()));
        }
        if self.notify_base_uri.is_empty() {
            return Err(ConfigError::Invalid("notify_base_uri is not set".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if !self.provider.endpoint_template.contains("{pnr}") {
            return Err(ConfigError::Invalid(
                "provider.endpoint_template must contain {pnr}".into(),
            ));
        }
        if self.checked_offset().is_none() {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            )));
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut batch = Vec::with_capacity(self.entities.len());
        for id in &self.entities {
            let entity = TrackedEntity::new(id)?;
            if let Some(other) = seen.insert(entity.cache_key.to_string(), id) {
                return Err(ConfigError::Invalid(format!(
                    "entities '{other}' and '{id}' share cache key {}",
                    entity.cache_key
                )));
            }
            batch.push(entity);
        }

        if self.queues.len() < batch.len() {
            tracing::warn!(
                "⚠️ {} queues configured for {} entities; notifications for the rest will fail routing",
                self.queues.len(),
                batch.len()
            );
        }
        Ok(batch)
    }

    /// Offset for checked-at timestamps.
    pub fn utc_offset(&self) -> FixedOffset {
        self.checked_offset().unwrap_or_else(|| Utc.fix())
    }

    fn checked_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

/// Split a comma-separated list, keeping positions (blank items stay blank).
pub fn split_list(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

/// Status provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Request URL with a `{pnr}` placeholder.
    #[serde(default = "default_endpoint_template")]
    pub endpoint_template: String,
    #[serde(default = "default_provider_api_key")]
    pub api_key: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint_template() -> String {
    "https://cttrainsapi.confirmtkt.com/api/v2/ctpro/mweb/{pnr}?querysource=ct-web&locale=en&getHighChanceText=true&livePnr=false".into()
}
fn default_provider_api_key() -> String { "ct-web!2$".into() }
fn default_client_id() -> String { "ct-web".into() }
fn default_provider_timeout() -> u64 { 15 }

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint_template: default_endpoint_template(),
            api_key: default_provider_api_key(),
            client_id: default_client_id(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Notification channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "bool_true")]
    pub push_enabled: bool,
    #[serde(default = "bool_true")]
    pub email_enabled: bool,
}

fn default_notify_timeout() -> u64 { 10 }
fn bool_true() -> bool { true }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notify_timeout(),
            push_enabled: true,
            email_enabled: true,
        }
    }
}

/// Which state store backs the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One text file per CacheKey.
    #[default]
    File,
    /// Single embedded SQLite database.
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Invalid(format!("unknown store backend '{other}'"))),
        }
    }
}

/// Persisted-state configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_state_dir")]
    pub dir: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_state_dir() -> String { "~/.railwatch/state".into() }
fn default_db_path() -> String { "~/.railwatch/state.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dir: default_state_dir(),
            db_path: default_db_path(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        expand_path(&self.dir)
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_path(&self.db_path)
    }
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// How a fresh fingerprint is compared with the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Unchanged iff the stored text contains the new rendering.
    #[default]
    Containment,
    /// Unchanged iff the passenger entries are equal, in order.
    Strict,
}

impl FromStr for DetectionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "containment" => Ok(Self::Containment),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::Invalid(format!("unknown detection mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub mode: DetectionMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> WatchConfig {
        WatchConfig {
            entities: vec!["8524301234".into(), "8524305678".into()],
            queues: vec!["pnr-a".into(), "pnr-b".into()],
            notify_base_uri: "https://ntfy.example.com/".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.utc_offset_minutes, 330);
        assert_eq!(config.provider.timeout_secs, 15);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.detection.mode, DetectionMode::Containment);
        assert!(config.notify.push_enabled && config.notify.email_enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            entities = ["8524301234"]
            queues = ["pnr-a"]
            notify_base_uri = "https://ntfy.example.com/"
            concurrency = 4

            [store]
            backend = "sqlite"
            db_path = "/tmp/rw.db"

            [detection]
            mode = "strict"
        "#;

        let config: WatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.resolved_db_path(), PathBuf::from("/tmp/rw.db"));
        assert_eq!(config.detection.mode, DetectionMode::Strict);
        assert_eq!(config.provider.client_id, "ct-web");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: WatchConfig = toml::from_str("").unwrap();
        assert!(config.entities.is_empty());
        assert_eq!(config.notify.timeout_secs, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "entities = [\"8524301234\"]\n").unwrap();
        let config = WatchConfig::load_from(&path).unwrap();
        assert_eq!(config.entities, vec!["8524301234".to_string()]);
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "entities = [").unwrap();
        assert!(matches!(
            WatchConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PNR_LIST, "8524301234, 8524305678"),
            (ENV_RECIPIENT_EMAILS, "a@example.com,"),
            (ENV_NOTIF_QUEUES, "pnr-a,pnr-b"),
            (ENV_NOTIF_SERVICE_PROVIDER, "https://ntfy.example.com/"),
        ]);
        let mut config = WatchConfig::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.entities, vec!["8524301234", "8524305678"]);
        assert_eq!(config.recipients, vec!["a@example.com", ""]);
        assert_eq!(config.queues, vec!["pnr-a", "pnr-b"]);
        assert_eq!(config.notify_base_uri, "https://ntfy.example.com/");
        // untouched
        assert_eq!(config.provider.api_key, "ct-web!2$");
    }

    #[test]
    fn test_split_list_empty() {
        assert!(split_list("").is_empty());
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn test_validate_builds_batch() {
        let batch = valid_config().validate().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].cache_key.as_str(), "5678");
    }

    #[test]
    fn test_validate_rejects_empty_batch() {
        let config = WatchConfig {
            entities: vec![],
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_short_identifier() {
        let config = WatchConfig {
            entities: vec!["12".into()],
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Key(_))));
    }

    #[test]
    fn test_validate_rejects_key_collision() {
        let config = WatchConfig {
            entities: vec!["1111111234".into(), "2222221234".into()],
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("share cache key 1234"));
    }

    #[test]
    fn test_validate_allows_short_queue_list() {
        let config = WatchConfig {
            queues: vec!["pnr-a".into()],
            ..valid_config()
        };
        assert_eq!(config.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!("strict".parse::<DetectionMode>().unwrap(), DetectionMode::Strict);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_utc_offset_ist() {
        let offset = valid_config().utc_offset();
        assert_eq!(offset.local_minus_utc(), 330 * 60);
    }

    #[test]
    fn test_home_dir() {
        let home = WatchConfig::home_dir();
        assert!(home.to_string_lossy().contains("railwatch"));
    }
}
