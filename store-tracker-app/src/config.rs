//! Application configuration: TOML file plus environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use store_tracker_core::error::{CoreError, CoreResult};
use store_tracker_core::services::BulkReplaceOptions;
use store_tracker_core::RetryPolicy;
use store_tracker_remote::{emulator_base_url, FirestoreConfig, MAX_BATCH_SIZE};

const ENV_PROJECT_ID: &str = "STORE_TRACKER_PROJECT_ID";
const ENV_DATABASE: &str = "STORE_TRACKER_DATABASE";
const ENV_COLLECTION: &str = "STORE_TRACKER_COLLECTION";
const ENV_ID_TOKEN: &str = "STORE_TRACKER_ID_TOKEN";
const ENV_API_KEY: &str = "STORE_TRACKER_API_KEY";
const ENV_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";
const ENV_CACHE_DIR: &str = "STORE_TRACKER_CACHE_DIR";
const ENV_USER_EMAIL: &str = "STORE_TRACKER_USER_EMAIL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub firestore: FirestoreSection,
    pub bulk: BulkSection,
    pub cache: CacheSection,
    pub access: AccessSection,
}

/// `[firestore]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreSection {
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    /// REST base URL override; takes precedence over `emulator_host`.
    pub base_url: Option<String>,
    /// `host:port` of a local emulator.
    pub emulator_host: Option<String>,
    pub api_key: Option<String>,
    pub id_token: Option<String>,
}

impl Default for FirestoreSection {
    fn default() -> Self {
        let defaults = FirestoreConfig::new("");
        Self {
            project_id: String::new(),
            database_id: defaults.database_id,
            collection_id: defaults.collection_id,
            base_url: None,
            emulator_host: None,
            api_key: None,
            id_token: None,
        }
    }
}

/// `[bulk]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkSection {
    pub page_size: usize,
    pub chunk_size: usize,
    pub batch_delay_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub extra_delete_rounds: u32,
    pub strict_delete_verification: bool,
}

impl Default for BulkSection {
    fn default() -> Self {
        let options = BulkReplaceOptions::default();
        Self {
            page_size: options.page_size,
            chunk_size: options.chunk_size,
            batch_delay_ms: duration_ms(options.batch_delay),
            retry_max_attempts: options.retry.max_attempts,
            retry_base_delay_ms: duration_ms(options.retry.base_delay),
            extra_delete_rounds: options.extra_delete_rounds,
            strict_delete_verification: options.strict_delete_verification,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub dir: PathBuf,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".store-tracker"),
        }
    }
}

/// `[access]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSection {
    /// Accounts allowed to run operations. Empty denies everyone.
    pub allowed_emails: Vec<String>,
    /// Signed-in account for this process.
    pub user_email: Option<String>,
}

impl AppConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> CoreResult<Self> {
        toml::from_str(raw).map_err(|e| CoreError::ValidationError(format!("invalid config: {e}")))
    }

    /// Loads `path` (when given) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::StorageError(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key));
        log::debug!(
            "Config loaded: project={} collection={}",
            config.firestore.project_id,
            config.firestore.collection_id
        );
        Ok(config)
    }

    /// Applies overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let get = |key: &str| lookup(key).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_PROJECT_ID) {
            self.firestore.project_id = v;
        }
        if let Some(v) = get(ENV_DATABASE) {
            self.firestore.database_id = v;
        }
        if let Some(v) = get(ENV_COLLECTION) {
            self.firestore.collection_id = v;
        }
        if let Some(v) = get(ENV_ID_TOKEN) {
            self.firestore.id_token = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.firestore.api_key = Some(v);
        }
        if let Some(v) = get(ENV_EMULATOR_HOST) {
            self.firestore.emulator_host = Some(v);
        }
        if let Some(v) = get(ENV_CACHE_DIR) {
            self.cache.dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_USER_EMAIL) {
            self.access.user_email = Some(v);
        }
    }

    /// Connection settings for the remote collection.
    pub fn firestore_config(&self) -> CoreResult<FirestoreConfig> {
        let section = &self.firestore;
        if section.project_id.trim().is_empty() {
            return Err(CoreError::ValidationError(format!(
                "firestore.project_id is required (or set {ENV_PROJECT_ID})"
            )));
        }

        let base_url = section
            .base_url
            .clone()
            .or_else(|| section.emulator_host.as_deref().map(emulator_base_url));

        Ok(FirestoreConfig {
            project_id: section.project_id.trim().to_string(),
            database_id: section.database_id.clone(),
            collection_id: section.collection_id.clone(),
            base_url,
            api_key: section.api_key.clone(),
            id_token: section.id_token.clone(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.bulk.retry_max_attempts,
            base_delay: Duration::from_millis(self.bulk.retry_base_delay_ms),
        }
    }

    /// Bulk engine tunables; batch sizes are capped at 500.
    pub fn bulk_options(&self) -> BulkReplaceOptions {
        BulkReplaceOptions {
            page_size: self.bulk.page_size.min(MAX_BATCH_SIZE),
            chunk_size: self.bulk.chunk_size.min(MAX_BATCH_SIZE),
            batch_delay: Duration::from_millis(self.bulk.batch_delay_ms),
            retry: self.retry_policy(),
            extra_delete_rounds: self.bulk.extra_delete_rounds,
            strict_delete_verification: self.bulk.strict_delete_verification,
        }
        .normalized()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_match_engine_constants() {
        let config = AppConfig::default();
        assert_eq!(config.firestore.database_id, "(default)");
        assert_eq!(config.firestore.collection_id, "stores");
        assert_eq!(config.bulk.page_size, 500);
        assert_eq!(config.bulk.chunk_size, 500);
        assert_eq!(config.bulk.batch_delay_ms, 200);
        assert_eq!(config.bulk.retry_max_attempts, 5);
        assert_eq!(config.bulk.retry_base_delay_ms, 300);
        assert_eq!(config.bulk_options(), BulkReplaceOptions::default());
    }

    #[test]
    fn toml_sections_parse() {
        let config = AppConfig::from_toml_str(
            r#"
            [firestore]
            project_id = "demo"
            collection_id = "shops"

            [bulk]
            chunk_size = 900
            batch_delay_ms = 0
            strict_delete_verification = true

            [access]
            allowed_emails = ["a@example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.firestore.project_id, "demo");
        assert_eq!(config.firestore.database_id, "(default)");
        let options = config.bulk_options();
        assert_eq!(options.chunk_size, 500);
        assert!(options.batch_delay.is_zero());
        assert!(options.strict_delete_verification);
        assert_eq!(config.access.allowed_emails, ["a@example.com"]);
    }

    #[test]
    fn invalid_toml_is_validation_error() {
        let err = AppConfig::from_toml_str("[bulk]\npage_size = \"many\"").unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::from_toml_str("[firestore]\nproject_id = \"file\"").unwrap();
        let env = HashMap::from([
            (ENV_PROJECT_ID, "env-project"),
            (ENV_EMULATOR_HOST, "localhost:8080"),
            (ENV_CACHE_DIR, "/tmp/cache"),
            (ENV_API_KEY, ""),
        ]);
        config.apply_env(lookup_from_map(&env));

        let firestore = config.firestore_config().unwrap();
        assert_eq!(firestore.project_id, "env-project");
        assert_eq!(firestore.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(firestore.api_key, None);
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/cache"));
    }

    #[test]
    fn project_id_is_required() {
        let err = AppConfig::default().firestore_config().unwrap_err();
        assert!(err.to_string().contains("project_id"));
    }
}
