use ferry_core::{FerryError, Result, SlotStoreBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Fallback environment variable for the shared secret.
const SECRET_ENV: &str = "SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

/// Slot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            namespace: default_namespace(),
            redis: None,
        }
    }
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_namespace() -> String {
    "ferry".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("FERRY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| FerryError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| FerryError::Config(e.to_string()))?;

        if config.auth.secret.is_none() {
            config.auth.secret = std::env::var(SECRET_ENV).ok();
        }

        Ok(config)
    }

    /// The shared secret, required for the server to start.
    pub fn secret(&self) -> Result<&str> {
        self.auth
            .secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| {
                FerryError::Config(format!(
                    "auth secret is not set (use auth.secret, FERRY_AUTH__SECRET or {})",
                    SECRET_ENV
                ))
            })
    }

    pub fn slot_store_builder(&self) -> SlotStoreBuilder {
        let mut builder = SlotStoreBuilder::new()
            .backend(self.storage.backend.clone())
            .data_dir(self.storage.data_dir.clone())
            .namespace(self.storage.namespace.clone());

        if let Some(redis) = &self.storage.redis {
            builder = builder.redis_url(redis.url.clone());
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ferry.yaml");
        std::fs::write(
            &path,
            "server:\n  bind_addr: \"127.0.0.1:7000\"\n\
             storage:\n  backend: memory\n  namespace: staging\n\
             auth:\n  secret: from-file\n",
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.storage.namespace, "staging");
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.secret().unwrap(), "from-file");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent.yaml");

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.storage.backend, "file");
        assert!(config.storage.redis.is_none());
    }

    #[test]
    fn test_secret_is_required() {
        let mut config = Config::default();
        assert!(matches!(config.secret(), Err(FerryError::Config(_))));

        config.auth.secret = Some("  ".to_string());
        assert!(matches!(config.secret(), Err(FerryError::Config(_))));

        config.auth.secret = Some("ok".to_string());
        assert_eq!(config.secret().unwrap(), "ok");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut config = Config::default();
        config.auth.secret = Some("hunter2".to_string());
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_slot_store_builder_follows_storage_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = temp_dir.path().to_path_buf();

        let store = config.slot_store_builder().build().await.unwrap();
        assert_eq!(store.backend_name(), "file");

        config.storage.backend = "redis".to_string();
        assert!(matches!(
            config.slot_store_builder().build().await,
            Err(FerryError::Config(_))
        ));
    }
}
