//! Service configuration.
//!
//! Loaded from a TOML file, then overridden from the command line or
//! environment. The store URI has no default: the service refuses to
//! start without one.

use crate::archive::ArchiveConfig;
use crate::codec::CodecConfig;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("store URI not set (use store.uri, --store-uri or MONGO_URI)")]
    MissingStoreUri,
    #[error("unsupported store URI {0:?} (expected mongodb://, mongodb+srv:// or memory://)")]
    UnsupportedStoreUri(String),
    #[error("store URI {0:?} needs the `mongo` feature")]
    MongoDisabled(String),
    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),
    #[error("archive.max_frames must be at least 1")]
    InvalidCapacity,
    #[error("invalid JPEG quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("server.max_upload_bytes must be greater than zero")]
    InvalidUploadLimit,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 5000).into(),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection target; required.
    pub uri: Option<String>,
    /// Database name; defaults to the URI's database.
    pub database: Option<String>,
    /// Collection holding frame records.
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: None,
            collection: "frames".to_string(),
        }
    }
}

/// Storage backend selected by the store URI scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo(String),
    Memory,
}

impl StoreConfig {
    /// Picks the backend for the configured URI.
    pub fn backend(&self) -> Result<StoreBackend, ConfigError> {
        let uri = self
            .uri
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingStoreUri)?;

        if uri.starts_with("memory://") {
            return Ok(StoreBackend::Memory);
        }
        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            if cfg!(feature = "mongo") {
                return Ok(StoreBackend::Mongo(uri.to_string()));
            }
            return Err(ConfigError::MongoDisabled(uri.to_string()));
        }
        Err(ConfigError::UnsupportedStoreUri(uri.to_string()))
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// IANA timezone for watermarks and history dates.
    pub timezone: String,
    /// Default log filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Kolkata".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Parses the configured timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub codec: CodecConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Only parsing happens here; call [`validate`](Self::validate) once
    /// overrides are applied.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.backend()?;
        self.general.timezone()?;
        if self.archive.max_frames == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        if !(1..=100).contains(&self.codec.jpeg_quality) {
            return Err(ConfigError::InvalidQuality(self.codec.jpeg_quality));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidUploadLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn valid_config() -> FileConfig {
        let mut config = FileConfig::default();
        config.store.uri = Some("memory://".into());
        config
    }

    #[test]
    fn test_default_config_needs_store_uri() {
        let config = FileConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingStoreUri)
        ));
    }

    #[test]
    fn test_blank_store_uri_rejected() {
        let mut config = valid_config();
        config.store.uri = Some("   ".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingStoreUri)
        ));
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_store_backend_by_scheme() {
        let mut store = StoreConfig::default();
        store.uri = Some("memory://".into());
        assert_eq!(store.backend().unwrap(), StoreBackend::Memory);

        store.uri = Some("postgres://localhost".into());
        assert!(matches!(
            store.backend(),
            Err(ConfigError::UnsupportedStoreUri(_))
        ));

        store.uri = Some("mongodb://localhost:27017/camera".into());
        if cfg!(feature = "mongo") {
            assert_eq!(
                store.backend().unwrap(),
                StoreBackend::Mongo("mongodb://localhost:27017/camera".into())
            );
        } else {
            assert!(matches!(store.backend(), Err(ConfigError::MongoDisabled(_))));
        }
    }

    #[test]
    fn test_validation_rules() {
        let mut config = valid_config();
        config.archive.max_frames = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCapacity)));

        let mut config = valid_config();
        config.codec.jpeg_quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidQuality(0))));

        let mut config = valid_config();
        config.general.timezone = "Mars/Olympus_Mons".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimezone(_))
        ));

        let mut config = valid_config();
        config.server.max_upload_bytes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUploadLimit)
        ));
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let path = std::env::temp_dir().join("frame-relay-config-test.toml");
        fs::write(
            &path,
            r#"
[store]
uri = "memory://"

[archive]
max_frames = 3
"#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.archive.max_frames, 3);
        assert!(!config.archive.strict_capacity);
        assert_eq!(config.codec.jpeg_quality, 95);
        assert_eq!(config.store.collection, "frames");
        assert_eq!(config.server.bind_addr.port(), 5000);
        assert_eq!(config.general.timezone().unwrap(), chrono_tz::Asia::Kolkata);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            FileConfig::from_file("/nonexistent/frame-relay.toml"),
            Err(ConfigError::FileReadError(_))
        ));
    }
}
