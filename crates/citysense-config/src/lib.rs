use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load configuration from the CITYSENSE_CONFIG path (TOML) if present.
    ///
    /// A DATABASE_URL environment variable takes precedence over the file.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CITYSENSE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_database_url(std::env::var("DATABASE_URL").ok()))
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&s)?)
    }

    /// Replace the configured database URL when `url` is set
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.database.get_or_insert_with(DatabaseConfig::default).url = Some(url);
        }
        self
    }

    /// HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string())
    }

    /// Database URL, if any; without one the server keeps data in memory
    pub fn database_url(&self) -> Option<&str> {
        self.database.as_ref().and_then(|d| d.url.as_deref())
    }

    pub fn max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .and_then(|d| d.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_bind_is_8080() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
        assert_eq!(cfg.max_connections(), 10);
        assert!(cfg.database_url().is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert!(cfg.database.is_none());
        assert!(cfg.http.is_none());
    }

    #[test]
    fn reads_sections_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "postgres://city@localhost/sense"
max_connections = 4

[http]
bind = "127.0.0.1:9000"
"#
        )
        .unwrap();

        let cfg = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.database_url(), Some("postgres://city@localhost/sense"));
        assert_eq!(cfg.max_connections(), 4);
        assert_eq!(cfg.http_bind(), "127.0.0.1:9000");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database\nurl = 3").unwrap();

        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn env_database_url_overrides_file() {
        let cfg = AppConfig {
            database: Some(DatabaseConfig {
                url: Some("postgres://file/db".to_string()),
                max_connections: Some(3),
            }),
            http: None,
        };

        let cfg = cfg.with_database_url(Some("postgres://env/db".to_string()));
        assert_eq!(cfg.database_url(), Some("postgres://env/db"));
        assert_eq!(cfg.max_connections(), 3);

        let cfg = AppConfig::default().with_database_url(None);
        assert!(cfg.database_url().is_none());

        let cfg = AppConfig::default().with_database_url(Some("  ".to_string()));
        assert!(cfg.database_url().is_none());
    }
}
