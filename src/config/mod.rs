mod file_config;

pub use file_config::{FileConfig, TracksCacheConfig};

use crate::catalog_store::DEFAULT_TRACKS_CACHE_TTL;
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that take part in config resolution. TOML values override
/// them where present.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub store_timeout_ms: u64,
    pub read_pool_size: usize,
    pub tracks_cache: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            store_timeout_ms: 5000,
            read_pool_size: 4,
            tracks_cache: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracksCacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
}

impl Default for TracksCacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: DEFAULT_TRACKS_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub store_timeout: Duration,
    pub read_pool_size: usize,
    pub tracks_cache: TracksCacheSettings,
}

impl AppConfig {
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified on the command line or in the config file"))?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let store_timeout_ms = file.store_timeout_ms.unwrap_or(cli.store_timeout_ms);
        if store_timeout_ms == 0 {
            bail!("store_timeout_ms must be greater than zero");
        }

        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size);
        if read_pool_size == 0 {
            bail!("read_pool_size must be greater than zero");
        }

        let cache_file = file.tracks_cache.unwrap_or_default();
        let tracks_cache = TracksCacheSettings {
            enabled: cache_file.enabled.unwrap_or(cli.tracks_cache),
            ttl: cache_file
                .ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TRACKS_CACHE_TTL),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            store_timeout: Duration::from_millis(store_timeout_ms),
            read_pool_size,
            tracks_cache,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_dir(dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_cli_only() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_dir(&dir), None).unwrap();

        assert_eq!(config.db_dir, dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.store_timeout, Duration::from_millis(5000));
        assert_eq!(config.read_pool_size, 4);
        assert!(!config.tracks_cache.enabled);
        assert_eq!(config.tracks_cache.ttl, Duration::from_secs(28800));
        assert_eq!(config.catalog_db_path(), dir.path().join("catalog.db"));
    }

    #[test]
    fn file_overrides_cli() {
        let dir = TempDir::new().unwrap();
        let file = FileConfig {
            port: Some(8080),
            logging_level: Some("body".to_string()),
            store_timeout_ms: Some(250),
            tracks_cache: Some(TracksCacheConfig {
                enabled: Some(true),
                ttl_secs: Some(60),
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli_with_dir(&dir), Some(file)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert!(config.tracks_cache.enabled);
        assert_eq!(config.tracks_cache.ttl, Duration::from_secs(60));
    }

    #[test]
    fn unknown_logging_level_falls_back_to_cli() {
        let dir = TempDir::new().unwrap();
        let file = FileConfig {
            logging_level: Some("verbose".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli_with_dir(&dir), Some(file)).unwrap();
        assert_eq!(config.logging_level, RequestsLoggingLevel::Path);
    }

    #[test]
    fn missing_db_dir_is_an_error() {
        assert!(AppConfig::resolve(&CliConfig::default(), None).is_err());

        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err().to_string();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cli = CliConfig {
            store_timeout_ms: 0,
            ..cli_with_dir(&dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn parses_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
port = 4000
read_pool_size = 2

[tracks_cache]
enabled = true
"#,
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.port, Some(4000));
        assert_eq!(file.read_pool_size, Some(2));
        assert_eq!(file.tracks_cache.unwrap().enabled, Some(true));
    }
}
