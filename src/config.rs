// src/config.rs - Configuration management: TOML file, .env and env overrides
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::engine::LayoutSettings;
use crate::store::DEFAULT_STORAGE_KEY;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub layout: LayoutSettings,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    /// Directory for the file backend.
    pub data_dir: String,
    pub storage_key: String,
    /// Owner scope for every record.
    pub namespace: String,
    /// Feed store snapshots back into the engine.
    pub realtime_sync: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: "sqlite:warehouse.db".to_string(),
            max_connections: 5,
            data_dir: "data".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            namespace: "default".to_string(),
            realtime_sync: true,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            max_request_size: 256 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let mut config = match env::var("CONFIG_FILE") {
        Ok(config_file) => load_config_file(Path::new(&config_file))?,
        Err(_) => Config::default(),
    };

    override_with(&mut config, |key| env::var(key).ok())?;

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Apply environment overrides. `lookup` is `env::var` outside of tests.
pub fn override_with<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("BIND_ADDRESS") {
        config.server.host = host;
    }
    if let Some(port) = lookup("WAREHOUSE_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("WAREHOUSE_PORT is not a valid port: {}", port))?;
    }
    if let Some(workers_str) = lookup("WAREHOUSE_WORKERS") {
        if let Ok(workers) = workers_str.parse::<usize>() {
            config.server.workers = Some(workers);
        }
    }
    if let Some(url) = lookup("DATABASE_URL") {
        config.storage.database_url = url;
    }
    if let Some(backend) = lookup("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse()
            .with_context(|| format!("Unknown STORAGE_BACKEND: {}", backend))?;
    }
    if let Some(dir) = lookup("STORAGE_DIR") {
        config.storage.data_dir = dir;
    }
    if let Some(namespace) = lookup("STORAGE_NAMESPACE") {
        config.storage.namespace = namespace;
    }
    if let Some(origins_str) = lookup("ALLOWED_ORIGINS") {
        config.security.allowed_origins = origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(level) = lookup("RUST_LOG") {
        config.logging.level = level;
    }

    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server.port must be non-zero"));
        }
        if self.storage.max_connections == 0 {
            return Err(anyhow::anyhow!("storage.max_connections must be at least 1"));
        }
        if self.storage.storage_key.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.storage_key cannot be empty"));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.namespace.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.namespace cannot be empty for the sqlite backend"));
        }

        let layout = &self.layout;
        if !(layout.grid_step >= 0.0) {
            return Err(anyhow::anyhow!("layout.grid_step must be >= 0 (got {})", layout.grid_step));
        }
        if !(layout.wall_limit > 0.0) {
            return Err(anyhow::anyhow!("layout.wall_limit must be > 0 (got {})", layout.wall_limit));
        }
        if !(layout.floor_area > 0.0) {
            return Err(anyhow::anyhow!("layout.floor_area must be > 0 (got {})", layout.floor_area));
        }
        if !(layout.collision_clearance >= 0.0) {
            return Err(anyhow::anyhow!(
                "layout.collision_clearance must be >= 0 (got {})",
                layout.collision_clearance
            ));
        }
        if !(layout.spawn_range >= 0.0) {
            return Err(anyhow::anyhow!("layout.spawn_range must be >= 0 (got {})", layout.spawn_range));
        }
        if layout.spawn_attempts == 0 {
            return Err(anyhow::anyhow!("layout.spawn_attempts must be at least 1"));
        }
        if layout.near_expiry_days < 0 {
            return Err(anyhow::anyhow!("layout.near_expiry_days must be >= 0"));
        }
        if layout.default_warehouse_name.trim().is_empty() {
            return Err(anyhow::anyhow!("layout.default_warehouse_name cannot be empty"));
        }

        Ok(())
    }

    pub fn print_startup_info(&self) {
        log::info!("📦 Warehouse layout service starting up...");
        log::info!("🌐 Server: {}:{}", self.server.host, self.server.port);
        match self.storage.backend {
            StorageBackend::Sqlite => log::info!("💾 Storage: SQLite ({})", self.storage.database_url),
            StorageBackend::File => log::info!("💾 Storage: file ({})", self.storage.data_dir),
            StorageBackend::Memory => log::warn!("💾 Storage: in-memory, nothing survives a restart"),
        }
        log::info!("👤 Namespace: {}", self.storage.namespace);
        log::info!(
            "📐 Layout: grid {}, walls ±{}, clearance {}",
            self.layout.grid_step, self.layout.wall_limit, self.layout.collision_clearance
        );
        log::info!("🔄 Realtime sync: {}", if self.storage.realtime_sync { "Enabled" } else { "Disabled" });
        log::info!("📊 Logging: {} level, {} format", self.logging.level, self.logging.format);
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.storage_key, "warehouse-storage");
        assert_eq!(config.layout.grid_step, 2.0);
        assert_eq!(config.layout.wall_limit, 24.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[storage]
backend = "file"
data_dir = "/var/lib/warehouse"

[layout]
collision_clearance = 0.5
"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, "/var/lib/warehouse");
        assert_eq!(config.layout.collision_clearance, 0.5);
        assert_eq!(config.layout.grid_step, 2.0);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        override_with(
            &mut config,
            lookup_from(&[
                ("WAREHOUSE_PORT", "7000"),
                ("STORAGE_BACKEND", "Memory"),
                ("STORAGE_NAMESPACE", "user-42"),
                ("ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.namespace, "user-42");
        assert_eq!(
            config.security.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_invalid_env_values_are_rejected() {
        let mut config = Config::default();
        assert!(override_with(&mut config, lookup_from(&[("STORAGE_BACKEND", "firestore")])).is_err());
        assert!(override_with(&mut config, lookup_from(&[("WAREHOUSE_PORT", "http")])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.layout.spawn_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.layout.collision_clearance = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.layout.default_warehouse_name = "   ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.namespace = String::new();
        assert!(config.validate().is_err());
        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }
}
