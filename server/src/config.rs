//! Configuration for the arena server
//!
//! Every tunable has a default below and an `ARENA_*` environment override.
//! The data directory resolves with the following precedence:
//! 1. ARENA_DATA_DIR environment variable
//! 2. ~/.config/chess-arena/data (production default)
//! 3. ./data (fallback for development)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use engine::BridgeConfig;

const DEFAULT_CONFIG_DIR: &str = ".config/chess-arena/data";
const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "arena.db";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_JWT_SECRET: &str = "development-secret";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_ENGINE_PATHS: &[&str] = &[
    "stockfish",
    "/usr/games/stockfish",
    "/usr/local/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
];
const DEFAULT_ENGINE_POOL_SIZE: usize = 2;
const DEFAULT_ENGINE_INIT_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_ENGINE_SEARCH_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_FINISHED_LINGER_SECS: u64 = 60;
pub const DEFAULT_RATING: i32 = 1500;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub cors_origin: String,
    pub engine_paths: Vec<PathBuf>,
    pub engine_pool_size: usize,
    pub engine_init_timeout: Duration,
    pub engine_search_timeout: Duration,
    pub finished_linger: Duration,
    pub default_rating: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEV_DATA_DIR),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            engine_paths: DEFAULT_ENGINE_PATHS.iter().map(PathBuf::from).collect(),
            engine_pool_size: DEFAULT_ENGINE_POOL_SIZE,
            engine_init_timeout: Duration::from_millis(DEFAULT_ENGINE_INIT_TIMEOUT_MS),
            engine_search_timeout: Duration::from_millis(DEFAULT_ENGINE_SEARCH_TIMEOUT_MS),
            finished_linger: Duration::from_secs(DEFAULT_FINISHED_LINGER_SECS),
            default_rating: DEFAULT_RATING,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Values that fail to
    /// parse are ignored in favour of the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let engine_paths = match lookup("ARENA_ENGINE_PATHS") {
            Some(paths) if !paths.trim().is_empty() => paths
                .split(':')
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect(),
            _ => defaults.engine_paths,
        };

        Self {
            host: lookup("ARENA_HOST").unwrap_or(defaults.host),
            port: lookup("ARENA_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            data_dir: data_dir(&lookup),
            jwt_secret: lookup("ARENA_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            cors_origin: lookup("ARENA_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            engine_paths,
            engine_pool_size: parsed("ARENA_ENGINE_POOL_SIZE")
                .map(|n| n as usize)
                .unwrap_or(defaults.engine_pool_size),
            engine_init_timeout: parsed("ARENA_ENGINE_INIT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.engine_init_timeout),
            engine_search_timeout: parsed("ARENA_ENGINE_SEARCH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.engine_search_timeout),
            finished_linger: parsed("ARENA_FINISHED_LINGER_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.finished_linger),
            default_rating: lookup("ARENA_DEFAULT_RATING")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.default_rating),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            candidates: self.engine_paths.clone(),
            init_timeout: self.engine_init_timeout,
            search_timeout: self.engine_search_timeout,
            ..BridgeConfig::default()
        }
    }
}

fn data_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup("ARENA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = lookup("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.port, 4000);
        assert_eq!(config.jwt_secret, "development-secret");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.engine_pool_size, 2);
        assert_eq!(config.engine_search_timeout, Duration::from_secs(15));
        assert_eq!(config.default_rating, 1500);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ARENA_PORT", "8080"),
            ("ARENA_ENGINE_PATHS", "/a/sf:/b/sf"),
            ("ARENA_FINISHED_LINGER_SECS", "5"),
            ("ARENA_DATA_DIR", "/tmp/arena"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.engine_paths,
            vec![PathBuf::from("/a/sf"), PathBuf::from("/b/sf")]
        );
        assert_eq!(config.finished_linger, Duration::from_secs(5));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/arena/arena.db"));
    }

    #[test]
    fn test_home_data_dir_and_bad_numbers() {
        let config = config_from(&[("HOME", "/home/kim"), ("ARENA_PORT", "not-a-port")]);
        assert_eq!(
            config.data_dir,
            PathBuf::from("/home/kim/.config/chess-arena/data")
        );
        assert_eq!(config.port, 4000);
    }
}
