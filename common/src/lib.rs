//! Configuration and database bootstrap shared by the TubeDigest binaries.
//!
//! Every config section is optional: an empty file (or no file) yields a
//! working local setup. Secrets are never stored in the file, only the names
//! of the environment variables holding them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/tubedigest.db")
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/tubedigest.db".to_string(),
        }
    }
}

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Overall deadline for one summarize request
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_seconds: 30,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Token verification settings. Tokens are issued by the identity provider and
/// signed with a shared HS256 secret read from `jwt_secret_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: "TUBEDIGEST_JWT_SECRET".to_string(),
        }
    }
}

impl AuthConfig {
    /// Reads the signing secret from the environment, if set and non-empty.
    pub fn secret(&self) -> Option<String> {
        read_env(&self.jwt_secret_env)
    }
}

/// Remote (OpenAI-compatible) completion endpoint used for AI summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key_env: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_seconds: 30,
            max_tokens: 425,
        }
    }
}

impl LlmConfig {
    /// Reads the API key from the environment. `None` disables AI summaries.
    pub fn api_key(&self) -> Option<String> {
        read_env(&self.api_key_env)
    }
}

/// Video metadata sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Path or name of the yt-dlp executable used by the primary source
    pub ytdlp_path: String,
    /// oEmbed endpoint used by the fallback source
    pub oembed_url: String,
    pub fetch_timeout_seconds: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            oembed_url: "https://www.youtube.com/oembed".to_string(),
            fetch_timeout_seconds: 15,
        }
    }
}

impl VideoConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub video: VideoConfig,
}

/// Defaults file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.default.toml";
/// Local override file, used when no explicit path is given.
pub const OVERRIDE_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Standard lookup shared by every binary: `config.default.toml` in `dir`,
    /// overridden by `explicit` (which must exist) or else by `config.toml` in `dir`.
    pub async fn load_from_dir(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let override_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => dir.join(OVERRIDE_CONFIG_FILE),
        };
        let default_path = dir.join(DEFAULT_CONFIG_FILE);

        Self::load_with_defaults(Some(&default_path), Some(&override_path)).await
    }

    /// Layer an optional override file over an optional defaults file. Missing
    /// files are skipped, nested tables merge key by key and the built-in
    /// defaults fill whatever neither file sets.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in [default_path, override_path].into_iter().flatten() {
            if path.exists() {
                overlay(&mut merged, read_layer(path).await?);
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .context("Failed to parse merged configuration")
    }
}

async fn read_layer(path: &Path) -> Result<toml::Table> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse configuration: {}", path.display()))
}

fn overlay(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => overlay(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Open (creating if needed) the SQLite database at `path` in WAL mode.
/// Schema creation is left to the caller.
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    let db_path = Path::new(path);
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create DB parent directory: {}", dir.display()))?;
        }
        _ => {}
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open sqlite database at {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse config");
        assert_eq!(cfg.database.path, "data/tubedigest.db");
        assert_eq!(cfg.server.request_timeout_seconds, 30);
        assert_eq!(cfg.llm.max_tokens, 425);
        assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.video.ytdlp_path, "yt-dlp");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml = r#"
            [server]
            port = 9090

            [llm]
            model = "gpt-4o-mini"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.bind, "127.0.0.1");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.api_url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn missing_env_var_disables_api_key() {
        let llm = LlmConfig {
            api_key_env: "TUBEDIGEST_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        assert!(llm.api_key().is_none());
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        std::fs::write(
            &default_path,
            "[server]\nport = 8000\nbind = \"0.0.0.0\"\n[database]\npath = \"a.db\"\n",
        )
        .expect("write default");
        std::fs::write(&override_path, "[server]\nport = 9000\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.database.path, "a.db");
    }

    #[tokio::test]
    async fn load_from_dir_prefers_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[auth]\njwt_secret_env = \"A\"\n").unwrap();
        std::fs::write(dir.path().join(OVERRIDE_CONFIG_FILE), "[auth]\njwt_secret_env = \"B\"\n").unwrap();
        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[auth]\njwt_secret_env = \"C\"\n").unwrap();

        let local = Config::load_from_dir(dir.path(), None).await.expect("load");
        assert_eq!(local.auth.jwt_secret_env, "B");

        let chosen = Config::load_from_dir(dir.path(), Some(&explicit)).await.expect("load");
        assert_eq!(chosen.auth.jwt_secret_env, "C");
    }

    #[tokio::test]
    async fn load_from_dir_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.toml");
        let err = Config::load_from_dir(dir.path(), Some(&missing)).await.unwrap_err();
        assert!(err.to_string().contains("Config file not found"));

        // No files at all still gives the built-in defaults
        let cfg = Config::load_from_dir(dir.path(), None).await.expect("defaults");
        assert_eq!(cfg.auth.jwt_secret_env, "TUBEDIGEST_JWT_SECRET");
    }

    #[tokio::test]
    async fn db_pool_in_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("tubedigest.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
        assert!(db_path.exists());
    }
}
