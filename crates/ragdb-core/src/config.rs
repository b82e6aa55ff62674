//! Service settings and path helpers.
//!
//! Figment merges built-in defaults, `config.toml`, `config.<env>.toml`
//! (`RUST_ENV`, `dev` by default), `APP_*` variables nested with `__`, and the
//! raw cloud credential variables mapped into `cloud.*`.
use std::env;
use std::fmt;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

const CLOUD_VARS: [&str; 4] = ["OPENAI_API_KEY", "GEMINI_API_KEY", "PINECONE_API_KEY", "PINECONE_ENV"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub paths: PathSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub chat: ChatSettings,
    pub cloud: CloudSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 50051, max_upload_bytes: 64 * 1024 * 1024 }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Raw path strings as configured; `~` and `${VAR}` are expanded on access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub model_dir: String,
    pub index_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self { model_dir: "~/.ragdb/models".into(), index_dir: "~/.ragdb/index".into() }
    }
}

impl PathSettings {
    pub fn model_path(&self) -> PathBuf {
        expand_path(&self.model_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }

    /// Create both directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.model_path())?;
        std::fs::create_dir_all(self.index_path())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub table: String,
    pub default_top_k: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { table: "chunks".into(), default_top_k: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-transformer weights loaded from `paths.model_dir`.
    Local,
    /// Deterministic hashing embedder; no weights needed.
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub max_len: usize,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Local,
            model: "all-MiniLM-L6-v2".into(),
            max_len: 256,
            fake_dim: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub token_delay_ms: u64,
    pub channel_capacity: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { token_delay_ms: 10, channel_capacity: 32 }
    }
}

/// Cloud credentials. Carried for future remote backends; never logged.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub pinecone_env: Option<String>,
}

impl fmt::Debug for CloudSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("CloudSettings")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .field("pinecone_env", &self.pinecone_env)
            .finish()
    }
}

impl Settings {
    /// Load from the working directory and the process environment.
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::from_figment(Self::figment(&env_name))
    }

    pub fn figment(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment
            .merge(Env::prefixed("APP_").split("__"))
            .merge(
                Env::raw()
                    .only(&CLOUD_VARS)
                    .map(|key| format!("cloud.{}", key.as_str().to_ascii_lowercase()).into()),
            )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        let checks = [
            (self.index.table.trim().is_empty(), "index.table must not be empty"),
            (self.index.default_top_k == 0, "index.default_top_k must be positive"),
            (self.embedding.max_len == 0, "embedding.max_len must be positive"),
            (self.embedding.fake_dim == 0, "embedding.fake_dim must be positive"),
            (self.chat.channel_capacity == 0, "chat.channel_capacity must be positive"),
            (self.server.max_upload_bytes == 0, "server.max_upload_bytes must be positive"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(Error::InvalidConfig((*msg).to_string())),
            None => Ok(()),
        }
    }
}

/// Expand a leading `~` and `${VAR}`/`$VAR` references. Unknown variables are
/// left as written; the result is not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_any_source() {
        Jail::expect_with(|_jail| {
            let s = Settings::from_figment(Settings::figment("dev")).expect("defaults");
            assert_eq!(s.server.port, 50051);
            assert_eq!(s.chunking, ChunkingConfig { chunk_size: 1000, chunk_overlap: 200 });
            assert_eq!(s.index.default_top_k, 4);
            assert_eq!(s.embedding.backend, EmbeddingBackend::Local);
            Ok(())
        });
    }

    #[test]
    fn files_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [server]
                port = 9000
                [chunking]
                chunk_size = 500
                chunk_overlap = 50
                "#,
            )?;
            jail.create_file("config.prod.toml", "[embedding]\nbackend = \"fake\"\n")?;
            jail.set_env("APP_SERVER__PORT", "8080");
            jail.set_env("OPENAI_API_KEY", "sk-secret");

            let s = Settings::from_figment(Settings::figment("prod")).expect("load");
            assert_eq!(s.server.port, 8080);
            assert_eq!(s.chunking.chunk_size, 500);
            assert_eq!(s.embedding.backend, EmbeddingBackend::Fake);
            assert_eq!(s.cloud.openai_api_key.as_deref(), Some("sk-secret"));
            assert!(!format!("{:?}", s.cloud).contains("sk-secret"));
            Ok(())
        });
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_CHUNKING__CHUNK_OVERLAP", "1000");
            let err = Settings::from_figment(Settings::figment("dev")).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)));
            Ok(())
        });
    }

    #[test]
    fn unknown_backend_is_invalid() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_EMBEDDING__BACKEND", "quantum");
            assert!(Settings::from_figment(Settings::figment("dev")).is_err());
            Ok(())
        });
    }

    #[test]
    fn expand_path_tilde_and_env() {
        std::env::set_var("RAGDB_TEST_DIR", "/tmp/ragdb");
        assert_eq!(expand_path("${RAGDB_TEST_DIR}/idx"), PathBuf::from("/tmp/ragdb/idx"));
        let home = expand_path("~/models");
        assert!(!home.to_string_lossy().starts_with('~'));
    }
}
