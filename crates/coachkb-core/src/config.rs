//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_EMBEDDING__MODEL`). The embedding
//! credential and model also honour the conventional `OPENAI_API_KEY` and
//! `OPENAI_EMBEDDING_MODEL` variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::paths::DEFAULT_ANCHOR;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// A config holding only the given serializable values; handy in tests.
    pub fn from_values<T: serde::Serialize>(values: T) -> Self {
        Self { figment: Figment::from(Serialized::defaults(values)) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawEmbedding {
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    use_fake: Option<bool>,
}

/// Everything the embedding client needs.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub model: String,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            use_fake: false,
        }
    }
}

impl EmbeddingSettings {
    pub fn from_config(config: &Config) -> Self {
        Self::from_config_with_env(config, |name| env::var(name).ok())
    }

    /// Resolves settings from `config`, falling back to `lookup` for the
    /// conventional environment variables.
    pub fn from_config_with_env(config: &Config, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let raw: RawEmbedding = config.get("embedding").unwrap_or_default();
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let model = non_empty(raw.model)
            .or_else(|| non_empty(lookup("OPENAI_EMBEDDING_MODEL")))
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let api_key = non_empty(raw.api_key)
            .or_else(|| non_empty(lookup("OPENAI_API_KEY")))
            .map(SecretString::new);
        let base_url = non_empty(raw.base_url).unwrap_or_else(|| DEFAULT_EMBEDDING_BASE_URL.to_string());
        let use_fake = raw.use_fake.unwrap_or_else(|| {
            lookup("APP_USE_FAKE_EMBEDDINGS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        });
        Self { model, api_key, base_url, use_fake }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.expose_secret().is_empty())
    }
}

/// Settings for one knowledge base: its anchor path plus embedding config.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub anchor: PathBuf,
    pub embedding: EmbeddingSettings,
}

impl StoreSettings {
    pub fn from_config(config: &Config) -> Self {
        let anchor: String = config.get("store.anchor").unwrap_or_else(|_| DEFAULT_ANCHOR.to_string());
        Self { anchor: expand_path(anchor), embedding: EmbeddingSettings::from_config(config) }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
