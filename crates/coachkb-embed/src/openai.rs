//! OpenAI embeddings client using the `/v1/embeddings` endpoint.
//!
//! Blocking on purpose: the stores call it inline from request handlers.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use coachkb_core::config::{EmbeddingSettings, DEFAULT_EMBEDDING_BASE_URL};
use coachkb_core::error::{Error, Result};
use coachkb_core::traits::Embedder;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if has_version_suffix(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

impl OpenAiEmbedder {
    /// Builds a client. A missing or blank key yields an unconfigured client
    /// whose calls fail with [`Error::Unavailable`].
    pub fn new(api_key: Option<SecretString>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Unavailable(format!("embeddings http client: {e}")))?;
        let api_key = api_key.filter(|k| !k.expose_secret().trim().is_empty());
        Ok(Self { client, api_key, base_url: normalize_base_url(DEFAULT_EMBEDDING_BASE_URL), model: model.into() })
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self::new(settings.api_key.clone(), settings.model.clone())?.with_base_url(&settings.base_url))
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let Some(api_key) = self.api_key.as_ref() else {
            return Err(Error::Unavailable("OpenAI client not configured for embeddings".to_string()));
        };
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let req = EmbeddingRequest { model: &self.model, input: texts };
        let mut resp: EmbeddingResponse = self
            .client
            .post(embeddings_endpoint(&self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&req)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::json)
            .map_err(|e| Error::Unavailable(format!("embeddings request failed: {e}")))?;

        if resp.data.len() != texts.len() {
            return Err(Error::Embedding(format!("expected {} embeddings, got {}", texts.len(), resp.data.len())));
        }
        resp.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        debug!(model = %self.model, batch = texts.len(), "embedded batch");
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_host_base_uses_v1_embeddings() {
        assert_eq!(embeddings_endpoint("https://api.openai.com"), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn endpoint_from_version_base_appends_embeddings_once() {
        assert_eq!(embeddings_endpoint("https://proxy.local/v1/"), "https://proxy.local/v1/embeddings");
        assert_eq!(embeddings_endpoint("http://localhost:8080/openai/v2"), "http://localhost:8080/openai/v2/embeddings");
    }

    #[test]
    fn endpoint_preserves_explicit_embeddings_url() {
        assert_eq!(embeddings_endpoint("https://api.example.com/v1/embeddings"), "https://api.example.com/v1/embeddings");
    }

    #[test]
    fn unconfigured_client_is_unavailable() {
        let embedder = OpenAiEmbedder::new(Some(SecretString::new("  ".to_string())), "text-embedding-3-small").unwrap();
        assert!(!embedder.is_configured());
        let err = embedder.embed_batch(&["hello".to_string()]).unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("embeddings"));
    }
}
