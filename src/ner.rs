use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::NerConfig;

/// An entity found by the recognizer. `start` and `end` are character
/// offsets into the analysed text, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Named-entity recognizer. Spans come back ordered left to right and
/// non-overlapping.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Used when no recognizer service is configured.
pub struct NoEntities;

#[async_trait]
impl EntityRecognizer for NoEntities {
    async fn recognize(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    entities: Vec<EntitySpan>,
}

/// Client for an entity-recognition service (for example a spaCy model
/// behind a small HTTP wrapper) answering `{"entities": [...]}`.
pub struct HttpRecognizer {
    client: reqwest::Client,
    config: NerConfig,
}

impl HttpRecognizer {
    pub fn new(config: NerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EntityRecognizer for HttpRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let mut body = json!({ "text": text });
        if let Some(model) = &self.config.model {
            body["model"] = json!(model);
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("NER request to {} failed", self.config.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("NER API error ({}): {}", status, error_text);
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .context("Failed to parse NER response")?;
        Ok(parsed.entities)
    }
}

/// Picks the recognizer for the given config section.
pub fn from_config(config: Option<&NerConfig>) -> Arc<dyn EntityRecognizer> {
    match config {
        Some(conf) => Arc::new(HttpRecognizer::new(conf.clone())),
        None => Arc::new(NoEntities),
    }
}
