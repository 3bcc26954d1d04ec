use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::TranslationConfig;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Form body accepted by the translation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationRequest<'a> {
    pub action: &'a str,
    pub src_lan: &'a str,
    pub tgt_lan: &'a str,
    pub text: &'a str,
    #[serde(rename = "trans_to_use")]
    pub engine: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationResponse {
    pub translation: String,
}

/// Machine translation over a plain HTTP form POST.
pub struct HttpTranslator {
    client: reqwest::Client,
    config: TranslationConfig,
}

impl HttpTranslator {
    pub fn new(config: TranslationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn request<'a>(&'a self, text: &'a str) -> TranslationRequest<'a> {
        TranslationRequest {
            action: &self.config.action,
            src_lan: &self.config.src_lan,
            tgt_lan: &self.config.tgt_lan,
            text,
            engine: &self.config.engine,
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        debug!(
            "Translating {} chars {} -> {}",
            text.len(),
            self.config.src_lan,
            self.config.tgt_lan
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&self.request(text))
            .send()
            .await
            .with_context(|| format!("Translation request to {} failed", self.config.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Translation API error ({}): {}", status, error_text);
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

pub fn parse_response(body: &str) -> Result<String> {
    let parsed: TranslationResponse =
        serde_json::from_str(body).context("Failed to parse translation response")?;
    Ok(parsed.translation)
}
