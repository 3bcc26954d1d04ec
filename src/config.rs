use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::validate::MAX_VIDEO_LENGTH;

const APP_DIR: &str = ".tubescribe";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transcription: TranscriptionConfig,
    pub source: SourceConfig,
    pub translation: TranslationConfig,
    pub ner: Option<NerConfig>,
    pub cache: CacheConfig,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Model name, also part of the cache key. Resolves to
    /// `~/.tubescribe/models/ggml-{model}.bin` unless `model_path` is set.
    pub model: String,
    pub model_path: Option<String>,
    pub use_gpu: bool,
    pub threads: Option<i32>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "tiny".to_string(),
            model_path: None,
            use_gpu: false,
            threads: None,
        }
    }
}

impl TranscriptionConfig {
    pub fn resolve_model_path(&self) -> anyhow::Result<PathBuf> {
        match &self.model_path {
            Some(path) => resolve_path(path),
            None => Ok(app_dir()?
                .join("models")
                .join(format!("ggml-{}.bin", self.model))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    /// yt-dlp executable.
    pub downloader: String,
    pub data_dir: PathBuf,
    /// Seconds.
    pub max_video_length: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            downloader: "yt-dlp".to_string(),
            data_dir: PathBuf::from("data"),
            max_video_length: MAX_VIDEO_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TranslationConfig {
    pub endpoint: String,
    pub action: String,
    pub src_lan: String,
    pub tgt_lan: String,
    pub engine: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://lexytrad.es/apps/vipapi/".to_string(),
            action: "mt".to_string(),
            src_lan: "en".to_string(),
            tgt_lan: "es".to_string(),
            engine: "apertium".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NerConfig {
    pub endpoint: String,
    pub model: Option<String>, // e.g. en_core_web_lg
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 4 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub url: String,
}

pub fn default_samples() -> Vec<Sample> {
    vec![Sample {
        name: "Sample 1".to_string(),
        url: "https://www.youtube.com/watch?v=f1NZEqgd7zw".to_string(),
    }]
}

impl AppConfig {
    pub fn samples(&self) -> Vec<Sample> {
        if self.samples.is_empty() {
            default_samples()
        } else {
            self.samples.clone()
        }
    }
}

fn app_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(APP_DIR))
}

/// Expands `~/`; anything else is used as given.
pub fn resolve_path(path: &str) -> anyhow::Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().context("Could not find home directory")?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(path))
}

pub fn parse_app_config(content: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(content)?;
    Ok(config)
}

/// Loads `path`, or `~/.tubescribe/config.yaml` when no path is given.
/// A missing default file means an all-default config; a missing explicit
/// file is an error.
pub fn load_app_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default_path = app_dir()?.join("config.yaml");
            if !default_path.exists() {
                log::info!("No config at {:?}, using defaults", default_path);
                return Ok(AppConfig::default());
            }
            default_path
        }
    };

    if !config_path.exists() {
        anyhow::bail!("Config file not found at {:?}", config_path);
    }

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {:?}", config_path))?;
    parse_app_config(&content).with_context(|| format!("Invalid config {:?}", config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config = parse_app_config("{}").unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8501");
        assert_eq!(config.transcription.model, "tiny");
        assert!(!config.transcription.use_gpu);
        assert_eq!(config.source.max_video_length, 600);
        assert_eq!(config.translation.tgt_lan, "es");
        assert_eq!(config.cache.capacity, 4);
        assert!(config.ner.is_none());
        assert_eq!(config.samples(), default_samples());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_app_config(
            r#"
transcription:
  model: base
  model_path: /models/ggml-base.bin
translation:
  tgt_lan: ca
ner:
  endpoint: http://localhost:8080/ents
  model: en_core_web_lg
samples:
  - name: Talk
    url: https://youtu.be/abc
"#,
        )
        .unwrap();

        assert_eq!(config.transcription.model, "base");
        assert_eq!(
            config.transcription.resolve_model_path().unwrap(),
            PathBuf::from("/models/ggml-base.bin")
        );
        assert_eq!(config.translation.tgt_lan, "ca");
        assert_eq!(config.translation.src_lan, "en");
        assert_eq!(config.ner.unwrap().model.as_deref(), Some("en_core_web_lg"));
        assert_eq!(config.samples[0].url, "https://youtu.be/abc");
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "server:\n  bind: 0.0.0.0:9000\ncache:\n  capacity: 1").unwrap();

        let config = load_app_config(Some(file.path())).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.cache.capacity, 1);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_app_config(Some(Path::new("/nonexistent/tubescribe.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(resolve_path("~/m.bin").unwrap(), home.join("m.bin"));
        assert_eq!(resolve_path("./m.bin").unwrap(), PathBuf::from("./m.bin"));
    }
}
