use std::sync::Arc;

use anyhow::{Context, anyhow};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};

use crate::{
    annotate::{self, AnnotatedSentence},
    cache::{CacheKey, TranscriptCache},
    error::CaptionError,
    ner::EntityRecognizer,
    source::VideoSource,
    transcribe::{SpeechModel, Transcription},
    translate::Translator,
    validate,
};

/// Builds the speech model on first use. Runs on the blocking pool.
pub type ModelLoader = Arc<dyn Fn() -> anyhow::Result<Arc<dyn SpeechModel>> + Send + Sync>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VideoInfo {
    pub url: String,
    pub video_id: Option<String>,
    pub embed_url: Option<String>,
    pub duration: u64,
}

/// Everything behind the page: URL checks, the shared model, the
/// transcription cache and the annotation collaborators.
pub struct Captioner {
    model_name: String,
    loader: ModelLoader,
    model: OnceCell<Arc<dyn SpeechModel>>,
    // held for the whole fetch + inference; try_lock only
    inference: Mutex<()>,
    cache: TranscriptCache,
    source: Arc<dyn VideoSource>,
    translator: Arc<dyn Translator>,
    recognizer: Arc<dyn EntityRecognizer>,
    max_video_length: u64,
}

impl Captioner {
    pub fn new(
        model_name: impl Into<String>,
        loader: ModelLoader,
        source: Arc<dyn VideoSource>,
        translator: Arc<dyn Translator>,
        recognizer: Arc<dyn EntityRecognizer>,
        cache_capacity: usize,
        max_video_length: u64,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            loader,
            model: OnceCell::new(),
            inference: Mutex::new(()),
            cache: TranscriptCache::new(cache_capacity),
            source,
            translator,
            recognizer,
            max_video_length,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn max_video_length(&self) -> u64 {
        self.max_video_length
    }

    fn validate_url(&self, url: &str) -> Result<(), CaptionError> {
        if validate::valid_url(url) {
            Ok(())
        } else {
            Err(CaptionError::InvalidUrl(url.to_string()))
        }
    }

    async fn check_length(&self, url: &str) -> Result<u64, CaptionError> {
        let duration = self
            .source
            .duration_seconds(url)
            .await
            .with_context(|| format!("Failed to look up {}", url))?;
        validate::check_duration(duration, self.max_video_length)?;
        Ok(duration)
    }

    /// Validates the URL and applies the length policy.
    pub async fn check(&self, url: &str) -> Result<VideoInfo, CaptionError> {
        self.validate_url(url)?;
        let duration = self.check_length(url).await?;
        let video_id = validate::video_id(url);

        Ok(VideoInfo {
            url: url.to_string(),
            embed_url: video_id.as_deref().map(validate::embed_url),
            video_id,
            duration,
        })
    }

    async fn model(&self) -> Result<Arc<dyn SpeechModel>, CaptionError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!("Loading speech model '{}'", self.model_name);
                let loader = self.loader.clone();
                let model = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| anyhow!("model loading task failed: {}", e))??;
                info!("Speech model '{}' ready", model.name());
                Ok::<_, anyhow::Error>(model)
            })
            .await?;
        Ok(model.clone())
    }

    /// Transcribes the audio of `url`, or returns the cached result.
    ///
    /// Only one transcription runs at a time; a call arriving while another
    /// is in flight fails with [`CaptionError::Busy`].
    pub async fn transcribe(&self, url: &str) -> Result<Arc<Transcription>, CaptionError> {
        self.validate_url(url)?;

        let key = CacheKey::new(&self.model_name, url);
        if let Some(hit) = self.cache.get(&key) {
            info!("Cache hit for {}", url);
            return Ok(hit);
        }

        self.check_length(url).await?;

        let _slot = self.inference.try_lock().map_err(|_| {
            warn!("Rejecting {}: model busy", url);
            CaptionError::Busy
        })?;

        // another request may have finished this url while we were checking
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let model = self.model().await?;
        let audio = self.source.fetch_audio(url).await?;

        let result = tokio::task::spawn_blocking(move || model.transcribe(&audio))
            .await
            .map_err(|e| anyhow!("transcription task failed: {}", e))??;

        let result = Arc::new(result);
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    pub async fn annotate(&self, text: &str) -> Result<Vec<AnnotatedSentence>, CaptionError> {
        let sentences =
            annotate::annotate(text, self.translator.as_ref(), self.recognizer.as_ref()).await?;
        Ok(sentences)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ner::NoEntities;
    use crate::transcribe::Segment;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    pub struct FakeSource {
        pub duration: u64,
        pub lookups: AtomicUsize,
        pub downloads: AtomicUsize,
        fail_download: bool,
    }

    impl FakeSource {
        pub fn new(duration: u64) -> Self {
            Self {
                duration,
                lookups: AtomicUsize::new(0),
                downloads: AtomicUsize::new(0),
                fail_download: false,
            }
        }

        /// Source whose audio download always fails.
        pub fn broken_download(duration: u64) -> Self {
            Self {
                fail_download: true,
                ..Self::new(duration)
            }
        }
    }

    #[async_trait]
    impl VideoSource for FakeSource {
        async fn duration_seconds(&self, _url: &str) -> Result<u64> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.duration)
        }

        async fn fetch_audio(&self, _url: &str) -> Result<PathBuf> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if self.fail_download {
                anyhow::bail!("yt-dlp exited with status 1");
            }
            Ok(PathBuf::from("data/audio.mp3"))
        }
    }

    /// Model that counts calls and can be held mid-inference.
    pub struct FakeModel {
        pub calls: AtomicUsize,
        gate: Option<(Arc<Notify>, Arc<std::sync::Barrier>)>,
    }

    impl FakeModel {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        /// Model that signals `started` once inference begins and then
        /// blocks until `release` is reached by the test.
        pub fn gated(started: Arc<Notify>, release: Arc<std::sync::Barrier>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Some((started, release)),
            }
        }
    }

    impl SpeechModel for FakeModel {
        fn name(&self) -> &str {
            "fake"
        }

        fn transcribe(&self, _audio: &Path) -> Result<Transcription> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((started, release)) = &self.gate {
                started.notify_one();
                release.wait();
            }
            Ok(Transcription::from_segments(
                "en",
                vec![Segment {
                    start: 0.0,
                    end: 1.2,
                    text: " Hello there.".into(),
                }],
            ))
        }
    }

    pub struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str) -> Result<String> {
            Ok(format!("<{}>", text))
        }
    }

    pub fn captioner(source: Arc<FakeSource>, model: Arc<FakeModel>) -> Captioner {
        let loader: ModelLoader =
            Arc::new(move || -> Result<Arc<dyn SpeechModel>> { Ok(model.clone()) });
        Captioner::new(
            "fake",
            loader,
            source,
            Arc::new(EchoTranslator),
            Arc::new(NoEntities),
            4,
            validate::MAX_VIDEO_LENGTH,
        )
    }

    const URL: &str = "https://www.youtube.com/watch?v=abc";

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let source = Arc::new(FakeSource::new(120));
        let model = Arc::new(FakeModel::new());
        let captioner = captioner(source.clone(), model.clone());

        let first = captioner.transcribe(URL).await.unwrap();
        let second = captioner.transcribe(URL).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(first.language, "en");
        assert_eq!(first.subtitle(), "1\n00:00:00,000 --> 00:00:01,200\nHello there.\n");
    }

    #[tokio::test]
    async fn invalid_url_stops_before_lookup() {
        let source = Arc::new(FakeSource::new(120));
        let captioner = captioner(source.clone(), Arc::new(FakeModel::new()));

        let err = captioner.transcribe("http://example.com").await.unwrap_err();
        assert!(matches!(err, CaptionError::InvalidUrl(_)));
        assert_eq!(source.lookups.load(Ordering::SeqCst), 0);

        let err = captioner.check("not a url").await.unwrap_err();
        assert!(matches!(err, CaptionError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn long_video_is_rejected_before_download() {
        let source = Arc::new(FakeSource::new(validate::MAX_VIDEO_LENGTH + 1));
        let model = Arc::new(FakeModel::new());
        let captioner = captioner(source.clone(), model.clone());

        let err = captioner.transcribe(URL).await.unwrap_err();
        assert!(matches!(err, CaptionError::TooLong { duration: 601, max: 600 }));
        assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn video_at_the_limit_is_accepted() {
        let source = Arc::new(FakeSource::new(validate::MAX_VIDEO_LENGTH));
        let captioner = captioner(source, Arc::new(FakeModel::new()));

        let info = captioner.check(URL).await.unwrap();
        assert_eq!(info.duration, 600);
        assert_eq!(info.video_id.as_deref(), Some("abc"));
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/abc")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_transcription_is_busy() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(std::sync::Barrier::new(2));
        let model = Arc::new(FakeModel::gated(started.clone(), release.clone()));
        let source = Arc::new(FakeSource::new(60));
        let captioner = Arc::new(captioner(source, model.clone()));

        let first = {
            let captioner = captioner.clone();
            tokio::spawn(async move { captioner.transcribe(URL).await })
        };
        started.notified().await;

        // same url and a different one: both must be turned away
        let err = captioner.transcribe(URL).await.unwrap_err();
        assert!(err.is_busy());
        let err = captioner
            .transcribe("https://youtu.be/other")
            .await
            .unwrap_err();
        assert!(err.is_busy());

        release.wait();
        let result = first.await.unwrap().unwrap();
        assert_eq!(result.text, " Hello there.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        // the slot is free again and the first result is cached
        let again = captioner.transcribe(URL).await.unwrap();
        assert!(Arc::ptr_eq(&again, &result));
    }

    #[tokio::test]
    async fn failed_download_is_external_and_not_cached() {
        let source = Arc::new(FakeSource::broken_download(60));
        let model = Arc::new(FakeModel::new());
        let captioner = captioner(source.clone(), model.clone());

        let err = captioner.transcribe(URL).await.unwrap_err();
        assert!(matches!(err, CaptionError::External(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        // nothing cached and the slot is released: the retry downloads again
        captioner.transcribe(URL).await.unwrap_err();
        assert_eq!(source.downloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn model_is_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(FakeModel::new());
        let loader: ModelLoader = {
            let loads = loads.clone();
            Arc::new(move || -> Result<Arc<dyn SpeechModel>> {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(model.clone())
            })
        };
        let captioner = Captioner::new(
            "fake",
            loader,
            Arc::new(FakeSource::new(10)),
            Arc::new(EchoTranslator),
            Arc::new(NoEntities),
            4,
            validate::MAX_VIDEO_LENGTH,
        );

        assert_eq!(loads.load(Ordering::SeqCst), 0);
        captioner.transcribe(URL).await.unwrap();
        captioner.transcribe("https://youtu.be/xyz").await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn annotate_uses_configured_translator() {
        let captioner = captioner(Arc::new(FakeSource::new(10)), Arc::new(FakeModel::new()));
        let sentences = captioner.annotate("One. Two").await.unwrap();

        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].translation, "<One>");
        assert_eq!(sentences[1].translation, "<Two>");
    }
}
