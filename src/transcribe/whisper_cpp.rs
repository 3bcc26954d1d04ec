use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    decoder,
    transcribe::{Segment, SpeechModel, Transcription},
};

// whisper.cpp reports segment timestamps in centiseconds
const TIMESTAMP_SCALE: f64 = 100.0;

pub struct Whisper {
    ctx: WhisperContext,
    name: String,
    threads: Option<i32>,
}

impl Whisper {
    pub fn load(
        name: &str,
        model_path: &Path,
        use_gpu: bool,
        threads: Option<i32>,
    ) -> Result<Self> {
        if !model_path.exists() {
            return Err(anyhow!(
                "Whisper model '{}' not found at {:?}",
                name,
                model_path
            ));
        }

        let mut param = WhisperContextParameters::default();
        param.use_gpu(use_gpu);

        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("invalid model path {:?}", model_path))?;
        let ctx = WhisperContext::new_with_params(path, param)
            .with_context(|| format!("Failed to load Whisper model from {:?}", model_path))?;

        info!("Loaded Whisper model '{}' (gpu: {})", name, use_gpu);

        Ok(Self {
            ctx,
            name: name.to_string(),
            threads,
        })
    }

    fn params(&self) -> FullParams<'_, '_> {
        // fixed decoding: greedy, no temperature fallback, language auto-detect
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_token_timestamps(false);
        params.set_translate(false);
        params.set_temperature(0.0);
        params.set_language(Some("auto"));

        if let Some(threads) = self.threads {
            params.set_n_threads(threads);
        }

        params
    }
}

impl SpeechModel for Whisper {
    fn name(&self) -> &str {
        &self.name
    }

    fn transcribe(&self, audio: &Path) -> Result<Transcription> {
        let samples = decoder::read_file(audio)?;
        debug!("Decoded {} samples from {:?}", samples.len(), audio);

        let mut state = self.ctx.create_state()?;
        state
            .full(self.params(), &samples)
            .context("Whisper inference failed")?;

        let lang_id = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(lang_id)
            .unwrap_or("unknown")
            .to_string();

        let num_segments = state.full_n_segments();
        let mut segments = Vec::with_capacity(num_segments.max(0) as usize);

        for segment in state.as_iter() {
            let text = segment.to_str_lossy()?.to_string();
            let start = segment.start_timestamp() as f64 / TIMESTAMP_SCALE;
            let end = segment.end_timestamp() as f64 / TIMESTAMP_SCALE;

            segments.push(Segment { start, end, text });
        }

        info!(
            "Transcribed {:?}: {} segments, language {}",
            audio,
            segments.len(),
            language
        );

        Ok(Transcription::from_segments(language, segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_reported() {
        let result = Whisper::load(
            "tiny",
            Path::new("/nonexistent/ggml-tiny.bin"),
            false,
            None,
        );
        let err = result.err().expect("loading a missing model must fail");
        assert!(err.to_string().contains("not found"), "got: {}", err);
    }

    #[test]
    #[ignore] // needs a ggml model and ffmpeg; TUBESCRIBE_MODEL=/path/to/ggml-tiny.bin
    fn transcribes_a_sample_file() {
        let model_path = std::env::var("TUBESCRIBE_MODEL").unwrap();
        let audio = std::env::var("TUBESCRIBE_AUDIO").unwrap();

        let whisper = Whisper::load("tiny", Path::new(&model_path), false, None).unwrap();
        let result = whisper.transcribe(Path::new(&audio)).unwrap();

        assert!(!result.segments.is_empty());
        assert!(!result.language.is_empty());
        for s in &result.segments {
            assert!(s.start <= s.end);
        }
    }
}
