pub mod whisper_cpp;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::subtitle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64, // seconds
    pub end: f64,   // seconds
    pub text: String,
}

/// Model output for one audio file.
///
/// The SubRip rendering is not stored: [`Transcription::subtitle`] derives it
/// from `segments` every time, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub language: String,
    pub text: String,
    pub segments: Vec<Segment>,
}

impl Transcription {
    /// Builds a transcription whose full text is the concatenation of the
    /// segment texts.
    pub fn from_segments(language: impl Into<String>, segments: Vec<Segment>) -> Self {
        let text = segments.iter().map(|s| s.text.as_str()).collect();
        Self {
            language: language.into(),
            text,
            segments,
        }
    }

    pub fn subtitle(&self) -> String {
        subtitle::to_subtitle(&self.segments)
    }
}

/// A loaded speech-recognition model.
///
/// Implementations are not required to support concurrent calls; the
/// service never runs two transcriptions at once.
pub trait SpeechModel: Send + Sync {
    /// Identity used in cache keys.
    fn name(&self) -> &str;

    /// Blocking transcription of a local audio file.
    fn transcribe(&self, audio: &Path) -> Result<Transcription>;
}
