use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::transcribe::{Segment, Transcription};

/// Seconds to a SubRip timestamp, `HH:MM:SS,mmm`.
///
/// Rounded to whole milliseconds before splitting, so minutes and seconds
/// stay in `[0, 60)` even when rounding carries into the next field.
pub fn format_timestamp(t: f64) -> String {
    let total_ms = (t * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// SubRip serialization: one block per segment, numbered from 1, blocks
/// separated by a blank line.
pub fn to_subtitle(segments: &[Segment]) -> String {
    let mut lines = Vec::with_capacity(segments.len() * 3);

    for (i, segment) in segments.iter().enumerate() {
        lines.push((i + 1).to_string());
        lines.push(format!(
            "{} --> {}",
            format_timestamp(segment.start),
            format_timestamp(segment.end)
        ));
        lines.push(format!("{}\n", segment.text.trim()));
    }

    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Srt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Srt => "srt",
        }
    }

    pub fn file_name(&self) -> String {
        format!("captions.{}", self.extension())
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "text/plain; charset=utf-8",
            OutputFormat::Srt => "application/x-subrip; charset=utf-8",
        }
    }

    pub fn render(&self, transcription: &Transcription) -> String {
        match self {
            OutputFormat::Txt => transcription.text.trim().to_string(),
            OutputFormat::Srt => transcription.subtitle(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" => Ok(OutputFormat::Txt),
            "srt" => Ok(OutputFormat::Srt),
            other => Err(anyhow!("unsupported output format '{}'", other)),
        }
    }
}
