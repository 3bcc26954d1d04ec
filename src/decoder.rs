use anyhow::{Context, Result, anyhow};
use audrey::Reader;
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

/// Sample rate whisper.cpp expects.
pub const SAMPLE_RATE: u32 = 16_000;

// ffmpeg -i audio.mp3 -ar 16000 -ac 1 -c:a pcm_s16le out.wav
fn to_wav(input_path: &Path) -> Result<NamedTempFile> {
    let temp_file = NamedTempFile::with_suffix(".wav")?;
    let input = input_path
        .to_str()
        .ok_or_else(|| anyhow!("invalid path {:?}", input_path))?;
    let output = temp_file
        .path()
        .to_str()
        .ok_or_else(|| anyhow!("invalid temp path"))?;
    let rate = SAMPLE_RATE.to_string();

    debug!("Converting {:?} with ffmpeg", input_path);

    let status = Command::new("ffmpeg")
        .args([
            "-i",
            input,
            "-ar",
            rate.as_str(),
            "-ac",
            "1",
            "-c:a",
            "pcm_s16le",
            output,
            "-hide_banner",
            "-y",
            "-loglevel",
            "error",
        ])
        .stdin(Stdio::null())
        .status()
        .context("Failed to run ffmpeg")?;

    if status.success() {
        Ok(temp_file)
    } else {
        Err(anyhow!("ffmpeg could not convert {:?} ({})", input_path, status))
    }
}

/// Decodes any ffmpeg-readable file into mono f32 PCM at [`SAMPLE_RATE`].
pub fn read_file<P: AsRef<Path>>(audio_file_path: P) -> Result<Vec<f32>> {
    let temp_file = to_wav(audio_file_path.as_ref())?;
    read_wav(temp_file.reopen()?)
    // temp_file is deleted when it goes out of scope
}

fn read_wav(file: std::fs::File) -> Result<Vec<f32>> {
    let mut reader = Reader::new(file)?;
    let audio_buf: Vec<i16> = reader.samples().collect::<Result<_, _>>()?;
    let mut output = vec![0.0f32; audio_buf.len()];

    whisper_rs::convert_integer_to_float_audio(&audio_buf, &mut output)?;
    Ok(output)
}
