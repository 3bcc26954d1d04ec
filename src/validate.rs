use std::sync::LazyLock;

use regex::Regex;

use crate::error::CaptionError;

/// Longest video accepted for transcription, in seconds.
pub const MAX_VIDEO_LENGTH: u64 = 10 * 60;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((https?://)?)(www\.)?((youtube\.com/)|(youtu.be/))\S+").expect("valid regex")
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/|/shorts/)([A-Za-z0-9_-]+)").expect("valid regex")
});

/// Relaxed check for a youtube.com / youtu.be link, with or without scheme
/// and `www.`. The pattern is searched, not anchored.
pub fn valid_url(url: &str) -> bool {
    YOUTUBE_URL.is_match(url)
}

/// Video id used for the embedded player.
pub fn video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

pub fn check_duration(duration: u64, max: u64) -> Result<(), CaptionError> {
    if duration <= max {
        Ok(())
    } else {
        Err(CaptionError::TooLong { duration, max })
    }
}

/// Copy shown to the user when a video is over the limit.
pub fn too_long_message(max: u64) -> String {
    if max % 60 == 0 {
        format!("Sorry, the video has to be shorter than or equal to {} minutes.", max / 60)
    } else {
        format!("Sorry, the video has to be shorter than or equal to {} seconds.", max)
    }
}
