use thiserror::Error;

/// Failures the presentation layer reports differently.
///
/// Everything coming out of an external collaborator (downloader, model,
/// translator, recognizer) is carried as [`CaptionError::External`].
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("video is {duration}s long, the limit is {max}s")]
    TooLong { duration: u64, max: u64 },

    #[error("the model is busy transcribing another video")]
    Busy,

    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl CaptionError {
    pub fn is_busy(&self) -> bool {
        matches!(self, CaptionError::Busy)
    }
}
