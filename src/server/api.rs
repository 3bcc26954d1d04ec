//! JSON handlers behind the page

use super::AppState;
use crate::annotate::AnnotatedSentence;
use crate::config::Sample;
use crate::error::CaptionError;
use crate::service::VideoInfo;
use crate::subtitle::OutputFormat;
use crate::transcribe::Segment;
use crate::validate;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const BUSY_MESSAGE: &str = "Oops! Someone else is using the model right now to transcribe \
                                another video. Please try again in a few seconds.";

/// Generic API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Error reply: a status code plus the message shown to the user.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<CaptionError> for ApiError {
    fn from(err: CaptionError) -> Self {
        let (status, message) = match &err {
            CaptionError::InvalidUrl(_) => {
                (StatusCode::BAD_REQUEST, "Invalid YouTube URL.".to_string())
            }
            CaptionError::TooLong { max, .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, validate::too_long_message(*max))
            }
            CaptionError::Busy => (StatusCode::SERVICE_UNAVAILABLE, BUSY_MESSAGE.to_string()),
            CaptionError::External(e) => {
                log::error!("Request failed: {:#}", e);
                (StatusCode::BAD_GATEWAY, format!("{:#}", e))
            }
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub text: String,
    pub format: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub language: String,
    pub text: String,
    pub srt: String,
    pub segments: Vec<Segment>,
}

/// List the sample videos
/// GET /api/samples
pub async fn list_samples(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<Sample>>> {
    Json(ApiResponse::success(state.samples.clone()))
}

/// Validate a URL and its length
/// POST /api/check
pub async fn check_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UrlRequest>,
) -> ApiResult<VideoInfo> {
    let info = state.captioner.check(req.url.trim()).await?;
    Ok(Json(ApiResponse::success(info)))
}

/// Transcribe a video (cached per model and URL)
/// POST /api/transcribe
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UrlRequest>,
) -> ApiResult<TranscribeResponse> {
    let result = state.captioner.transcribe(req.url.trim()).await?;

    Ok(Json(ApiResponse::success(TranscribeResponse {
        language: result.language.clone(),
        text: OutputFormat::Txt.render(&result),
        srt: result.subtitle(),
        segments: result.segments.clone(),
    })))
}

/// Split, translate and tag a transcript
/// POST /api/annotate
pub async fn annotate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> ApiResult<Vec<AnnotatedSentence>> {
    let sentences = state.captioner.annotate(&req.text).await?;
    Ok(Json(ApiResponse::success(sentences)))
}

/// Return the (possibly edited) text as a captions file
/// POST /api/download
pub async fn download(Json(req): Json<DownloadRequest>) -> Result<Response, ApiError> {
    let format: OutputFormat = req.format.parse().map_err(|e: anyhow::Error| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: e.to_string(),
    })?;

    let disposition = format!("attachment; filename=\"{}\"", format.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        req.text,
    )
        .into_response())
}
