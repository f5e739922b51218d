//! HTTP API for the study tools.
//!
//! `/api/summarize`, `/api/generate-flashcards` and `/api/chat` all resolve the
//! submitted URL, run the transcript pipeline and hand the text to the model.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::{GenerateError, summarize_failures};
use crate::llm::Generator;
use crate::pipeline::{Acquisition, Orchestrator};
use crate::summarize::{self, Flashcard, FlashcardError, TRANSCRIPT_UNAVAILABLE};
use crate::title::TitleSource;
use crate::{PipelineError, Segment, TranscriptSource, VideoId, resolve_video_id};

const INVALID_URL: &str = "Invalid YouTube URL or could not extract video ID";

/// Shared, immutable per-process state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub generator: Arc<dyn Generator>,
    pub titles: Arc<dyn TitleSource>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/summarize", post(summarize_handler))
        .route("/api/generate-flashcards", post(flashcards_handler))
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve the API until the process is stopped
pub async fn serve(addr: SocketAddr, state: AppState) -> eyre::Result<()> {
    let app = router(state);

    info!("Starting server on http://{addr}");
    info!("  POST /api/summarize");
    info!("  POST /api/generate-flashcards");
    info!("  POST /api/chat");
    info!("  GET  /health");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Errors surfaced to API callers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{error}")]
    NotFound { error: String, message: String },

    #[error("{error}")]
    Upstream { error: String, message: String },

    #[error("request cancelled")]
    Cancelled,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(error) => (StatusCode::BAD_REQUEST, json!({ "error": error })),
            ApiError::NotFound { error, message } => {
                (StatusCode::NOT_FOUND, json!({ "error": error, "message": message }))
            }
            ApiError::Upstream { error, message } => {
                (StatusCode::BAD_GATEWAY, json!({ "error": error, "message": message }))
            }
            // Client is gone; the status is only for the logs
            ApiError::Cancelled => (StatusCode::REQUEST_TIMEOUT, json!({ "error": "Request cancelled" })),
        };
        (status, Json(body)).into_response()
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Cancelled => ApiError::Cancelled,
            err => ApiError::Upstream {
                error: "Failed to generate content".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Exhausted(failures) => ApiError::NotFound {
                error: "No transcript available for this video".to_string(),
                message: summarize_failures(&failures),
            },
            PipelineError::Generation(err) => err.into(),
            PipelineError::Cancelled => ApiError::Cancelled,
        }
    }
}

impl From<FlashcardError> for ApiError {
    fn from(err: FlashcardError) -> Self {
        match err {
            FlashcardError::Generate(err) => err.into(),
            FlashcardError::InvalidData(message) => ApiError::Upstream {
                error: "Failed to parse flashcard data from AI response.".to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoRequest {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub url: Option<String>,
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub video_id: VideoId,
    pub video_title: String,
    pub transcript: Vec<Segment>,
    pub source: TranscriptSource,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_transcript: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FlashcardsResponse {
    pub flashcards: Vec<Flashcard>,
    pub video_id: VideoId,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub used_fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub video_id: VideoId,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_transcript: bool,
}

/// Resolve the `url` field or reject the request
fn require_video_id(url: Option<&str>) -> Result<VideoId, ApiError> {
    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing URL in request body".to_string()))?;
    resolve_video_id(url).ok_or_else(|| {
        warn!("Could not extract video ID from URL: {url}");
        ApiError::BadRequest(INVALID_URL.to_string())
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text())))
}

/// Token cancelled when the handler future is dropped (client disconnected)
fn request_token() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

/// POST /api/summarize
async fn summarize_handler(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let request = body(payload)?;
    let video_id = require_video_id(request.url.as_deref())?;
    info!("[/api/summarize] video {video_id}");

    let (cancel, _guard) = request_token();
    let video_title = state.titles.title(&video_id, &cancel).await;
    let acquisition = state.orchestrator.acquire(&video_id, &video_title, &cancel).await?;

    let summary = match acquisition.fallback_summary.clone() {
        Some(summary) => summary,
        None => {
            summarize::summarize(
                state.generator.as_ref(),
                &video_title,
                acquisition.result.raw_text(),
                &cancel,
            )
            .await
            .inspect_err(|e| error!("[/api/summarize] summary for {video_id} failed: {e}"))?
        }
    };

    Ok(Json(summary_response(summary, video_id, video_title, acquisition)))
}

fn summary_response(summary: String, video_id: VideoId, video_title: String, acquisition: Acquisition) -> SummaryResponse {
    SummaryResponse {
        summary,
        video_id,
        video_title,
        source: acquisition.result.source(),
        used_fallback: acquisition.used_fallback(),
        no_transcript: acquisition.no_transcript(),
        error_info: acquisition.error_info(),
        transcript: acquisition.result.segments().to_vec(),
    }
}

/// POST /api/generate-flashcards
async fn flashcards_handler(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> Result<Json<FlashcardsResponse>, ApiError> {
    let request = body(payload)?;
    let video_id = require_video_id(request.url.as_deref())?;
    info!("[/api/generate-flashcards] video {video_id}");

    let (cancel, _guard) = request_token();
    let acquisition = state.orchestrator.fetch_transcript(&video_id, &cancel).await?;
    let flashcards =
        summarize::generate_flashcards(state.generator.as_ref(), acquisition.result.raw_text(), &cancel).await?;
    info!("[/api/generate-flashcards] {} flashcards for {video_id}", flashcards.len());

    Ok(Json(FlashcardsResponse {
        flashcards,
        video_id,
        used_fallback: acquisition.used_fallback(),
    }))
}

/// POST /api/chat
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = body(payload)?;
    let question = request
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing URL or question in request body".to_string()))?
        .to_string();
    let video_id = require_video_id(request.url.as_deref())?;
    info!("[/api/chat] video {video_id}");

    let (cancel, _guard) = request_token();
    let (transcript_text, used_fallback, no_transcript) =
        match state.orchestrator.fetch_transcript(&video_id, &cancel).await {
            Ok(acquisition) => (
                acquisition.result.raw_text().to_string(),
                acquisition.used_fallback(),
                false,
            ),
            Err(PipelineError::Exhausted(failures)) => {
                warn!(
                    "[/api/chat] no transcript for {video_id}: {}",
                    summarize_failures(&failures)
                );
                (TRANSCRIPT_UNAVAILABLE.to_string(), true, true)
            }
            Err(err) => return Err(err.into()),
        };

    let answer = summarize::answer_question(state.generator.as_ref(), &transcript_text, &question, &cancel).await?;

    Ok(Json(ChatResponse {
        answer,
        video_id,
        used_fallback,
        no_transcript,
    }))
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_video_id() {
        assert!(matches!(require_video_id(None), Err(ApiError::BadRequest(msg)) if msg.contains("Missing URL")));
        assert!(matches!(require_video_id(Some("  ")), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            require_video_id(Some("not a url at all")),
            Err(ApiError::BadRequest(msg)) if msg == INVALID_URL
        ));
        assert_eq!(
            require_video_id(Some("https://youtu.be/abc123?t=30")).unwrap().as_str(),
            "abc123"
        );
    }

    #[test]
    fn test_exhausted_maps_to_not_found() {
        let err: ApiError = PipelineError::Exhausted(vec![]).into();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_generation_maps_to_bad_gateway() {
        let err: ApiError = PipelineError::Generation(GenerateError::UnexpectedResponse { provider: "Gemini" }).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
