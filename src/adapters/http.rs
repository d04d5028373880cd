//! HTTP inbound adapter standing in for the chat transport.

use crate::adapters::progress::TranscriptProgress;
use crate::domain::classify::extract_url;
use crate::domain::media::{FetchResult, MediaKind};
use crate::error::PipelineError;
use crate::ports::pipeline::Pipeline;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<dyn Pipeline>,
    permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(pipeline: Arc<dyn Pipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/messages", post(messages))
        .route("/reprocess", post(reprocess))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReprocessRequest {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Delivered,
    Failed,
    /// The message carried no link
    Ignored,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub status: RunStatus,
    pub url: Option<String>,
    pub kind: Option<MediaKind>,
    pub files: Vec<String>,
    pub title: Option<String>,
    pub error: Option<String>,
    /// Every status line shown during the run
    pub transcript: Vec<String>,
}

impl RunResponse {
    fn ignored() -> Self {
        Self {
            status: RunStatus::Ignored,
            url: None,
            kind: None,
            files: Vec::new(),
            title: None,
            error: None,
            transcript: Vec::new(),
        }
    }

    fn from_run(
        url: &str,
        run: &Result<FetchResult, PipelineError>,
        transcript: Vec<String>,
    ) -> Self {
        match run {
            Ok(result) => Self {
                status: RunStatus::Delivered,
                url: Some(url.to_string()),
                kind: Some(result.kind),
                files: result
                    .files
                    .iter()
                    .map(|f| f.to_string_lossy().into_owned())
                    .collect(),
                title: result.title.clone(),
                error: None,
                transcript,
            },
            Err(e) => Self {
                status: RunStatus::Failed,
                url: Some(url.to_string()),
                kind: None,
                files: Vec::new(),
                title: None,
                error: Some(e.user_message()),
                transcript,
            },
        }
    }
}

fn status_code(run: &Result<FetchResult, PipelineError>) -> StatusCode {
    match run {
        Ok(_) => StatusCode::OK,
        Err(PipelineError::UnsupportedUrl(_)) => StatusCode::BAD_REQUEST,
        Err(PipelineError::Delivery(_)) => StatusCode::BAD_GATEWAY,
        Err(PipelineError::Workspace(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Err(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Clone, Copy)]
enum Mode {
    Handle,
    Reprocess,
}

async fn messages(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> (StatusCode, Json<RunResponse>) {
    match extract_url(&request.text) {
        Some(url) => run(&state, url, Mode::Handle).await,
        None => (StatusCode::OK, Json(RunResponse::ignored())),
    }
}

async fn reprocess(
    State(state): State<AppState>,
    Json(request): Json<ReprocessRequest>,
) -> (StatusCode, Json<RunResponse>) {
    run(&state, request.url.trim(), Mode::Reprocess).await
}

async fn run(state: &AppState, url: &str, mode: Mode) -> (StatusCode, Json<RunResponse>) {
    let Ok(_permit) = state.permits.acquire().await else {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(RunResponse::ignored()));
    };

    let progress = TranscriptProgress::new();
    info!(url, "Processing link");
    let result = match mode {
        Mode::Handle => state.pipeline.handle(url, &progress).await,
        Mode::Reprocess => state.pipeline.reprocess(url, &progress).await,
    };
    let code = status_code(&result);
    (code, Json(RunResponse::from_run(url, &result, progress.lines())))
}
