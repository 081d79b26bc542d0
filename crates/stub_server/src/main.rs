use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use shared::{
    domain::{IssueId, ResearchStatus, SessionId},
    error::ApiError,
    protocol::{
        CommentResponse, CommentsResponse, CreateCommentRequest, FeatureRequest, SessionSnapshot,
        StartResearchResponse,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod workflow;

use config::{load_settings, Settings};
use workflow::{run_workflow, SessionStore};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    store: Arc<SessionStore>,
    settings: Settings,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    let settings = load_settings();
    let addr: SocketAddr = settings.server_bind.parse()?;
    let state = AppState {
        store: Arc::new(SessionStore::default()),
        settings,
    };
    let app = build_router(Arc::new(state));

    info!(%addr, "stub research backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// `RUST_LOG` when set and valid, otherwise `info`.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/research", post(start_research))
        .route("/research/:session_id", get(research_status))
        .route("/comments", post(create_comment))
        .route("/comments/:issue_id", get(list_comments))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Feature Research Agent API (stub)" }))
}

async fn healthz() -> &'static str {
    "ok"
}

fn bad_request(detail: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(detail)))
}

async fn start_research(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeatureRequest>,
) -> ApiResult<StartResearchResponse> {
    if req.name.trim().is_empty() {
        return Err(bad_request("Feature name is required"));
    }
    if req.description.trim().is_empty() {
        return Err(bad_request("Feature description is required"));
    }

    let session_id = state.store.create_session(&req, Utc::now()).await;
    let fail = state
        .settings
        .failure_marker
        .as_deref()
        .is_some_and(|marker| req.name.to_lowercase().contains(&marker.to_lowercase()));
    info!(%session_id, feature = %req.name, fail, "research session started");

    tokio::spawn(run_workflow(
        state.store.clone(),
        session_id.clone(),
        req,
        state.settings.stage_delay(),
        fail,
    ));

    Ok(Json(StartResearchResponse {
        session_id,
        status: Some(ResearchStatus::Unknown("started".to_string())),
        progress: Some(0.0),
    }))
}

async fn research_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session_id = SessionId::new(session_id);
    match state.store.snapshot(&session_id).await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => {
            warn!(%session_id, "unknown research session");
            Err((
                StatusCode::NOT_FOUND,
                Json(ApiError::new("Research session not found")),
            ))
        }
    }
}

async fn create_comment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCommentRequest>,
) -> Json<CommentResponse> {
    if req.content.trim().is_empty() {
        return Json(CommentResponse {
            success: false,
            message: "Failed to create comment: Comment content cannot be empty".to_string(),
            data: None,
        });
    }

    let comment_id = state.store.add_comment(&req, Utc::now()).await;
    info!(issue_id = %req.issue_id, %comment_id, "comment created");
    Json(CommentResponse {
        success: true,
        message: "Comment created successfully".to_string(),
        data: Some(json!({ "comment_id": comment_id, "issue_id": req.issue_id })),
    })
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(issue_id): Path<String>,
) -> Json<CommentsResponse> {
    let issue_id = IssueId::new(issue_id);
    let comments = state.store.comments(&issue_id).await;
    Json(CommentsResponse {
        count: Some(comments.len()),
        issue_id: Some(issue_id),
        comments,
    })
}
