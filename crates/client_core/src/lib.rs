use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{IssueId, SessionId},
    error::detail_message,
    protocol::{
        CommentResponse, CommentsResponse, CreateCommentRequest, FeatureRequest, SessionSnapshot,
        StartResearchResponse,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub mod comments;
pub mod dashboard;
pub mod forms;
pub mod poller;
pub mod presentation;

pub use comments::CommentsPanel;
pub use dashboard::ResearchDashboard;
pub use forms::{CommentForm, FeatureForm, ValidationError};
pub use poller::{PollPhase, PollerConfig, PollerError, PollerState, StatusPoller};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const START_RESEARCH_FALLBACK: &str = "Failed to start research";
const FETCH_STATUS_FALLBACK: &str = "Failed to fetch research status";
const LIST_COMMENTS_FALLBACK: &str = "Failed to load comments";
const CREATE_COMMENT_FALLBACK: &str = "Failed to create comment";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("unexpected response from server: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Poller(#[from] PollerError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            Self::Transport(err) | Self::Decode(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// HTTP surface of the research backend.
///
/// `ResearchClient` is the production implementation; the poller, dashboard,
/// and comments panel only depend on this trait.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    async fn start_research(
        &self,
        request: &FeatureRequest,
    ) -> Result<StartResearchResponse, ClientError>;
    async fn fetch_status(&self, session_id: &SessionId) -> Result<SessionSnapshot, ClientError>;
    async fn list_comments(&self, issue_id: &IssueId) -> Result<CommentsResponse, ClientError>;
    async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<CommentResponse, ClientError>;
}

pub struct ResearchClient {
    http: Client,
    base_url: Url,
}

impl ResearchClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Parses and checks the configured API base url.
///
/// Only absolute `http`/`https` urls are accepted.
pub fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let raw = raw.trim();
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    fallback: &'static str,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        let message = detail_message(&body).unwrap_or_else(|| fallback.to_string());
        warn!(status = status.as_u16(), %message, "backend returned error response");
        return Err(ClientError::Backend {
            status: status.as_u16(),
            message,
        });
    }
    response.json::<T>().await.map_err(ClientError::Decode)
}

#[async_trait]
impl ResearchBackend for ResearchClient {
    async fn start_research(
        &self,
        request: &FeatureRequest,
    ) -> Result<StartResearchResponse, ClientError> {
        let url = self.endpoint(&["research"])?;
        debug!(%url, feature = %request.name, "submitting research request");
        let res = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(res, START_RESEARCH_FALLBACK).await
    }

    async fn fetch_status(&self, session_id: &SessionId) -> Result<SessionSnapshot, ClientError> {
        let url = self.endpoint(&["research", session_id.as_str()])?;
        debug!(%url, "fetching research status");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(res, FETCH_STATUS_FALLBACK).await
    }

    async fn list_comments(&self, issue_id: &IssueId) -> Result<CommentsResponse, ClientError> {
        let url = self.endpoint(&["comments", issue_id.as_str()])?;
        debug!(%url, "listing comments");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(res, LIST_COMMENTS_FALLBACK).await
    }

    async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<CommentResponse, ClientError> {
        let url = self.endpoint(&["comments"])?;
        debug!(%url, issue_id = %request.issue_id, "creating comment");
        let res = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(res, CREATE_COMMENT_FALLBACK).await
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
