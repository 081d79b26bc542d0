use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{IssueId, ResearchStatus, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResearchResponse {
    pub session_id: SessionId,
    #[serde(default)]
    pub status: Option<ResearchStatus>,
    #[serde(default)]
    pub progress: Option<f64>,
}

/// Latest known state of a research session, replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    #[serde(default)]
    pub status: ResearchStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn result_summary(&self) -> Option<ResearchResultSummary> {
        let result = self.result.as_ref()?;
        Some(ResearchResultSummary {
            feature_name: string_field(result, "feature_name"),
            notion_page_id: string_field(result, "notion_page_id"),
            linear_issue_id: string_field(result, "linear_issue_id"),
            analysis: result.get("analysis").filter(|v| !v.is_null()).cloned(),
        })
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lenient view over the opaque `result` payload of a completed session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResearchResultSummary {
    pub feature_name: Option<String>,
    pub notion_page_id: Option<String>,
    pub linear_issue_id: Option<String>,
    pub analysis: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(
        default,
        alias = "createdAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CommentAuthor>,
}

impl Comment {
    pub fn author_name(&self) -> Option<&str> {
        self.user.as_ref()?.name.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub issue_id: IssueId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
