//! In-memory research sessions that walk through the workflow stages on a timer.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shared::{
    domain::{IssueId, ResearchStatus, SessionId},
    protocol::{Comment, CommentAuthor, CreateCommentRequest, FeatureRequest, SessionSnapshot},
};
use tokio::sync::RwLock;
use tracing::info;

/// Intermediate stages and the progress reported while in them.
pub const STAGES: [(ResearchStatus, f64); 4] = [
    (ResearchStatus::SettingUp, 10.0),
    (ResearchStatus::Researching, 30.0),
    (ResearchStatus::CreatingPrd, 60.0),
    (ResearchStatus::CreatingLinearIssue, 80.0),
];

#[derive(Debug, Clone)]
struct SessionRecord {
    status: ResearchStatus,
    progress: f64,
    result: Option<Value>,
    error: Option<String>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
    comments: RwLock<HashMap<IssueId, Vec<Comment>>>,
    next_issue: AtomicU64,
    next_comment: AtomicU64,
}

pub fn session_id_for(name: &str, now: DateTime<Utc>) -> SessionId {
    SessionId::new(format!(
        "research_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        name.replace(' ', "_")
    ))
}

impl SessionStore {
    pub async fn create_session(&self, request: &FeatureRequest, now: DateTime<Utc>) -> SessionId {
        let base = session_id_for(&request.name, now);
        let mut sessions = self.sessions.write().await;
        let mut session_id = base.clone();
        let mut suffix = 1;
        while sessions.contains_key(&session_id) {
            suffix += 1;
            session_id = SessionId::new(format!("{base}_{suffix}"));
        }
        sessions.insert(
            session_id.clone(),
            SessionRecord {
                status: ResearchStatus::Initializing,
                progress: 0.0,
                result: None,
                error: None,
            },
        );
        session_id
    }

    pub async fn snapshot(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        let record = sessions.get(session_id)?;
        Some(SessionSnapshot {
            session_id: session_id.clone(),
            status: record.status.clone(),
            progress: record.progress,
            result: record.result.clone(),
            error: record.error.clone(),
        })
    }

    async fn update(&self, session_id: &SessionId, apply: impl FnOnce(&mut SessionRecord)) {
        if let Some(record) = self.sessions.write().await.get_mut(session_id) {
            apply(record);
        }
    }

    pub async fn comments(&self, issue_id: &IssueId) -> Vec<Comment> {
        self.comments
            .read()
            .await
            .get(issue_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn add_comment(&self, request: &CreateCommentRequest, now: DateTime<Utc>) -> String {
        let id = format!("comment-{}", self.next_comment.fetch_add(1, Ordering::Relaxed) + 1);
        let title = if request.title.trim().is_empty() {
            "No title"
        } else {
            request.title.trim()
        };
        let comment = Comment {
            id: Some(id.clone()),
            body: format!("**{title}**\n\n{}", request.content),
            created_at: Some(now),
            user: Some(CommentAuthor {
                name: Some("Research Agent".to_string()),
            }),
        };
        self.comments
            .write()
            .await
            .entry(request.issue_id.clone())
            .or_default()
            .push(comment);
        id
    }

    fn next_issue_id(&self) -> String {
        format!("STUB-{}", self.next_issue.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

fn stub_analysis(request: &FeatureRequest) -> Value {
    json!({
        "feature_name": request.name,
        "description": request.description,
        "research_sources": [],
        "market_analysis": "Generated by the stub backend; no research was performed.",
        "technical_considerations": [],
        "implementation_approaches": [],
        "risks_and_challenges": [],
        "success_metrics": [],
        "recommendations": "Run against the real backend for a full analysis."
    })
}

/// Advances `session_id` through every stage, one `step` apart.
pub async fn run_workflow(
    store: Arc<SessionStore>,
    session_id: SessionId,
    request: FeatureRequest,
    step: Duration,
    fail: bool,
) {
    for (index, (status, progress)) in STAGES.iter().enumerate() {
        tokio::time::sleep(step).await;
        if fail && index == 2 {
            info!(%session_id, "stub workflow failing on request");
            store
                .update(&session_id, |record| {
                    record.status = ResearchStatus::Failed;
                    record.error = Some(format!(
                        "Research failed for '{}': stub failure requested",
                        request.name
                    ));
                })
                .await;
            return;
        }
        store
            .update(&session_id, |record| {
                record.status = status.clone();
                record.progress = *progress;
            })
            .await;
    }

    tokio::time::sleep(step).await;
    let issue_id = store.next_issue_id();
    let result = json!({
        "feature_name": request.name,
        "analysis": stub_analysis(&request),
        "notion_page_id": null,
        "linear_issue_id": issue_id,
    });
    store
        .update(&session_id, |record| {
            record.status = ResearchStatus::Completed;
            record.progress = 100.0;
            record.result = Some(result);
        })
        .await;
    info!(%session_id, %issue_id, "stub workflow completed");
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
