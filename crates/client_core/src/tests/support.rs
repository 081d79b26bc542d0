use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{IssueId, ResearchStatus, SessionId},
    protocol::{
        Comment, CommentResponse, CommentsResponse, CreateCommentRequest, FeatureRequest,
        SessionSnapshot, StartResearchResponse,
    },
};

use crate::{ClientError, ResearchBackend};

pub fn snapshot(session_id: &str, status: &str, progress: f64) -> SessionSnapshot {
    SessionSnapshot {
        session_id: SessionId::new(session_id),
        status: ResearchStatus::parse(status),
        progress,
        result: None,
        error: None,
    }
}

#[derive(Clone)]
pub enum Scripted {
    Snapshot {
        delay: Duration,
        snapshot: SessionSnapshot,
    },
    Failure {
        delay: Duration,
        message: String,
    },
}

impl Scripted {
    pub fn ok(snapshot: SessionSnapshot) -> Self {
        Self::Snapshot {
            delay: Duration::ZERO,
            snapshot,
        }
    }

    pub fn delayed(delay: Duration, snapshot: SessionSnapshot) -> Self {
        Self::Snapshot { delay, snapshot }
    }

    pub fn fail(message: &str) -> Self {
        Self::Failure {
            delay: Duration::ZERO,
            message: message.to_string(),
        }
    }
}

/// Scripted in-memory backend. Status responses are served in call order;
/// once the script runs out the last entry repeats.
#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    status_calls: Mutex<Vec<SessionId>>,
    start_replies: Mutex<VecDeque<Result<String, String>>>,
    start_requests: Mutex<Vec<FeatureRequest>>,
    comments: Mutex<Vec<Comment>>,
    list_calls: Mutex<Vec<IssueId>>,
    comment_reply: Mutex<Option<CommentResponse>>,
    created: Mutex<Vec<CreateCommentRequest>>,
}

impl FakeBackend {
    pub fn with_script(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        let backend = Self::default();
        *backend.script.lock().expect("lock") = script.into_iter().collect();
        Arc::new(backend)
    }

    pub fn push_start_reply(&self, reply: Result<&str, &str>) {
        self.start_replies
            .lock()
            .expect("lock")
            .push_back(reply.map(str::to_string).map_err(str::to_string));
    }

    pub fn set_comments(&self, comments: Vec<Comment>) {
        *self.comments.lock().expect("lock") = comments;
    }

    pub fn set_comment_reply(&self, reply: CommentResponse) {
        *self.comment_reply.lock().expect("lock") = Some(reply);
    }

    pub fn status_calls(&self) -> Vec<SessionId> {
        self.status_calls.lock().expect("lock").clone()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().expect("lock").len()
    }

    pub fn start_requests(&self) -> Vec<FeatureRequest> {
        self.start_requests.lock().expect("lock").clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().expect("lock").len()
    }

    pub fn created(&self) -> Vec<CreateCommentRequest> {
        self.created.lock().expect("lock").clone()
    }

    fn next_scripted(&self) -> Option<Scripted> {
        let next = self.script.lock().expect("lock").pop_front();
        let mut last = self.last.lock().expect("lock");
        match next {
            Some(item) => {
                *last = Some(item.clone());
                Some(item)
            }
            None => last.clone(),
        }
    }
}

#[async_trait]
impl ResearchBackend for FakeBackend {
    async fn start_research(
        &self,
        request: &FeatureRequest,
    ) -> Result<StartResearchResponse, ClientError> {
        self.start_requests
            .lock()
            .expect("lock")
            .push(request.clone());
        let reply = self
            .start_replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok("session-1".to_string()));
        match reply {
            Ok(session_id) => Ok(StartResearchResponse {
                session_id: SessionId::new(session_id),
                status: Some(ResearchStatus::parse("started")),
                progress: Some(0.0),
            }),
            Err(message) => Err(ClientError::Backend {
                status: 500,
                message,
            }),
        }
    }

    async fn fetch_status(&self, session_id: &SessionId) -> Result<SessionSnapshot, ClientError> {
        self.status_calls
            .lock()
            .expect("lock")
            .push(session_id.clone());
        match self.next_scripted() {
            Some(Scripted::Snapshot { delay, snapshot }) => {
                tokio::time::sleep(delay).await;
                Ok(SessionSnapshot {
                    session_id: session_id.clone(),
                    ..snapshot
                })
            }
            Some(Scripted::Failure { delay, message }) => {
                tokio::time::sleep(delay).await;
                Err(ClientError::Backend {
                    status: 503,
                    message,
                })
            }
            None => Err(ClientError::Backend {
                status: 404,
                message: "Research session not found".to_string(),
            }),
        }
    }

    async fn list_comments(&self, issue_id: &IssueId) -> Result<CommentsResponse, ClientError> {
        self.list_calls.lock().expect("lock").push(issue_id.clone());
        let comments = self.comments.lock().expect("lock").clone();
        Ok(CommentsResponse {
            issue_id: Some(issue_id.clone()),
            count: Some(comments.len()),
            comments,
        })
    }

    async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<CommentResponse, ClientError> {
        self.created.lock().expect("lock").push(request.clone());
        let reply = self.comment_reply.lock().expect("lock").clone();
        Ok(reply.unwrap_or_else(|| CommentResponse {
            success: true,
            message: "Comment created successfully".to_string(),
            data: None,
        }))
    }
}
