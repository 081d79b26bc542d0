//! Issue comments panel: list comments for an issue and post new ones.

use std::sync::Arc;

use shared::{
    domain::IssueId,
    protocol::{Comment, CommentResponse},
};
use tracing::{info, warn};

use crate::{forms::CommentForm, ClientError, ResearchBackend};

pub struct CommentsPanel {
    backend: Arc<dyn ResearchBackend>,
    issue_id: Option<IssueId>,
    comments: Vec<Comment>,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
}

impl CommentsPanel {
    pub fn new(backend: Arc<dyn ResearchBackend>) -> Self {
        Self {
            backend,
            issue_id: None,
            comments: Vec::new(),
            loading: false,
            error: None,
            notice: None,
        }
    }

    pub fn issue_id(&self) -> Option<&IssueId> {
        self.issue_id.as_ref()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Loads the comments of `issue_id`, replacing the current list.
    pub async fn load(&mut self, issue_id: impl Into<IssueId>) -> Result<usize, ClientError> {
        let issue_id = issue_id.into();
        if issue_id.is_blank() {
            let err = ClientError::Validation(crate::ValidationError::MissingField {
                field: "issue id",
            });
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.loading = true;
        let outcome = self.backend.list_comments(&issue_id).await;
        self.loading = false;

        match outcome {
            Ok(response) => {
                info!(%issue_id, count = response.comments.len(), "comments loaded");
                self.issue_id = Some(issue_id);
                self.comments = response.comments;
                self.error = None;
                Ok(self.comments.len())
            }
            Err(err) => {
                warn!(%issue_id, error = %err, "failed to load comments");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn refresh(&mut self) -> Result<usize, ClientError> {
        match self.issue_id.clone() {
            Some(issue_id) => self.load(issue_id).await,
            None => Ok(0),
        }
    }

    /// Validates and posts a comment, then reloads the issue's comments.
    ///
    /// Invalid input never reaches the backend. A response with
    /// `success == false` is reported as `ClientError::Rejected`.
    pub async fn submit(&mut self, form: &CommentForm) -> Result<CommentResponse, ClientError> {
        self.notice = None;
        let request = match form.validate() {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };

        let response = match self.backend.create_comment(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(issue_id = %request.issue_id, error = %err, "failed to create comment");
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        if !response.success {
            warn!(issue_id = %request.issue_id, message = %response.message, "backend rejected comment");
            self.error = Some(response.message.clone());
            return Err(ClientError::Rejected(response.message));
        }

        info!(issue_id = %request.issue_id, "comment created");
        self.error = None;
        self.notice = Some(response.message.clone());
        // A failed reload is recorded on the panel; the comment itself was created.
        let _ = self.load(request.issue_id).await;
        Ok(response)
    }
}

#[cfg(test)]
#[path = "tests/comments_tests.rs"]
mod tests;
