//! Client-side checks run before any request leaves the process.

use shared::{
    domain::IssueId,
    protocol::{CreateCommentRequest, FeatureRequest},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureForm {
    pub name: String,
    pub description: String,
}

impl FeatureForm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<FeatureRequest, ValidationError> {
        Ok(FeatureRequest {
            name: required(&self.name, "feature name")?,
            description: required(&self.description, "feature description")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    pub issue_id: String,
    pub title: String,
    pub content: String,
}

impl CommentForm {
    pub fn new(
        issue_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            issue_id: issue_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<CreateCommentRequest, ValidationError> {
        Ok(CreateCommentRequest {
            issue_id: IssueId::new(required(&self.issue_id, "issue id")?),
            title: required(&self.title, "comment title")?,
            content: required(&self.content, "comment content")?,
        })
    }
}
