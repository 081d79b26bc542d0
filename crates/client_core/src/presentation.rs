//! Maps poller state to what a dashboard shows.

use chrono::{DateTime, Utc};
use shared::{domain::ResearchStatus, protocol::SessionSnapshot};

use crate::poller::{PollPhase, PollerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Loading,
    Empty,
    InProgress,
    Success,
    Failure,
    Stuck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusAction {
    ViewFullAnalysis,
    OpenInLinear { issue_id: Option<String> },
    Retry,
}

impl StatusAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ViewFullAnalysis => "View Full Analysis",
            Self::OpenInLinear { .. } => "Open in Linear",
            Self::Retry => "Retry",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub tone: Tone,
    pub headline: String,
    pub status: Option<ResearchStatus>,
    /// `round(progress)`.
    pub percent: i64,
    /// Bar fill in percent, `progress` clamped to `[0, 100]`.
    pub bar_width: f64,
    pub error_banner: Option<String>,
    pub feature_name: Option<String>,
    pub actions: Vec<StatusAction>,
}

impl StatusView {
    fn bare(tone: Tone, headline: impl Into<String>) -> Self {
        Self {
            tone,
            headline: headline.into(),
            status: None,
            percent: 0,
            bar_width: 0.0,
            error_banner: None,
            feature_name: None,
            actions: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.tone, Tone::Success | Tone::Failure | Tone::Stuck)
    }

    pub fn has_action(&self, label: &str) -> bool {
        self.actions.iter().any(|action| action.label() == label)
    }
}

pub fn status_label(status: &ResearchStatus) -> &'static str {
    match status.presented() {
        ResearchStatus::SettingUp => "Setting up research tools",
        ResearchStatus::Researching => "Researching the feature",
        ResearchStatus::CreatingPrd => "Writing the product requirements document",
        ResearchStatus::CreatingLinearIssue => "Creating Linear issue and tasks",
        ResearchStatus::Completed => "Research complete",
        ResearchStatus::Failed => "Research failed",
        ResearchStatus::Initializing | ResearchStatus::Unknown(_) => {
            "Initializing research session"
        }
    }
}

pub fn progress_percent(progress: f64) -> i64 {
    if progress.is_finite() {
        progress.round() as i64
    } else {
        0
    }
}

pub fn progress_width(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub fn view_snapshot(snapshot: &SessionSnapshot) -> StatusView {
    let status = snapshot.status.presented();
    let summary = snapshot.result_summary().unwrap_or_default();
    let mut view = StatusView {
        tone: Tone::InProgress,
        headline: status_label(&status).to_string(),
        status: Some(status.clone()),
        percent: progress_percent(snapshot.progress),
        bar_width: progress_width(snapshot.progress),
        error_banner: None,
        feature_name: summary.feature_name,
        actions: Vec::new(),
    };

    match status {
        ResearchStatus::Completed => {
            view.tone = Tone::Success;
            view.actions = vec![
                StatusAction::ViewFullAnalysis,
                StatusAction::OpenInLinear {
                    issue_id: summary.linear_issue_id,
                },
            ];
        }
        ResearchStatus::Failed => {
            view.tone = Tone::Failure;
            view.error_banner = Some(
                snapshot
                    .error
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Research failed".to_string()),
            );
            view.actions = vec![StatusAction::Retry];
        }
        _ => {}
    }
    view
}

pub fn view_state(state: &PollerState) -> StatusView {
    let Some(snapshot) = state.snapshot.as_ref() else {
        if state.loading {
            return StatusView::bare(Tone::Loading, "Loading research session");
        }
        if state.phase == PollPhase::Idle {
            return StatusView::bare(Tone::Empty, "No research session");
        }
        let mut view = StatusView::bare(Tone::Empty, "No session data");
        view.error_banner = Some(
            state
                .last_error
                .clone()
                .unwrap_or_else(|| "Research session not found".to_string()),
        );
        if state.phase == PollPhase::Stuck {
            view.actions = vec![StatusAction::Retry];
        }
        return view;
    };

    let mut view = view_snapshot(snapshot);
    if state.phase == PollPhase::Stuck && !snapshot.is_terminal() {
        view.tone = Tone::Stuck;
        view.headline = "Research appears stuck".to_string();
        view.error_banner = Some(format!(
            "No terminal status after {} status checks; last status was '{}'",
            state.polls_issued, snapshot.status
        ));
        view.actions = vec![StatusAction::Retry];
    }
    view
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M UTC").to_string()
}

#[cfg(test)]
#[path = "tests/presentation_tests.rs"]
mod tests;
