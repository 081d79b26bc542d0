use super::*;
use crate::test_support::snapshot;
use chrono::TimeZone;

fn state_with(snapshot: Option<SessionSnapshot>, phase: PollPhase) -> PollerState {
    let mut state = PollerState::default();
    state.session_id = Some("abc-123".into());
    state.snapshot = snapshot;
    state.phase = phase;
    state
}

#[test]
fn percent_is_rounded_and_width_follows_progress() {
    for (progress, percent, width) in [
        (0.0, 0, 0.0),
        (33.4, 33, 33.4),
        (33.6, 34, 33.6),
        (62.5, 63, 62.5),
        (100.0, 100, 100.0),
    ] {
        let view = view_snapshot(&snapshot("abc-123", "researching", progress));
        assert_eq!(view.percent, percent, "progress {progress}");
        assert_eq!(view.bar_width, width, "progress {progress}");
    }
}

#[test]
fn out_of_range_progress_is_clamped_for_the_bar_only() {
    let view = view_snapshot(&snapshot("abc-123", "researching", 140.0));
    assert_eq!(view.percent, 140);
    assert_eq!(view.bar_width, 100.0);

    let view = view_snapshot(&snapshot("abc-123", "researching", f64::NAN));
    assert_eq!(view.percent, 0);
    assert_eq!(view.bar_width, 0.0);
}

#[test]
fn in_progress_snapshot_has_no_terminal_actions() {
    let view = view_snapshot(&snapshot("abc-123", "researching", 40.0));
    assert_eq!(view.tone, Tone::InProgress);
    assert_eq!(view.status, Some(ResearchStatus::Researching));
    assert!(view.actions.is_empty());
    assert!(view.error_banner.is_none());
    assert!(!view.is_terminal());
}

#[test]
fn completed_snapshot_offers_analysis_and_linear_actions() {
    let mut completed = snapshot("abc-123", "completed", 100.0);
    completed.result = Some(serde_json::json!({ "feature_name": "X" }));
    let view = view_snapshot(&completed);

    assert_eq!(view.tone, Tone::Success);
    assert_eq!(view.feature_name.as_deref(), Some("X"));
    assert!(view.has_action("View Full Analysis"));
    assert!(view.has_action("Open in Linear"));
    assert!(view.actions.contains(&StatusAction::OpenInLinear { issue_id: None }));
}

#[test]
fn failed_snapshot_shows_error_banner_and_retry() {
    let mut failed = snapshot("abc-123", "failed", 30.0);
    failed.error = Some("boom".to_string());
    let view = view_snapshot(&failed);

    assert_eq!(view.tone, Tone::Failure);
    assert_eq!(view.error_banner.as_deref(), Some("boom"));
    assert_eq!(view.actions, vec![StatusAction::Retry]);
}

#[test]
fn failed_snapshot_without_message_uses_generic_banner() {
    let view = view_snapshot(&snapshot("abc-123", "failed", 30.0));
    assert_eq!(view.error_banner.as_deref(), Some("Research failed"));
}

#[test]
fn unknown_status_presents_as_initializing() {
    let view = view_snapshot(&snapshot("abc-123", "started", 0.0));
    assert_eq!(view.status, Some(ResearchStatus::Initializing));
    assert_eq!(view.headline, "Initializing research session");
    assert_eq!(view.tone, Tone::InProgress);
}

#[test]
fn loading_and_missing_session_are_distinguishable() {
    let mut loading = state_with(None, PollPhase::Polling);
    loading.loading = true;
    assert_eq!(view_state(&loading).tone, Tone::Loading);

    let mut missing = state_with(None, PollPhase::Polling);
    missing.last_error = Some("Research session not found".to_string());
    let view = view_state(&missing);
    assert_eq!(view.tone, Tone::Empty);
    assert_eq!(view.headline, "No session data");
    assert_eq!(
        view.error_banner.as_deref(),
        Some("Research session not found")
    );
}

#[test]
fn stuck_session_offers_retry() {
    let mut stuck = state_with(
        Some(snapshot("abc-123", "researching", 30.0)),
        PollPhase::Stuck,
    );
    stuck.polls_issued = 900;
    let view = view_state(&stuck);

    assert_eq!(view.tone, Tone::Stuck);
    assert!(view.is_terminal());
    assert_eq!(view.actions, vec![StatusAction::Retry]);
    assert_eq!(view.percent, 30);
}

#[test]
fn timestamps_are_formatted_for_humans() {
    let at = Utc
        .with_ymd_and_hms(2025, 3, 4, 10, 15, 0)
        .single()
        .expect("valid timestamp");
    assert_eq!(format_timestamp(&at), "Mar 4, 2025 10:15 UTC");
}
