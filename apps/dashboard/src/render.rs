//! Plain-text rendering of dashboard state for the terminal.

use client_core::presentation::{format_timestamp, StatusAction, StatusView, Tone};
use shared::protocol::Comment;

pub const BAR_CELLS: usize = 30;

pub fn progress_bar(view: &StatusView, cells: usize) -> String {
    let filled = ((view.bar_width / 100.0) * cells as f64).round() as usize;
    let filled = filled.min(cells);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(cells - filled))
}

fn action_label(action: &StatusAction) -> String {
    match action {
        StatusAction::OpenInLinear {
            issue_id: Some(issue_id),
        } => format!("{} ({issue_id})", action.label()),
        other => other.label().to_string(),
    }
}

pub fn render_status(view: &StatusView) -> String {
    let mut lines = vec![view.headline.clone()];
    match view.tone {
        Tone::Loading | Tone::Empty => {}
        _ => lines.push(format!(
            "{} {:>3}%",
            progress_bar(view, BAR_CELLS),
            view.percent
        )),
    }
    if let Some(feature) = &view.feature_name {
        lines.push(format!("Feature: {feature}"));
    }
    if let Some(error) = &view.error_banner {
        lines.push(format!("Error: {error}"));
    }
    if !view.actions.is_empty() {
        let actions = view
            .actions
            .iter()
            .map(action_label)
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(format!("Actions: {actions}"));
    }
    lines.join("\n")
}

pub fn render_comment(comment: &Comment) -> String {
    let author = comment.author_name().unwrap_or("Unknown");
    let header = match &comment.created_at {
        Some(at) => format!("{author} on {}", format_timestamp(at)),
        None => author.to_string(),
    };
    let body = comment
        .body
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{header}\n{body}")
}

pub fn render_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments yet".to_string();
    }
    comments
        .iter()
        .map(render_comment)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
