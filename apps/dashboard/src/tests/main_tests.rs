use std::time::Duration;

use super::*;

fn settled(phase: PollPhase) -> PollerState {
    let mut state = PollerState::default();
    state.phase = phase;
    state
}

#[test]
fn comment_create_requires_title_flag() {
    let err = Cli::try_parse_from([
        "dashboard",
        "comments",
        "create",
        "PRA-8",
        "--content",
        "Looks good",
    ])
    .expect_err("missing --title");
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

    let cli = Cli::try_parse_from([
        "dashboard",
        "comments",
        "create",
        "PRA-8",
        "--title",
        "Review",
        "--content",
        "Looks good",
    ])
    .expect("parse");
    let Command::Comments(CommentsCommand::Create { title, .. }) = cli.command else {
        panic!("expected comments create");
    };
    let request = CommentForm::new("PRA-8", title, "Looks good")
        .validate()
        .expect("valid form");
    assert_eq!(request.title, "Review");
}

#[tokio::test]
async fn settled_state_ends_rendering() {
    let (_tx, rx) = watch::channel(settled(PollPhase::Stopped));
    let mut out = Vec::new();

    let state = render_until_settled(rx, std::future::pending(), &mut out)
        .await
        .expect("render")
        .expect("settled state");

    assert_eq!(state.phase, PollPhase::Stopped);
    assert!(String::from_utf8(out).expect("utf8").starts_with("No session data"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_resolving_mid_poll_stops_rendering() {
    let mut polling = PollerState::default();
    polling.phase = PollPhase::Polling;
    polling.loading = true;
    let (tx, rx) = watch::channel(polling);
    let mut out = Vec::new();

    let outcome = render_until_settled(
        rx,
        tokio::time::sleep(Duration::from_secs(5)),
        &mut out,
    )
    .await
    .expect("render");

    assert!(outcome.is_none());
    drop(tx);
    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        "Loading research session\n\n"
    );
}

#[tokio::test]
async fn closed_update_channel_is_an_error() {
    let (tx, rx) = watch::channel(PollerState::default());
    drop(tx);
    let mut out = Vec::new();

    // The initial value still renders before the stream ends.
    let err = render_until_settled(rx, std::future::pending(), &mut out)
        .await
        .expect_err("stream ended");
    assert!(err.to_string().contains("ended unexpectedly"));
}
