use super::*;

fn cfg(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_apply_without_overrides() {
    let settings = resolve_settings(&HashMap::new(), &HashMap::new());
    assert_eq!(settings.server_bind, "127.0.0.1:8000");
    assert_eq!(settings.stage_delay(), Duration::from_millis(1500));
    assert_eq!(settings.failure_marker.as_deref(), Some("fail"));
}

#[test]
fn environment_overrides_file() {
    let file = cfg(&[("bind_addr", "0.0.0.0:9000"), ("stage_delay_ms", "250")]);
    let env = cfg(&[("APP__BIND_ADDR", "127.0.0.1:9100")]);

    let settings = resolve_settings(&file, &env);

    assert_eq!(settings.server_bind, "127.0.0.1:9100");
    assert_eq!(settings.stage_delay_ms, 250);
}

#[test]
fn unparsable_delay_is_ignored_and_blank_marker_disables_failures() {
    let env = cfg(&[("APP__STAGE_DELAY_MS", "soon"), ("APP__FAILURE_MARKER", " ")]);

    let settings = resolve_settings(&HashMap::new(), &env);

    assert_eq!(settings.stage_delay_ms, 1500);
    assert!(settings.failure_marker.is_none());
}
