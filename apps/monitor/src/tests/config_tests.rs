use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let pairs: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| pairs.get(key).cloned()
}

#[test]
fn defaults_leave_the_endpoint_unset() {
    let settings = Settings::default();
    assert_eq!(settings.endpoint(), None);
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn file_values_accept_integer_or_string_ports() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "host = \"10.0.0.5\"\nport = 3000\n");
    assert_eq!(settings.endpoint(), Some(("10.0.0.5".into(), 3000)));

    apply_file(&mut settings, "port = \"4000\"\nlog_filter = \"debug\"\n");
    assert_eq!(settings.port, Some(4000));
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn environment_overrides_file_and_app_prefix_wins() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "host = \"file-host\"\nport = 3000\n");
    apply_env(
        &mut settings,
        env_of(&[
            ("READINESS_HOST", "env-host"),
            ("APP__HOST", "app-host"),
            ("READINESS_PORT", "3100"),
            ("READINESS_LOG", "readiness_core=debug"),
        ]),
    );

    assert_eq!(settings.endpoint(), Some(("app-host".into(), 3100)));
    assert_eq!(settings.log_filter, "readiness_core=debug");
}

#[test]
fn unparseable_ports_are_ignored() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "port = 70000\n");
    assert_eq!(settings.port, None);

    apply_env(&mut settings, env_of(&[("APP__PORT", "not-a-port")]));
    assert_eq!(settings.port, None);
}

#[test]
fn blank_host_is_not_an_endpoint() {
    let settings = Settings {
        host: Some("   ".into()),
        port: Some(3000),
        ..Settings::default()
    };
    assert_eq!(settings.endpoint(), None);
}

#[test]
fn loads_settings_from_a_file_on_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("readiness_monitor_test_{suffix}.toml"));
    fs::write(&path, "log_filter = \"warn\"\n").expect("write config");

    let settings = load_settings(&path);
    fs::remove_file(&path).expect("cleanup");

    if env::var("READINESS_LOG").is_err() && env::var("APP__LOG_FILTER").is_err() {
        assert_eq!(settings.log_filter, "warn");
    }
}
