//! Configuration precedence tests: CLI flags > environment > file > defaults.

use std::io::Write;

use clap::Parser;
use serial_test::serial;

use syslog_relay_daemon::cli::DaemonCli;

const ENV_KEYS: &[&str] = &[
    "SYSLOG_RELAY_LISTENER_PORT",
    "SYSLOG_RELAY_RULES_PATTERNS",
    "SYSLOG_RELAY_SINK_URL",
    "SYSLOG_RELAY_SINK_ENABLED",
];

fn clear_env() {
    for key in ENV_KEYS {
        // SAFETY: env-mutating tests are #[serial]
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const FILE_CONFIG: &str = r#"
[listener]
listen_port = 1514

[rules]
patterns = ["FROM-FILE"]

[sink]
enabled = true
url = "http://file.example/hook"
"#;

#[tokio::test]
#[serial]
async fn defaults_without_config_file() {
    clear_env();
    let cli = DaemonCli::parse_from(["syslog-relay-daemon"]);
    let (config, rejected) = cli.load_config().await.unwrap();

    assert_eq!(config.listener.listen_port, 514);
    assert!(!config.sink.enabled);
    assert!(rejected.is_empty());
    let rules = config.rules.inline_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].pattern, "%SYS-5-CONFIG_I");
}

#[tokio::test]
#[serial]
async fn env_overrides_file() {
    clear_env();
    let file = write_config(FILE_CONFIG);
    // SAFETY: #[serial]
    unsafe { std::env::set_var("SYSLOG_RELAY_LISTENER_PORT", "2514") };

    let cli = DaemonCli::parse_from([
        "syslog-relay-daemon",
        "--config",
        file.path().to_str().unwrap(),
    ]);
    let (config, rejected) = cli.load_config().await.unwrap();
    clear_env();

    assert_eq!(config.listener.listen_port, 2514);
    assert!(rejected.is_empty());
    assert_eq!(config.rules.patterns, vec!["FROM-FILE"]);
    assert_eq!(config.sink.url, "http://file.example/hook");
}

#[tokio::test]
#[serial]
async fn cli_overrides_env_and_file() {
    clear_env();
    let file = write_config(FILE_CONFIG);
    // SAFETY: #[serial]
    unsafe {
        std::env::set_var("SYSLOG_RELAY_LISTENER_PORT", "2514");
        std::env::set_var("SYSLOG_RELAY_RULES_PATTERNS", "FROM-ENV");
        std::env::set_var("SYSLOG_RELAY_SINK_URL", "http://env.example/hook");
    }

    let cli = DaemonCli::parse_from([
        "syslog-relay-daemon",
        "--config",
        file.path().to_str().unwrap(),
        "--listen-port",
        "3514",
        "--pattern",
        "FROM-CLI",
        "--sink-url",
        "http://cli.example/hook",
    ]);
    let (config, rejected) = cli.load_config().await.unwrap();
    clear_env();

    assert_eq!(config.listener.listen_port, 3514);
    assert!(rejected.is_empty());
    assert_eq!(config.rules.patterns, vec!["FROM-CLI"]);
    assert_eq!(config.sink.url, "http://cli.example/hook");
}

#[tokio::test]
#[serial]
async fn cli_can_disable_sink_enabled_by_env() {
    clear_env();
    // SAFETY: #[serial]
    unsafe { std::env::set_var("SYSLOG_RELAY_SINK_ENABLED", "true") };

    // enabled http sink with no URL would be invalid
    let cli = DaemonCli::parse_from(["syslog-relay-daemon"]);
    assert!(cli.load_config().await.is_err());

    let cli = DaemonCli::parse_from(["syslog-relay-daemon", "--sink-enabled", "false"]);
    let config = cli.load_config().await;
    clear_env();

    assert!(!config.unwrap().0.sink.enabled);
}

#[tokio::test]
#[serial]
async fn unparsable_env_values_are_returned_to_caller() {
    clear_env();
    // SAFETY: #[serial]
    unsafe {
        std::env::set_var("SYSLOG_RELAY_LISTENER_PORT", "15l4");
        std::env::set_var("SYSLOG_RELAY_SINK_ENABLED", "yes");
    }

    let cli = DaemonCli::parse_from(["syslog-relay-daemon"]);
    let result = cli.load_config().await;
    clear_env();

    let (config, rejected) = result.unwrap();
    assert_eq!(config.listener.listen_port, 514);
    assert!(!config.sink.enabled);

    let keys: Vec<_> = rejected.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["SYSLOG_RELAY_LISTENER_PORT", "SYSLOG_RELAY_SINK_ENABLED"]
    );
    assert_eq!(rejected[1].value, "yes");
}

#[tokio::test]
#[serial]
async fn missing_config_file_is_an_error() {
    clear_env();
    let cli = DaemonCli::parse_from([
        "syslog-relay-daemon",
        "--config",
        "/nonexistent/syslog-relay.toml",
    ]);
    let err = cli.load_config().await.unwrap_err();
    assert!(err.to_string().contains("/nonexistent/syslog-relay.toml"));
}

#[tokio::test]
#[serial]
async fn invalid_override_fails_validation() {
    clear_env();
    let cli = DaemonCli::parse_from(["syslog-relay-daemon", "--listen-ip", "not-an-ip"]);
    assert!(cli.load_config().await.is_err());
}
