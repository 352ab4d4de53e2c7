//! syslog-relay.toml 통합 설정 테스트
//!
//! - syslog-relay.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use std::io::Write;

use serial_test::serial;
use syslog_relay_core::config::RelayConfig;
use syslog_relay_core::error::{ConfigError, RelayError};

const EXAMPLE: &str = include_str!("../../../syslog-relay.toml.example");

// =============================================================================
// syslog-relay.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = RelayConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.listener.listen_port, 514);
    assert_eq!(config.listener.max_datagram_size, 4096);
    assert_eq!(config.listener.recv_buffer_size, 262_144);
}

#[test]
fn example_config_passes_validation() {
    let config = RelayConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_declares_rules_in_order() {
    let config = RelayConfig::parse(EXAMPLE).expect("should parse");
    let rules = config.rules.inline_rules();

    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].id, "config-change");
    assert!(rules[0].enabled);
    assert_eq!(rules[1].id, "interface-down");
    assert!(!rules[1].enabled);
    assert_eq!(
        rules[1].pattern,
        r"%LINK-3-UPDOWN: Interface \S+, changed state to down"
    );
}

#[test]
fn example_config_has_correct_sink_defaults() {
    let config = RelayConfig::parse(EXAMPLE).expect("should parse");

    assert!(!config.sink.enabled);
    assert_eq!(config.sink.kind, "http");
    assert_eq!(config.sink.timeout_secs, 10);
    assert_eq!(config.sink.max_attempts, 2);
    assert_eq!(config.sink.queue_capacity, 1024);
    assert_eq!(config.sink.max_concurrency, 16);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn listener_only_config_keeps_other_defaults() {
    let config = RelayConfig::parse(
        r#"
[listener]
listen_ip = "::"
listen_port = 1514
"#,
    )
    .expect("should parse");

    assert_eq!(config.listener.bind_addr().unwrap().to_string(), "[::]:1514");
    assert_eq!(config.rules.inline_rules()[0].id, "config-change");
    assert!(!config.sink.enabled);
    config.validate().expect("should validate");
}

#[test]
fn unknown_field_type_mismatch_is_parse_error() {
    let err = RelayConfig::parse("[listener]\nlisten_port = \"high\"").unwrap_err();
    assert!(matches!(
        err,
        RelayError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 파일 로딩 + 환경변수 우선순위
// =============================================================================

#[tokio::test]
#[serial]
async fn load_applies_env_over_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[listener]\nlisten_port = 1514\n\n[sink]\nenabled = true\nkind = \"console\""
    )
    .expect("write");

    // SAFETY: serial_test로 환경변수를 조작하는 테스트를 직렬화합니다.
    unsafe { std::env::set_var("SYSLOG_RELAY_LISTENER_PORT", "2514") };
    let result = RelayConfig::load(file.path()).await;
    unsafe { std::env::remove_var("SYSLOG_RELAY_LISTENER_PORT") };

    let config = result.expect("should load");
    assert_eq!(config.listener.listen_port, 2514);
    assert_eq!(config.sink.kind, "console");
}

#[tokio::test]
#[serial]
async fn load_rejects_invalid_env_value_after_merge() {
    let file = tempfile::NamedTempFile::new().expect("temp file");

    // SAFETY: serial_test로 환경변수를 조작하는 테스트를 직렬화합니다.
    unsafe { std::env::set_var("SYSLOG_RELAY_RULES_MATCH_POLICY", "sometimes") };
    let result = RelayConfig::load(file.path()).await;
    unsafe { std::env::remove_var("SYSLOG_RELAY_RULES_MATCH_POLICY") };

    let err = result.unwrap_err();
    assert!(err.to_string().contains("rules.match_policy"));
}

#[tokio::test]
async fn empty_file_loads_defaults() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let config = RelayConfig::from_file(file.path()).await.expect("should load");
    assert_eq!(config.listener.listen_port, 514);
}
