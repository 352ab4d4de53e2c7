//! 설정 관리 -- syslog-relay.toml 파싱 및 런타임 설정
//!
//! [`RelayConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, daemon에서 적용)
//! 2. 환경변수 (`SYSLOG_RELAY_LISTENER_PORT=1514` 형식)
//! 3. 설정 파일 (`syslog-relay.toml`, 선택 사항)
//! 4. 기본값 (`Default` 구현)
//!
//! 설정은 시작 시 한 번 로드되며 실행 중에는 변경되지 않습니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), syslog_relay_core::error::RelayError> {
//! use syslog_relay_core::config::RelayConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = RelayConfig::load("syslog-relay.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = RelayConfig::parse("[listener]\nlisten_port = 1514")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RelayError};

/// 환경변수 접두어
pub const ENV_PREFIX: &str = "SYSLOG_RELAY";

/// UDP 페이로드 상한 (바이트)
pub const MAX_UDP_PAYLOAD: usize = 65_535;

/// 기본 룰 ID (Cisco IOS 설정 변경 알림)
pub const DEFAULT_RULE_ID: &str = "config-change";

/// 기본 룰 패턴
pub const DEFAULT_RULE_PATTERN: &str = "%SYS-5-CONFIG_I";

/// syslog-relay 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// UDP 수신 설정
    #[serde(default)]
    pub listener: ListenerConfig,
    /// 매칭 룰 설정
    #[serde(default)]
    pub rules: RulesConfig,
    /// 이벤트 싱크 설정
    #[serde(default)]
    pub sink: SinkConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl RelayConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let mut config = Self::from_file(path).await?;
        for rejected in config.apply_env_overrides() {
            warn!(
                env_key = %rejected.key,
                value = %rejected.value,
                expected = rejected.expected,
                "failed to parse env var, ignoring"
            );
        }
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    ///
    /// CLI 오버라이드를 더 적용해야 하는 호출자가 마지막에 검증합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RelayError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, RelayError> {
        toml::from_str(toml_str).map_err(|e| {
            RelayError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SYSLOG_RELAY_{SECTION}_{FIELD}`
    /// 예: `SYSLOG_RELAY_SINK_URL=https://hooks.example.com/syslog`
    ///
    /// 목록 값(`SYSLOG_RELAY_RULES_PATTERNS`)은 쉼표로 구분합니다.
    ///
    /// 파싱할 수 없는 값은 적용하지 않고 반환합니다. 로깅이 아직 초기화되지
    /// 않았을 수 있으므로 경고 출력은 호출자가 담당합니다.
    pub fn apply_env_overrides(&mut self) -> Vec<RejectedEnvVar> {
        let mut rejected = Vec::new();
        let r = &mut rejected;

        // General
        override_string(&mut self.general.log_level, "SYSLOG_RELAY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SYSLOG_RELAY_GENERAL_LOG_FORMAT");

        // Listener
        override_string(&mut self.listener.listen_ip, "SYSLOG_RELAY_LISTENER_IP");
        override_parsed(&mut self.listener.listen_port, "SYSLOG_RELAY_LISTENER_PORT", r);
        override_parsed(&mut self.listener.max_datagram_size, "SYSLOG_RELAY_LISTENER_MAX_DATAGRAM_SIZE", r);
        override_parsed(&mut self.listener.recv_buffer_size, "SYSLOG_RELAY_LISTENER_RECV_BUFFER_SIZE", r);

        // Rules
        override_string(&mut self.rules.match_policy, "SYSLOG_RELAY_RULES_MATCH_POLICY");
        override_csv(&mut self.rules.patterns, "SYSLOG_RELAY_RULES_PATTERNS");
        override_string(&mut self.rules.rule_dir, "SYSLOG_RELAY_RULES_DIR");

        // Sink
        override_parsed(&mut self.sink.enabled, "SYSLOG_RELAY_SINK_ENABLED", r);
        override_string(&mut self.sink.kind, "SYSLOG_RELAY_SINK_KIND");
        override_string(&mut self.sink.url, "SYSLOG_RELAY_SINK_URL");
        override_string(&mut self.sink.file_path, "SYSLOG_RELAY_SINK_FILE_PATH");
        override_parsed(&mut self.sink.timeout_secs, "SYSLOG_RELAY_SINK_TIMEOUT_SECS", r);
        override_parsed(&mut self.sink.max_attempts, "SYSLOG_RELAY_SINK_MAX_ATTEMPTS", r);
        override_parsed(&mut self.sink.queue_capacity, "SYSLOG_RELAY_SINK_QUEUE_CAPACITY", r);
        override_parsed(&mut self.sink.max_concurrency, "SYSLOG_RELAY_SINK_MAX_CONCURRENCY", r);
        override_parsed(&mut self.sink.drain_grace_secs, "SYSLOG_RELAY_SINK_DRAIN_GRACE_SECS", r);

        // Metrics
        override_parsed(&mut self.metrics.enabled, "SYSLOG_RELAY_METRICS_ENABLED", r);
        override_string(&mut self.metrics.listen_addr, "SYSLOG_RELAY_METRICS_LISTEN_ADDR");
        override_parsed(&mut self.metrics.port, "SYSLOG_RELAY_METRICS_PORT", r);

        rejected
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RelayError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.listener.bind_addr()?;

        if self.listener.max_datagram_size == 0 || self.listener.max_datagram_size > MAX_UDP_PAYLOAD
        {
            return Err(invalid(
                "listener.max_datagram_size",
                format!("must be 1-{MAX_UDP_PAYLOAD}"),
            ));
        }

        if self.listener.recv_buffer_size == 0 {
            return Err(invalid(
                "listener.recv_buffer_size",
                "must be greater than 0".to_owned(),
            ));
        }

        self.rules.validate()?;
        self.sink.validate()?;

        if self.metrics.enabled {
            if self.metrics.listen_addr.parse::<IpAddr>().is_err() {
                return Err(invalid(
                    "metrics.listen_addr",
                    format!("'{}' is not a valid IP address", self.metrics.listen_addr),
                ));
            }
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must be 1-65535".to_owned()));
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// UDP 수신 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// 바인드 IP (IPv4 또는 IPv6)
    pub listen_ip: String,
    /// 바인드 포트. 514는 대부분의 OS에서 권한이 필요하므로 1514 등을 대안으로 사용
    pub listen_port: u16,
    /// 최대 데이터그램 크기 (바이트). 초과분은 잘라냅니다.
    pub max_datagram_size: usize,
    /// 커널 수신 버퍼 크기 (SO_RCVBUF, 바이트)
    pub recv_buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            listen_ip: "0.0.0.0".to_owned(),
            listen_port: 514,
            max_datagram_size: 4096,
            recv_buffer_size: 256 * 1024, // 256KB
        }
    }
}

impl ListenerConfig {
    /// 바인드할 소켓 주소를 반환합니다.
    pub fn bind_addr(&self) -> Result<SocketAddr, RelayError> {
        let ip = self.listen_ip.parse::<IpAddr>().map_err(|_| {
            invalid(
                "listener.listen_ip",
                format!("'{}' is not a valid IP address", self.listen_ip),
            )
        })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }
}

/// 매칭 룰 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// 다중 매칭 정책 (all: 룰마다 이벤트 생성, first: 첫 매칭만)
    pub match_policy: String,
    /// 이름 없는 패턴 목록. 각각 `pattern-<n>` ID를 받습니다.
    pub patterns: Vec<String>,
    /// YAML 룰 디렉토리 (빈 문자열이면 사용하지 않음)
    pub rule_dir: String,
    /// 이름 있는 룰 (`[[rules.rule]]`)
    pub rule: Vec<RuleConfig>,
}

impl RulesConfig {
    /// 설정에 직접 선언된 룰을 평가 순서대로 반환합니다.
    ///
    /// 순서: `[[rules.rule]]` 선언 순서, 그다음 `patterns`.
    /// 아무 룰도 선언되지 않았고 룰 디렉토리도 없으면 기본 룰
    /// (`config-change` = `%SYS-5-CONFIG_I`)을 사용합니다.
    pub fn inline_rules(&self) -> Vec<RuleConfig> {
        let mut rules = self.rule.clone();
        rules.extend(self.patterns.iter().enumerate().map(|(idx, pattern)| RuleConfig {
            id: format!("pattern-{}", idx + 1),
            pattern: pattern.clone(),
            description: String::new(),
            enabled: true,
        }));

        if rules.is_empty() && self.rule_dir.is_empty() {
            rules.push(RuleConfig {
                id: DEFAULT_RULE_ID.to_owned(),
                pattern: DEFAULT_RULE_PATTERN.to_owned(),
                description: "IOS configuration change notification".to_owned(),
                enabled: true,
            });
        }

        rules
    }

    /// 정책 문자열을 반환합니다. 비어 있으면 "all".
    pub fn match_policy(&self) -> &str {
        if self.match_policy.is_empty() {
            "all"
        } else {
            &self.match_policy
        }
    }

    fn validate(&self) -> Result<(), RelayError> {
        let valid_policies = ["all", "first"];
        if !valid_policies.contains(&self.match_policy()) {
            return Err(invalid(
                "rules.match_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }

        let rules = self.inline_rules();
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.id.trim().is_empty() {
                return Err(invalid("rules.rule.id", "rule id must not be empty".to_owned()));
            }
            if rule.pattern.is_empty() {
                return Err(invalid(
                    "rules.rule.pattern",
                    format!("rule '{}' has an empty pattern", rule.id),
                ));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(invalid(
                    "rules.rule.id",
                    format!("duplicate rule id '{}'", rule.id),
                ));
            }
        }

        // 룰 디렉토리가 있으면 활성 룰 존재 여부는 로딩 시점에 확인
        if self.rule_dir.is_empty() && !rules.iter().any(|r| r.enabled) {
            return Err(invalid(
                "rules",
                "at least one enabled rule must be configured".to_owned(),
            ));
        }

        Ok(())
    }
}

/// 이름 있는 매칭 룰 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// 룰 ID (MatchedEvent에 기록됨)
    pub id: String,
    /// 정규식 패턴 (라인 내 어디든 포함되면 매칭)
    pub pattern: String,
    /// 설명
    #[serde(default)]
    pub description: String,
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// 이벤트 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// 전달 활성화 여부. 비활성화 시 매칭 이벤트는 로그로만 남습니다.
    pub enabled: bool,
    /// 싱크 종류 (http, console, file)
    pub kind: String,
    /// HTTP 싱크 엔드포인트 URL
    pub url: String,
    /// 파일 싱크 경로 (JSON lines, append)
    pub file_path: String,
    /// 단일 전달 타임아웃 (초)
    pub timeout_secs: u64,
    /// 이벤트당 최대 시도 횟수 (2 = 최초 시도 + 즉시 재시도 1회)
    pub max_attempts: u32,
    /// 전달 대기 큐 용량
    pub queue_capacity: usize,
    /// 동시 전달 최대 수
    pub max_concurrency: usize,
    /// 종료 시 진행 중인 전달을 기다리는 최대 시간 (초)
    pub drain_grace_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: "http".to_owned(),
            url: String::new(),
            file_path: String::new(),
            timeout_secs: 10,
            max_attempts: 2,
            queue_capacity: 1024,
            max_concurrency: 16,
            drain_grace_secs: 5,
        }
    }
}

impl SinkConfig {
    fn validate(&self) -> Result<(), RelayError> {
        const MAX_ATTEMPTS: u32 = 10;

        // kind는 활성 여부와 무관하게 검증
        let valid_kinds = ["http", "console", "file"];
        if !valid_kinds.contains(&self.kind.as_str()) {
            return Err(invalid(
                "sink.kind",
                format!("must be one of: {}", valid_kinds.join(", ")),
            ));
        }

        if !self.enabled {
            return Ok(());
        }

        if self.kind == "http"
            && !(self.url.starts_with("http://") || self.url.starts_with("https://"))
        {
            return Err(invalid(
                "sink.url",
                "an http:// or https:// URL is required for the http sink".to_owned(),
            ));
        }

        if self.kind == "file" && self.file_path.is_empty() {
            return Err(invalid(
                "sink.file_path",
                "a file path is required for the file sink".to_owned(),
            ));
        }

        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS {
            return Err(invalid(
                "sink.max_attempts",
                format!("must be 1-{MAX_ATTEMPTS}"),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(invalid("sink.timeout_secs", "must be greater than 0".to_owned()));
        }

        if self.queue_capacity == 0 {
            return Err(invalid(
                "sink.queue_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(invalid(
                "sink.max_concurrency",
                "must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Prometheus 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 스크레이프 경로 (현재 "/metrics"만 지원)
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9514,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 파싱할 수 없어 무시된 환경변수
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEnvVar {
    /// 환경변수 이름
    pub key: String,
    /// 설정된 원래 값
    pub value: String,
    /// 기대한 타입 (`u16`, `bool`, ...)
    pub expected: &'static str,
}

impl fmt::Display for RejectedEnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?} is not a valid {}", self.key, self.value, self.expected)
    }
}

fn invalid(field: &str, reason: String) -> RelayError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str, rejected: &mut Vec<RejectedEnvVar>) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => rejected.push(RejectedEnvVar {
                key: env_key.to_owned(),
                value: val,
                expected: std::any::type_name::<T>(),
            }),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
