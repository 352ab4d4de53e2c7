//! 리스너 설정
//!
//! [`PipelineConfig`]는 core의 [`RelayConfig`]에서 리스너/룰/싱크 섹션을
//! 모아 파이프라인이 바로 쓸 수 있는 타입으로 변환한 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use syslog_relay_core::config::RelayConfig;
//! use syslog_relay_pipeline::config::PipelineConfig;
//!
//! let core_config = RelayConfig::default();
//! let config = PipelineConfig::from_core(&core_config)?;
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use syslog_relay_core::config::{MAX_UDP_PAYLOAD, RelayConfig, RuleConfig, RulesConfig};

use crate::error::RelayPipelineError;

/// 다중 매칭 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// 매칭된 룰마다 이벤트 하나씩 (기본값)
    #[default]
    All,
    /// 첫 번째로 매칭된 룰만
    First,
}

impl FromStr for MatchPolicy {
    type Err = RelayPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "first" => Ok(Self::First),
            other => Err(RelayPipelineError::Config {
                field: "rules.match_policy".to_owned(),
                reason: format!("unknown match policy '{other}'"),
            }),
        }
    }
}

/// 이벤트 싱크 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// HTTP POST 웹훅
    Http,
    /// 표준 출력 (JSON lines)
    Console,
    /// 파일 append (JSON lines)
    File,
}

impl FromStr for SinkKind {
    type Err = RelayPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "console" => Ok(Self::Console),
            "file" => Ok(Self::File),
            other => Err(RelayPipelineError::Config {
                field: "sink.kind".to_owned(),
                reason: format!("unknown sink kind '{other}'"),
            }),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Console => write!(f, "console"),
            Self::File => write!(f, "file"),
        }
    }
}

/// 싱크/디스패처 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    /// 전달 활성화 여부
    pub enabled: bool,
    /// 싱크 종류
    pub kind: SinkKind,
    /// HTTP 엔드포인트
    pub url: String,
    /// 파일 싱크 경로
    pub file_path: PathBuf,
    /// 단일 전달 타임아웃
    pub timeout: Duration,
    /// 이벤트당 최대 시도 횟수
    pub max_attempts: u32,
    /// 전달 대기 큐 용량
    pub queue_capacity: usize,
    /// 동시 전달 최대 수
    pub max_concurrency: usize,
    /// 종료 시 drain 유예 시간
    pub drain_grace: Duration,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: SinkKind::Http,
            url: String::new(),
            file_path: PathBuf::new(),
            timeout: Duration::from_secs(10),
            max_attempts: 2,
            queue_capacity: 1024,
            max_concurrency: 16,
            drain_grace: Duration::from_secs(5),
        }
    }
}

/// 리스너 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 바인드 IP
    pub listen_ip: String,
    /// 바인드 포트 (0이면 OS가 할당)
    pub listen_port: u16,
    /// 최대 데이터그램 크기
    pub max_datagram_size: usize,
    /// SO_RCVBUF 요청 크기
    pub recv_buffer_size: usize,
    /// 다중 매칭 정책
    pub match_policy: MatchPolicy,
    /// 설정 파일에 선언된 룰 (평가 순서)
    pub rules: Vec<RuleConfig>,
    /// YAML 룰 디렉토리
    pub rule_dir: Option<PathBuf>,
    /// 싱크 설정
    pub sink: SinkSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            listen_ip: "0.0.0.0".to_owned(),
            listen_port: 514,
            max_datagram_size: 4096,
            recv_buffer_size: 256 * 1024,
            match_policy: MatchPolicy::All,
            rules: RulesConfig::default().inline_rules(),
            rule_dir: None,
            sink: SinkSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// core의 `RelayConfig`에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &RelayConfig) -> Result<Self, RelayPipelineError> {
        let rule_dir = if core.rules.rule_dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(&core.rules.rule_dir))
        };

        Ok(Self {
            listen_ip: core.listener.listen_ip.clone(),
            listen_port: core.listener.listen_port,
            max_datagram_size: core.listener.max_datagram_size,
            recv_buffer_size: core.listener.recv_buffer_size,
            match_policy: core.rules.match_policy().parse()?,
            rules: core.rules.inline_rules(),
            rule_dir,
            sink: SinkSettings {
                enabled: core.sink.enabled,
                kind: core.sink.kind.parse()?,
                url: core.sink.url.clone(),
                file_path: PathBuf::from(&core.sink.file_path),
                timeout: Duration::from_secs(core.sink.timeout_secs),
                max_attempts: core.sink.max_attempts,
                queue_capacity: core.sink.queue_capacity,
                max_concurrency: core.sink.max_concurrency,
                drain_grace: Duration::from_secs(core.sink.drain_grace_secs),
            },
        })
    }

    /// 바인드할 소켓 주소를 반환합니다.
    pub fn bind_addr(&self) -> Result<SocketAddr, RelayPipelineError> {
        let ip = self
            .listen_ip
            .parse::<IpAddr>()
            .map_err(|_| RelayPipelineError::Config {
                field: "listen_ip".to_owned(),
                reason: format!("'{}' is not a valid IP address", self.listen_ip),
            })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RelayPipelineError> {
        const MAX_QUEUE_CAPACITY: usize = 1_000_000;
        const MAX_CONCURRENCY: usize = 1024;

        self.bind_addr()?;

        if self.max_datagram_size == 0 || self.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(RelayPipelineError::Config {
                field: "max_datagram_size".to_owned(),
                reason: format!("must be 1-{MAX_UDP_PAYLOAD}"),
            });
        }

        if self.recv_buffer_size == 0 {
            return Err(RelayPipelineError::Config {
                field: "recv_buffer_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.rules.is_empty() && self.rule_dir.is_none() {
            return Err(RelayPipelineError::Config {
                field: "rules".to_owned(),
                reason: "no rules configured".to_owned(),
            });
        }

        let sink = &self.sink;
        if sink.max_attempts == 0 {
            return Err(RelayPipelineError::Config {
                field: "sink.max_attempts".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        if sink.queue_capacity == 0 || sink.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(RelayPipelineError::Config {
                field: "sink.queue_capacity".to_owned(),
                reason: format!("must be 1-{MAX_QUEUE_CAPACITY}"),
            });
        }

        if sink.max_concurrency == 0 || sink.max_concurrency > MAX_CONCURRENCY {
            return Err(RelayPipelineError::Config {
                field: "sink.max_concurrency".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENCY}"),
            });
        }

        if sink.enabled {
            match sink.kind {
                SinkKind::Http
                    if !(sink.url.starts_with("http://") || sink.url.starts_with("https://")) =>
                {
                    return Err(RelayPipelineError::Config {
                        field: "sink.url".to_owned(),
                        reason: "an http:// or https:// URL is required".to_owned(),
                    });
                }
                SinkKind::File if sink.file_path.as_os_str().is_empty() => {
                    return Err(RelayPipelineError::Config {
                        field: "sink.file_path".to_owned(),
                        reason: "a file path is required".to_owned(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}
