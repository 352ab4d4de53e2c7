//! 파이프라인 에러 타입
//!
//! [`RelayPipelineError`]는 리스너 구성/시작 단계에서 발생하는 에러를 표현합니다.
//! `From<RelayPipelineError> for RelayError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! [`SinkError`]는 개별 이벤트 전달 실패입니다. 디스패처가 로그로 남기고
//! 흡수하므로 리스너 밖으로 전파되지 않습니다.

use std::time::Duration;

use syslog_relay_core::error::{ConfigError, PipelineError, RelayError};

/// 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RelayPipelineError {
    /// UDP 소켓 바인드 실패
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// 바인드 주소
        addr: String,
        /// 실패 사유
        reason: String,
    },

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 또는 디렉토리 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 싱크 초기화 실패 (HTTP 클라이언트 생성, 파일 열기 등)
    #[error("sink init error: {sink}: {reason}")]
    SinkInit {
        /// 싱크 이름
        sink: String,
        /// 실패 사유
        reason: String,
    },
}

impl From<RelayPipelineError> for RelayError {
    fn from(err: RelayPipelineError) -> Self {
        match err {
            RelayPipelineError::Bind { addr, reason } => {
                RelayError::Pipeline(PipelineError::Bind { addr, reason })
            }
            RelayPipelineError::Config { field, reason } => {
                RelayError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => RelayError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

/// 단일 이벤트 전달 실패
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 2xx가 아닌 HTTP 응답
    #[error("unexpected status {status}")]
    Status {
        /// HTTP 상태 코드
        status: u16,
    },

    /// 연결 실패, DNS 실패 등 전송 계층 에러
    #[error("transport error: {0}")]
    Transport(String),

    /// 요청 타임아웃
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// 페이로드 직렬화 실패
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 출력 I/O 에러 (console, file)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
