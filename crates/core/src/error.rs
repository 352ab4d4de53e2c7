//! 에러 타입 -- 도메인별 에러 정의
//!
//! 시작 단계 에러(설정, 바인드)만 프로세스를 종료시킵니다.
//! 정상 운영 중의 디코딩/전달 실패는 각 컴포넌트가 로그로 남기고 흡수합니다.

/// syslog-relay 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 라이프사이클 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 라이프사이클 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중이거나 이미 한 번 시작된 리스너
    #[error("pipeline already started")]
    AlreadyRunning,

    /// 실행 중이 아닌 리스너를 정지하려 함
    #[error("pipeline not running")]
    NotRunning,

    /// 소켓 바인드 실패 (포트 사용 중, 권한 부족 등)
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// 초기화 실패 (룰 로딩, 싱크 생성 등)
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}
