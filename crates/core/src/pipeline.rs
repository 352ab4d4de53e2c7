//! 파이프라인 trait -- 라이프사이클 확장 포인트 정의

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::error::RelayError;

/// dyn 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작 중이나 일부 기능 저하 (예: 싱크 큐 포화)
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지/상태 확인 라이프사이클을 가진 모듈
///
/// `start()`는 한 번만 성공할 수 있으며, 정지 후 재시작은 지원하지 않습니다.
/// 설정 변경은 프로세스 재시작으로 반영합니다.
pub trait Pipeline: Send {
    /// 리소스를 준비하고 백그라운드 태스크를 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// 수신을 멈추고 남은 작업을 정리한 뒤 정지합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// 현재 건강 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("x".to_owned()).is_healthy());
        assert!(!HealthStatus::Degraded("x".to_owned()).is_unhealthy());
        assert!(HealthStatus::Unhealthy("x".to_owned()).is_unhealthy());
    }

    #[test]
    fn health_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(
            HealthStatus::Degraded("sink queue full".to_owned()).to_string(),
            "degraded: sink queue full"
        );
    }
}
