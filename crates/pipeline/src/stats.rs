//! 리스너 통계 -- 락 없는 카운터
//!
//! 수신 루프와 전달 태스크가 동시에 갱신하므로 모든 필드는 atomic입니다.
//! Prometheus 메트릭과 별개로, 레코더 없이도 테스트와 health check에서 읽을 수 있습니다.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// 리스너 통계 카운터
#[derive(Debug, Default)]
pub struct ListenerStats {
    pub(crate) received: AtomicU64,
    pub(crate) truncated: AtomicU64,
    pub(crate) decode_failures: AtomicU64,
    pub(crate) empty: AtomicU64,
    pub(crate) receive_errors: AtomicU64,
    pub(crate) matched: AtomicU64,
    pub(crate) dispatched: AtomicU64,
    pub(crate) queue_full: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) delivery_failures: AtomicU64,
}

impl ListenerStats {
    /// 현재 값을 복사합니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// 수신한 데이터그램
    pub received: u64,
    /// 최대 크기 초과로 잘린 데이터그램
    pub truncated: u64,
    /// UTF-8 디코딩 실패
    pub decode_failures: u64,
    /// 트림 후 빈 라인
    pub empty: u64,
    /// 소켓 수신 에러
    pub receive_errors: u64,
    /// 생성된 매칭 이벤트
    pub matched: u64,
    /// 싱크 큐에 들어간 이벤트
    pub dispatched: u64,
    /// 큐 포화로 버린 이벤트
    pub queue_full: u64,
    /// 전달 성공
    pub delivered: u64,
    /// 재시도 후에도 실패한 전달
    pub delivery_failures: u64,
}

impl StatsSnapshot {
    /// 큐에 들어갔지만 아직 결과가 나지 않은 이벤트 수
    pub fn in_flight(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.delivered)
            .saturating_sub(self.delivery_failures)
    }
}
