//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `syslog_relay_`
//! - 영역: `listener_`, `sink_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! 레코더가 설치되지 않은 상태(테스트, 메트릭 비활성화)에서는
//! 매크로 호출이 아무 일도 하지 않습니다.

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 룰 ID 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 싱크 이름 레이블 키 (http, console, file)
pub const LABEL_SINK: &str = "sink";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Listener 메트릭 ────────────────────────────────────────────────

/// Listener: 수신한 데이터그램 수 (counter)
pub const LISTENER_DATAGRAMS_RECEIVED_TOTAL: &str =
    "syslog_relay_listener_datagrams_received_total";

/// Listener: 최대 크기를 넘어 잘린 데이터그램 수 (counter)
pub const LISTENER_DATAGRAMS_TRUNCATED_TOTAL: &str =
    "syslog_relay_listener_datagrams_truncated_total";

/// Listener: UTF-8 디코딩 실패로 버린 데이터그램 수 (counter)
pub const LISTENER_DECODE_FAILURES_TOTAL: &str = "syslog_relay_listener_decode_failures_total";

/// Listener: 트림 후 빈 라인 수 (counter)
pub const LISTENER_EMPTY_LINES_TOTAL: &str = "syslog_relay_listener_empty_lines_total";

/// Listener: 소켓 수신 에러 수 (counter)
pub const LISTENER_RECEIVE_ERRORS_TOTAL: &str = "syslog_relay_listener_receive_errors_total";

/// Listener: 룰 매칭으로 생성된 이벤트 수 (counter, label: rule)
pub const LISTENER_EVENTS_MATCHED_TOTAL: &str = "syslog_relay_listener_events_matched_total";

// ─── Sink 메트릭 ────────────────────────────────────────────────────

/// Sink: 전달 결과별 이벤트 수 (counter, labels: sink, result)
pub const SINK_DELIVERIES_TOTAL: &str = "syslog_relay_sink_deliveries_total";

/// Sink: 재시도 횟수 (counter, label: sink)
pub const SINK_RETRIES_TOTAL: &str = "syslog_relay_sink_retries_total";

/// Sink: 큐 포화로 버린 이벤트 수 (counter)
pub const SINK_QUEUE_DROPPED_TOTAL: &str = "syslog_relay_sink_queue_dropped_total";

/// Sink: 큐에 대기 중인 이벤트 수 (gauge)
pub const SINK_QUEUE_DEPTH: &str = "syslog_relay_sink_queue_depth";

/// Sink: 단일 전달 소요 시간 (histogram, 초)
pub const SINK_DELIVERY_DURATION_SECONDS: &str = "syslog_relay_sink_delivery_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "syslog_relay_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "syslog_relay_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 싱크 전달 지연 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 30s 범위 (HTTP 타임아웃 포함)
pub const DELIVERY_DURATION_BUCKETS: [f64; 10] =
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Listener
    describe_counter!(
        LISTENER_DATAGRAMS_RECEIVED_TOTAL,
        "Total number of UDP datagrams received"
    );
    describe_counter!(
        LISTENER_DATAGRAMS_TRUNCATED_TOTAL,
        "Total number of datagrams truncated to the maximum accepted size"
    );
    describe_counter!(
        LISTENER_DECODE_FAILURES_TOTAL,
        "Total number of datagrams dropped because they were not valid UTF-8"
    );
    describe_counter!(
        LISTENER_EMPTY_LINES_TOTAL,
        "Total number of datagrams that were empty after trimming"
    );
    describe_counter!(
        LISTENER_RECEIVE_ERRORS_TOTAL,
        "Total number of socket receive errors"
    );
    describe_counter!(
        LISTENER_EVENTS_MATCHED_TOTAL,
        "Total number of matched events per rule"
    );

    // Sink
    describe_counter!(
        SINK_DELIVERIES_TOTAL,
        "Total number of sink deliveries by result"
    );
    describe_counter!(SINK_RETRIES_TOTAL, "Total number of sink delivery retries");
    describe_counter!(
        SINK_QUEUE_DROPPED_TOTAL,
        "Total number of matched events dropped because the sink queue was full"
    );
    describe_gauge!(
        SINK_QUEUE_DEPTH,
        "Current number of matched events waiting for delivery"
    );
    describe_histogram!(
        SINK_DELIVERY_DURATION_SECONDS,
        "Time to deliver a single matched event in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "syslog-relay daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
