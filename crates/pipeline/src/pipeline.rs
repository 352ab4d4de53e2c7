//! 리스너 오케스트레이션 -- 수신/디코딩/분류/전달의 전체 흐름을 관리합니다.
//!
//! [`SyslogListener`]는 core의 [`Pipeline`](syslog_relay_core::pipeline::Pipeline) trait을 구현하여
//! `syslog-relay-daemon`에서 start/stop/health_check 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! UdpReceiver -> decode -> EventClassifier -> DispatchHandle -> mpsc -> SinkDispatcher -> EventSink
//! ```
//!
//! # 상태 전이
//! ```text
//! Starting --start()--> Running --stop()--> Draining --> Stopped
//!     \--start() 실패-----------------------------------> Stopped
//! ```
//! 재시작은 지원하지 않습니다.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use syslog_relay_core::error::{PipelineError, RelayError};
use syslog_relay_core::metrics as m;
use syslog_relay_core::pipeline::{HealthStatus, Pipeline};

use crate::collector::{Datagram, UdpReceiver, UdpReceiverConfig};
use crate::config::PipelineConfig;
use crate::decoder::{DecodeOutcome, decode};
use crate::error::RelayPipelineError;
use crate::rule::EventClassifier;
use crate::sink::{DispatchHandle, DispatcherConfig, EventSink, SinkDispatcher, build_sink};
use crate::stats::{ListenerStats, StatsSnapshot};

/// 리스너 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// 생성됨, 아직 시작하지 않음
    Starting,
    /// 수신 중
    Running,
    /// 수신 중단, 남은 전달 처리 중
    Draining,
    /// 정지됨 (종료 상태)
    Stopped,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// syslog 리스너 -- 수신/디코딩/분류/전달의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use syslog_relay_pipeline::SyslogListenerBuilder;
///
/// let mut listener = SyslogListenerBuilder::new()
///     .config(config)
///     .build()?;
///
/// listener.start().await?;
/// // ...
/// listener.stop().await?;
/// ```
pub struct SyslogListener {
    /// 리스너 설정
    config: PipelineConfig,
    /// 현재 상태
    state: ListenerState,
    /// 외부에서 주입한 싱크 (없으면 설정으로 생성)
    sink_override: Option<Arc<dyn EventSink>>,
    /// 통계 카운터
    stats: Arc<ListenerStats>,
    /// 수신 루프 취소 토큰
    cancel: CancellationToken,
    /// 수신 루프 태스크
    receive_task: Option<JoinHandle<()>>,
    /// 싱크 디스패처 (싱크 비활성 시 None)
    dispatcher: Option<SinkDispatcher>,
    /// 실제 바인드 주소
    local_addr: Option<SocketAddr>,
    /// 활성 룰 수
    rule_count: usize,
    /// 직전 health check 시점의 큐 드롭 수
    seen_queue_full: AtomicU64,
    /// 직전 health check 시점의 전달 실패 수
    seen_failures: AtomicU64,
}

impl SyslogListener {
    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// 실제 바인드된 주소를 반환합니다 (시작 전에는 None).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// 통계 스냅샷을 반환합니다.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// 활성 룰 수를 반환합니다 (시작 전에는 0).
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// 리스너 설정을 반환합니다.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn try_start(&mut self) -> Result<(), RelayPipelineError> {
        // 1. 룰 로드 및 컴파일
        let classifier = Arc::new(EventClassifier::load(&self.config).await?);
        self.rule_count = classifier.rule_count();

        // 2. 싱크 준비
        let sink = match self.sink_override.take() {
            Some(sink) => Some(sink),
            None if self.config.sink.enabled => Some(build_sink(&self.config.sink).await?),
            None => {
                tracing::info!("event sink disabled, matched events will only be logged");
                None
            }
        };

        // 3. 소켓 바인드
        let receiver = UdpReceiver::bind(&UdpReceiverConfig {
            bind_addr: self.config.bind_addr()?,
            recv_buffer_size: self.config.recv_buffer_size,
            max_datagram_size: self.config.max_datagram_size,
        })?;
        self.local_addr = Some(receiver.local_addr());

        // 4. 디스패처 + 수신 루프 스폰
        let dispatcher = sink.map(|sink| {
            SinkDispatcher::spawn(
                sink,
                DispatcherConfig::from(&self.config.sink),
                Arc::clone(&self.stats),
            )
        });
        let handle = dispatcher.as_ref().map(SinkDispatcher::handle);
        self.dispatcher = dispatcher;

        self.receive_task = Some(tokio::spawn(receive_loop(
            receiver,
            classifier,
            handle,
            Arc::clone(&self.stats),
            self.cancel.clone(),
        )));

        Ok(())
    }
}

impl Pipeline for SyslogListener {
    async fn start(&mut self) -> Result<(), RelayError> {
        if self.state != ListenerState::Starting {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!("starting syslog listener");

        if let Err(e) = self.try_start().await {
            self.state = ListenerState::Stopped;
            self.cancel.cancel();
            tracing::error!(error = %e, "syslog listener failed to start");
            return Err(e.into());
        }

        self.state = ListenerState::Running;
        tracing::info!(
            addr = ?self.local_addr,
            rules = self.rule_count,
            sink = self.dispatcher.as_ref().map(SinkDispatcher::sink_name),
            "syslog listener started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RelayError> {
        if self.state != ListenerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        self.state = ListenerState::Draining;
        tracing::info!("stopping syslog listener");

        // 1. 수신 루프 중단 (루프 종료 시 소켓과 dispatch 핸들이 drop됨)
        self.cancel.cancel();
        if let Some(task) = self.receive_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "receive loop task failed");
            }
        }

        // 2. 큐에 남은 전달 처리 (graceful drain)
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown().await;
        }

        self.state = ListenerState::Stopped;
        let stats = self.stats.snapshot();
        tracing::info!(
            received = stats.received,
            matched = stats.matched,
            delivered = stats.delivered,
            delivery_failures = stats.delivery_failures,
            queue_full = stats.queue_full,
            "syslog listener stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ListenerState::Running => {
                if self
                    .receive_task
                    .as_ref()
                    .is_none_or(JoinHandle::is_finished)
                {
                    return HealthStatus::Unhealthy("receive loop terminated".to_owned());
                }

                let stats = self.stats.snapshot();
                let dropped = stats.queue_full.saturating_sub(
                    self.seen_queue_full.swap(stats.queue_full, Ordering::Relaxed),
                );
                let failed = stats.delivery_failures.saturating_sub(
                    self.seen_failures
                        .swap(stats.delivery_failures, Ordering::Relaxed),
                );

                if dropped > 0 {
                    HealthStatus::Degraded(format!(
                        "sink queue full: {dropped} events dropped since last check"
                    ))
                } else if failed > 0 {
                    HealthStatus::Degraded(format!(
                        "{failed} deliveries failed since last check"
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            ListenerState::Starting => HealthStatus::Unhealthy("not started".to_owned()),
            ListenerState::Draining => HealthStatus::Unhealthy("draining".to_owned()),
            ListenerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 수신 루프 -- 취소될 때까지 데이터그램을 처리합니다.
///
/// `recv_from`에서만 대기합니다. 디코딩과 분류는 동기 처리이고,
/// 전달은 디스패처 큐로 넘기므로 수신을 막지 않습니다.
async fn receive_loop(
    mut receiver: UdpReceiver,
    classifier: Arc<EventClassifier>,
    dispatch: Option<DispatchHandle>,
    stats: Arc<ListenerStats>,
    cancel: CancellationToken,
) {
    while let Some(result) = receiver.recv(&cancel).await {
        match result {
            Ok(datagram) => {
                process_datagram(&datagram, &classifier, dispatch.as_ref(), &stats);
            }
            Err(e) => {
                ListenerStats::incr(&stats.receive_errors);
                metrics::counter!(m::LISTENER_RECEIVE_ERRORS_TOTAL).increment(1);
                tracing::debug!(error = %e, "udp receive error");
            }
        }
    }

    tracing::debug!("receive loop stopped");
}

/// 데이터그램 하나를 디코딩/분류/전달합니다. 생성된 이벤트 수를 반환합니다.
///
/// 데이터그램마다 독립적으로 처리되며, 어떤 실패도 다음 데이터그램에 영향을 주지 않습니다.
pub fn process_datagram(
    datagram: &Datagram,
    classifier: &EventClassifier,
    dispatch: Option<&DispatchHandle>,
    stats: &ListenerStats,
) -> usize {
    ListenerStats::incr(&stats.received);
    metrics::counter!(m::LISTENER_DATAGRAMS_RECEIVED_TOTAL).increment(1);

    if datagram.truncated {
        ListenerStats::incr(&stats.truncated);
        metrics::counter!(m::LISTENER_DATAGRAMS_TRUNCATED_TOTAL).increment(1);
        tracing::debug!(sender = %datagram.sender, "datagram truncated to maximum size");
    }

    let line = match decode(datagram) {
        DecodeOutcome::Line(line) => line,
        DecodeOutcome::Invalid => {
            ListenerStats::incr(&stats.decode_failures);
            metrics::counter!(m::LISTENER_DECODE_FAILURES_TOTAL).increment(1);
            tracing::debug!(
                sender = %datagram.sender,
                len = datagram.payload.len(),
                "dropping datagram with invalid UTF-8"
            );
            return 0;
        }
        DecodeOutcome::Empty => {
            ListenerStats::incr(&stats.empty);
            metrics::counter!(m::LISTENER_EMPTY_LINES_TOTAL).increment(1);
            return 0;
        }
    };

    let events = classifier.classify(&line);
    let count = events.len();

    for event in events {
        ListenerStats::incr(&stats.matched);
        metrics::counter!(m::LISTENER_EVENTS_MATCHED_TOTAL, m::LABEL_RULE => event.rule_id.clone())
            .increment(1);
        tracing::info!(
            event_id = %event.id,
            rule_id = %event.rule_id,
            "matched event {event}"
        );

        if let Some(dispatch) = dispatch {
            dispatch.dispatch(event);
        }
    }

    count
}

/// 리스너 빌더
pub struct SyslogListenerBuilder {
    config: PipelineConfig,
    sink: Option<Arc<dyn EventSink>>,
}

impl SyslogListenerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            sink: None,
        }
    }

    /// 리스너 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 싱크를 직접 지정합니다.
    ///
    /// 지정하면 `sink.enabled`/`sink.kind` 설정과 무관하게 이 싱크로 전달합니다.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 리스너를 빌드합니다. 소켓, 태스크는 `start()`에서 생성됩니다.
    pub fn build(self) -> Result<SyslogListener, RelayPipelineError> {
        self.config.validate()?;

        Ok(SyslogListener {
            config: self.config,
            state: ListenerState::Starting,
            sink_override: self.sink,
            stats: Arc::new(ListenerStats::default()),
            cancel: CancellationToken::new(),
            receive_task: None,
            dispatcher: None,
            local_addr: None,
            rule_count: 0,
            seen_queue_full: AtomicU64::new(0),
            seen_failures: AtomicU64::new(0),
        })
    }
}

impl Default for SyslogListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchPolicy;
    use crate::rule::MatchRule;

    fn loopback_config() -> PipelineConfig {
        PipelineConfig {
            listen_ip: "127.0.0.1".to_owned(),
            listen_port: 0,
            ..Default::default()
        }
    }

    fn classifier() -> EventClassifier {
        EventClassifier::new(
            vec![
                MatchRule::new("config-change", "%SYS-5-CONFIG_I"),
                MatchRule::new("sys", "%SYS-"),
            ],
            MatchPolicy::All,
        )
        .unwrap()
    }

    fn datagram(bytes: &[u8], truncated: bool) -> Datagram {
        Datagram::new(bytes.to_vec(), "10.0.0.5:514".parse().unwrap(), truncated)
    }

    #[test]
    fn builder_creates_listener_in_starting_state() {
        let listener = SyslogListenerBuilder::new().build().unwrap();
        assert_eq!(listener.state(), ListenerState::Starting);
        assert!(listener.local_addr().is_none());
        assert_eq!(listener.rule_count(), 0);
    }

    #[test]
    fn builder_with_invalid_config_fails() {
        let config = PipelineConfig {
            max_datagram_size: 0,
            ..Default::default()
        };
        assert!(SyslogListenerBuilder::new().config(config).build().is_err());
    }

    #[test]
    fn process_counts_match_per_rule() {
        let stats = ListenerStats::default();
        let n = process_datagram(
            &datagram(b"%SYS-5-CONFIG_I: Configured", false),
            &classifier(),
            None,
            &stats,
        );
        assert_eq!(n, 2);
        let snap = stats.snapshot();
        assert_eq!(snap.received, 1);
        assert_eq!(snap.matched, 2);
        assert_eq!(snap.dispatched, 0);
    }

    #[test]
    fn process_drops_invalid_and_empty() {
        let stats = ListenerStats::default();
        let c = classifier();
        assert_eq!(process_datagram(&datagram(b"\xff\xfe", false), &c, None, &stats), 0);
        assert_eq!(process_datagram(&datagram(b"   ", false), &c, None, &stats), 0);
        let snap = stats.snapshot();
        assert_eq!(snap.received, 2);
        assert_eq!(snap.decode_failures, 1);
        assert_eq!(snap.empty, 1);
        assert_eq!(snap.matched, 0);
    }

    #[test]
    fn process_counts_truncated() {
        let stats = ListenerStats::default();
        process_datagram(&datagram(b"%SYS-5-CONFIG_I", true), &classifier(), None, &stats);
        assert_eq!(stats.snapshot().truncated, 1);
        assert_eq!(stats.snapshot().matched, 2);
    }

    #[tokio::test]
    async fn lifecycle_start_stop() {
        let mut listener = SyslogListenerBuilder::new()
            .config(loopback_config())
            .build()
            .unwrap();

        assert!(listener.health_check().await.is_unhealthy());
        assert!(listener.stop().await.is_err());

        listener.start().await.unwrap();
        assert_eq!(listener.state(), ListenerState::Running);
        assert!(listener.local_addr().is_some());
        assert_eq!(listener.rule_count(), 1);
        assert!(listener.health_check().await.is_healthy());

        listener.stop().await.unwrap();
        assert_eq!(listener.state(), ListenerState::Stopped);
        assert!(listener.health_check().await.is_unhealthy());
    }

    #[tokio::test]
    async fn restart_is_rejected() {
        let mut listener = SyslogListenerBuilder::new()
            .config(loopback_config())
            .build()
            .unwrap();
        listener.start().await.unwrap();
        assert!(listener.start().await.is_err());
        listener.stop().await.unwrap();
        assert!(listener.start().await.is_err());
        assert!(listener.stop().await.is_err());
    }

    #[tokio::test]
    async fn failed_start_moves_to_stopped() {
        let config = PipelineConfig {
            rule_dir: Some("/nonexistent/syslog-relay/rules".into()),
            ..loopback_config()
        };
        let mut listener = SyslogListenerBuilder::new().config(config).build().unwrap();

        assert!(listener.start().await.is_err());
        assert_eq!(listener.state(), ListenerState::Stopped);
        assert!(listener.start().await.is_err());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = PipelineConfig {
            listen_port: taken.local_addr().unwrap().port(),
            ..loopback_config()
        };
        let mut listener = SyslogListenerBuilder::new().config(config).build().unwrap();

        let err = listener.start().await.unwrap_err();
        assert!(matches!(err, RelayError::Pipeline(PipelineError::Bind { .. })));
        assert_eq!(listener.state(), ListenerState::Stopped);
    }

    #[test]
    fn state_display() {
        assert_eq!(ListenerState::Starting.to_string(), "starting");
        assert_eq!(ListenerState::Draining.to_string(), "draining");
    }
}
