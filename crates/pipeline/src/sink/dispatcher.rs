//! 싱크 디스패처 -- 전달을 수신 경로에서 분리합니다.
//!
//! # 내부 아키텍처
//! ```text
//! receive loop --try_send--> mpsc(queue_capacity) --> worker --spawn--> deliver (semaphore)
//! ```
//!
//! - 큐가 가득 차면 이벤트를 버리고 카운트합니다. 수신 루프는 절대 기다리지 않습니다.
//! - 전달은 이벤트마다 별도 태스크에서 실행되며 `max_concurrency`로 제한됩니다.
//! - 실패 시 `max_attempts`까지 즉시 재시도한 뒤 경고 로그와 함께 버립니다.
//! - 전달 순서는 보장하지 않습니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use syslog_relay_core::event::MatchedEvent;
use syslog_relay_core::metrics as m;

use super::EventSink;
use crate::config::SinkSettings;
use crate::stats::ListenerStats;

/// 디스패처 설정
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 큐 용량
    pub queue_capacity: usize,
    /// 동시 전달 최대 수
    pub max_concurrency: usize,
    /// 이벤트당 최대 시도 횟수
    pub max_attempts: u32,
    /// 종료 시 drain 유예 시간
    pub drain_grace: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrency: 16,
            max_attempts: 2,
            drain_grace: Duration::from_secs(5),
        }
    }
}

impl From<&SinkSettings> for DispatcherConfig {
    fn from(settings: &SinkSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            max_concurrency: settings.max_concurrency,
            max_attempts: settings.max_attempts,
            drain_grace: settings.drain_grace,
        }
    }
}

/// 수신 루프가 이벤트를 넘기는 핸들
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<MatchedEvent>,
    stats: Arc<ListenerStats>,
}

impl DispatchHandle {
    /// 이벤트를 큐에 넣습니다. 큐가 가득 찼거나 닫혔으면 버리고 `false`를 반환합니다.
    pub fn dispatch(&self, event: MatchedEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                ListenerStats::incr(&self.stats.dispatched);
                metrics::gauge!(m::SINK_QUEUE_DEPTH).increment(1.0);
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                ListenerStats::incr(&self.stats.queue_full);
                metrics::counter!(m::SINK_QUEUE_DROPPED_TOTAL).increment(1);
                tracing::warn!(
                    event_id = %event.id,
                    rule_id = %event.rule_id,
                    sender = %event.sender,
                    "sink queue full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(event_id = %event.id, "sink queue closed, dropping event");
                false
            }
        }
    }
}

/// 싱크 디스패처
pub struct SinkDispatcher {
    tx: mpsc::Sender<MatchedEvent>,
    worker: JoinHandle<()>,
    sink_name: String,
    drain_grace: Duration,
    stats: Arc<ListenerStats>,
}

impl SinkDispatcher {
    /// 워커 태스크를 시작합니다. tokio 런타임 안에서 호출해야 합니다.
    pub fn spawn(
        sink: Arc<dyn EventSink>,
        config: DispatcherConfig,
        stats: Arc<ListenerStats>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let sink_name = sink.name().to_owned();

        let worker = tokio::spawn(run_worker(
            rx,
            sink,
            Arc::new(Semaphore::new(config.max_concurrency)),
            config.max_attempts,
            Arc::clone(&stats),
        ));

        tracing::debug!(
            sink = %sink_name,
            queue_capacity = config.queue_capacity,
            max_concurrency = config.max_concurrency,
            max_attempts = config.max_attempts,
            "sink dispatcher started"
        );

        Self {
            tx,
            worker,
            sink_name,
            drain_grace: config.drain_grace,
            stats,
        }
    }

    /// 수신 루프용 핸들을 만듭니다.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            tx: self.tx.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// 싱크 이름
    pub fn sink_name(&self) -> &str {
        &self.sink_name
    }

    /// 큐를 닫고 남은 전달을 유예 시간까지 기다립니다.
    ///
    /// 모든 [`DispatchHandle`]이 먼저 drop되어야 큐가 닫힙니다.
    /// 유예 시간이 지나면 남은 전달을 중단하고 `false`를 반환합니다.
    pub async fn shutdown(self) -> bool {
        let Self {
            tx,
            mut worker,
            sink_name,
            drain_grace,
            stats,
        } = self;
        drop(tx);

        match tokio::time::timeout(drain_grace, &mut worker).await {
            Ok(Ok(())) => {
                tracing::debug!(sink = %sink_name, "sink dispatcher drained");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(sink = %sink_name, error = %e, "sink worker failed");
                false
            }
            Err(_) => {
                // worker가 소유한 JoinSet이 drop되며 진행 중인 전달도 중단됨
                worker.abort();
                tracing::warn!(
                    sink = %sink_name,
                    grace_secs = drain_grace.as_secs_f64(),
                    abandoned = stats.snapshot().in_flight(),
                    "drain grace period expired, aborting remaining deliveries"
                );
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<MatchedEvent>,
    sink: Arc<dyn EventSink>,
    semaphore: Arc<Semaphore>,
    max_attempts: u32,
    stats: Arc<ListenerStats>,
) {
    let mut tasks = JoinSet::new();

    while let Some(event) = rx.recv().await {
        metrics::gauge!(m::SINK_QUEUE_DEPTH).decrement(1.0);

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        tasks.spawn(deliver_with_retry(
            Arc::clone(&sink),
            event,
            max_attempts,
            Arc::clone(&stats),
            permit,
        ));

        // 끝난 태스크 정리
        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
}

async fn deliver_with_retry(
    sink: Arc<dyn EventSink>,
    event: MatchedEvent,
    max_attempts: u32,
    stats: Arc<ListenerStats>,
    _permit: OwnedSemaphorePermit,
) {
    let sink_name = sink.name().to_owned();

    for attempt in 1..=max_attempts {
        let started = Instant::now();
        let result = sink.deliver(&event).await;
        metrics::histogram!(m::SINK_DELIVERY_DURATION_SECONDS, m::LABEL_SINK => sink_name.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                ListenerStats::incr(&stats.delivered);
                metrics::counter!(
                    m::SINK_DELIVERIES_TOTAL,
                    m::LABEL_SINK => sink_name.clone(),
                    m::LABEL_RESULT => "success"
                )
                .increment(1);
                tracing::debug!(
                    event_id = %event.id,
                    rule_id = %event.rule_id,
                    sink = %sink_name,
                    attempt,
                    "event delivered"
                );
                return;
            }
            Err(e) if attempt < max_attempts => {
                metrics::counter!(m::SINK_RETRIES_TOTAL, m::LABEL_SINK => sink_name.clone())
                    .increment(1);
                tracing::debug!(
                    event_id = %event.id,
                    sink = %sink_name,
                    attempt,
                    error = %e,
                    "delivery failed, retrying"
                );
            }
            Err(e) => {
                ListenerStats::incr(&stats.delivery_failures);
                metrics::counter!(
                    m::SINK_DELIVERIES_TOTAL,
                    m::LABEL_SINK => sink_name.clone(),
                    m::LABEL_RESULT => "failure"
                )
                .increment(1);
                tracing::warn!(
                    event_id = %event.id,
                    rule_id = %event.rule_id,
                    sender = %event.sender,
                    sink = %sink_name,
                    attempts = attempt,
                    error = %e,
                    "delivery failed, dropping event"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;
    use syslog_relay_core::event::SyslogLine;
    use syslog_relay_core::pipeline::BoxFuture;

    use crate::error::SinkError;

    /// 처음 `fail_first`번은 실패하고 이후 성공하는 싱크
    struct FlakySink {
        calls: AtomicU32,
        fail_first: u32,
        delay: Duration,
    }

    impl FlakySink {
        fn new(fail_first: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first,
                delay: Duration::ZERO,
            }
        }
    }

    impl EventSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        fn deliver<'a>(&'a self, _event: &'a MatchedEvent) -> BoxFuture<'a, Result<(), SinkError>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if n < self.fail_first {
                    Err(SinkError::Status { status: 503 })
                } else {
                    Ok(())
                }
            })
        }
    }

    fn event() -> MatchedEvent {
        let line = SyslogLine::new("%SYS-5-CONFIG_I", "10.0.0.5".parse().unwrap(), Utc::now());
        MatchedEvent::new(&line, "config-change")
    }

    #[tokio::test]
    async fn delivers_and_drains() {
        let sink = Arc::new(FlakySink::new(0));
        let stats = Arc::new(ListenerStats::default());
        let dispatcher = SinkDispatcher::spawn(
            sink.clone(),
            DispatcherConfig::default(),
            Arc::clone(&stats),
        );

        let handle = dispatcher.handle();
        for _ in 0..5 {
            assert!(handle.dispatch(event()));
        }
        drop(handle);

        assert!(dispatcher.shutdown().await);
        let snap = stats.snapshot();
        assert_eq!(snap.dispatched, 5);
        assert_eq!(snap.delivered, 5);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let sink = Arc::new(FlakySink::new(1));
        let stats = Arc::new(ListenerStats::default());
        let dispatcher = SinkDispatcher::spawn(
            sink.clone(),
            DispatcherConfig::default(),
            Arc::clone(&stats),
        );

        let handle = dispatcher.handle();
        handle.dispatch(event());
        drop(handle);
        dispatcher.shutdown().await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.snapshot().delivered, 1);
        assert_eq!(stats.snapshot().delivery_failures, 0);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let sink = Arc::new(FlakySink::new(u32::MAX));
        let stats = Arc::new(ListenerStats::default());
        let dispatcher = SinkDispatcher::spawn(
            sink.clone(),
            DispatcherConfig {
                max_attempts: 3,
                ..Default::default()
            },
            Arc::clone(&stats),
        );

        let handle = dispatcher.handle();
        handle.dispatch(event());
        drop(handle);
        dispatcher.shutdown().await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.snapshot().delivery_failures, 1);
        assert_eq!(stats.snapshot().delivered, 0);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let sink = Arc::new(FlakySink {
            delay: Duration::from_secs(60),
            ..FlakySink::new(0)
        });
        let stats = Arc::new(ListenerStats::default());
        let dispatcher = SinkDispatcher::spawn(
            sink,
            DispatcherConfig {
                queue_capacity: 1,
                max_concurrency: 1,
                drain_grace: Duration::from_millis(50),
                ..Default::default()
            },
            Arc::clone(&stats),
        );

        let handle = dispatcher.handle();
        // 워커 1개 진행 중 + 큐 1칸이 찬 뒤로는 모두 버려짐
        let accepted = (0..20).filter(|_| handle.dispatch(event())).count();
        assert!(accepted < 20);
        assert_eq!(stats.snapshot().queue_full as usize, 20 - accepted);
        drop(handle);

        // 유예 시간 초과로 중단
        assert!(!dispatcher.shutdown().await);
    }
}
