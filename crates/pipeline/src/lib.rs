#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: UDP 소켓에서 원시 데이터그램 수신 (SO_RCVBUF, 잘림 감지)
//! - [`decoder`]: 엄격한 UTF-8 디코딩 및 트림
//! - [`rule`]: 정규식 룰 로딩/컴파일 및 이벤트 분류
//! - [`sink`]: 이벤트 싱크 (HTTP, console, file) 및 비동기 디스패처
//! - [`pipeline`]: 리스너 생명주기 관리 (Pipeline trait 구현)
//! - [`stats`]: 락 없는 통계 카운터
//! - [`config`]: 리스너 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! UdpReceiver -> decode -> EventClassifier -> SinkDispatcher -> EventSink
//!      |            |             |                  |              |
//!  socket2/UDP   UTF-8+trim   regex rules     bounded mpsc     http/console/file
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod stats;

pub mod collector;
pub mod rule;
pub mod sink;

// --- 주요 타입 re-export ---

// 리스너
pub use pipeline::{ListenerState, SyslogListener, SyslogListenerBuilder};

// 설정
pub use config::{MatchPolicy, PipelineConfig, SinkKind, SinkSettings};

// 에러
pub use error::{RelayPipelineError, SinkError};

// 수집/디코딩
pub use collector::{Datagram, UdpReceiver};
pub use decoder::{DecodeOutcome, decode};

// 분류기
pub use rule::{EventClassifier, MatchRule, RuleLoader};

// 싱크
pub use sink::{ConsoleSink, EventSink, FileSink, HttpSink, SinkDispatcher};

// 통계
pub use stats::{ListenerStats, StatsSnapshot};
