//! 이벤트 싱크 -- 매칭된 이벤트를 외부로 전달합니다.
//!
//! 리스너는 [`EventSink`] trait 객체(`Arc<dyn EventSink>`)만 알고,
//! 구체 싱크는 설정의 `sink.kind`로 선택됩니다.
//!
//! # 싱크
//! - [`HttpSink`]: JSON POST 웹훅 (2xx = 성공)
//! - [`ConsoleSink`]: 표준 출력에 JSON 한 줄
//! - [`FileSink`]: 파일에 JSON 한 줄 append
//!
//! 전달은 [`SinkDispatcher`]가 수신 경로와 분리해서 수행합니다.

pub mod console;
pub mod dispatcher;
pub mod file;
pub mod http;

pub use console::ConsoleSink;
pub use dispatcher::{DispatchHandle, DispatcherConfig, SinkDispatcher};
pub use file::FileSink;
pub use http::HttpSink;

use std::sync::Arc;

use syslog_relay_core::event::MatchedEvent;
use syslog_relay_core::pipeline::BoxFuture;

use crate::config::{SinkKind, SinkSettings};
use crate::error::{RelayPipelineError, SinkError};

/// 이벤트 싱크
///
/// `BoxFuture`를 반환하여 `Arc<dyn EventSink>`로 사용할 수 있습니다.
/// 구현체는 여러 전달 태스크에서 동시에 호출됩니다.
pub trait EventSink: Send + Sync {
    /// 싱크 이름 (로그와 메트릭 레이블에 사용)
    fn name(&self) -> &str;

    /// 이벤트 하나를 전달합니다. 재시도는 호출자가 결정합니다.
    fn deliver<'a>(&'a self, event: &'a MatchedEvent) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// 설정에 맞는 싱크를 생성합니다.
pub async fn build_sink(settings: &SinkSettings) -> Result<Arc<dyn EventSink>, RelayPipelineError> {
    let (sink, target): (Arc<dyn EventSink>, String) = match settings.kind {
        SinkKind::Http => {
            let sink = HttpSink::new(&settings.url, settings.timeout)?;
            let target = sink.url().to_owned();
            (Arc::new(sink), target)
        }
        SinkKind::Console => (Arc::new(ConsoleSink::stdout()), "stdout".to_owned()),
        SinkKind::File => {
            let sink = FileSink::open(&settings.file_path).await?;
            let target = sink.path().display().to_string();
            (Arc::new(sink), target)
        }
    };

    tracing::info!(sink = sink.name(), kind = %settings.kind, %target, "event sink ready");
    Ok(sink)
}

/// 페이로드를 개행으로 끝나는 JSON 한 줄로 직렬화합니다.
pub(crate) fn json_line(event: &MatchedEvent) -> Result<Vec<u8>, SinkError> {
    let mut line = serde_json::to_vec(&event.payload())?;
    line.push(b'\n');
    Ok(line)
}
