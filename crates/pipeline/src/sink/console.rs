//! 콘솔 싱크 -- 표준 출력에 JSON 한 줄씩 씁니다.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use syslog_relay_core::event::MatchedEvent;
use syslog_relay_core::pipeline::BoxFuture;

use super::{EventSink, json_line};
use crate::error::SinkError;

type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// 콘솔 싱크
///
/// 동시 전달 태스크의 출력이 섞이지 않도록 writer를 mutex로 보호합니다.
pub struct ConsoleSink {
    out: Mutex<BoxWriter>,
}

impl ConsoleSink {
    /// 표준 출력에 쓰는 싱크를 생성합니다.
    pub fn stdout() -> Self {
        Self::with_writer(tokio::io::stdout())
    }

    /// 임의의 writer에 쓰는 싱크를 생성합니다.
    pub fn with_writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    async fn write(&self, event: &MatchedEvent) -> Result<(), SinkError> {
        let line = json_line(event)?;
        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

impl EventSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn deliver<'a>(&'a self, event: &'a MatchedEvent) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.write(event))
    }
}
