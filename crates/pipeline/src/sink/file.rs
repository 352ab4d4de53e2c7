//! 파일 싱크 -- JSON lines 파일에 이벤트를 append합니다.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use syslog_relay_core::event::MatchedEvent;
use syslog_relay_core::pipeline::BoxFuture;

use super::{EventSink, json_line};
use crate::error::{RelayPipelineError, SinkError};

/// 파일 싱크
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// 파일을 append 모드로 엽니다. 없으면 생성합니다.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RelayPipelineError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| RelayPipelineError::SinkInit {
                sink: "file".to_owned(),
                reason: format!("{}: {e}", path.display()),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// 출력 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, event: &MatchedEvent) -> Result<(), SinkError> {
        let line = json_line(event)?;
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

impl EventSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn deliver<'a>(&'a self, event: &'a MatchedEvent) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.append(event))
    }
}
