//! HTTP 웹훅 싱크
//!
//! 매칭 이벤트를 `{"log": ..., "ip_address": ...}` JSON으로 POST합니다.
//! 2xx 응답만 성공으로 취급합니다.

use std::time::Duration;

use syslog_relay_core::event::MatchedEvent;
use syslog_relay_core::pipeline::BoxFuture;

use super::EventSink;
use crate::error::{RelayPipelineError, SinkError};

/// HTTP 웹훅 싱크
///
/// `reqwest::Client`의 커넥션 풀을 모든 전달 태스크가 공유합니다.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSink {
    /// 요청 타임아웃을 가진 HTTP 싱크를 생성합니다.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RelayPipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("syslog-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayPipelineError::SinkInit {
                sink: "http".to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_owned(),
            timeout,
        })
    }

    /// 엔드포인트 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, event: &MatchedEvent) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(&event.payload())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Timeout(self.timeout)
                } else {
                    SinkError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Status {
                status: status.as_u16(),
            })
        }
    }
}

impl EventSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn deliver<'a>(&'a self, event: &'a MatchedEvent) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.post(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use syslog_relay_core::event::SyslogLine;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event() -> MatchedEvent {
        let line = SyslogLine::new(
            "%SYS-5-CONFIG_I: Configured from console",
            "10.0.0.5".parse().unwrap(),
            Utc::now(),
        );
        MatchedEvent::new(&line, "config-change")
    }

    #[tokio::test]
    async fn posts_payload_and_accepts_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({
                "log": "%SYS-5-CONFIG_I: Configured from console",
                "ip_address": "10.0.0.5",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/hook", server.uri());
        let sink = HttpSink::new(&url, Duration::from_secs(5)).unwrap();
        assert_eq!(sink.url(), url);
        sink.deliver(&event()).await.unwrap();
    }

    #[tokio::test]
    async fn non_2xx_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = HttpSink::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = sink.deliver(&event()).await.unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let sink = HttpSink::new(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = sink.deliver(&event()).await.unwrap_err();
        assert!(matches!(err, SinkError::Timeout(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // 바인드 후 바로 닫아 아무도 듣지 않는 포트를 얻음
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpSink::new(&format!("http://{addr}/hook"), Duration::from_secs(2)).unwrap();
        let err = sink.deliver(&event()).await.unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
    }
}
