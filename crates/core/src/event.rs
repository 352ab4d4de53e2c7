//! 이벤트 타입 -- 디코딩된 syslog 라인과 매칭된 이벤트
//!
//! 데이터 흐름은 단방향입니다:
//! ```text
//! Datagram -> SyslogLine -> (룰 매칭) -> MatchedEvent -> EventSink
//! ```
//! [`SyslogLine`]은 분류가 끝나면 버려지고, [`MatchedEvent`]는 싱크로
//! 소유권이 넘어갑니다. 리스너는 전달 후 사본을 보관하지 않습니다.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 디코딩된 syslog 라인
///
/// 하나의 데이터그램에서 정확히 하나가 만들어지며, 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogLine {
    text: String,
    sender: IpAddr,
    received_at: DateTime<Utc>,
}

impl SyslogLine {
    /// 새 라인을 생성합니다. `text`는 이미 트림된 상태여야 합니다.
    pub fn new(text: impl Into<String>, sender: IpAddr, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            sender,
            received_at,
        }
    }

    /// 라인 텍스트
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 송신 장비 IP
    pub fn sender(&self) -> IpAddr {
        self.sender
    }

    /// 수신 시각
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// 룰에 매칭된 이벤트
///
/// 하나의 라인이 여러 룰에 매칭되면 매칭 정책에 따라
/// 룰마다 하나씩 생성됩니다. 중복 제거는 하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEvent {
    /// 로그 상관관계용 이벤트 ID
    pub id: Uuid,
    /// 원본 라인 텍스트 (변경 없음)
    pub line: String,
    /// 송신 장비 IP
    pub sender: IpAddr,
    /// 매칭된 룰 ID
    pub rule_id: String,
    /// 데이터그램 수신 시각
    pub received_at: DateTime<Utc>,
}

impl MatchedEvent {
    /// 라인과 매칭된 룰 ID로 이벤트를 생성합니다.
    pub fn new(line: &SyslogLine, rule_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            line: line.text.clone(),
            sender: line.sender,
            rule_id: rule_id.into(),
            received_at: line.received_at,
        }
    }

    /// 외부 수집기로 보낼 JSON 페이로드를 만듭니다.
    pub fn payload(&self) -> WebhookPayload<'_> {
        WebhookPayload {
            log: &self.line,
            ip_address: self.sender,
        }
    }
}

impl fmt::Display for MatchedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} | Client IP: {}", self.rule_id, self.line, self.sender)
    }
}

/// 싱크 전달 페이로드: `{"log": <string>, "ip_address": <string>}`
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    /// 원본 라인
    pub log: &'a str,
    /// 송신 장비 IP (문자열로 직렬화)
    pub ip_address: IpAddr,
}
