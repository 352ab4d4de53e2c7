//! 수집기 모듈 -- UDP 소켓에서 원시 데이터그램을 수신합니다.
//!
//! # 수집기
//! - [`UdpReceiver`]: UDP syslog 데이터그램 수신 (RFC 3164/5424 형식 무관)
//!
//! 수집기는 메시지를 해석하지 않고 원시 바이트를 [`Datagram`]으로 전달합니다.
//! 디코딩은 [`decoder`](crate::decoder) 모듈이 담당합니다.

pub mod syslog_udp;

use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use syslog_udp::{UdpReceiver, UdpReceiverConfig};

/// 수집기가 수신한 원시 데이터그램
///
/// 한 번의 수신 호출 동안만 존재하며 디코딩 후 버려집니다.
#[derive(Debug, Clone)]
pub struct Datagram {
    /// 원시 바이트 (최대 크기로 잘린 상태일 수 있음)
    pub payload: Bytes,
    /// 송신 주소
    pub sender: SocketAddr,
    /// 수신 시각
    pub received_at: DateTime<Utc>,
    /// 최대 크기를 넘어 잘렸는지 여부
    pub truncated: bool,
}

impl Datagram {
    /// 새 데이터그램을 생성합니다.
    pub fn new(payload: impl Into<Bytes>, sender: SocketAddr, truncated: bool) -> Self {
        Self {
            payload: payload.into(),
            sender,
            received_at: Utc::now(),
            truncated,
        }
    }
}
