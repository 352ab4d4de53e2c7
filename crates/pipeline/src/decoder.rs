//! 라인 디코더 -- 데이터그램 바이트를 syslog 라인으로 변환합니다.
//!
//! 엄격한 UTF-8 디코딩 후 앞뒤 공백을 제거합니다.
//! 디코딩 실패는 에러로 전파하지 않고 [`DecodeOutcome::Invalid`]로 보고합니다.

use syslog_relay_core::event::SyslogLine;

use crate::collector::Datagram;

/// 디코딩 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// 분류 가능한 라인
    Line(SyslogLine),
    /// 유효하지 않은 UTF-8 -- 데이터그램을 버림
    Invalid,
    /// 트림 후 빈 라인 -- 분류할 내용 없음
    Empty,
}

/// 데이터그램을 디코딩합니다.
///
/// 잘린 데이터그램에 한해, 잘림 경계에서 끊긴 멀티바이트 시퀀스는 버리고
/// 유효한 앞부분을 사용합니다. 그 외 위치의 잘못된 바이트는 데이터그램 전체를
/// 무효로 처리합니다.
pub fn decode(datagram: &Datagram) -> DecodeOutcome {
    let bytes = &datagram.payload[..];

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        // error_len() == None: 입력 끝에서 시퀀스가 끊김
        Err(e) if datagram.truncated && e.error_len().is_none() => {
            match std::str::from_utf8(&bytes[..e.valid_up_to()]) {
                Ok(prefix) => prefix,
                Err(_) => return DecodeOutcome::Invalid,
            }
        }
        Err(_) => return DecodeOutcome::Invalid,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DecodeOutcome::Empty;
    }

    DecodeOutcome::Line(SyslogLine::new(
        trimmed,
        datagram.sender.ip().to_canonical(),
        datagram.received_at,
    ))
}
