//! UDP Syslog 수신기
//!
//! syslog 메시지를 UDP 소켓으로 수신합니다. 각 데이터그램을 하나의 로그
//! 메시지로 취급하며, 메시지 형식은 해석하지 않습니다.
//!
//! 수신 버퍼는 최대 크기보다 1바이트 크게 잡아 초과 여부를 판별합니다.
//! 초과한 데이터그램은 최대 크기로 잘라 `truncated`로 표시한 뒤 처리합니다.

use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::Datagram;
use crate::error::RelayPipelineError;

/// UDP 수신기 설정
#[derive(Debug, Clone)]
pub struct UdpReceiverConfig {
    /// 바인드 주소
    pub bind_addr: SocketAddr,
    /// 커널 수신 버퍼 크기 (SO_RCVBUF, 바이트)
    pub recv_buffer_size: usize,
    /// 최대 데이터그램 크기 (바이트)
    pub max_datagram_size: usize,
}

impl Default for UdpReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 514)),
            recv_buffer_size: 256 * 1024, // 256KB
            max_datagram_size: 4096,
        }
    }
}

/// UDP Syslog 수신기
///
/// 바인드된 소켓과 재사용 수신 버퍼를 소유합니다.
/// 수신기가 drop되면 소켓이 닫힙니다.
pub struct UdpReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
    max_datagram_size: usize,
    local_addr: SocketAddr,
}

impl UdpReceiver {
    /// 소켓을 생성하고 바인드합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    /// 바인드 실패는 주소를 포함한 [`RelayPipelineError::Bind`]로 반환됩니다.
    pub fn bind(config: &UdpReceiverConfig) -> Result<Self, RelayPipelineError> {
        let bind_err = |e: io::Error| RelayPipelineError::Bind {
            addr: config.bind_addr.to_string(),
            reason: e.to_string(),
        };

        let socket = create_socket(config.bind_addr, config.recv_buffer_size).map_err(bind_err)?;
        let local_addr = socket.local_addr().map_err(bind_err)?;

        tracing::info!(
            addr = %local_addr,
            max_datagram_size = config.max_datagram_size,
            "udp syslog receiver bound"
        );

        Ok(Self {
            socket,
            buf: vec![0u8; config.max_datagram_size + 1],
            max_datagram_size: config.max_datagram_size,
            local_addr,
        })
    }

    /// 실제 바인드된 주소를 반환합니다 (포트 0 바인드 시 OS 할당 포트 포함).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 다음 데이터그램을 기다립니다.
    ///
    /// 취소 토큰이 발동하면 `None`을 반환합니다.
    /// 소켓 수신 에러는 `Some(Err(_))`로 반환되며 수신기는 계속 사용할 수 있습니다.
    pub async fn recv(&mut self, cancel: &CancellationToken) -> Option<io::Result<Datagram>> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = self.socket.recv_from(&mut self.buf) => result,
        };

        Some(result.map(|(len, sender)| {
            let truncated = len > self.max_datagram_size;
            let len = len.min(self.max_datagram_size);
            Datagram::new(bytes::Bytes::copy_from_slice(&self.buf[..len]), sender, truncated)
        }))
    }
}

/// socket2로 UDP 소켓을 만들어 SO_RCVBUF를 설정한 뒤 tokio 소켓으로 변환합니다.
fn create_socket(addr: SocketAddr, recv_buffer_size: usize) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    // 버퍼 확대 실패는 치명적이지 않음
    if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
        tracing::warn!(
            error = %e,
            requested_size = recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}
