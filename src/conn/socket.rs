//! The UDP leg shared by both transports.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::Error;

/// Per-receive deadline.
const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// How many datagrams we will accept (and possibly discard) per receive.
const MAX_RECV_ATTEMPTS: usize = 3;
/// Largest packet either side may send.
const BUFFER_LEN: usize = 1024;

/// A connected UDP socket with the receive discipline both session layers
/// share: a 10-second deadline, and up to three accepted datagrams to skip
/// strays before giving up.
pub(crate) struct UdpConnection {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpConnection {
    pub(crate) fn connect(hostname: &str, port: u16) -> Result<Self, Error> {
        let peer = (hostname, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    ErrorKind::AddrNotAvailable,
                    format!("{hostname}:{port} did not resolve"),
                ))
            })?;

        let bind_addr: SocketAddr = if peer.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        socket.connect(peer)?;

        Ok(Self { socket, peer })
    }

    pub(crate) fn send(&self, packet: &[u8]) -> Result<(), Error> {
        log::trace!("-> {} bytes to {}", packet.len(), self.peer);
        self.socket.send(packet)?;
        Ok(())
    }

    /// Receive one datagram from the peer. Datagrams from anyone else are
    /// discarded; each accept (or deadline expiry) consumes one attempt.
    pub(crate) fn recv(&self) -> Result<Vec<u8>, Error> {
        let mut buffer = [0u8; BUFFER_LEN];

        for _ in 0..MAX_RECV_ATTEMPTS {
            match self.socket.recv_from(&mut buffer) {
                Ok((len, from)) => {
                    if from != self.peer {
                        log::warn!("discarding {len} stray bytes from {from}");
                        continue;
                    }
                    log::trace!("<- {len} bytes from {from}");
                    return Ok(buffer[..len].to_vec());
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Timeout)
    }
}
