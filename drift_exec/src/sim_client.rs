//! # Simulation Client
//!
//! The SimClient is the UDP link to the Speed Dreams simulator. Commands go out to the simulator's
//! command endpoint from an ephemeral socket, and telemetry arrives on a separately bound socket.
//! Neither side acknowledges anything, so a lost datagram only shows up as a receive timeout.
//!
//! The run loop only sees the [`SimLink`] trait, which lets tests drive it from a script instead of
//! a running simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::Duration
};
use log::debug;

use comms_if::net::NetParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Size of the receive buffer. Larger than any expected datagram so oversize ones are caught by
/// the length check rather than silently truncated.
pub const RECV_BUF_LEN: usize = 4096;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A bidirectional datagram link to the simulator.
pub trait SimLink {
    /// Send one datagram.
    fn send(&mut self, datagram: &[u8]) -> Result<(), SimClientError>;

    /// Wait for one datagram, returning the number of bytes written into `buf`.
    ///
    /// Must return [`SimClientError::Timeout`] rather than block forever.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SimClientError>;

    /// Discard any datagrams already queued, returning how many were dropped.
    fn flush(&mut self) -> Result<usize, SimClientError> {
        Ok(0)
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimClient {
    cmd_socket: UdpSocket,
    tlm_socket: UdpSocket,
    command_endpoint: SocketAddr,
    recv_timeout: Duration
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("No telemetry received within {0:?}")]
    Timeout(Duration),

    #[error("Could not bind a socket to {0}: {1}")]
    Bind(SocketAddr, io::Error),

    #[error("Socket error: {0}")]
    Io(io::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient {
    /// Bind the sockets described by the network parameters.
    pub fn new(params: &NetParams) -> Result<Self, SimClientError> {
        let tlm_socket = UdpSocket::bind(params.telemetry_bind)
            .map_err(|e| SimClientError::Bind(params.telemetry_bind, e))?;
        tlm_socket.set_read_timeout(Some(params.recv_timeout()))
            .map_err(SimClientError::Io)?;

        let cmd_bind = match params.command_endpoint {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let cmd_socket = UdpSocket::bind(cmd_bind)
            .map_err(|e| SimClientError::Bind(cmd_bind, e))?;

        debug!(
            "SimClient sending to {}, receiving on {}",
            params.command_endpoint,
            tlm_socket.local_addr().map_err(SimClientError::Io)?
        );

        Ok(Self {
            cmd_socket,
            tlm_socket,
            command_endpoint: params.command_endpoint,
            recv_timeout: params.recv_timeout()
        })
    }

    /// Address the telemetry socket is actually bound to.
    pub fn telemetry_addr(&self) -> Result<SocketAddr, SimClientError> {
        self.tlm_socket.local_addr().map_err(SimClientError::Io)
    }
}

impl SimLink for SimClient {
    fn send(&mut self, datagram: &[u8]) -> Result<(), SimClientError> {
        self.cmd_socket.send_to(datagram, self.command_endpoint)
            .map(|_| ())
            .map_err(SimClientError::Io)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SimClientError> {
        match self.tlm_socket.recv_from(buf) {
            Ok((n, _)) => Ok(n),
            Err(e) if is_timeout(&e) => Err(SimClientError::Timeout(self.recv_timeout)),
            Err(e) => Err(SimClientError::Io(e))
        }
    }

    fn flush(&mut self) -> Result<usize, SimClientError> {
        let mut buf = [0u8; RECV_BUF_LEN];
        let mut num_dropped = 0;

        self.tlm_socket.set_nonblocking(true).map_err(SimClientError::Io)?;

        let result = loop {
            match self.tlm_socket.recv_from(&mut buf) {
                Ok(_) => num_dropped += 1,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(num_dropped),
                Err(e) => break Err(SimClientError::Io(e))
            }
        };

        self.tlm_socket.set_nonblocking(false).map_err(SimClientError::Io)?;

        result
    }
}

/// Read timeouts surface as either kind depending on the platform.
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod test {
    use super::*;

    fn loopback_params(command_endpoint: SocketAddr) -> NetParams {
        NetParams {
            command_endpoint,
            telemetry_bind: "127.0.0.1:0".parse().unwrap(),
            recv_timeout_ms: 20
        }
    }

    #[test]
    fn test_recv_timeout() {
        let sink = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut client = SimClient::new(&loopback_params(sink.local_addr().unwrap())).unwrap();

        let mut buf = [0u8; RECV_BUF_LEN];
        match client.recv(&mut buf) {
            Err(SimClientError::Timeout(d)) => assert_eq!(d, Duration::from_millis(20)),
            r => panic!("Expected a timeout, got {:?}", r)
        }
    }

    #[test]
    fn test_loopback() {
        let sim = UdpSocket::bind("127.0.0.1:0").unwrap();
        sim.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
        let mut client = SimClient::new(&loopback_params(sim.local_addr().unwrap())).unwrap();
        let tlm_addr = client.telemetry_addr().unwrap();

        // Commands reach the simulator
        client.send(&[1, 2, 3]).unwrap();
        let mut sim_buf = [0u8; 16];
        let (n, _) = sim.recv_from(&mut sim_buf).unwrap();
        assert_eq!(&sim_buf[..n], &[1, 2, 3]);

        // Telemetry reaches the client
        sim.send_to(&[9; 10], tlm_addr).unwrap();
        let mut buf = [0u8; RECV_BUF_LEN];
        assert_eq!(client.recv(&mut buf).unwrap(), 10);

        // Flush drops whatever is queued and leaves the socket blocking again
        sim.send_to(&[7; 4], tlm_addr).unwrap();
        sim.send_to(&[7; 4], tlm_addr).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(client.flush().unwrap(), 2);
        assert!(matches!(client.recv(&mut buf), Err(SimClientError::Timeout(_))));
    }
}
