//! single-shot TCP client for the upstream resolver

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use derive_more::{Display, Error};

use crate::dns::buffer::VectorPacketBuffer;
use crate::dns::netutil::{read_packet_length, write_packet_length};
use crate::dns::protocol::{DnsPacket, ProtocolError};

#[derive(Debug, Display, Error)]
pub enum ResolveError {
    ConnectionFailed(io::Error),
    Timeout,
    WriteFailed(io::Error),
    ReadFailed(io::Error),
    MalformedResponse(ProtocolError),
    PackFailed(ProtocolError),
}

type Result<T> = std::result::Result<T, ResolveError>;

fn timed_out(err: &io::Error) -> bool {
    // Read/write deadlines surface as WouldBlock on unix and TimedOut on
    // windows.
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn classify_write(err: io::Error) -> ResolveError {
    if timed_out(&err) {
        ResolveError::Timeout
    } else {
        ResolveError::WriteFailed(err)
    }
}

fn classify_read(err: io::Error) -> ResolveError {
    if timed_out(&err) {
        ResolveError::Timeout
    } else {
        ResolveError::ReadFailed(err)
    }
}

/// Performs one query/response round trip against the configured upstream
/// resolver over TCP.
///
/// Every call dials a fresh connection and drops it when the round trip
/// completes, succeeds or not; connections are never reused. The configured
/// timeout applies independently to connect, write and read, so one request
/// can take up to roughly three times the timeout in the worst case.
pub struct UpstreamResolver {
    server: SocketAddr,
    timeout: Duration,
}

impl UpstreamResolver {
    pub fn new(server: SocketAddr, timeout: Duration) -> UpstreamResolver {
        UpstreamResolver { server, timeout }
    }

    /// Send `query` upstream and read back one framed response message.
    /// Exactly one attempt is made; the caller decides whether to retry.
    pub fn resolve(&self, query: &mut DnsPacket) -> Result<DnsPacket> {
        let mut req_buffer = VectorPacketBuffer::new();
        query.write(&mut req_buffer).map_err(ResolveError::PackFailed)?;

        let mut stream = TcpStream::connect_timeout(&self.server, self.timeout)
            .map_err(ResolveError::ConnectionFailed)?;

        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(ResolveError::WriteFailed)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(ResolveError::ReadFailed)?;

        write_packet_length(&mut stream, req_buffer.buffer.len()).map_err(classify_write)?;
        stream.write_all(&req_buffer.buffer).map_err(classify_write)?;
        stream.flush().map_err(classify_write)?;

        let res_len = read_packet_length(&mut stream).map_err(classify_read)?;
        let mut frame = vec![0u8; res_len as usize];
        stream.read_exact(&mut frame).map_err(classify_read)?;

        let mut res_buffer = VectorPacketBuffer::from_bytes(&frame);
        let response =
            DnsPacket::from_buffer(&mut res_buffer).map_err(ResolveError::MalformedResponse)?;

        // A single query was written on a dedicated connection, so the one
        // response read is assumed to answer it. A mismatched id is worth
        // flagging but not refusing.
        if response.header.id != query.header.id {
            log::warn!(
                "upstream answered with id {} for query id {}",
                response.header.id,
                query.header.id
            );
        }

        Ok(response)
    }
}
