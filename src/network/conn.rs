use std::io::ErrorKind;
use std::net::SocketAddr;

use log::debug;
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::TcpStream;

use crate::network::trace;
use crate::protocol::Message;

const READ_CHUNK: usize = 4096;
const FRAME_END: &[u8] = b"\r\n";

/// A CRLF-framed, non-blocking buffer around one TCP stream.
///
/// All I/O goes through [`Conn::pump`], which never blocks: it moves at most
/// one chunk each way per call and leaves the rest for the next pass. Errors
/// and EOF set a sticky `broken` flag instead of surfacing immediately; the
/// owner notices on its next pass and discards the connection. Inbound bytes
/// leave the buffer only through [`Conn::take_frame`].
#[derive(Debug)]
pub struct Conn {
    stream: TcpStream,
    local: SocketAddr,
    peer: SocketAddr,
    inbound: Vec<u8>,
    outbound: Vec<u8>,
    broken: bool,
}

impl Conn {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        Ok(Conn {
            local: stream.local_addr()?,
            peer: stream.peer_addr()?,
            stream,
            inbound: Vec::new(),
            outbound: Vec::new(),
            broken: false,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Resolves once the socket is readable, or writable while the outbound
    /// buffer is non-empty. This is the only thing a supervisor needs to
    /// await per connection; the actual transfer happens in [`Conn::pump`].
    pub async fn readiness(&self) {
        let interest: Interest = if self.is_writing() {
            Interest::READABLE.add(Interest::WRITABLE)
        } else {
            Interest::READABLE
        };
        let _ = self.stream.ready(interest).await;
    }

    /// One non-blocking read and, if anything is queued, one non-blocking
    /// write. Would-block results are ignored; EOF and hard errors set the
    /// sticky flag.
    pub fn pump(&mut self) {
        if self.broken {
            return;
        }
        let mut chunk: [u8; READ_CHUNK] = [0u8; READ_CHUNK];
        match self.stream.try_read(&mut chunk) {
            Ok(0) => {
                debug!("connection with {} closed with EOF", self.peer);
                self.broken = true;
            }
            Ok(size) => self.inbound.extend_from_slice(&chunk[..size]),
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) => {
                debug!("connection with {} closed: {err}", self.peer);
                self.broken = true;
            }
        }
        if self.broken || self.outbound.is_empty() {
            return;
        }
        match self.stream.try_write(&self.outbound) {
            Ok(0) => self.broken = true,
            Ok(size) => {
                self.outbound.drain(..size);
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) => {
                debug!("connection with {} closed on write: {err}", self.peer);
                self.broken = true;
            }
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn is_writing(&self) -> bool {
        !self.outbound.is_empty()
    }

    pub fn has_frame(&self) -> bool {
        !self.broken && find_frame_end(&self.inbound).is_some()
    }

    /// Removes and returns the oldest complete frame, CRLF included, and
    /// reports it on the wire trace.
    pub fn take_frame(&mut self) -> Option<String> {
        if self.broken {
            return None;
        }
        let end: usize = find_frame_end(&self.inbound)?;
        let frame_bytes: Vec<u8> = self.inbound.drain(..end + FRAME_END.len()).collect();
        let frame: String = String::from_utf8_lossy(&frame_bytes).into_owned();
        trace::report(self.peer, self.local, &frame);
        Some(frame)
    }

    pub fn enqueue(&mut self, message: &Message) {
        self.enqueue_raw(&message.to_string());
    }

    pub fn enqueue_raw(&mut self, frame: &str) {
        self.outbound.extend_from_slice(frame.as_bytes());
        trace::report(self.local, self.peer, frame);
    }

    /// Drains the outbound buffer completely, waiting as long as it takes.
    /// Only called on the way out, so the final SCORE/TOTAL reach the peer.
    pub async fn flush(&mut self) {
        if self.broken || self.outbound.is_empty() {
            return;
        }
        if self.stream.write_all(&self.outbound).await.is_err() {
            self.broken = true;
        }
        self.outbound.clear();
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_END.len())
        .position(|window: &[u8]| window == FRAME_END)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn pair() -> (Conn, TcpStream) {
        let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let peer: TcpStream = TcpStream::connect(addr).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        (Conn::new(accepted).unwrap(), peer)
    }

    #[tokio::test]
    async fn splits_inbound_bytes_on_crlf() {
        let (mut conn, mut peer) = pair().await;
        peer.write_all(b"IAMN\r\nTRI").await.unwrap();
        while !conn.has_frame() {
            conn.readiness().await;
            conn.pump();
        }
        assert_eq!(conn.take_frame().unwrap(), "IAMN\r\n");
        // The partial frame stays buffered until its CRLF arrives.
        assert!(!conn.has_frame());
        peer.write_all(b"CK1\r\n").await.unwrap();
        while !conn.has_frame() {
            conn.readiness().await;
            conn.pump();
        }
        assert_eq!(conn.take_frame().unwrap(), "TRICK1\r\n");
    }

    #[tokio::test]
    async fn eof_sets_the_sticky_flag_and_hides_frames() {
        let (mut conn, mut peer) = pair().await;
        peer.write_all(b"IAMN\r\n").await.unwrap();
        peer.shutdown().await.unwrap();
        while !conn.is_broken() {
            conn.readiness().await;
            conn.pump();
        }
        assert!(!conn.has_frame());
        assert_eq!(conn.take_frame(), None);
    }

    #[tokio::test]
    async fn drains_queued_output_to_the_peer() {
        let (mut conn, mut peer) = pair().await;
        conn.enqueue_raw("WRONG1\r\n");
        assert!(conn.is_writing());
        while conn.is_writing() {
            conn.readiness().await;
            conn.pump();
        }
        let mut received: [u8; 8] = [0u8; 8];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"WRONG1\r\n");
    }
}
