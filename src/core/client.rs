// src/core/client.rs

//! A small internal asynchronous Redis client used to drive the
//! cluster-administration commands on managed nodes.
//!
//! Connection construction is abstracted behind the [`RedisDialer`] trait so
//! that tests can inject scripted connections; node handles built from gossip
//! output use the same dialer as the primary handles.

use crate::core::SlotwardError;
use crate::core::protocol::{RespCodec, RespFrame};
use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

/// A single Redis command channel. One request, one reply, in order.
#[async_trait]
pub trait RedisConn: Send {
    /// Sends a single command frame and waits for a single reply frame.
    async fn exec(&mut self, frame: RespFrame) -> Result<RespFrame, SlotwardError>;
}

/// Opens [`RedisConn`]s for a `host:port` pair.
#[async_trait]
pub trait RedisDialer: Send + Sync {
    async fn dial(&self, host: &str, port: u16) -> Result<Box<dyn RedisConn>, SlotwardError>;
}

/// A real TCP connection speaking RESP.
pub struct TcpConn {
    stream: TcpStream,
    codec: RespCodec,
    command_timeout: Duration,
}

#[async_trait]
impl RedisConn for TcpConn {
    async fn exec(&mut self, frame: RespFrame) -> Result<RespFrame, SlotwardError> {
        // 1. Encode the command into a byte buffer.
        let mut write_buf = BytesMut::new();
        self.codec.encode(frame, &mut write_buf)?;

        // 2. Send the buffer to the target server with a write timeout.
        let write_fut = self.stream.write_all(&write_buf);
        tokio::time::timeout(self.command_timeout, write_fut)
            .await
            .map_err(|_| SlotwardError::Timeout("command write".to_string()))??;

        // 3. Read the reply from the server in a loop until a full frame decodes.
        let mut read_buf = BytesMut::with_capacity(4096);
        loop {
            let read_fut = self.stream.read_buf(&mut read_buf);
            match tokio::time::timeout(self.command_timeout, read_fut).await {
                Ok(Ok(0)) => {
                    return Err(SlotwardError::Protocol(
                        "connection closed by peer".to_string(),
                    ));
                }
                Ok(Ok(_)) => {
                    if let Some(reply) = self.codec.decode(&mut read_buf)? {
                        return Ok(reply);
                    }
                    // Data not yet complete, keep reading.
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(SlotwardError::Timeout("command reply".to_string())),
            }
        }
    }
}

/// Dials plain TCP connections with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl TcpDialer {
    pub fn new(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
        }
    }
}

#[async_trait]
impl RedisDialer for TcpDialer {
    async fn dial(&self, host: &str, port: u16) -> Result<Box<dyn RedisConn>, SlotwardError> {
        let connect_fut = TcpStream::connect((host, port));
        let stream = tokio::time::timeout(self.connect_timeout, connect_fut)
            .await
            .map_err(|_| SlotwardError::Timeout(format!("connect to {host}:{port}")))??;
        Ok(Box::new(TcpConn {
            stream,
            codec: RespCodec,
            command_timeout: self.command_timeout,
        }))
    }
}

// --- Reply-shape helpers shared by the command wrappers ---

/// Accepts `+OK`, rejects everything else.
pub fn expect_ok(reply: RespFrame, command: &str, addr: &str) -> Result<(), SlotwardError> {
    match reply {
        RespFrame::SimpleString(s) if s.eq_ignore_ascii_case("OK") => Ok(()),
        other => Err(reply_error(other, command, addr)),
    }
}

/// Accepts any simple string reply and returns it (`PING` replies `+PONG`).
pub fn expect_simple(reply: RespFrame, command: &str, addr: &str) -> Result<String, SlotwardError> {
    match reply {
        RespFrame::SimpleString(s) => Ok(s),
        other => Err(reply_error(other, command, addr)),
    }
}

/// Accepts a bulk string reply and decodes it as UTF-8 text.
pub fn expect_text(reply: RespFrame, command: &str, addr: &str) -> Result<String, SlotwardError> {
    match reply {
        RespFrame::BulkString(b) => Ok(String::from_utf8_lossy(&b).to_string()),
        other => Err(reply_error(other, command, addr)),
    }
}

/// Accepts an array of bulk strings and returns the raw key payloads.
pub fn expect_keys(
    reply: RespFrame,
    command: &str,
    addr: &str,
) -> Result<Vec<bytes::Bytes>, SlotwardError> {
    match reply {
        RespFrame::Array(arr) => arr
            .into_iter()
            .map(|frame| match frame {
                RespFrame::BulkString(b) => Ok(b),
                other => Err(reply_error(other, command, addr)),
            })
            .collect(),
        other => Err(reply_error(other, command, addr)),
    }
}

/// Maps an unexpected reply to a typed error. `-ERR` replies become
/// [`SlotwardError::CommandFailed`], anything else is a shape mismatch.
pub fn reply_error(reply: RespFrame, command: &str, addr: &str) -> SlotwardError {
    match reply {
        RespFrame::Error(message) => SlotwardError::CommandFailed {
            command: command.to_string(),
            addr: addr.to_string(),
            message,
        },
        other => SlotwardError::UnexpectedReply {
            command: command.to_string(),
            addr: addr.to_string(),
            reply: other.describe(),
        },
    }
}
