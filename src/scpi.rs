//! SCPI over TCP session handling.
//!
//! An [`InstrumentSession`] owns one TCP connection to an instrument. Chroma
//! loads announce themselves with a greeting banner as soon as the connection
//! opens, before any command is issued; [`InstrumentSession::connect`] reads
//! that banner and keeps it for the caller.
//!
//! The wire protocol is a raw byte stream: commands are sent verbatim with no
//! terminator appended, and each query performs exactly one receive of up to
//! the configured buffer capacity. A response spanning multiple packets is
//! truncated, not reassembled.

use crate::config::InstrumentConfig;
use crate::error::{ScpiError, ScpiResult};
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// One TCP connection to a SCPI instrument plus its read-buffer settings.
///
/// Lifecycle: created by [`connect`](Self::connect) (or
/// [`disconnected`](Self::disconnected) for the degraded path), used through
/// [`query`](Self::query), released by [`close`](Self::close). Dropping the
/// session also releases the socket, so an early return mid-loop does not
/// leak the connection. A closed session is not reusable.
#[derive(Debug)]
pub struct InstrumentSession {
    addr: String,
    stream: Option<TcpStream>,
    greeting: Option<Bytes>,
    buffer_size: usize,
    query_delay: Duration,
    close_delay: Duration,
    read_timeout: Option<Duration>,
}

impl InstrumentSession {
    /// Connect to the instrument and read its greeting banner.
    ///
    /// The banner read uses the same buffer capacity as query responses. A
    /// failure to connect or to read the banner is reported as
    /// [`ScpiError::Connect`]; callers decide whether that is fatal.
    pub async fn connect(config: &InstrumentConfig) -> ScpiResult<Self> {
        let addr_text = config.addr();
        let addr: SocketAddr = addr_text.parse().map_err(|source| ScpiError::Address {
            addr: addr_text.clone(),
            source,
        })?;

        let connecting = TcpStream::connect(addr);
        let stream = match config.connect_timeout {
            Some(limit) => timeout(limit, connecting)
                .await
                .map_err(|_| ScpiError::Timeout {
                    addr: addr_text.clone(),
                    timeout: limit,
                })?,
            None => connecting.await,
        }
        .map_err(|source| ScpiError::Connect {
            addr: addr_text.clone(),
            source,
        })?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true).map_err(|source| ScpiError::Connect {
            addr: addr_text.clone(),
            source,
        })?;

        tracing::info!("connected to instrument at {}", addr_text);

        let mut session = Self {
            addr: addr_text,
            stream: Some(stream),
            greeting: None,
            buffer_size: config.buffer_size,
            query_delay: config.query_delay,
            close_delay: config.close_delay,
            read_timeout: config.read_timeout,
        };

        let banner = session.receive().await.map_err(|err| match err {
            ScpiError::Receive { addr, source } => ScpiError::Connect { addr, source },
            ScpiError::ConnectionClosed { addr } => ScpiError::Connect {
                addr,
                source: std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            },
            other => other,
        })?;
        tracing::debug!(bytes = banner.len(), "received greeting banner");
        session.greeting = Some(banner);

        Ok(session)
    }

    /// Create a session with no live connection.
    ///
    /// Queries against it fail with [`ScpiError::NotConnected`]. This exists
    /// so a caller can report a connect failure and still drive the normal
    /// query loop against the dead session.
    pub fn disconnected(config: &InstrumentConfig) -> Self {
        Self {
            addr: config.addr(),
            stream: None,
            greeting: None,
            buffer_size: config.buffer_size,
            query_delay: config.query_delay,
            close_delay: config.close_delay,
            read_timeout: config.read_timeout,
        }
    }

    /// The greeting banner received at connect time, if any.
    pub fn greeting(&self) -> Option<&Bytes> {
        self.greeting.as_ref()
    }

    /// Whether the session holds a live connection.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// The `host:port` this session targets.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a command verbatim and read one response.
    ///
    /// After the command is flushed the session waits `query_delay` before
    /// receiving, giving the instrument time to process. Exactly one receive
    /// of up to `buffer_size` bytes is performed; longer responses are
    /// truncated at capacity. With no `read_timeout` configured a silent
    /// instrument blocks this call indefinitely.
    pub async fn query(&mut self, command: &[u8]) -> ScpiResult<Bytes> {
        {
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| ScpiError::NotConnected {
                    addr: self.addr.clone(),
                })?;

            tracing::debug!(command = %String::from_utf8_lossy(command), "sending command");
            stream
                .write_all(command)
                .await
                .map_err(|source| ScpiError::Send {
                    addr: self.addr.clone(),
                    command: String::from_utf8_lossy(command).into_owned(),
                    source,
                })?;
            stream.flush().await.map_err(|source| ScpiError::Send {
                addr: self.addr.clone(),
                command: String::from_utf8_lossy(command).into_owned(),
                source,
            })?;
        }

        sleep(self.query_delay).await;
        self.receive().await
    }

    /// Close the connection and wait the settling delay.
    ///
    /// Shutdown errors are logged and otherwise ignored. Closing an already
    /// closed session is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.shutdown().await {
                tracing::debug!("error shutting down connection to {}: {err}", self.addr);
            }
            tracing::info!("closed connection to {}", self.addr);
            sleep(self.close_delay).await;
        }
    }

    /// Perform one receive of up to `buffer_size` bytes.
    async fn receive(&mut self) -> ScpiResult<Bytes> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ScpiError::NotConnected {
                addr: self.addr.clone(),
            })?;

        let mut buf = vec![0u8; self.buffer_size];
        let reading = stream.read(&mut buf);
        let n = match self.read_timeout {
            Some(limit) => timeout(limit, reading)
                .await
                .map_err(|_| ScpiError::Timeout {
                    addr: self.addr.clone(),
                    timeout: limit,
                })?,
            None => reading.await,
        }
        .map_err(|source| ScpiError::Receive {
            addr: self.addr.clone(),
            source,
        })?;

        if n == 0 {
            return Err(ScpiError::ConnectionClosed {
                addr: self.addr.clone(),
            });
        }

        buf.truncate(n);
        Ok(Bytes::from(buf))
    }
}
