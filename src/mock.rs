//! Loopback instrument for testing without hardware.
//!
//! [`MockInstrument`] behaves like a Chroma's LAN service: it accepts one TCP
//! connection, immediately writes a greeting banner, then answers every
//! received command with a fixed reply. Received commands are recorded so
//! tests can assert on exactly what crossed the wire.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A mock SCPI instrument listening on an ephemeral local port.
pub struct MockInstrument {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<Vec<u8>>>>,
    task: JoinHandle<()>,
}

impl MockInstrument {
    /// Start the mock on `127.0.0.1` with an OS-assigned port.
    ///
    /// The mock serves a single connection: it writes `greeting` on accept,
    /// then answers each received chunk of bytes with `reply` until the peer
    /// disconnects. An empty `reply` makes the instrument go silent after
    /// the greeting, which is useful for timeout tests.
    pub async fn spawn(
        greeting: impl Into<Vec<u8>>,
        reply: impl Into<Vec<u8>>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let greeting = greeting.into();
        let reply = reply.into();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&commands);

        let task = tokio::spawn(async move {
            let Ok((mut socket, peer)) = listener.accept().await else {
                return;
            };
            tracing::debug!("mock instrument accepted connection from {peer}");

            if socket.write_all(&greeting).await.is_err() {
                return;
            }

            let mut buf = vec![0u8; 4096];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        log.lock().await.push(buf[..n].to_vec());
                        if socket.write_all(&reply).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("mock instrument connection ended");
        });

        Ok(Self {
            addr,
            commands,
            task,
        })
    }

    /// The address the mock is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every command received so far, in arrival order.
    pub async fn commands(&self) -> Vec<Vec<u8>> {
        self.commands.lock().await.clone()
    }
}

impl Drop for MockInstrument {
    fn drop(&mut self) {
        self.task.abort();
    }
}
