//! SCPI-over-TCP client for Chroma programmable instruments
//!
//! This crate talks to a Chroma load over its LAN SCPI service: open one TCP
//! connection, read the greeting banner the instrument sends on connect, then
//! run synchronous command/response round-trips over the raw byte stream.
//!
//! # Communication
//!
//! Commands are opaque byte sequences sent verbatim (no terminator is
//! appended) and responses are whatever one receive returns, up to the
//! configured buffer capacity. There is no framing, reassembly, or retry
//! layer; the client mirrors the instrument's plain request/response
//! behavior.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chroma_scpi::{InstrumentConfig, InstrumentSession};
//!
//! let config = InstrumentConfig::load()?;
//! let mut session = InstrumentSession::connect(&config).await?;
//!
//! let response = session.query(b"*IDN?").await?;
//! println!("{}", String::from_utf8_lossy(&response));
//!
//! session.close().await;
//! ```
//!
//! # Mock Mode
//!
//! For testing without hardware, [`mock::MockInstrument`] serves a loopback
//! instrument that greets on connect and answers every command with a fixed
//! reply. The `chroma-scpi` binary exposes it via `--mock`.

pub mod config;
pub mod error;
pub mod mock;
pub mod scpi;

pub use config::InstrumentConfig;
pub use error::{ScpiError, ScpiResult};
pub use mock::MockInstrument;
pub use scpi::InstrumentSession;
