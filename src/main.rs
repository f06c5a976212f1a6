//! CLI entry point for the Chroma SCPI client.
//!
//! Opens one connection to the instrument, prints the greeting banner, runs a
//! fixed number of query round-trips printing each numbered response, then
//! closes the connection.
//!
//! # Usage
//!
//! Query the configured instrument:
//! ```bash
//! chroma-scpi
//! ```
//!
//! Override the target and command:
//! ```bash
//! chroma-scpi --host 10.0.0.5 --port 5025 --command "MEAS:VOLT?" --count 3
//! ```
//!
//! Run against a loopback mock instead of hardware:
//! ```bash
//! chroma-scpi --mock
//! ```

use anyhow::{Context, Result};
use chroma_scpi::{InstrumentConfig, InstrumentSession, MockInstrument, ScpiError};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Greeting served by the loopback mock.
const MOCK_GREETING: &[u8] = b"READY\n";

/// Reply served by the loopback mock for every command.
const MOCK_REPLY: &[u8] = b"Chroma,63804,SN000001,1.00\n";

#[derive(Parser)]
#[command(name = "chroma-scpi")]
#[command(about = "Query a Chroma instrument over its LAN SCPI service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Instrument IP address
    #[arg(long)]
    host: Option<String>,

    /// Instrument TCP port
    #[arg(long)]
    port: Option<u16>,

    /// SCPI command to send (sent verbatim, no terminator appended)
    #[arg(long)]
    command: Option<String>,

    /// Number of query round-trips to perform
    #[arg(long)]
    count: Option<u32>,

    /// Read buffer capacity in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Run against a loopback mock instrument instead of hardware
    #[arg(long)]
    mock: bool,

    /// Wait for Enter before exiting, so a terminal window stays readable
    #[arg(long)]
    pause: bool,
}

impl Cli {
    fn apply(&self, config: &mut InstrumentConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(command) = &self.command {
            config.command = command.clone();
        }
        if let Some(count) = self.count {
            config.query_count = count;
        }
        if let Some(buffer_size) = self.buffer_size {
            config.buffer_size = buffer_size;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => InstrumentConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => InstrumentConfig::load().context("failed to load configuration")?,
    };
    cli.apply(&mut config);

    // Keep the mock alive until the run is over; dropping it tears the
    // listener down.
    let _mock = if cli.mock {
        let mock = MockInstrument::spawn(MOCK_GREETING, MOCK_REPLY)
            .await
            .context("failed to start mock instrument")?;
        config.host = mock.addr().ip().to_string();
        config.port = mock.addr().port();
        Some(mock)
    } else {
        None
    };

    config
        .validate()
        .map_err(|reason| anyhow::anyhow!("invalid configuration: {reason}"))?;

    run(&config).await?;

    if cli.pause {
        wait_for_enter()?;
    }

    Ok(())
}

/// Open a session, run the query loop, close.
///
/// A connect failure is reported but not fatal: the loop still runs against
/// the dead session, and the first query aborts the run. Send and receive
/// failures are fatal; the socket is released on every exit path because the
/// session closes on drop.
async fn run(config: &InstrumentConfig) -> Result<()> {
    let mut session = match InstrumentSession::connect(config).await {
        Ok(session) => {
            if let Some(greeting) = session.greeting() {
                println!("{}", text(greeting));
            }
            session
        }
        Err(err @ (ScpiError::Connect { .. } | ScpiError::Timeout { .. })) => {
            warn!("{err}");
            InstrumentSession::disconnected(config)
        }
        Err(err) => return Err(err.into()),
    };

    let command = config.command.as_bytes();
    for n in 1..=config.query_count {
        let response = session
            .query(command)
            .await
            .with_context(|| format!("query {n} of {} failed", config.query_count))?;
        println!("{} :: {}", n, text(&response));
    }

    session.close().await;
    Ok(())
}

/// Render response bytes for display: lossy UTF-8 with the trailing line
/// terminator trimmed. The bytes themselves are never modified.
fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Block until the user presses Enter, keeping console output readable when
/// the client runs in a terminal window that closes on exit.
fn wait_for_enter() -> Result<()> {
    print!("Press Enter to exit");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trims_line_terminators_only() {
        assert_eq!(text(b"ACME,Model1,SN123,v1.0\n"), "ACME,Model1,SN123,v1.0");
        assert_eq!(text(b"ACME\r\n"), "ACME");
        assert_eq!(text(b"no terminator"), "no terminator");
        assert_eq!(text(b"inner\nnewline\n"), "inner\nnewline");
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli {
            config: None,
            host: Some("10.1.2.3".to_string()),
            port: Some(5025),
            command: Some("MEAS:CURR?".to_string()),
            count: Some(3),
            buffer_size: Some(1024),
            mock: false,
            pause: false,
        };

        let mut config = InstrumentConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.host, "10.1.2.3");
        assert_eq!(config.port, 5025);
        assert_eq!(config.command, "MEAS:CURR?");
        assert_eq!(config.query_count, 3);
        assert_eq!(config.buffer_size, 1024);
    }
}
