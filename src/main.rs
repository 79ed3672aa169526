//! ircbridge - runs one IRC agent against a line-based stdio host.
//!
//! Relayed messages are printed as `origin<TAB>author<TAB>identity<TAB>body`.
//! Lines read from stdin as `origin<TAB>body` (or `origin body`) are sent to
//! IRC. EOF or Ctrl-C shuts the agent down.

use ircbridge::{Config, Host, HostMessage, IrcAgent, OutboundRequest, telemetry};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Prints relayed messages to stdout.
struct StdioHost;

impl Host for StdioHost {
    fn dispatch(&self, message: HostMessage) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            message.origin,
            message.author,
            message.identity.as_deref().unwrap_or("-"),
            message.body
        );
    }
}

fn parse_line(line: &str) -> Option<OutboundRequest> {
    let (origin, body) = line.split_once('\t').or_else(|| line.split_once(' '))?;
    if origin.is_empty() || body.is_empty() {
        return None;
    }
    Some(OutboundRequest::new(origin, body))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_logging();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load_validated(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(agent = %config.name, addr = %config.address(), "Starting ircbridge");

    let agent = Arc::new(IrcAgent::init(config, Arc::new(StdioHost))?);

    // stdin is blocking, so it gets its own thread.
    let (eof_tx, eof_rx) = oneshot::channel();
    let reader = Arc::clone(&agent);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(line.trim_end()) {
                Some(request) => reader.receive(request),
                None if line.trim().is_empty() => {}
                None => warn!(line = %line, "Expected `origin<TAB>body`"),
            }
        }
        let _ = eof_tx.send(());
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = eof_rx => info!("Input closed"),
    }

    let stopping = Arc::clone(&agent);
    tokio::task::spawn_blocking(move || stopping.shutdown()).await??;
    info!("Shutdown complete");
    Ok(())
}
