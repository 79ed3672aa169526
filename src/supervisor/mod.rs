//! Connection Supervisor - one IRC connection on an isolated execution context.
//!
//! # Architecture
//!
//! - **Execution context**: a dedicated OS thread running a current-thread
//!   Tokio runtime. The connection, and everything the [`EventHandler`] owns,
//!   lives there and nowhere else.
//! - **Submission**: other threads reach the context only through
//!   [`Supervisor::submit`], a non-blocking enqueue onto an unbounded channel.
//!   The context runs each action or inbound event to completion before the
//!   next one.
//! - **Stop**: [`Supervisor::stop`] enqueues a disconnect and then waits for
//!   the thread to exit, so QUIT reaches the wire before the runtime is torn
//!   down. It also raises a stop flag that cuts short an event still being
//!   handled, such as a WHOIS waiting on the server.

mod event_loop;
mod state;

pub use state::SupervisorState;

use crate::config::Config;
use crate::error::{ShutdownError, StartupError};
use crate::network::{Connection, Connector, Event};
use crate::telemetry::spans;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, info, warn};

/// Work scheduled onto the execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send text to a channel or nick.
    Send { target: String, text: String },
    /// QUIT and end the run.
    Disconnect { reason: Option<String> },
}

/// Callbacks run inside the execution context.
#[async_trait]
pub trait EventHandler: Send + 'static {
    /// Called once, right after registration completes.
    async fn on_connected(&mut self, conn: &mut dyn Connection);

    /// Called for each inbound event while joined.
    async fn on_event(&mut self, conn: &mut dyn Connection, event: Event);
}

/// Handle to a running connection.
pub struct Supervisor {
    actions: mpsc::UnboundedSender<Action>,
    state: watch::Receiver<SupervisorState>,
    stopping: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
    exited: std::sync::mpsc::Receiver<()>,
    shutdown_timeout: Duration,
}

impl Supervisor {
    /// Launch the connection on its own thread and return immediately.
    ///
    /// Fails only if the runtime or the thread cannot be created; connection
    /// errors surface later in the log and as a `Stopped` state.
    pub fn start<C, H>(config: Arc<Config>, connector: C, handler: H) -> Result<Self, StartupError>
    where
        C: Connector,
        H: EventHandler,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StartupError::Runtime)?;

        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SupervisorState::Idle);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (exit_tx, exit_rx) = std::sync::mpsc::channel();
        let shutdown_timeout = config.timeouts.shutdown();
        let span = spans::connection(&config.name, &config.address());

        let thread = std::thread::Builder::new()
            .name(format!("irc-{}", config.name))
            .spawn(move || {
                runtime.block_on(
                    event_loop::run(config, connector, handler, action_rx, stop_rx, state_tx)
                        .instrument(span),
                );
                // Tear down remaining tasks before reporting exit.
                drop(runtime);
                let _ = exit_tx.send(());
            })
            .map_err(StartupError::Spawn)?;

        debug!("Connection thread started");
        Ok(Self {
            actions: action_tx,
            state: state_rx,
            stopping: stop_tx,
            thread: Some(thread),
            exited: exit_rx,
            shutdown_timeout,
        })
    }

    /// Schedule an action from any thread without blocking.
    ///
    /// Fails, handing the action back, once the context has exited.
    pub fn submit(&self, action: Action) -> Result<(), mpsc::error::SendError<Action>> {
        self.actions.send(action)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Disconnect gracefully and wait for the execution context to exit.
    ///
    /// Blocks the calling thread for at most the configured shutdown timeout.
    /// On timeout the thread is left detached and `ShutdownError::Timeout` is
    /// returned.
    pub fn stop(self) -> Result<(), ShutdownError> {
        self.stop_with_reason(None)
    }

    /// [`stop`](Self::stop) with a QUIT message.
    pub fn stop_with_reason(mut self, reason: Option<String>) -> Result<(), ShutdownError> {
        let Some(thread) = self.thread.take() else {
            return Err(ShutdownError::NotRunning);
        };

        if self.actions.send(Action::Disconnect { reason }).is_err() {
            debug!("Connection already finished before stop");
        }
        self.stopping.send_replace(true);

        match self.exited.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                thread.join().map_err(|_| ShutdownError::Panicked)?;
                info!("Connection stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout = ?self.shutdown_timeout,
                    "Connection thread did not exit in time, detaching"
                );
                Err(ShutdownError::Timeout(self.shutdown_timeout))
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Dropped without stop(): ask the context to finish, but don't block.
        if self.thread.is_some() {
            let _ = self.actions.send(Action::Disconnect { reason: None });
            self.stopping.send_replace(true);
        }
    }
}
