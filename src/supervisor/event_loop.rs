//! The run loop executed inside the execution context.
//!
//! Phase 1 connects and registers while still accepting submissions: sends
//! are held back until joined, a disconnect abandons the attempt.
//! Phase 2 interleaves submitted actions with inbound events, each handled to
//! completion before the next. A raised stop flag abandons the event in
//! progress; actions queued ahead of the disconnect still run.

use super::{Action, EventHandler, SupervisorState};
use crate::config::Config;
use crate::network::{Connection, Connector};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Why the event loop ended.
enum Exit {
    /// Disconnect requested, QUIT still to be sent.
    Requested(Option<String>),
    /// Connection is already gone.
    Dropped,
}

pub(super) async fn run<C, H>(
    config: Arc<Config>,
    connector: C,
    mut handler: H,
    mut actions: mpsc::UnboundedReceiver<Action>,
    mut stopping: watch::Receiver<bool>,
    state: watch::Sender<SupervisorState>,
) where
    C: Connector,
    H: EventHandler,
{
    state.send_replace(SupervisorState::Connecting);

    // Phase 1: connect, holding back early sends.
    let mut backlog = Vec::new();
    let mut connecting = connector.connect(&config);
    let mut conn = loop {
        tokio::select! {
            result = &mut connecting => match result {
                Ok(conn) => break conn,
                Err(e) => {
                    error!(
                        addr = %config.address(),
                        error = %e,
                        kind = e.error_code(),
                        "Connection failed"
                    );
                    state.send_replace(SupervisorState::Stopped);
                    return;
                }
            },
            action = actions.recv() => match action {
                Some(Action::Disconnect { .. }) | None => {
                    info!("Stop requested before connection completed");
                    state.send_replace(SupervisorState::Stopped);
                    return;
                }
                Some(action) => backlog.push(action),
            },
        }
    };
    drop(connecting);

    state.send_replace(SupervisorState::Joined);
    handler.on_connected(conn.as_mut()).await;

    // Phase 2: actions and events, one at a time.
    let mut exit = None;
    for action in backlog {
        if let Some(reason) = execute(conn.as_mut(), action).await {
            exit = Some(Exit::Requested(reason));
            break;
        }
    }

    let exit = match exit {
        Some(exit) => exit,
        None => loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => {
                        if let Some(reason) = execute(conn.as_mut(), action).await {
                            break Exit::Requested(reason);
                        }
                    }
                    None => break Exit::Requested(None),
                },
                event = conn.next_event() => match event {
                    Ok(Some(event)) => {
                        debug_assert!(state.borrow().accepts_events());
                        let handled = tokio::select! {
                            biased;
                            () = handler.on_event(conn.as_mut(), event) => true,
                            _ = stopping.wait_for(|stop| *stop) => false,
                        };
                        if !handled {
                            info!("Stop requested while handling an event, abandoning it");
                            break drain(conn.as_mut(), &mut actions).await;
                        }
                    }
                    Ok(None) => {
                        warn!("Server closed the connection");
                        break Exit::Dropped;
                    }
                    Err(e) => {
                        error!(error = %e, kind = e.error_code(), "Connection lost");
                        break Exit::Dropped;
                    }
                },
            }
        },
    };

    state.send_replace(SupervisorState::Disconnecting);
    if let Exit::Requested(reason) = exit {
        match conn.quit(reason.as_deref()).await {
            Ok(()) => info!("Disconnected"),
            Err(e) => warn!(error = %e, "QUIT failed"),
        }
    }

    drop(conn);
    drop(handler);
    state.send_replace(SupervisorState::Stopped);
}

/// Run the actions queued ahead of a disconnect.
async fn drain(conn: &mut dyn Connection, actions: &mut mpsc::UnboundedReceiver<Action>) -> Exit {
    while let Ok(action) = actions.try_recv() {
        if let Some(reason) = execute(conn, action).await {
            return Exit::Requested(reason);
        }
    }
    Exit::Requested(None)
}

/// Run one submitted action. Returns `Some(reason)` for a disconnect.
async fn execute(conn: &mut dyn Connection, action: Action) -> Option<Option<String>> {
    match action {
        Action::Send { target, text } => {
            match conn.send(&target, &text).await {
                Ok(()) => debug!(target = %target, "Sent message"),
                Err(e) => warn!(target = %target, error = %e, "Send failed"),
            }
            None
        }
        Action::Disconnect { reason } => Some(reason),
    }
}
