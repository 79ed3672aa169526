//! The host-facing agent: `init`, `receive` and `shutdown`.

use crate::bridge::Bridge;
use crate::config::{Config, ConfigError, validate};
use crate::error::{ShutdownError, StartupError};
use crate::host::{Host, OutboundRequest, is_valid_target};
use crate::network::{Connector, IrcConnector};
use crate::supervisor::{Action, Supervisor, SupervisorState};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One IRC connection bridged to a host.
///
/// Every method is callable from the host's thread and none of them block,
/// except [`shutdown`](Self::shutdown).
pub struct IrcAgent {
    config: Arc<Config>,
    supervisor: Mutex<Option<Supervisor>>,
}

impl IrcAgent {
    /// Validate the configuration, load TLS materials and start connecting.
    ///
    /// Returns as soon as the connection thread is running.
    pub fn init(config: Config, host: Arc<dyn Host>) -> Result<Self, StartupError> {
        validate(&config).map_err(|errors| StartupError::Config(ConfigError::Invalid(errors)))?;
        let connector = IrcConnector::from_config(&config)?;
        Self::init_with(config, host, connector)
    }

    /// [`init`](Self::init) with a caller-supplied connector.
    pub fn init_with<C: Connector>(
        config: Config,
        host: Arc<dyn Host>,
        connector: C,
    ) -> Result<Self, StartupError> {
        let config = Arc::new(config);
        let bridge = Bridge::new(config.name.clone(), config.channel.clone(), host);
        let supervisor = Supervisor::start(Arc::clone(&config), connector, bridge)?;

        info!(
            agent = %config.name,
            addr = %config.address(),
            nick = %config.nickname,
            "IRC agent started"
        );
        Ok(Self {
            config,
            supervisor: Mutex::new(Some(supervisor)),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Lifecycle state, `Stopped` once shut down.
    pub fn state(&self) -> SupervisorState {
        self.supervisor
            .lock()
            .as_ref()
            .map_or(SupervisorState::Stopped, Supervisor::state)
    }

    /// Queue a host message for delivery to the origin's channel or nick.
    pub fn receive(&self, request: OutboundRequest) {
        let target = request.target();
        if !is_valid_target(target) {
            warn!(origin = %request.origin, "Dropping message with no usable target");
            return;
        }

        let action = Action::Send {
            target: target.to_string(),
            text: request.body,
        };

        let guard = self.supervisor.lock();
        let Some(supervisor) = guard.as_ref() else {
            warn!(origin = %request.origin, "Agent is shut down, dropping message");
            return;
        };
        if supervisor.state().is_terminal() {
            warn!(origin = %request.origin, "Connection has ended, dropping message");
            return;
        }
        match supervisor.submit(action) {
            Ok(()) => debug!(origin = %request.origin, "Queued outbound message"),
            Err(_) => warn!(origin = %request.origin, "Connection has ended, dropping message"),
        }
    }

    /// Disconnect and wait, bounded by the shutdown timeout, for the
    /// connection thread to exit.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        let supervisor = self.supervisor.lock().take();
        match supervisor {
            Some(supervisor) => supervisor.stop_with_reason(None),
            None => Err(ShutdownError::NotRunning),
        }
    }
}
