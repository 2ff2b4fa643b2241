//! Trigger session lifecycle
//!
//! Owns the transport and the dispatcher and runs the three host hooks:
//! [`TriggerSession::initialize`], [`TriggerSession::tick`] once per frame,
//! and [`TriggerSession::shutdown`].
//!
//! # Graceful Fallback
//!
//! A transport that fails to start leaves the session degraded: every tick
//! is a no-op until the process restarts, or until a reconnect succeeds if
//! a reconnect cooldown is configured. Nothing here ever fails the host.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::dispatcher::TriggerDispatcher;
use crate::effects::EffectCommand;
use crate::transport::{send_command, TriggerTransport};
use crate::weapon::{classify, WeaponProvider};

/// Shared session for access from the tick thread and the config watcher
pub type SharedTriggerSession<T = Box<dyn TriggerTransport + Send>> = Arc<Mutex<TriggerSession<T>>>;

/// Wrap a session for shared access
pub fn new_shared_session<T: TriggerTransport>(session: TriggerSession<T>) -> SharedTriggerSession<T> {
    Arc::new(Mutex::new(session))
}

/// Lock a shared session, recovering from a poisoned lock
pub fn lock_session<T: TriggerTransport>(session: &SharedTriggerSession<T>) -> MutexGuard<'_, TriggerSession<T>> {
    match session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Trigger session lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Connection state of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not started, or shut down
    #[default]
    NotConnected,
    /// Transport started successfully
    Connected,
    /// Transport failed to start
    Disconnected,
    /// Waiting for cooldown before attempting reconnection
    Cooldown,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No transport, nothing sent
    Degraded,
    /// Trigger effects disabled in config
    Disabled,
    /// Neither hand holds a weapon
    NoWeapon,
    /// Weapon state unchanged since the last dispatch
    Unchanged,
    /// A reset and effect batch was sent (number of commands)
    Dispatched(usize),
}

// ============================================================================
// Session
// ============================================================================

/// Trigger effect session
pub struct TriggerSession<T = Box<dyn TriggerTransport + Send>> {
    transport: T,
    dispatcher: TriggerDispatcher,
    connection_state: ConnectionState,
    /// Whether effects are enabled
    enabled: bool,
    /// Pause between the reset and the new effect
    settle_delay: Duration,
    /// Reconnect cooldown (None = no reconnection)
    reconnect_cooldown: Option<Duration>,
    /// Host frame interval
    tick_interval: Duration,
    last_connect_attempt: Option<Instant>,
    ticks: u64,
    dispatches: u64,
}

impl<T: TriggerTransport> TriggerSession<T> {
    /// Start the transport and build a session from configuration
    ///
    /// A transport that fails to start is logged and leaves the session
    /// degraded; this never fails.
    pub fn initialize(transport: T, config: &Config) -> Self {
        let mut session = Self {
            transport,
            dispatcher: TriggerDispatcher::new(config.effects.clone()),
            connection_state: ConnectionState::NotConnected,
            enabled: config.triggers.enabled,
            settle_delay: config.triggers.settle_delay(),
            reconnect_cooldown: config.triggers.reconnect_cooldown(),
            tick_interval: config.triggers.tick_interval(),
            last_connect_attempt: None,
            ticks: 0,
            dispatches: 0,
        };

        tracing::info!("Connecting to trigger transport...");
        if session.connect() {
            tracing::info!("Trigger transport connected");
        } else {
            tracing::error!(
                reconnect = session.reconnect_cooldown.is_some(),
                "Failed to connect to trigger transport, trigger effects disabled"
            );
        }

        session
    }

    fn connect(&mut self) -> bool {
        self.last_connect_attempt = Some(Instant::now());

        if self.transport.start() {
            self.connection_state = ConnectionState::Connected;
            true
        } else {
            self.connection_state = ConnectionState::Disconnected;
            false
        }
    }

    /// Attempt to reconnect if the transport is down and cooldown has passed
    ///
    /// Returns true if the session is connected afterwards. After a
    /// successful reconnect the dispatcher is reset so the current weapon is
    /// applied again.
    pub fn reconnect_if_needed(&mut self) -> bool {
        match self.connection_state {
            ConnectionState::Connected => return true,
            ConnectionState::NotConnected => return false,
            ConnectionState::Disconnected | ConnectionState::Cooldown => {}
        }

        let Some(cooldown) = self.reconnect_cooldown else {
            return false;
        };

        let waited = self
            .last_connect_attempt
            .map(|at| at.elapsed())
            .unwrap_or(Duration::MAX);
        if waited < cooldown {
            self.connection_state = ConnectionState::Cooldown;
            return false;
        }

        tracing::debug!("Attempting trigger transport reconnection");

        if self.connect() {
            tracing::info!("Trigger transport reconnected");
            self.dispatcher.reset();
            true
        } else {
            self.connection_state = ConnectionState::Cooldown;
            false
        }
    }

    /// Run one frame: classify the weapon state and dispatch on change
    pub fn tick(&mut self, provider: &dyn WeaponProvider) -> TickOutcome {
        self.ticks += 1;

        if !self.reconnect_if_needed() {
            return TickOutcome::Degraded;
        }

        if !self.enabled {
            return TickOutcome::Disabled;
        }

        let Some(observation) = classify(provider) else {
            return TickOutcome::NoWeapon;
        };

        let commands = self.dispatcher.dispatch(&observation);
        let Some((reset, effects)) = commands.split_first() else {
            return TickOutcome::Unchanged;
        };

        send_command(&mut self.transport, reset);
        self.settle();
        for command in effects {
            tracing::trace!(command = command.name(), target = %command.target(), "Sending trigger effect");
            send_command(&mut self.transport, command);
        }

        self.dispatches += 1;
        TickOutcome::Dispatched(commands.len())
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
    }

    /// Reset the triggers and stop the transport
    ///
    /// The final reset is sent only if connected; it is not retried. Safe to
    /// call more than once.
    pub fn shutdown(&mut self) {
        match self.connection_state {
            ConnectionState::NotConnected => return,
            ConnectionState::Connected => {
                send_command(&mut self.transport, &EffectCommand::RESET);
            }
            ConnectionState::Disconnected | ConnectionState::Cooldown => {}
        }

        self.transport.stop();
        self.connection_state = ConnectionState::NotConnected;
        self.dispatcher.reset();

        tracing::info!(
            ticks = self.ticks,
            dispatches = self.dispatches,
            "Trigger transport closed"
        );
    }

    /// Update settings from configuration (for hot-reload)
    ///
    /// The dispatcher is reset so the current weapon picks up the new table
    /// on the next tick.
    pub fn update_from_config(&mut self, config: &Config) {
        let was_enabled = self.enabled;

        self.enabled = config.triggers.enabled;
        self.settle_delay = config.triggers.settle_delay();
        self.reconnect_cooldown = config.triggers.reconnect_cooldown();
        self.tick_interval = config.triggers.tick_interval();
        self.dispatcher.set_table(config.effects.clone());

        if was_enabled && !self.enabled && self.is_connected() {
            send_command(&mut self.transport, &EffectCommand::RESET);
        }

        tracing::debug!(
            enabled = self.enabled,
            settle_delay_ms = self.settle_delay.as_millis() as u64,
            weapon_types = config.effects.entries.len(),
            "Trigger settings updated from config"
        );
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Interval at which the host should call [`TriggerSession::tick`]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of ticks run
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of ticks that sent commands
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    pub fn dispatcher(&self) -> &TriggerDispatcher {
        &self.dispatcher
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// ============================================================================
// Tests
// ============================================================================
