//! PSVR2 Triggers Library
//!
//! Adaptive trigger effects driven by the weapon the player currently holds.
//! Public API for testing and integration.

pub mod config;
pub mod config_watcher;
pub mod dispatcher;
pub mod effects;
pub mod replay;
pub mod session;
pub mod transport;
pub mod weapon;

/// Re-export commonly used types
pub use config::{Config, ConfigError, TriggerConfig};
pub use config_watcher::ConfigWatcher;
pub use dispatcher::{dispatch, DispatcherState, TriggerDispatcher};
pub use effects::{DualFanout, EffectCommand, EffectEntry, EffectShape, EffectTable, Target};
pub use replay::{ReplayError, ReplayFrame, ReplayProvider};
pub use session::{
    lock_session, new_shared_session, ConnectionState, SharedTriggerSession, TickOutcome, TriggerSession,
};
pub use transport::{send_command, JsonLinesTransport, LogTransport, RecordingTransport, TriggerTransport};
pub use weapon::{classify, HandSide, Observation, WeaponHandle, WeaponProvider, WeaponRef, WeaponSnapshot};
