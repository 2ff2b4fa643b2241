//! Trigger transport abstraction
//!
//! The transport is the session with whatever drives the controller
//! triggers. It must be started before use and stopped on shutdown. Every
//! send is fire-and-forget: there is no acknowledgement and failures are
//! never reported back to the caller.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::effects::{EffectCommand, Target, MULTI_POSITION_ZONES};

/// Trigger effect session
pub trait TriggerTransport {
    /// Open the session
    ///
    /// Returns false if the session could not be established.
    fn start(&mut self) -> bool;

    /// Close the session
    fn stop(&mut self);

    fn disable(&mut self, target: Target);

    fn feedback(&mut self, target: Target, position: u8, strength: u8);

    fn weapon(&mut self, target: Target, mode: u8, position: u8, strength: u8);

    fn multi_position_feedback(&mut self, target: Target, strengths: &[u8; MULTI_POSITION_ZONES]);

    fn slope_feedback(
        &mut self,
        target: Target,
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    );
}

impl<T: TriggerTransport + ?Sized> TriggerTransport for Box<T> {
    fn start(&mut self) -> bool {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn disable(&mut self, target: Target) {
        (**self).disable(target)
    }

    fn feedback(&mut self, target: Target, position: u8, strength: u8) {
        (**self).feedback(target, position, strength)
    }

    fn weapon(&mut self, target: Target, mode: u8, position: u8, strength: u8) {
        (**self).weapon(target, mode, position, strength)
    }

    fn multi_position_feedback(&mut self, target: Target, strengths: &[u8; MULTI_POSITION_ZONES]) {
        (**self).multi_position_feedback(target, strengths)
    }

    fn slope_feedback(
        &mut self,
        target: Target,
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    ) {
        (**self).slope_feedback(target, mode, start_strength, end_strength, curve)
    }
}

/// Send one command through the matching transport operation
pub fn send_command<T: TriggerTransport + ?Sized>(transport: &mut T, command: &EffectCommand) {
    match *command {
        EffectCommand::Disable { target } => transport.disable(target),
        EffectCommand::Feedback {
            target,
            position,
            strength,
        } => transport.feedback(target, position, strength),
        EffectCommand::Weapon {
            target,
            mode,
            position,
            strength,
        } => transport.weapon(target, mode, position, strength),
        EffectCommand::MultiPositionFeedback {
            target,
            ref strengths,
        } => transport.multi_position_feedback(target, strengths),
        EffectCommand::SlopeFeedback {
            target,
            mode,
            start_strength,
            end_strength,
            curve,
        } => transport.slope_feedback(target, mode, start_strength, end_strength, curve),
    }
}

// ============================================================================
// Log Transport
// ============================================================================

/// Transport that only logs each command
///
/// Used when no output is configured, e.g. to dry-run a replay.
#[derive(Debug, Default)]
pub struct LogTransport {
    started: bool,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl TriggerTransport for LogTransport {
    fn start(&mut self) -> bool {
        self.started = true;
        tracing::info!("Log transport started");
        true
    }

    fn stop(&mut self) {
        self.started = false;
        tracing::info!("Log transport stopped");
    }

    fn disable(&mut self, target: Target) {
        tracing::info!(%target, "Trigger effect: disable");
    }

    fn feedback(&mut self, target: Target, position: u8, strength: u8) {
        tracing::info!(%target, position, strength, "Trigger effect: feedback");
    }

    fn weapon(&mut self, target: Target, mode: u8, position: u8, strength: u8) {
        tracing::info!(%target, mode, position, strength, "Trigger effect: weapon");
    }

    fn multi_position_feedback(&mut self, target: Target, strengths: &[u8; MULTI_POSITION_ZONES]) {
        tracing::info!(%target, ?strengths, "Trigger effect: multi-position feedback");
    }

    fn slope_feedback(
        &mut self,
        target: Target,
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    ) {
        tracing::info!(
            %target,
            mode,
            start_strength,
            end_strength,
            curve,
            "Trigger effect: slope feedback"
        );
    }
}

// ============================================================================
// JSON Lines Transport
// ============================================================================

/// Transport that writes each command as one JSON line
pub struct JsonLinesTransport<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the transport and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, command: EffectCommand) {
        let result = serde_json::to_writer(&mut self.writer, &command)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));

        if let Err(e) = result {
            tracing::debug!(error = %e, command = command.name(), "Failed to write trigger command");
        }
    }
}

impl<W: Write> TriggerTransport for JsonLinesTransport<W> {
    fn start(&mut self) -> bool {
        true
    }

    fn stop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::debug!(error = %e, "Failed to flush trigger command output");
        }
    }

    fn disable(&mut self, target: Target) {
        self.write(EffectCommand::Disable { target });
    }

    fn feedback(&mut self, target: Target, position: u8, strength: u8) {
        self.write(EffectCommand::Feedback {
            target,
            position,
            strength,
        });
    }

    fn weapon(&mut self, target: Target, mode: u8, position: u8, strength: u8) {
        self.write(EffectCommand::Weapon {
            target,
            mode,
            position,
            strength,
        });
    }

    fn multi_position_feedback(&mut self, target: Target, strengths: &[u8; MULTI_POSITION_ZONES]) {
        self.write(EffectCommand::MultiPositionFeedback {
            target,
            strengths: *strengths,
        });
    }

    fn slope_feedback(
        &mut self,
        target: Target,
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    ) {
        self.write(EffectCommand::SlopeFeedback {
            target,
            mode,
            start_strength,
            end_strength,
            curve,
        });
    }
}

// ============================================================================
// Recording Transport
// ============================================================================

#[derive(Debug)]
struct Recording {
    commands: Vec<EffectCommand>,
    start_result: bool,
    starts: usize,
    stops: usize,
}

/// In-memory transport that records every command
///
/// Clones share the same recording, so a test can keep one handle while
/// the session owns another.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingTransport {
    /// Create a recorder whose `start()` succeeds
    pub fn new() -> Self {
        Self::with_start_result(true)
    }

    /// Create a recorder whose `start()` returns `start_result`
    pub fn with_start_result(start_result: bool) -> Self {
        Self {
            recording: Arc::new(Mutex::new(Recording {
                commands: Vec::new(),
                start_result,
                starts: 0,
                stops: 0,
            })),
        }
    }

    /// Change the result of subsequent `start()` calls on every clone
    pub fn set_start_result(&self, start_result: bool) {
        self.with_recording(|r| r.start_result = start_result);
    }

    /// All commands recorded so far
    pub fn commands(&self) -> Vec<EffectCommand> {
        self.with_recording(|r| r.commands.clone())
    }

    /// Remove and return all recorded commands
    pub fn take(&self) -> Vec<EffectCommand> {
        self.with_recording(|r| std::mem::take(&mut r.commands))
    }

    pub fn start_count(&self) -> usize {
        self.with_recording(|r| r.starts)
    }

    pub fn stop_count(&self) -> usize {
        self.with_recording(|r| r.stops)
    }

    fn with_recording<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> R {
        let mut guard = match self.recording.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn record(&mut self, command: EffectCommand) {
        self.with_recording(|r| r.commands.push(command));
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerTransport for RecordingTransport {
    fn start(&mut self) -> bool {
        self.with_recording(|r| {
            r.starts += 1;
            r.start_result
        })
    }

    fn stop(&mut self) {
        self.with_recording(|r| r.stops += 1);
    }

    fn disable(&mut self, target: Target) {
        self.record(EffectCommand::Disable { target });
    }

    fn feedback(&mut self, target: Target, position: u8, strength: u8) {
        self.record(EffectCommand::Feedback {
            target,
            position,
            strength,
        });
    }

    fn weapon(&mut self, target: Target, mode: u8, position: u8, strength: u8) {
        self.record(EffectCommand::Weapon {
            target,
            mode,
            position,
            strength,
        });
    }

    fn multi_position_feedback(&mut self, target: Target, strengths: &[u8; MULTI_POSITION_ZONES]) {
        self.record(EffectCommand::MultiPositionFeedback {
            target,
            strengths: *strengths,
        });
    }

    fn slope_feedback(
        &mut self,
        target: Target,
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    ) {
        self.record(EffectCommand::SlopeFeedback {
            target,
            mode,
            start_strength,
            end_strength,
            curve,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
