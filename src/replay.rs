//! Recorded weapon timeline
//!
//! [`ReplayProvider`] plays back a JSON timeline of per-hand weapon
//! snapshots, one frame per tick, so the tick loop can be driven without a
//! running game.
//!
//! ```json
//! { "frames": [
//!     { "left": { "id": 1, "weapon_type": 0 }, "hold": 90 },
//!     { "left": { "id": 1, "weapon_type": 0 },
//!       "right": { "id": 2, "weapon_type": 0 }, "dual_wield": true, "hold": 90 },
//!     { "hold": 30 }
//! ] }
//! ```
//!
//! SPDX-License-Identifier: GPL-3.0

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::weapon::{WeaponHandle, WeaponProvider, WeaponSnapshot};

/// One timeline entry, held for `hold` ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(flatten)]
    pub snapshot: WeaponSnapshot,

    /// Number of ticks this frame is repeated
    #[serde(default = "default_hold")]
    pub hold: u32,
}

fn default_hold() -> u32 { 1 }

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Timeline {
    frames: Vec<ReplayFrame>,
}

/// Weapon provider backed by a recorded timeline
///
/// Reports no weapons before the first [`ReplayProvider::advance`] and
/// after the timeline ends.
#[derive(Debug, Clone)]
pub struct ReplayProvider {
    frames: Vec<ReplayFrame>,
    /// Index of the current frame
    frame: usize,
    /// Ticks already spent on the current frame
    held: u32,
    /// Current snapshot (empty when not playing)
    current: Option<WeaponSnapshot>,
    finished: bool,
}

impl ReplayProvider {
    /// Build from frames
    ///
    /// Frames with `hold == 0` are skipped during playback.
    pub fn new(frames: Vec<ReplayFrame>) -> Result<Self, ReplayError> {
        if frames.iter().all(|f| f.hold == 0) {
            return Err(ReplayError::Empty);
        }

        Ok(Self {
            frames,
            frame: 0,
            held: 0,
            current: None,
            finished: false,
        })
    }

    /// Parse a timeline from JSON
    pub fn from_json(contents: &str) -> Result<Self, ReplayError> {
        let timeline: Timeline = serde_json::from_str(contents).map_err(ReplayError::ParseError)?;
        Self::new(timeline.frames)
    }

    /// Load a timeline file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(ReplayError::IoError)?;
        let replay = Self::from_json(&contents)?;

        tracing::info!(
            path = %path.display(),
            frames = replay.frame_count(),
            ticks = replay.tick_count(),
            "Replay loaded"
        );

        Ok(replay)
    }

    /// Move to the next tick
    ///
    /// Returns false once the timeline is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.finished {
            return false;
        }

        if self.current.is_some() {
            self.held += 1;
        }

        while let Some(frame) = self.frames.get(self.frame) {
            if self.held < frame.hold {
                self.current = Some(frame.snapshot);
                return true;
            }
            self.frame += 1;
            self.held = 0;
        }

        self.current = None;
        self.finished = true;
        false
    }

    /// Restart playback from the first frame
    pub fn rewind(&mut self) {
        self.frame = 0;
        self.held = 0;
        self.current = None;
        self.finished = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of frames in the timeline
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total ticks the timeline plays for
    pub fn tick_count(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.hold)).sum()
    }
}

impl WeaponProvider for ReplayProvider {
    fn weapon_left(&self) -> Option<WeaponHandle> {
        self.current.and_then(|s| s.left)
    }

    fn weapon_right(&self) -> Option<WeaponHandle> {
        self.current.and_then(|s| s.right)
    }

    fn dual_wield_active(&self) -> bool {
        self.current.map(|s| s.dual_wield).unwrap_or(false)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Replay error type
#[derive(Debug)]
pub enum ReplayError {
    /// I/O error reading the timeline
    IoError(std::io::Error),
    /// JSON parsing error
    ParseError(serde_json::Error),
    /// Timeline has no playable frames
    Empty,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::IoError(e) => write!(f, "I/O error: {}", e),
            ReplayError::ParseError(e) => write!(f, "Parse error: {}", e),
            ReplayError::Empty => write!(f, "Replay has no playable frames"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::IoError(e) => Some(e),
            ReplayError::ParseError(e) => Some(e),
            ReplayError::Empty => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::{classify, WeaponRef};

    const TIMELINE: &str = r#"{
        "frames": [
            { "left": { "id": 1, "weapon_type": 0 }, "hold": 2 },
            { "left": { "id": 1, "weapon_type": 0 },
              "right": { "id": 2, "weapon_type": 0 }, "dual_wield": true },
            { "hold": 0, "right": { "id": 9, "weapon_type": 9 } },
            { }
        ]
    }"#;

    #[test]
    fn test_parse_timeline() {
        let replay = ReplayProvider::from_json(TIMELINE).unwrap();
        assert_eq!(replay.frame_count(), 4);
        assert_eq!(replay.tick_count(), 4);
        assert!(!replay.is_finished());
    }

    #[test]
    fn test_empty_before_first_advance() {
        let replay = ReplayProvider::from_json(TIMELINE).unwrap();
        assert!(replay.weapon_left().is_none());
        assert!(replay.weapon_right().is_none());
        assert!(!replay.dual_wield_active());
    }

    #[test]
    fn test_playback_order() {
        let mut replay = ReplayProvider::from_json(TIMELINE).unwrap();

        assert!(replay.advance());
        assert_eq!(replay.weapon_left().map(|w| w.id), Some(WeaponRef(1)));
        assert!(!replay.dual_wield_active());

        assert!(replay.advance()); // held frame
        assert!(replay.weapon_right().is_none());

        assert!(replay.advance());
        assert_eq!(replay.weapon_right().map(|w| w.id), Some(WeaponRef(2)));
        assert!(replay.dual_wield_active());

        // hold 0 frame is skipped, empty frame plays once
        assert!(replay.advance());
        assert!(classify(&replay).is_none());

        assert!(!replay.advance());
        assert!(replay.is_finished());
        assert!(replay.weapon_left().is_none());
        assert!(!replay.advance());
    }

    #[test]
    fn test_rewind() {
        let mut replay = ReplayProvider::from_json(TIMELINE).unwrap();
        while replay.advance() {}

        replay.rewind();
        assert!(!replay.is_finished());
        assert!(replay.advance());
        assert_eq!(replay.weapon_left().map(|w| w.id), Some(WeaponRef(1)));
    }

    #[test]
    fn test_empty_timeline_rejected() {
        assert!(matches!(
            ReplayProvider::from_json(r#"{"frames": []}"#),
            Err(ReplayError::Empty)
        ));
        assert!(matches!(
            ReplayProvider::from_json(r#"{"frames": [{"hold": 0}]}"#),
            Err(ReplayError::Empty)
        ));
    }

    #[test]
    fn test_invalid_json() {
        let err = ReplayProvider::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, ReplayError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        fs::write(&path, TIMELINE).unwrap();

        let replay = ReplayProvider::load(&path).unwrap();
        assert_eq!(replay.frame_count(), 4);

        let missing = ReplayProvider::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ReplayError::IoError(_))));
    }
}
