//! Weapon classification
//!
//! Turns the raw per-hand weapon handles reported by the game into a
//! normalized [`Observation`]: which weapon is current, which hand holds
//! it, its type code, and whether dual wield is active.
//!
//! SPDX-License-Identifier: GPL-3.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::Target;

// ============================================================================
// Weapon Identity
// ============================================================================

/// Opaque identity of a weapon instance
///
/// Assigned by the world-state provider. Two refs are equal only if they
/// name the same weapon instance; two weapons of the same type with
/// different ids are different weapons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponRef(pub u64);

impl fmt::Display for WeaponRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A weapon held in one hand, as seen this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponHandle {
    /// Instance identity
    pub id: WeaponRef,
    /// Raw type code (observed 0-5, anything else is unknown)
    pub weapon_type: i32,
}

impl WeaponHandle {
    pub fn new(id: u64, weapon_type: i32) -> Self {
        Self {
            id: WeaponRef(id),
            weapon_type,
        }
    }
}

/// Controller hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSide {
    Left,
    Right,
}

impl From<HandSide> for Target {
    fn from(side: HandSide) -> Self {
        match side {
            HandSide::Left => Target::Left,
            HandSide::Right => Target::Right,
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandSide::Left => write!(f, "left"),
            HandSide::Right => write!(f, "right"),
        }
    }
}

// ============================================================================
// World State
// ============================================================================

/// Read-only view of the game's weapon state
///
/// Values may change between any two reads. Implementations are polled
/// once per tick and must never block.
pub trait WeaponProvider {
    /// Weapon in the left hand, if any
    fn weapon_left(&self) -> Option<WeaponHandle>;

    /// Weapon in the right hand, if any
    fn weapon_right(&self) -> Option<WeaponHandle>;

    /// Whether both hands hold an active weapon
    fn dual_wield_active(&self) -> bool;

    /// Weapon the game considers current
    ///
    /// Defaults to the left-hand weapon, then the right-hand one.
    fn current_weapon(&self) -> Option<WeaponHandle> {
        self.weapon_left().or_else(|| self.weapon_right())
    }
}

/// Plain snapshot of both hands
///
/// Implements [`WeaponProvider`] by returning its own fields, which makes it
/// usable as a fixed world state or as one frame of a recorded timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    #[serde(default)]
    pub left: Option<WeaponHandle>,
    #[serde(default)]
    pub right: Option<WeaponHandle>,
    #[serde(default)]
    pub dual_wield: bool,
}

impl WeaponSnapshot {
    pub fn new(left: Option<WeaponHandle>, right: Option<WeaponHandle>, dual_wield: bool) -> Self {
        Self {
            left,
            right,
            dual_wield,
        }
    }
}

impl WeaponProvider for WeaponSnapshot {
    fn weapon_left(&self) -> Option<WeaponHandle> {
        self.left
    }

    fn weapon_right(&self) -> Option<WeaponHandle> {
        self.right
    }

    fn dual_wield_active(&self) -> bool {
        self.dual_wield
    }
}

// ============================================================================
// Observation
// ============================================================================

/// Normalized weapon state for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Hand holding the current weapon (used only when not dual wielding)
    pub active_hand: HandSide,
    /// Identity of the current weapon
    pub weapon: WeaponRef,
    /// Type code of the current weapon, unvalidated
    pub weapon_type: i32,
    /// Dual wield flag
    pub dual_wield: bool,
}

impl Observation {
    /// Controller targeted by single-hand effects
    pub fn target(&self) -> Target {
        self.active_hand.into()
    }
}

/// Classify the provider's current weapon state
///
/// Returns `None` when neither hand holds a weapon. The current weapon's
/// type code is used regardless of dual wield state; its hand is found by
/// identity against the per-hand handles.
pub fn classify(provider: &dyn WeaponProvider) -> Option<Observation> {
    let left = provider.weapon_left();
    let right = provider.weapon_right();
    if left.is_none() && right.is_none() {
        return None;
    }

    let current = provider.current_weapon()?;
    let dual_wield = provider.dual_wield_active();

    let active_hand = if left.map(|w| w.id) == Some(current.id) {
        HandSide::Left
    } else if right.map(|w| w.id) == Some(current.id) {
        HandSide::Right
    } else {
        tracing::warn!(
            weapon = %current.id,
            "Current weapon matches neither hand, defaulting to right"
        );
        HandSide::Right
    };

    Some(Observation {
        active_hand,
        weapon: current.id,
        weapon_type: current.weapon_type,
        dual_wield,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider whose current weapon matches neither hand
    struct Detached;

    impl WeaponProvider for Detached {
        fn weapon_left(&self) -> Option<WeaponHandle> {
            Some(WeaponHandle::new(1, 0))
        }

        fn weapon_right(&self) -> Option<WeaponHandle> {
            Some(WeaponHandle::new(2, 0))
        }

        fn dual_wield_active(&self) -> bool {
            false
        }

        fn current_weapon(&self) -> Option<WeaponHandle> {
            Some(WeaponHandle::new(3, 1))
        }
    }

    #[test]
    fn test_no_weapons_yields_none() {
        let hands = WeaponSnapshot::new(None, None, false);
        assert!(classify(&hands).is_none());

        // Dual flag alone is not a weapon
        let hands = WeaponSnapshot::new(None, None, true);
        assert!(classify(&hands).is_none());
    }

    #[test]
    fn test_left_weapon_preferred() {
        let hands = WeaponSnapshot::new(Some(WeaponHandle::new(1, 3)), Some(WeaponHandle::new(2, 0)), true);

        let obs = classify(&hands).unwrap();
        assert_eq!(obs.weapon, WeaponRef(1));
        assert_eq!(obs.weapon_type, 3);
        assert_eq!(obs.active_hand, HandSide::Left);
        assert!(obs.dual_wield);
    }

    #[test]
    fn test_right_only_weapon() {
        let hands = WeaponSnapshot::new(None, Some(WeaponHandle::new(7, 1)), false);

        let obs = classify(&hands).unwrap();
        assert_eq!(obs.weapon, WeaponRef(7));
        assert_eq!(obs.active_hand, HandSide::Right);
        assert_eq!(obs.target(), Target::Right);
    }

    #[test]
    fn test_left_only_targets_left() {
        let hands = WeaponSnapshot::new(Some(WeaponHandle::new(4, 0)), None, false);

        let obs = classify(&hands).unwrap();
        assert_eq!(obs.active_hand, HandSide::Left);
        assert_eq!(obs.target(), Target::Left);
    }

    #[test]
    fn test_unmatched_current_weapon_defaults_right() {
        let obs = classify(&Detached).unwrap();
        assert_eq!(obs.active_hand, HandSide::Right);
        assert_eq!(obs.weapon, WeaponRef(3));
        assert_eq!(obs.weapon_type, 1);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let hands = WeaponSnapshot::new(Some(WeaponHandle::new(1, 99)), None, false);
        assert_eq!(classify(&hands).unwrap().weapon_type, 99);

        let hands = WeaponSnapshot::new(None, Some(WeaponHandle::new(1, -3)), false);
        assert_eq!(classify(&hands).unwrap().weapon_type, -3);
    }

    #[test]
    fn test_weapon_ref_identity_not_type() {
        // Same type, different instances
        let a = WeaponHandle::new(1, 0);
        let b = WeaponHandle::new(2, 0);
        assert_ne!(a.id, b.id);
        assert_eq!(a.weapon_type, b.weapon_type);
    }

    #[test]
    fn test_hand_side_display() {
        assert_eq!(HandSide::Left.to_string(), "left");
        assert_eq!(HandSide::Right.to_string(), "right");
        assert_eq!(WeaponRef(12).to_string(), "#12");
    }
}
