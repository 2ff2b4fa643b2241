//! Adaptive trigger effect vocabulary and the weapon effect table
//!
//! [`EffectCommand`] is the closed set of commands the trigger transport
//! understands. [`EffectTable`] maps weapon type codes to effect shapes and
//! is plain data, so new weapon types are added through configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Number of zones in a multi-position feedback pattern
pub const MULTI_POSITION_ZONES: usize = 10;

/// Weapon effect mode used by the stock table
const WEAPON_MODE: u8 = 2;

// ============================================================================
// Commands
// ============================================================================

/// Controller selector for an effect command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Left,
    Right,
    Both,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Left => write!(f, "left"),
            Target::Right => write!(f, "right"),
            Target::Both => write!(f, "both"),
        }
    }
}

/// A single trigger effect command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EffectCommand {
    /// Clear any active effect
    Disable { target: Target },
    /// Constant resistance from a position onward
    Feedback {
        target: Target,
        position: u8,
        strength: u8,
    },
    /// Weapon-style resistance that snaps when pulled through
    Weapon {
        target: Target,
        mode: u8,
        position: u8,
        strength: u8,
    },
    /// Per-zone resistance along the trigger travel
    MultiPositionFeedback {
        target: Target,
        strengths: [u8; MULTI_POSITION_ZONES],
    },
    /// Resistance ramping between two strengths
    SlopeFeedback {
        target: Target,
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    },
}

impl EffectCommand {
    /// Reset command sent before every effect change
    pub const RESET: EffectCommand = EffectCommand::Disable {
        target: Target::Both,
    };

    /// Controller(s) this command applies to
    pub fn target(&self) -> Target {
        match *self {
            EffectCommand::Disable { target }
            | EffectCommand::Feedback { target, .. }
            | EffectCommand::Weapon { target, .. }
            | EffectCommand::MultiPositionFeedback { target, .. }
            | EffectCommand::SlopeFeedback { target, .. } => target,
        }
    }

    /// Short name of the command kind, for logs
    pub fn name(&self) -> &'static str {
        match self {
            EffectCommand::Disable { .. } => "disable",
            EffectCommand::Feedback { .. } => "feedback",
            EffectCommand::Weapon { .. } => "weapon",
            EffectCommand::MultiPositionFeedback { .. } => "multi_position_feedback",
            EffectCommand::SlopeFeedback { .. } => "slope_feedback",
        }
    }
}

// ============================================================================
// Effect Table
// ============================================================================

/// Target-independent effect parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectShape {
    /// No effect beyond the reset
    Off,
    Feedback {
        position: u8,
        strength: u8,
    },
    Weapon {
        mode: u8,
        position: u8,
        strength: u8,
    },
    MultiPositionFeedback {
        strengths: [u8; MULTI_POSITION_ZONES],
    },
    SlopeFeedback {
        mode: u8,
        start_strength: u8,
        end_strength: u8,
        curve: u8,
    },
}

impl EffectShape {
    /// Bind this shape to a target
    ///
    /// Returns `None` for [`EffectShape::Off`].
    pub fn to_command(self, target: Target) -> Option<EffectCommand> {
        match self {
            EffectShape::Off => None,
            EffectShape::Feedback { position, strength } => Some(EffectCommand::Feedback {
                target,
                position,
                strength,
            }),
            EffectShape::Weapon {
                mode,
                position,
                strength,
            } => Some(EffectCommand::Weapon {
                target,
                mode,
                position,
                strength,
            }),
            EffectShape::MultiPositionFeedback { strengths } => {
                Some(EffectCommand::MultiPositionFeedback { target, strengths })
            }
            EffectShape::SlopeFeedback {
                mode,
                start_strength,
                end_strength,
                curve,
            } => Some(EffectCommand::SlopeFeedback {
                target,
                mode,
                start_strength,
                end_strength,
                curve,
            }),
        }
    }
}

/// How an effect is fanned out while dual wielding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DualFanout {
    /// One command to the left controller and one to the right
    #[default]
    PerHand,
    /// A single command targeting both controllers
    Combined,
}

/// One row of the effect table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub shape: EffectShape,
    #[serde(default)]
    pub dual: DualFanout,
}

impl EffectEntry {
    pub const fn new(shape: EffectShape, dual: DualFanout) -> Self {
        Self { shape, dual }
    }

    pub const fn per_hand(shape: EffectShape) -> Self {
        Self::new(shape, DualFanout::PerHand)
    }

    pub const fn combined(shape: EffectShape) -> Self {
        Self::new(shape, DualFanout::Combined)
    }
}

/// Weapon type code to effect mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectTable {
    /// Known weapon types
    #[serde(default = "default_entries")]
    pub entries: BTreeMap<i32, EffectEntry>,

    /// Row used for any type code not in `entries`
    #[serde(default = "default_fallback")]
    pub fallback: EffectEntry,

    /// Optional override of the fallback shape for single-hand mode
    #[serde(default)]
    pub single_hand_fallback: Option<EffectShape>,
}

fn default_entries() -> BTreeMap<i32, EffectEntry> {
    BTreeMap::from([
        (
            0,
            EffectEntry::per_hand(EffectShape::Weapon {
                mode: WEAPON_MODE,
                position: 4,
                strength: 4,
            }),
        ),
        (
            1,
            EffectEntry::per_hand(EffectShape::Weapon {
                mode: WEAPON_MODE,
                position: 4,
                strength: 8,
            }),
        ),
        (
            2,
            EffectEntry::per_hand(EffectShape::MultiPositionFeedback {
                strengths: [4, 0, 0, 5, 0, 0, 6, 0, 0, 7],
            }),
        ),
        (
            3,
            EffectEntry::per_hand(EffectShape::SlopeFeedback {
                mode: 1,
                start_strength: 9,
                end_strength: 8,
                curve: 1,
            }),
        ),
        (4, EffectEntry::per_hand(EffectShape::Off)),
        (
            5,
            EffectEntry::combined(EffectShape::Weapon {
                mode: WEAPON_MODE,
                position: 4,
                strength: 4,
            }),
        ),
    ])
}

fn default_fallback() -> EffectEntry {
    EffectEntry::combined(EffectShape::Feedback {
        position: 128,
        strength: 100,
    })
}

impl Default for EffectTable {
    fn default() -> Self {
        Self {
            entries: default_entries(),
            fallback: default_fallback(),
            single_hand_fallback: None,
        }
    }
}

impl EffectTable {
    /// Look up the row for a type code
    ///
    /// The flag is `false` when the fallback row was used.
    pub fn lookup(&self, weapon_type: i32) -> (&EffectEntry, bool) {
        match self.entries.get(&weapon_type) {
            Some(entry) => (entry, true),
            None => (&self.fallback, false),
        }
    }

    /// Whether a type code has its own row
    pub fn is_known(&self, weapon_type: i32) -> bool {
        self.entries.contains_key(&weapon_type)
    }

    /// Expand a type code into the effect commands that follow the reset
    ///
    /// Dual wield fans out per the row's [`DualFanout`]; single-hand mode
    /// emits one command to `active`.
    pub fn commands(&self, weapon_type: i32, dual_wield: bool, active: Target) -> Vec<EffectCommand> {
        let (entry, known) = self.lookup(weapon_type);

        if !dual_wield {
            let shape = match (known, self.single_hand_fallback) {
                (false, Some(shape)) => shape,
                _ => entry.shape,
            };
            return shape.to_command(active).into_iter().collect();
        }

        match entry.dual {
            DualFanout::PerHand => [Target::Left, Target::Right]
                .into_iter()
                .filter_map(|target| entry.shape.to_command(target))
                .collect(),
            DualFanout::Combined => entry.shape.to_command(Target::Both).into_iter().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
