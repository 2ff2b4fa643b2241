//! Trigger effect dispatcher
//!
//! Compares each [`Observation`] against the last applied weapon state and,
//! only when something changed, produces a reset followed by the effect
//! commands for the new weapon. Repeated identical observations produce
//! nothing, so the device sees at most one update per transition.

use crate::effects::{EffectCommand, EffectTable};
use crate::weapon::{Observation, WeaponRef};

// ============================================================================
// State
// ============================================================================

/// Last weapon state applied to the triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherState {
    /// Identity of the last weapon (None = nothing applied yet)
    pub last_weapon: Option<WeaponRef>,
    /// Last weapon type code, [`DispatcherState::UNSET_TYPE`] before the first dispatch
    pub last_weapon_type: i32,
    /// Last dual wield flag
    pub last_dual_wield: bool,
}

impl DispatcherState {
    /// Sentinel type code before anything has been applied
    pub const UNSET_TYPE: i32 = -1;

    /// State after applying an observation
    pub fn from_observation(observation: &Observation) -> Self {
        Self {
            last_weapon: Some(observation.weapon),
            last_weapon_type: observation.weapon_type,
            last_dual_wield: observation.dual_wield,
        }
    }

    /// Whether nothing has been applied yet
    pub fn is_unset(&self) -> bool {
        self.last_weapon.is_none()
    }

    /// Whether an observation is already reflected by this state
    ///
    /// Weapon identity, type code and dual wield flag must all match.
    pub fn matches(&self, observation: &Observation) -> bool {
        self.last_weapon == Some(observation.weapon)
            && self.last_weapon_type == observation.weapon_type
            && self.last_dual_wield == observation.dual_wield
    }
}

impl Default for DispatcherState {
    fn default() -> Self {
        Self {
            last_weapon: None,
            last_weapon_type: Self::UNSET_TYPE,
            last_dual_wield: false,
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Compute the commands for an observation
///
/// Returns an empty list and the unchanged state when the observation
/// matches `state`. Otherwise the list starts with `Disable(Both)` and is
/// followed by the table's commands for the observed weapon.
pub fn dispatch(
    observation: &Observation,
    state: &DispatcherState,
    table: &EffectTable,
) -> (Vec<EffectCommand>, DispatcherState) {
    if state.matches(observation) {
        return (Vec::new(), *state);
    }

    if !table.is_known(observation.weapon_type) {
        tracing::warn!(
            weapon_type = observation.weapon_type,
            "Unknown weapon type, using fallback effect"
        );
    }

    let effects = table.commands(
        observation.weapon_type,
        observation.dual_wield,
        observation.target(),
    );

    let mut commands = Vec::with_capacity(effects.len() + 1);
    commands.push(EffectCommand::RESET);
    commands.extend(effects);

    tracing::debug!(
        weapon = %observation.weapon,
        weapon_type = observation.weapon_type,
        dual_wield = observation.dual_wield,
        hand = %observation.active_hand,
        commands = commands.len(),
        "Weapon state changed"
    );

    (commands, DispatcherState::from_observation(observation))
}

/// Stateful dispatcher owning its last-applied state and effect table
#[derive(Debug, Clone, Default)]
pub struct TriggerDispatcher {
    state: DispatcherState,
    table: EffectTable,
}

impl TriggerDispatcher {
    pub fn new(table: EffectTable) -> Self {
        Self {
            state: DispatcherState::default(),
            table,
        }
    }

    /// Dispatch an observation, retaining the new state
    pub fn dispatch(&mut self, observation: &Observation) -> Vec<EffectCommand> {
        let (commands, state) = dispatch(observation, &self.state, &self.table);
        self.state = state;
        commands
    }

    /// Forget the applied state so the next observation is re-applied
    pub fn reset(&mut self) {
        self.state = DispatcherState::default();
    }

    /// Replace the effect table
    ///
    /// Also resets the state so the current weapon picks up the new row.
    pub fn set_table(&mut self, table: EffectTable) {
        self.table = table;
        self.reset();
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    pub fn table(&self) -> &EffectTable {
        &self.table
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectEntry, EffectShape, Target};
    use crate::weapon::HandSide;

    fn obs(hand: HandSide, id: u64, weapon_type: i32, dual: bool) -> Observation {
        Observation {
            active_hand: hand,
            weapon: WeaponRef(id),
            weapon_type,
            dual_wield: dual,
        }
    }

    #[test]
    fn test_default_state_is_unset() {
        let state = DispatcherState::default();
        assert!(state.is_unset());
        assert_eq!(state.last_weapon_type, DispatcherState::UNSET_TYPE);
        assert!(!state.last_dual_wield);
    }

    #[test]
    fn test_first_dispatch_from_unset() {
        let table = EffectTable::default();
        let state = DispatcherState::default();

        let (commands, new_state) = dispatch(&obs(HandSide::Left, 1, 0, false), &state, &table);

        assert_eq!(
            commands,
            vec![
                EffectCommand::Disable { target: Target::Both },
                EffectCommand::Weapon { target: Target::Left, mode: 2, position: 4, strength: 4 },
            ]
        );
        assert_eq!(
            new_state,
            DispatcherState {
                last_weapon: Some(WeaponRef(1)),
                last_weapon_type: 0,
                last_dual_wield: false,
            }
        );
    }

    #[test]
    fn test_switch_to_dual_wield() {
        let table = EffectTable::default();
        let (_, state) = dispatch(&obs(HandSide::Left, 1, 0, false), &DispatcherState::default(), &table);

        let (commands, new_state) = dispatch(&obs(HandSide::Left, 1, 0, true), &state, &table);

        assert_eq!(
            commands,
            vec![
                EffectCommand::Disable { target: Target::Both },
                EffectCommand::Weapon { target: Target::Left, mode: 2, position: 4, strength: 4 },
                EffectCommand::Weapon { target: Target::Right, mode: 2, position: 4, strength: 4 },
            ]
        );
        assert!(new_state.last_dual_wield);
    }

    #[test]
    fn test_unchanged_observation_is_noop() {
        let table = EffectTable::default();
        let observation = obs(HandSide::Right, 3, 2, false);
        let (_, state) = dispatch(&observation, &DispatcherState::default(), &table);

        for _ in 0..10 {
            let (commands, same) = dispatch(&observation, &state, &table);
            assert!(commands.is_empty());
            assert_eq!(same, state);
        }
    }

    #[test]
    fn test_single_dispatch_per_transition() {
        let mut dispatcher = TriggerDispatcher::default();
        let first = obs(HandSide::Left, 1, 0, false);
        let second = obs(HandSide::Left, 1, 1, false);

        let mut batches = Vec::new();
        for _ in 0..5 {
            batches.push(dispatcher.dispatch(&first));
        }
        batches.push(dispatcher.dispatch(&second));
        for _ in 0..5 {
            batches.push(dispatcher.dispatch(&second));
        }

        let non_empty: Vec<usize> = batches
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(non_empty, vec![0, 5]);
    }

    #[test]
    fn test_reset_precedes_every_batch() {
        let mut dispatcher = TriggerDispatcher::default();
        let sequence = [
            obs(HandSide::Left, 1, 0, false),
            obs(HandSide::Left, 1, 0, true),
            obs(HandSide::Right, 2, 4, false),
            obs(HandSide::Right, 3, 99, true),
            obs(HandSide::Left, 4, 5, true),
        ];

        for observation in &sequence {
            let commands = dispatcher.dispatch(observation);
            assert_eq!(commands.first(), Some(&EffectCommand::RESET));
        }
    }

    #[test]
    fn test_dual_wield_fanout_per_type() {
        let table = EffectTable::default();

        for code in 0..=3 {
            let (commands, _) = dispatch(&obs(HandSide::Right, 1, code, true), &DispatcherState::default(), &table);
            assert_eq!(commands.len(), 3, "type {}", code);
            assert_eq!(commands[1].target(), Target::Left);
            assert_eq!(commands[2].target(), Target::Right);

            // Identical parameters apart from the target
            match (commands[1], commands[2]) {
                (EffectCommand::Weapon { mode: a, position: b, strength: c, .. },
                 EffectCommand::Weapon { mode: x, position: y, strength: z, .. }) => {
                    assert_eq!((a, b, c), (x, y, z));
                }
                (EffectCommand::MultiPositionFeedback { strengths: a, .. },
                 EffectCommand::MultiPositionFeedback { strengths: b, .. }) => assert_eq!(a, b),
                (EffectCommand::SlopeFeedback { mode: a, start_strength: b, end_strength: c, curve: d, .. },
                 EffectCommand::SlopeFeedback { mode: w, start_strength: x, end_strength: y, curve: z, .. }) => {
                    assert_eq!((a, b, c, d), (w, x, y, z));
                }
                other => panic!("mismatched pair for type {}: {:?}", code, other),
            }
        }

        let (commands, _) = dispatch(&obs(HandSide::Right, 1, 5, true), &DispatcherState::default(), &table);
        assert_eq!(
            commands,
            vec![
                EffectCommand::RESET,
                EffectCommand::Weapon { target: Target::Both, mode: 2, position: 4, strength: 4 },
            ]
        );

        let (commands, _) = dispatch(&obs(HandSide::Right, 1, 4, true), &DispatcherState::default(), &table);
        assert_eq!(commands, vec![EffectCommand::RESET]);
    }

    #[test]
    fn test_single_hand_targets_active_hand() {
        let table = EffectTable::default();

        for hand in [HandSide::Left, HandSide::Right] {
            for code in [0, 1, 2, 3, 5, 99] {
                let (commands, _) = dispatch(&obs(hand, 1, code, false), &DispatcherState::default(), &table);
                assert_eq!(commands.len(), 2);
                assert_eq!(commands[1].target(), Target::from(hand));
            }
        }
    }

    #[test]
    fn test_unknown_type_routes_to_fallback() {
        let table = EffectTable::default();
        let (commands, state) = dispatch(&obs(HandSide::Right, 1, 99, false), &DispatcherState::default(), &table);

        assert_eq!(
            commands,
            vec![
                EffectCommand::RESET,
                EffectCommand::Feedback { target: Target::Right, position: 128, strength: 100 },
            ]
        );
        assert_eq!(state.last_weapon_type, 99);
    }

    #[test]
    fn test_new_instance_same_type_dispatches() {
        let mut dispatcher = TriggerDispatcher::default();
        assert!(!dispatcher.dispatch(&obs(HandSide::Left, 1, 0, false)).is_empty());
        assert!(dispatcher.dispatch(&obs(HandSide::Left, 1, 0, false)).is_empty());

        let commands = dispatcher.dispatch(&obs(HandSide::Left, 2, 0, false));
        assert_eq!(commands.len(), 2);
        assert_eq!(dispatcher.state().last_weapon, Some(WeaponRef(2)));
    }

    #[test]
    fn test_hand_change_alone_is_not_a_transition() {
        // Active hand is not part of the retained state
        let mut dispatcher = TriggerDispatcher::default();
        dispatcher.dispatch(&obs(HandSide::Left, 1, 0, false));
        assert!(dispatcher.dispatch(&obs(HandSide::Right, 1, 0, false)).is_empty());
    }

    #[test]
    fn test_reset_reapplies_current_weapon() {
        let mut dispatcher = TriggerDispatcher::default();
        let observation = obs(HandSide::Left, 1, 1, false);
        dispatcher.dispatch(&observation);

        dispatcher.reset();
        assert!(dispatcher.state().is_unset());
        assert_eq!(dispatcher.dispatch(&observation).len(), 2);
    }

    #[test]
    fn test_set_table_takes_effect() {
        let mut dispatcher = TriggerDispatcher::default();
        let observation = obs(HandSide::Left, 1, 0, false);
        dispatcher.dispatch(&observation);

        let mut table = EffectTable::default();
        table.entries.insert(0, EffectEntry::per_hand(EffectShape::Feedback { position: 1, strength: 2 }));
        dispatcher.set_table(table);

        assert_eq!(
            dispatcher.dispatch(&observation),
            vec![
                EffectCommand::RESET,
                EffectCommand::Feedback { target: Target::Left, position: 1, strength: 2 },
            ]
        );
    }
}
