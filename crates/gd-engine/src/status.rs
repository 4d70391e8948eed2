//! Status stack bookkeeping — application with caps, duration decay,
//! and the turn-edge ticks shared by both sides of a battle.
//!
//! Phase order is part of the rules: on-turn-start effects fire in
//! insertion order; burn fires at the owner's turn end before duration
//! decay.

use gd_data::ContentRegistry;
use gd_types::state::StatusStack;
use gd_types::{StatusId, StatusKind};

/// HP lost per burn stack at the owner's turn end.
pub const BURN_DAMAGE_PER_STACK: u32 = 2;
/// Damage reflected per thorns stack.
pub const THORNS_DAMAGE_PER_STACK: u32 = 1;
/// Energy granted per charge stack at the owner's next turn start.
pub const CHARGE_ENERGY_PER_STACK: u32 = 1;

/// Stacks of a status kind currently held.
pub fn stacks_of(statuses: &[StatusStack], kind: StatusKind) -> u32 {
    let id = kind.id();
    statuses.iter().find(|s| s.id == id).map_or(0, |s| s.stacks)
}

/// Apply stacks of a status, clamped to the registry's per-status cap.
/// New statuses append (insertion order is the tick order); repeats
/// accumulate in place. Returns the resulting stack count.
pub fn apply_status(
    statuses: &mut Vec<StatusStack>,
    registry: &ContentRegistry,
    id: &StatusId,
    stacks: u32,
    duration: Option<u32>,
) -> u32 {
    let cap = registry.status(id).map_or(u32::MAX, |def| def.max_stacks);
    if let Some(existing) = statuses.iter_mut().find(|s| s.id == *id) {
        existing.stacks = (existing.stacks + stacks).min(cap);
        if duration.is_some() {
            existing.remaining_turns = duration;
        }
        existing.stacks
    } else {
        let entry = StatusStack {
            id: id.clone(),
            stacks: stacks.min(cap),
            remaining_turns: duration,
        };
        let result = entry.stacks;
        statuses.push(entry);
        result
    }
}

/// Remove a status outright. Returns whether it was present.
pub fn remove_status(statuses: &mut Vec<StatusStack>, id: &StatusId) -> bool {
    let before = statuses.len();
    statuses.retain(|s| s.id != *id);
    statuses.len() != before
}

/// Burn tick at the owner's turn end: returns the HP to lose, then
/// decays one stack (removing the status at zero).
pub fn burn_tick(statuses: &mut Vec<StatusStack>) -> u32 {
    let id = StatusKind::Burn.id();
    let Some(pos) = statuses.iter().position(|s| s.id == id) else {
        return 0;
    };
    let damage = statuses[pos].stacks * BURN_DAMAGE_PER_STACK;
    if statuses[pos].stacks <= 1 {
        statuses.remove(pos);
    } else {
        statuses[pos].stacks -= 1;
    }
    damage
}

/// Decrement finite durations at the owner's turn end. Returns the IDs
/// of statuses that expired (in their former insertion order).
pub fn decrement_durations(statuses: &mut Vec<StatusStack>) -> Vec<StatusId> {
    let mut expired = Vec::new();
    statuses.retain_mut(|s| match &mut s.remaining_turns {
        None => true,
        Some(turns) => {
            *turns = turns.saturating_sub(1);
            if *turns == 0 {
                expired.push(s.id.clone());
                false
            } else {
                true
            }
        }
    });
    expired
}

/// Consume charge stacks at turn start. Returns the bonus energy.
pub fn consume_charge(statuses: &mut Vec<StatusStack>) -> u32 {
    let stacks = stacks_of(statuses, StatusKind::Charge);
    if stacks > 0 {
        remove_status(statuses, &StatusKind::Charge.id());
    }
    stacks * CHARGE_ENERGY_PER_STACK
}
