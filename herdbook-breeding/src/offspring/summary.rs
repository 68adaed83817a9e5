//! Per-group offspring accounting
//!
//! Single-pass aggregation over a group's individuals, used by the group
//! detail and list views to answer "how many can still be placed".

use serde::Serialize;

use super::state::{KeeperIntent, LifeState, OffspringState, PlacementState};

/// Counts per life and placement status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub alive: u32,
    pub deceased: u32,
    pub unassigned: u32,
    pub option_hold: u32,
    pub reserved: u32,
    pub placed: u32,
    pub returned: u32,
    pub transferred: u32,
}

/// Dashboard summary for one offspring group
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupSummary {
    pub counts: StatusCounts,
    /// Individuals a breeder can still offer: alive, unassigned or on an
    /// option hold, and not withheld/kept by the breeder.
    pub available_to_place: u32,
    /// placed / (alive + deceased); None when the group has no recorded
    /// individuals (an undefined rate, not zero).
    pub placement_rate: Option<f64>,
}

/// Summarize a group's offspring in one pass.
pub fn summarize(offspring: &[OffspringState]) -> GroupSummary {
    let mut counts = StatusCounts::default();
    let mut available_to_place = 0u32;

    for state in offspring {
        match state.life {
            LifeState::Alive => counts.alive += 1,
            LifeState::Deceased => counts.deceased += 1,
        }
        match state.placement {
            PlacementState::Unassigned => counts.unassigned += 1,
            PlacementState::OptionHold => counts.option_hold += 1,
            PlacementState::Reserved => counts.reserved += 1,
            PlacementState::Placed => counts.placed += 1,
            PlacementState::Returned => counts.returned += 1,
            PlacementState::Transferred => counts.transferred += 1,
        }
        if state.life == LifeState::Alive
            && matches!(
                state.placement,
                PlacementState::Unassigned | PlacementState::OptionHold
            )
            && !matches!(state.keeper, KeeperIntent::Withheld | KeeperIntent::Keep)
        {
            available_to_place += 1;
        }
    }

    let total = counts.alive + counts.deceased;
    let placement_rate = if total > 0 {
        Some(f64::from(counts.placed) / f64::from(total))
    } else {
        None
    };

    GroupSummary {
        counts,
        available_to_place,
        placement_rate,
    }
}
