//! Feeder lab assignment.
//!
//! Two labs are dedicated to holding the inputs of the active reaction; every
//! other lab is an output lab that reacts using both feeders. A feeder is only
//! useful if output labs are within interaction range of it, so selection
//! greedily favours labs with many neighbours, breaking ties towards the
//! transfer point.
//!
//! The assignment is cached. It is re-validated at most once per interval and
//! only recomputed when missing or broken; a working assignment is never
//! re-optimised.

use crate::facility::{FacilitySnapshot, GridPosition, LabSnapshot};
use crate::fixed::Ticks;
use crate::id::LabId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fewest labs that can form a feeder pair plus one output.
pub const MIN_LABS: usize = 3;

/// The two feeder labs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeederPair {
    pub input1: LabId,
    pub input2: LabId,
}

impl FeederPair {
    pub fn contains(&self, lab: LabId) -> bool {
        self.input1 == lab || self.input2 == lab
    }
}

/// What a layout check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChange {
    /// Not due, or the cached assignment is still valid.
    Unchanged,
    /// A new pair was selected.
    Assigned(FeederPair),
    /// A previous pair was dropped and no replacement was found.
    Cleared,
}

/// Number of labs within `range` of `lab`, not counting `lab` itself or
/// `exclude`.
pub fn labs_in_range(
    labs: &[LabSnapshot],
    lab: &LabSnapshot,
    exclude: Option<LabId>,
    range: u32,
) -> usize {
    labs.iter()
        .filter(|other| other.id != lab.id && Some(other.id) != exclude)
        .filter(|other| other.position.chebyshev_distance(&lab.position) <= range)
        .count()
}

/// Greedy feeder selection. Returns `None` with fewer than [`MIN_LABS`] labs
/// or when either candidate would have no output lab in range.
pub fn select_feeders(
    labs: &[LabSnapshot],
    anchor: Option<GridPosition>,
    range: u32,
) -> Option<FeederPair> {
    if labs.len() < MIN_LABS {
        return None;
    }

    let mut sorted: Vec<&LabSnapshot> = labs.iter().collect();
    if let Some(anchor) = anchor {
        sorted.sort_by_key(|lab| lab.position.chebyshev_distance(&anchor));
    }

    // The two closest labs are the defaults; later labs replace them only by
    // reaching strictly more neighbours.
    let mut first = sorted[0];
    for &lab in &sorted[2..] {
        if labs_in_range(labs, lab, None, range) > labs_in_range(labs, first, None, range) {
            first = lab;
        }
    }

    let mut second = sorted[1];
    for &lab in &sorted[2..] {
        if lab.id == first.id {
            continue;
        }
        if labs_in_range(labs, lab, Some(first.id), range)
            > labs_in_range(labs, second, Some(first.id), range)
        {
            second = lab;
        }
    }

    if labs_in_range(labs, first, Some(second.id), range) == 0
        || labs_in_range(labs, second, Some(first.id), range) == 0
    {
        return None;
    }

    Some(FeederPair {
        input1: first.id,
        input2: second.id,
    })
}

/// Whether `pair` still resolves to two distinct labs that each reach at
/// least one output lab.
pub fn pair_is_valid(facility: &FacilitySnapshot, pair: FeederPair, range: u32) -> bool {
    if pair.input1 == pair.input2 {
        return false;
    }
    let (Some(lab1), Some(lab2)) = (facility.lab(pair.input1), facility.lab(pair.input2)) else {
        return false;
    };
    labs_in_range(&facility.labs, lab1, Some(pair.input2), range) > 0
        && labs_in_range(&facility.labs, lab2, Some(pair.input1), range) > 0
}

/// Cached feeder assignment for one facility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutAssigner {
    feeders: Option<FeederPair>,
    last_check: Option<Ticks>,
}

impl LayoutAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeders(&self) -> Option<FeederPair> {
        self.feeders
    }

    pub fn last_check(&self) -> Option<Ticks> {
        self.last_check
    }

    /// Re-validate the assignment if `interval` ticks have passed since the
    /// last check, repairing it when missing or broken.
    pub fn check(
        &mut self,
        facility: &FacilitySnapshot,
        interval: Ticks,
        range: u32,
    ) -> LayoutChange {
        if let Some(last) = self.last_check
            && facility.tick < last.saturating_add(interval)
        {
            return LayoutChange::Unchanged;
        }
        self.last_check = Some(facility.tick);

        if let Some(pair) = self.feeders {
            if pair_is_valid(facility, pair, range) {
                return LayoutChange::Unchanged;
            }
            debug!(tick = facility.tick, ?pair, "feeder assignment broken");
        }

        let previous = self.feeders.take();
        match select_feeders(&facility.labs, facility.anchor(), range) {
            Some(pair) => {
                debug!(
                    tick = facility.tick,
                    input1 = ?pair.input1,
                    input2 = ?pair.input2,
                    labs = facility.labs.len(),
                    "feeders assigned"
                );
                self.feeders = Some(pair);
                LayoutChange::Assigned(pair)
            }
            None if previous.is_some() => LayoutChange::Cleared,
            None => LayoutChange::Unchanged,
        }
    }

    /// Restore a previously saved assignment.
    pub(crate) fn restore(feeders: Option<FeederPair>, last_check: Option<Ticks>) -> Self {
        Self {
            feeders,
            last_check,
        }
    }
}
