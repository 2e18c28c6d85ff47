//! Deficit planning: how much of each compound must still be produced.
//!
//! [`plan_deficits`] is a pure pass. It seeds an accumulator with the
//! negated on-hand stock of every compound, injects each standing target at
//! its end compound and chains the injection down the graph, then clamps the
//! totals at zero. A surplus (negative running total) only ever lives inside
//! the accumulator, where it absorbs demand before it reaches the inputs.
//!
//! [`DeficitPlanner`] caches the last table and refreshes it on a fixed
//! cadence, since summing stock across every location is the expensive part.

use crate::compound::{Compound, MAX_CHAIN_DEPTH};
use crate::facility::FacilitySnapshot;
use crate::fixed::Ticks;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Target table
// ---------------------------------------------------------------------------

/// Standing inventory levels for end compounds.
///
/// Keyed by compound: setting a compound twice replaces its level, so a
/// planning pass injects each end compound exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTable {
    levels: BTreeMap<Compound, i64>,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the standing level for `compound`, returning the previous one.
    pub fn set(&mut self, compound: Compound, level: i64) -> Option<i64> {
        self.levels.insert(compound, level)
    }

    pub fn remove(&mut self, compound: Compound) -> Option<i64> {
        self.levels.remove(&compound)
    }

    pub fn get(&self, compound: Compound) -> Option<i64> {
        self.levels.get(&compound).copied()
    }

    /// Targets in compound order.
    pub fn iter(&self) -> impl Iterator<Item = (Compound, i64)> + '_ {
        self.levels.iter().map(|(c, l)| (*c, *l))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl FromIterator<(Compound, i64)> for TargetTable {
    fn from_iter<I: IntoIterator<Item = (Compound, i64)>>(iter: I) -> Self {
        let mut table = TargetTable::new();
        for (c, level) in iter {
            table.set(c, level);
        }
        table
    }
}

// ---------------------------------------------------------------------------
// Deficit table
// ---------------------------------------------------------------------------

/// Outstanding production per compound. Every value is non-negative;
/// compounds without a deficit are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeficitTable {
    deficits: BTreeMap<Compound, u32>,
}

impl DeficitTable {
    pub fn get(&self, compound: Compound) -> u32 {
        self.deficits.get(&compound).copied().unwrap_or(0)
    }

    /// Compounds with a positive deficit, in compound order.
    pub fn iter(&self) -> impl Iterator<Item = (Compound, u32)> + '_ {
        self.deficits.iter().map(|(c, d)| (*c, *d))
    }

    pub fn is_empty(&self) -> bool {
        self.deficits.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Planning pass
// ---------------------------------------------------------------------------

/// Running totals for one planning pass, indexed by [`Compound::index`].
struct DeficitAccumulator {
    totals: [i64; Compound::COUNT],
}

impl DeficitAccumulator {
    fn seeded(stock: impl Fn(Compound) -> u32) -> Self {
        let mut totals = [0i64; Compound::COUNT];
        for c in Compound::ALL {
            totals[c.index()] = -i64::from(stock(c));
        }
        Self { totals }
    }

    /// Add `amount` of demand at `compound`, then forward whatever part of it
    /// is not covered by existing surplus to both inputs.
    fn inject(&mut self, compound: Compound, amount: i64, depth: usize) {
        let total = &mut self.totals[compound.index()];
        *total += amount;
        let forwarded = amount.min(*total).max(0);

        if forwarded == 0 || depth >= MAX_CHAIN_DEPTH {
            return;
        }
        if let Some((a, b)) = compound.inputs() {
            self.inject(a, forwarded, depth + 1);
            self.inject(b, forwarded, depth + 1);
        }
    }

    fn into_table(self) -> DeficitTable {
        let deficits = Compound::ALL
            .into_iter()
            .filter_map(|c| {
                let clamped = self.totals[c.index()].clamp(0, i64::from(u32::MAX));
                (clamped > 0).then_some((c, clamped as u32))
            })
            .collect();
        DeficitTable { deficits }
    }
}

/// Compute the deficit table for `targets` given a stock lookup.
pub fn plan_deficits(targets: &TargetTable, stock: impl Fn(Compound) -> u32) -> DeficitTable {
    let mut acc = DeficitAccumulator::seeded(stock);
    for (compound, level) in targets.iter() {
        acc.inject(compound, level.max(0), 0);
    }
    acc.into_table()
}

// ---------------------------------------------------------------------------
// Throttled planner
// ---------------------------------------------------------------------------

/// Caches the deficit table and recomputes it at most once per interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeficitPlanner {
    table: DeficitTable,
    last_refresh: Option<Ticks>,
}

impl DeficitPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &DeficitTable {
        &self.table
    }

    pub fn last_refresh(&self) -> Option<Ticks> {
        self.last_refresh
    }

    /// Whether a refresh is due at `tick`. The first call is always due.
    pub fn is_due(&self, tick: Ticks, interval: Ticks) -> bool {
        self.last_refresh
            .is_none_or(|last| tick >= last.saturating_add(interval))
    }

    /// Recompute the table if due. Returns whether a refresh happened.
    pub fn refresh(
        &mut self,
        targets: &TargetTable,
        facility: &FacilitySnapshot,
        interval: Ticks,
    ) -> bool {
        if !self.is_due(facility.tick, interval) {
            return false;
        }
        self.table = plan_deficits(targets, |c| facility.stock(c));
        self.last_refresh = Some(facility.tick);
        debug!(
            tick = facility.tick,
            compounds = self.table.deficits.len(),
            "deficits refreshed"
        );
        true
    }

    /// Restore a previously saved table and refresh tick.
    pub(crate) fn restore(table: DeficitTable, last_refresh: Option<Ticks>) -> Self {
        Self {
            table,
            last_refresh,
        }
    }
}
