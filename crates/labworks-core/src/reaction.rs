//! Reaction selection.
//!
//! The selector holds a single [`ActiveReaction`] record; `output == None`
//! means idle. Each step it either leaves the record alone (snoozed, or an
//! unfinished reaction still inside its replan window) or replaces it
//! wholesale with a fresh selection:
//!
//! 1. End compounds with a positive deficit, most deficient first, are
//!    searched depth-first for the first reaction whose inputs are already on
//!    hand ([`find_next_reaction`]).
//! 2. Failing that, the first overstocked byproduct is reverse-reacted.
//! 3. Failing that, the selector goes idle and snoozes.

use crate::compound::{Compound, MAX_CHAIN_DEPTH};
use crate::config::{ByproductRule, LabConfig};
use crate::deficit::{DeficitTable, TargetTable};
use crate::facility::FacilitySnapshot;
use crate::fixed::Ticks;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{info, trace};

/// Which way a reaction runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Combine the two feeders' contents into the output.
    #[default]
    Forward,
    /// Split the output back into the two feeders.
    Reverse,
}

/// The reaction the labs are currently working towards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveReaction {
    /// `None` while idle.
    pub output: Option<Compound>,
    /// Stock level at which the reaction is done: reached from below when
    /// forward, from above when reverse.
    pub target_amount: u32,
    pub direction: Direction,
    /// No selection happens before this tick.
    pub snooze_until: Ticks,
    /// Earliest tick an unfinished reaction may be replaced.
    pub replan_at: Ticks,
}

impl ActiveReaction {
    pub fn is_idle(&self) -> bool {
        self.output.is_none()
    }

    pub fn is_reverse(&self) -> bool {
        self.direction == Direction::Reverse
    }

    /// The two inputs of the output compound, in feeder order.
    pub fn inputs(&self) -> Option<(Compound, Compound)> {
        self.output.and_then(Compound::inputs)
    }

    /// Whether the reaction has nothing left to do at current stock.
    ///
    /// Idle is always finished. Reverse finishes once stock falls to the
    /// target. Forward finishes when either input runs short of one batch or
    /// the output reaches the target.
    pub fn is_finished(&self, facility: &FacilitySnapshot, reaction_amount: u32) -> bool {
        let Some(output) = self.output else {
            return true;
        };
        match self.direction {
            Direction::Reverse => facility.stock(output) <= self.target_amount,
            Direction::Forward => {
                let Some((a, b)) = output.inputs() else {
                    return true;
                };
                if facility.stock(a) < reaction_amount || facility.stock(b) < reaction_amount {
                    return true;
                }
                facility.stock(output) >= self.target_amount
            }
        }
    }
}

/// A reaction the chain search bottomed out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub compound: Compound,
    /// How much of `compound` the chain above it still wants.
    pub amount: u32,
}

/// Depth-first search from `target` for a reaction whose inputs both hold
/// at least `reaction_amount`. Raw elements are leaves and never match.
fn chain_find(
    target: Compound,
    demanded: u32,
    facility: &FacilitySnapshot,
    reaction_amount: u32,
    depth: usize,
) -> Option<Candidate> {
    if depth >= MAX_CHAIN_DEPTH {
        return None;
    }
    let (a, b) = target.inputs()?;
    let (held_a, held_b) = (facility.stock(a), facility.stock(b));
    trace!(%target, demanded, %a, held_a, %b, held_b, depth, "chain search");

    if held_a >= reaction_amount && held_b >= reaction_amount {
        return Some(Candidate {
            compound: target,
            amount: demanded,
        });
    }

    for (input, held) in [(a, held_a), (b, held_b)] {
        if held >= demanded || input.is_raw() {
            continue;
        }
        if let Some(hit) = chain_find(input, demanded - held, facility, reaction_amount, depth + 1)
        {
            return Some(hit);
        }
    }
    None
}

/// The next forward reaction to run, if any end compound's chain has a
/// producible step.
pub fn find_next_reaction(
    targets: &TargetTable,
    deficits: &DeficitTable,
    facility: &FacilitySnapshot,
    reaction_amount: u32,
) -> Option<Candidate> {
    let mut ends: Vec<(Compound, u32)> = targets
        .iter()
        .map(|(c, _)| (c, deficits.get(c)))
        .filter(|&(_, deficit)| deficit > 0)
        .collect();
    ends.sort_by_key(|&(_, deficit)| Reverse(deficit));

    ends.into_iter()
        .find_map(|(c, deficit)| chain_find(c, deficit, facility, reaction_amount, 0))
}

/// The first byproduct rule whose compound is overstocked in bulk storage.
pub fn find_overstock(
    byproducts: &[ByproductRule],
    facility: &FacilitySnapshot,
) -> Option<ByproductRule> {
    byproducts
        .iter()
        .find(|rule| facility.storage_quantity(rule.compound) > rule.threshold)
        .copied()
}

/// Result of one selector update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Snoozed, or the running reaction keeps the labs.
    Unchanged,
    /// A new record replaced the old one (possibly an idle one).
    Replanned(ActiveReaction),
}

/// Owns the active reaction record and decides when to replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSelector {
    active: ActiveReaction,
}

impl ReactionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &ActiveReaction {
        &self.active
    }

    /// Advance the state machine for this step.
    pub fn update(
        &mut self,
        config: &LabConfig,
        deficits: &DeficitTable,
        facility: &FacilitySnapshot,
    ) -> SelectionOutcome {
        let now = facility.tick;
        let tuning = &config.tuning;

        if now < self.active.snooze_until {
            return SelectionOutcome::Unchanged;
        }
        if now < self.active.replan_at
            && !self.active.is_finished(facility, tuning.reaction_amount)
        {
            return SelectionOutcome::Unchanged;
        }

        let replan_at = now.saturating_add(tuning.replan_interval);
        let next = if let Some(hit) =
            find_next_reaction(&config.targets, deficits, facility, tuning.reaction_amount)
        {
            ActiveReaction {
                output: Some(hit.compound),
                target_amount: facility
                    .stock(hit.compound)
                    .saturating_add(hit.amount.min(tuning.cycle_amount)),
                direction: Direction::Forward,
                snooze_until: now,
                replan_at,
            }
        } else if let Some(rule) = find_overstock(&config.byproducts, facility) {
            ActiveReaction {
                output: Some(rule.compound),
                target_amount: rule.threshold,
                direction: Direction::Reverse,
                snooze_until: now,
                replan_at,
            }
        } else {
            ActiveReaction {
                output: None,
                target_amount: 0,
                direction: Direction::Forward,
                snooze_until: now.saturating_add(tuning.snooze_duration),
                replan_at,
            }
        };

        if next.output != self.active.output || next.direction != self.active.direction {
            match next.output {
                Some(output) => info!(
                    tick = now,
                    %output,
                    direction = ?next.direction,
                    target = next.target_amount,
                    "reaction selected"
                ),
                None => info!(
                    tick = now,
                    snooze_until = next.snooze_until,
                    "no reaction available"
                ),
            }
        }

        self.active = next.clone();
        SelectionOutcome::Replanned(next)
    }

    pub(crate) fn restore(active: ActiveReaction) -> Self {
        Self { active }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deficit::plan_deficits;
    use crate::facility::{GridPosition, StoreSnapshot};
    use crate::inventory::Inventory;
    use Compound::*;

    fn facility_with(tick: Ticks, stock: &[(Compound, u32)]) -> FacilitySnapshot {
        let mut inventory = Inventory::new(u32::MAX);
        for &(c, q) in stock {
            let _ = inventory.add(c, q);
        }
        FacilitySnapshot {
            tick,
            storage: Some(StoreSnapshot {
                position: GridPosition::new(0, 0),
                inventory,
            }),
            ..Default::default()
        }
    }

    fn config(targets: &[(Compound, i64)]) -> LabConfig {
        let mut config = LabConfig::empty();
        config.targets = targets.iter().copied().collect();
        config
    }

    fn step(
        selector: &mut ReactionSelector,
        config: &LabConfig,
        f: &FacilitySnapshot,
    ) -> SelectionOutcome {
        let deficits = plan_deficits(&config.targets, |c| f.stock(c));
        selector.update(config, &deficits, f)
    }

    #[test]
    fn empty_facility_goes_idle_and_snoozes() {
        let config = config(&[(Ghodium, 10_000)]);
        let mut selector = ReactionSelector::new();
        let outcome = step(&mut selector, &config, &facility_with(100, &[]));

        let SelectionOutcome::Replanned(active) = outcome else {
            panic!("expected a replan");
        };
        assert!(active.is_idle());
        assert_eq!(active.snooze_until, 130);
        assert_eq!(active.replan_at, 3100);
    }

    #[test]
    fn snooze_blocks_reselection() {
        let config = config(&[(Ghodium, 10_000)]);
        let mut selector = ReactionSelector::new();
        step(&mut selector, &config, &facility_with(0, &[]));

        // Inputs arrive, but the selector is still snoozing.
        let stocked = facility_with(29, &[(Zynthium, 100), (Keanium, 100)]);
        assert_eq!(step(&mut selector, &config, &stocked), SelectionOutcome::Unchanged);

        let stocked = facility_with(30, &[(Zynthium, 100), (Keanium, 100)]);
        assert!(matches!(
            step(&mut selector, &config, &stocked),
            SelectionOutcome::Replanned(_)
        ));
        assert_eq!(selector.active().output, Some(ZynthiumKeanite));
    }

    #[test]
    fn recurses_to_leaf_reaction() {
        let config = config(&[(Ghodium, 10_000)]);
        let mut selector = ReactionSelector::new();
        let f = facility_with(0, &[(Zynthium, 3000), (Keanium, 3000)]);
        step(&mut selector, &config, &f);

        let active = selector.active();
        assert_eq!(active.output, Some(ZynthiumKeanite));
        assert_eq!(active.inputs(), Some((Zynthium, Keanium)));
        assert_eq!(active.direction, Direction::Forward);
        assert_eq!(active.target_amount, 5000, "capped by the cycle amount");
    }

    #[test]
    fn ghodium_waits_for_both_intermediates() {
        let config = config(&[(Ghodium, 10_000)]);
        let targets = &config.targets;

        let f = facility_with(0, &[(ZynthiumKeanite, 500), (UtriumLemergite, 4)]);
        let deficits = plan_deficits(targets, |c| f.stock(c));
        assert_eq!(find_next_reaction(targets, &deficits, &f, 5), None);

        let f = facility_with(0, &[(ZynthiumKeanite, 500), (UtriumLemergite, 5)]);
        let deficits = plan_deficits(targets, |c| f.stock(c));
        assert_eq!(
            find_next_reaction(targets, &deficits, &f, 5),
            Some(Candidate {
                compound: Ghodium,
                amount: 10_000
            })
        );
    }

    #[test]
    fn shortfall_is_demanded_from_inputs() {
        let config = config(&[(Ghodium, 1000)]);
        let f = facility_with(
            0,
            &[(ZynthiumKeanite, 300), (Utrium, 50), (Lemergium, 50)],
        );
        let deficits = plan_deficits(&config.targets, |c| f.stock(c));
        // ZK holds 300 of the 1000 wanted, but UL is missing entirely.
        let hit = find_next_reaction(&config.targets, &deficits, &f, 5).unwrap();
        assert_eq!(hit.compound, UtriumLemergite);
        assert_eq!(hit.amount, 1000);
    }

    #[test]
    fn raw_target_never_selected() {
        let config = config(&[(Catalyst, 1000)]);
        let f = facility_with(0, &[]);
        let deficits = plan_deficits(&config.targets, |c| f.stock(c));
        assert_eq!(find_next_reaction(&config.targets, &deficits, &f, 5), None);
    }

    #[test]
    fn most_deficient_target_first() {
        let config = config(&[(Ghodium, 100), (Hydroxide, 5000)]);
        let f = facility_with(
            0,
            &[
                (Zynthium, 100),
                (Keanium, 100),
                (Hydrogen, 100),
                (Oxygen, 100),
            ],
        );
        let deficits = plan_deficits(&config.targets, |c| f.stock(c));
        let hit = find_next_reaction(&config.targets, &deficits, &f, 5).unwrap();
        assert_eq!(hit.compound, Hydroxide);
    }

    #[test]
    fn reverse_only_when_forward_finds_nothing() {
        let mut config = config(&[(Ghodium, 10_000)]);
        config.byproducts = vec![ByproductRule {
            compound: GhodiumOxide,
            threshold: 1000,
        }];

        // Forward work available: reverse is not chosen.
        let mut selector = ReactionSelector::new();
        let f = facility_with(0, &[(GhodiumOxide, 5000), (Zynthium, 10), (Keanium, 10)]);
        step(&mut selector, &config, &f);
        assert_eq!(selector.active().direction, Direction::Forward);

        // Nothing producible: the overstock is reversed down to the threshold.
        let mut selector = ReactionSelector::new();
        let f = facility_with(0, &[(GhodiumOxide, 5000)]);
        step(&mut selector, &config, &f);
        let active = selector.active();
        assert_eq!(active.output, Some(GhodiumOxide));
        assert_eq!(active.direction, Direction::Reverse);
        assert_eq!(active.target_amount, 1000);
        assert_eq!(active.inputs(), Some((Ghodium, Oxygen)));
    }

    #[test]
    fn byproduct_at_threshold_is_not_overstocked() {
        let rules = [ByproductRule {
            compound: LemergiumOxide,
            threshold: 500,
        }];
        assert_eq!(find_overstock(&rules, &facility_with(0, &[(LemergiumOxide, 500)])), None);
        assert_eq!(
            find_overstock(&rules, &facility_with(0, &[(LemergiumOxide, 501)])),
            Some(rules[0])
        );
    }

    #[test]
    fn running_reaction_kept_until_replan_deadline() {
        let config = config(&[(Ghodium, 10_000), (Hydroxide, 100)]);
        let mut selector = ReactionSelector::new();
        let f = facility_with(0, &[(Hydrogen, 1000), (Oxygen, 1000)]);
        step(&mut selector, &config, &f);
        assert_eq!(selector.active().output, Some(Hydroxide));

        // A much larger G chain becomes producible; OH is not finished.
        let f = facility_with(
            2999,
            &[
                (Hydrogen, 900),
                (Oxygen, 900),
                (Zynthium, 3000),
                (Keanium, 3000),
                (Hydroxide, 10),
            ],
        );
        assert_eq!(step(&mut selector, &config, &f), SelectionOutcome::Unchanged);
        assert_eq!(selector.active().output, Some(Hydroxide));

        let f = FacilitySnapshot { tick: 3000, ..f };
        step(&mut selector, &config, &f);
        assert_eq!(selector.active().output, Some(ZynthiumKeanite));
    }

    #[test]
    fn finished_reaction_replaced_before_deadline() {
        let config = config(&[(Ghodium, 10_000), (Hydroxide, 100)]);
        let mut selector = ReactionSelector::new();
        step(&mut selector, &config, &facility_with(0, &[(Hydrogen, 1000), (Oxygen, 1000)]));
        assert_eq!(selector.active().output, Some(Hydroxide));

        // OH reached its target of 100.
        let f = facility_with(
            50,
            &[(Hydroxide, 100), (Hydrogen, 900), (Oxygen, 900), (Zynthium, 50), (Keanium, 50)],
        );
        step(&mut selector, &config, &f);
        assert_eq!(selector.active().output, Some(ZynthiumKeanite));
        assert_eq!(selector.active().replan_at, 3050);
    }

    #[test]
    fn finished_checks() {
        let forward = ActiveReaction {
            output: Some(ZynthiumKeanite),
            target_amount: 100,
            ..Default::default()
        };
        assert!(forward.is_finished(&facility_with(0, &[(Zynthium, 4), (Keanium, 50)]), 5));
        let at_target = facility_with(0, &[(Zynthium, 50), (Keanium, 50), (ZynthiumKeanite, 100)]);
        assert!(forward.is_finished(&at_target, 5));
        let below_target =
            facility_with(0, &[(Zynthium, 50), (Keanium, 50), (ZynthiumKeanite, 99)]);
        assert!(!forward.is_finished(&below_target, 5));

        let reverse = ActiveReaction {
            output: Some(GhodiumOxide),
            target_amount: 1000,
            direction: Direction::Reverse,
            ..Default::default()
        };
        assert!(reverse.is_finished(&facility_with(0, &[(GhodiumOxide, 1000)]), 5));
        assert!(!reverse.is_finished(&facility_with(0, &[(GhodiumOxide, 1001)]), 5));

        assert!(ActiveReaction::default().is_finished(&facility_with(0, &[]), 5));
    }
}
