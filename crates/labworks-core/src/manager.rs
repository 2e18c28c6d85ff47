//! Per-facility orchestrator.
//!
//! A [`LabManager`] owns everything that persists between steps for one
//! facility: the feeder assignment, the cached deficit table, the active
//! reaction and the event log. Each call to [`LabManager::step`] runs, in
//! order:
//!
//! 1. **Layout**: validate or repair the feeder assignment (throttled).
//! 2. **Deficits**: refresh the deficit table (throttled).
//! 3. **Selection**: advance the reaction state machine.
//! 4. **Execution**: emit commands if the feeders are loaded.
//!
//! Hauling is demand-driven and separate: the driver calls
//! [`LabManager::generate_hauling_reservation`] whenever an agent asks for
//! work.

use crate::config::{ConfigError, LabConfig};
use crate::deficit::{DeficitPlanner, DeficitTable, TargetTable};
use crate::event::{EventBuffer, LabEvent};
use crate::executor::{LabCommand, check_loaded, plan_commands};
use crate::facility::{FacilitySnapshot, HaulerSnapshot};
use crate::hauling::{ReservationQueue, generate_reservation};
use crate::layout::{FeederPair, LayoutAssigner, LayoutChange};
use crate::reaction::{ActiveReaction, ReactionSelector, SelectionOutcome};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct LabManager {
    pub(crate) config: LabConfig,
    pub(crate) layout: LayoutAssigner,
    pub(crate) deficits: DeficitPlanner,
    pub(crate) selector: ReactionSelector,
    pub(crate) events: EventBuffer,
}

impl LabManager {
    /// Create a manager for one facility. The configuration is validated up
    /// front.
    pub fn new(config: LabConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = EventBuffer::new(config.tuning.event_capacity);
        Ok(Self {
            config,
            layout: LayoutAssigner::new(),
            deficits: DeficitPlanner::new(),
            selector: ReactionSelector::new(),
            events,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn targets(&self) -> &TargetTable {
        &self.config.targets
    }

    pub fn feeders(&self) -> Option<FeederPair> {
        self.layout.feeders()
    }

    pub fn deficits(&self) -> &DeficitTable {
        self.deficits.table()
    }

    pub fn active_reaction(&self) -> &ActiveReaction {
        self.selector.active()
    }

    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    /// Take every recorded event, oldest first.
    pub fn drain_events(&mut self) -> Vec<LabEvent> {
        self.events.drain()
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Run one control step against `facility` and return the reactions the
    /// driver should run.
    pub fn step(&mut self, facility: &FacilitySnapshot) -> Vec<LabCommand> {
        let tick = facility.tick;
        let tuning = &self.config.tuning;

        match self.layout.check(
            facility,
            tuning.layout_check_interval,
            tuning.interaction_range,
        ) {
            LayoutChange::Unchanged => {}
            LayoutChange::Assigned(pair) => self.events.push(LabEvent::FeedersAssigned {
                input1: pair.input1,
                input2: pair.input2,
                tick,
            }),
            LayoutChange::Cleared => self.events.push(LabEvent::FeedersCleared { tick }),
        }

        if self
            .deficits
            .refresh(&self.config.targets, facility, tuning.deficit_interval)
        {
            self.events.push(LabEvent::DeficitsRefreshed {
                compounds: self.deficits.table().iter().count(),
                tick,
            });
        }

        if let SelectionOutcome::Replanned(active) =
            self.selector
                .update(&self.config, self.deficits.table(), facility)
        {
            let event = match active.output {
                Some(output) => LabEvent::ReactionSelected {
                    output,
                    direction: active.direction,
                    target_amount: active.target_amount,
                    tick,
                },
                None => LabEvent::ReactionIdle {
                    snooze_until: active.snooze_until,
                    tick,
                },
            };
            self.events.push(event);
        }

        let reaction_amount = self.config.tuning.reaction_amount;
        let loaded = match check_loaded(
            facility,
            self.layout.feeders(),
            self.selector.active(),
            reaction_amount,
        ) {
            Ok(loaded) => loaded,
            Err(reason) => {
                trace!(tick, %reason, "labs not ready");
                return Vec::new();
            }
        };

        let commands = plan_commands(&loaded, reaction_amount);
        if !commands.is_empty() {
            debug!(tick, output = %loaded.output, labs = commands.len(), "reactions commanded");
            self.events.push(LabEvent::ReactionCommanded {
                output: loaded.output,
                labs: commands.len(),
                tick,
            });
        }
        commands
    }

    // -----------------------------------------------------------------------
    // Hauling
    // -----------------------------------------------------------------------

    /// Append the next trip for `hauler` to its queue. Returns whether
    /// anything was appended.
    pub fn generate_hauling_reservation(
        &mut self,
        facility: &FacilitySnapshot,
        hauler: &HaulerSnapshot,
        queue: &mut ReservationQueue,
    ) -> bool {
        let before = queue.len();
        if !generate_reservation(
            facility,
            self.layout.feeders(),
            self.selector.active(),
            hauler,
            queue,
        ) {
            return false;
        }

        let added = queue.len() - before;
        debug!(tick = facility.tick, hauler = ?hauler.id, reservations = added, "hauling reserved");
        self.events.push(LabEvent::ReservationIssued {
            hauler: hauler.id,
            reservations: added,
            tick: facility.tick,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compound::Compound::{self, *};
    use crate::event::LabEventKind;
    use crate::inventory::Inventory;
    use crate::test_utils::{FacilityBuilder, fill_lab};

    fn manager(targets: &[(Compound, i64)]) -> LabManager {
        let mut config = LabConfig::empty();
        config.targets = targets.iter().copied().collect();
        LabManager::new(config).unwrap()
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = LabConfig::default();
        config.tuning.reaction_amount = 0;
        assert_eq!(
            LabManager::new(config).unwrap_err(),
            ConfigError::ZeroReactionAmount
        );
    }

    #[test]
    fn first_step_assigns_plans_and_selects() {
        let facility = FacilityBuilder::new()
            .lab_row(5)
            .storage_with(Zynthium, 1000)
            .storage_with(Keanium, 1000)
            .build();
        let mut m = manager(&[(Ghodium, 10_000)]);
        let commands = m.step(&facility);

        // Feeders are still empty, so nothing runs yet.
        assert!(commands.is_empty());
        assert!(m.feeders().is_some());
        assert_eq!(m.active_reaction().output, Some(ZynthiumKeanite));

        let kinds: Vec<_> = m.drain_events().iter().map(LabEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                LabEventKind::FeedersAssigned,
                LabEventKind::DeficitsRefreshed,
                LabEventKind::ReactionSelected,
            ]
        );
        assert!(m.events().is_empty());
    }

    #[test]
    fn loaded_feeders_produce_commands() {
        let mut m = manager(&[(Ghodium, 10_000)]);
        let facility = FacilityBuilder::new()
            .lab_row(5)
            .storage_with(Zynthium, 1000)
            .storage_with(Keanium, 1000)
            .build();
        m.step(&facility);
        let pair = m.feeders().unwrap();

        let mut facility = facility;
        facility.tick = 1;
        fill_lab(&mut facility, pair.input1, Zynthium, 100);
        fill_lab(&mut facility, pair.input2, Keanium, 100);
        let commands = m.step(&facility);
        assert_eq!(commands.len(), 3);
        assert!(commands.iter().all(|c| !pair.contains(c.lab())));
        assert!(
            m.drain_events()
                .iter()
                .any(|e| e.kind() == LabEventKind::ReactionCommanded)
        );
    }

    #[test]
    fn hauling_without_feeders_is_a_no_op() {
        let facility = FacilityBuilder::new()
            .lab_row(2)
            .storage_with(Zynthium, 1000)
            .hauler(800)
            .build();
        let mut m = manager(&[(Ghodium, 10_000)]);
        m.step(&facility);
        assert!(m.feeders().is_none());

        let mut queue = ReservationQueue::new();
        assert!(!m.generate_hauling_reservation(&facility, &facility.haulers[0], &mut queue));
        assert!(queue.is_empty());
    }

    #[test]
    fn hauling_request_recorded() {
        let facility = FacilityBuilder::new()
            .lab_row(4)
            .storage_with(Zynthium, 1000)
            .storage_with(Keanium, 1000)
            .hauler(800)
            .build();
        let mut m = manager(&[(Ghodium, 10_000)]);
        m.step(&facility);
        m.drain_events();

        let mut queue = ReservationQueue::new();
        assert!(m.generate_hauling_reservation(&facility, &facility.haulers[0], &mut queue));
        assert_eq!(queue.len(), 2);
        assert_eq!(
            m.drain_events(),
            vec![LabEvent::ReservationIssued {
                hauler: facility.haulers[0].id,
                reservations: 2,
                tick: 0,
            }]
        );
    }

    #[test]
    fn huge_stock_does_not_overflow_planning() {
        let mut facility = FacilityBuilder::new()
            .lab_row(5)
            .terminal_with(Ghodium, 100)
            .build();
        if let Some(storage) = facility.storage.as_mut() {
            storage.inventory = Inventory::new(u32::MAX).with(Ghodium, u32::MAX - 10);
        }
        let mut m = manager(&[(Ghodium, 10_000)]);
        assert!(m.step(&facility).is_empty());
        assert_eq!(m.deficits().get(Ghodium), 0);
        assert!(m.active_reaction().is_idle());
    }

    #[test]
    fn event_log_is_bounded() {
        let mut config = LabConfig::empty();
        config.tuning.event_capacity = 2;
        config.tuning.deficit_interval = 1;
        let mut m = LabManager::new(config).unwrap();
        let mut facility = FacilityBuilder::new().build();
        for tick in 0..10 {
            facility.tick = tick;
            m.step(&facility);
        }
        assert_eq!(m.events().len(), 2);
        assert!(m.events().dropped_count() > 0);
    }
}
