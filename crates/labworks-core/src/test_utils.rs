//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).
//!
//! [`FacilityBuilder`] assembles snapshots. [`SimFacility`] plays the
//! driver's part: it applies lab commands and executes hauling reservations
//! against a snapshot so a [`LabManager`] can be run for many steps.

use crate::compound::Compound;
use crate::executor::LabCommand;
use crate::facility::{FacilitySnapshot, GridPosition, HaulerSnapshot, LabSnapshot, StoreSnapshot};
use crate::hauling::{Reservation, ReservationAction, ReservationQueue};
use crate::id::{HaulerId, LabId, StoreRef};
use crate::inventory::Inventory;
use crate::manager::LabManager;
use slotmap::SlotMap;

pub const LAB_CAPACITY: u32 = 3000;
pub const STORAGE_CAPACITY: u32 = 1_000_000;
pub const TERMINAL_CAPACITY: u32 = 300_000;

// ===========================================================================
// Facility builder
// ===========================================================================

/// Builds a [`FacilitySnapshot`]. Starts with the transfer point at the
/// origin, bulk storage next to it, and no labs or haulers.
pub struct FacilityBuilder {
    lab_ids: SlotMap<LabId, ()>,
    hauler_ids: SlotMap<HaulerId, ()>,
    facility: FacilitySnapshot,
}

impl Default for FacilityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FacilityBuilder {
    pub fn new() -> Self {
        Self {
            lab_ids: SlotMap::with_key(),
            hauler_ids: SlotMap::with_key(),
            facility: FacilitySnapshot {
                tick: 0,
                labs: Vec::new(),
                storage: Some(StoreSnapshot {
                    position: GridPosition::new(0, 3),
                    inventory: Inventory::new(STORAGE_CAPACITY),
                }),
                terminal: Some(StoreSnapshot {
                    position: GridPosition::new(0, 0),
                    inventory: Inventory::new(TERMINAL_CAPACITY),
                }),
                haulers: Vec::new(),
            },
        }
    }

    pub fn tick(mut self, tick: u64) -> Self {
        self.facility.tick = tick;
        self
    }

    /// Add an empty lab at `(x, y)`.
    pub fn lab_at(self, x: i32, y: i32) -> Self {
        self.lab_with(x, y, None)
    }

    /// Add a lab at `(x, y)` holding `content`.
    pub fn lab_with(mut self, x: i32, y: i32, content: Option<(Compound, u32)>) -> Self {
        self.facility.labs.push(LabSnapshot {
            id: self.lab_ids.insert(()),
            position: GridPosition::new(x, y),
            mineral: content.map(|(c, _)| c),
            amount: content.map_or(0, |(_, q)| q),
            capacity: LAB_CAPACITY,
        });
        self
    }

    /// Add `n` empty labs in a row at `(1, 1)`, `(2, 1)`, ...
    pub fn lab_row(self, n: usize) -> Self {
        (1..=n as i32).fold(self, |b, x| b.lab_at(x, 1))
    }

    pub fn storage_with(mut self, compound: Compound, amount: u32) -> Self {
        if let Some(s) = self.facility.storage.as_mut() {
            let _ = s.inventory.add(compound, amount);
        }
        self
    }

    pub fn terminal_with(mut self, compound: Compound, amount: u32) -> Self {
        if let Some(t) = self.facility.terminal.as_mut() {
            let _ = t.inventory.add(compound, amount);
        }
        self
    }

    pub fn without_storage(mut self) -> Self {
        self.facility.storage = None;
        self
    }

    pub fn without_terminal(mut self) -> Self {
        self.facility.terminal = None;
        self
    }

    /// Add an empty hauling agent.
    pub fn hauler(mut self, capacity: u32) -> Self {
        self.facility.haulers.push(HaulerSnapshot {
            id: self.hauler_ids.insert(()),
            carried: Inventory::new(capacity),
        });
        self
    }

    pub fn build(self) -> FacilitySnapshot {
        self.facility
    }
}

/// Overwrite a lab's contents in place. Does nothing for an unknown lab.
pub fn fill_lab(facility: &mut FacilitySnapshot, lab: LabId, compound: Compound, amount: u32) {
    if let Some(l) = facility.labs.iter_mut().find(|l| l.id == lab) {
        l.mineral = (amount > 0).then_some(compound);
        l.amount = amount;
    }
}

// ===========================================================================
// Lab content helpers
// ===========================================================================

/// Remove up to `amount` from a lab. Returns what was removed.
fn lab_take(lab: &mut LabSnapshot, compound: Compound, amount: u32) -> u32 {
    let taken = lab.quantity(compound).min(amount);
    lab.amount -= taken;
    if lab.amount == 0 {
        lab.mineral = None;
    }
    taken
}

/// Add up to `amount` to a lab. Returns what was added.
fn lab_put(lab: &mut LabSnapshot, compound: Compound, amount: u32) -> u32 {
    let added = lab.free_capacity_for(compound).min(amount);
    if added > 0 {
        lab.mineral = Some(compound);
        lab.amount += added;
    }
    added
}

// ===========================================================================
// Simulated facility
// ===========================================================================

/// A facility that reacts to commands and reservations the way the real
/// driver would, with agents that move instantly.
pub struct SimFacility {
    pub facility: FacilitySnapshot,
    /// One queue per hauler, in `facility.haulers` order.
    pub queues: Vec<ReservationQueue>,
    pub reaction_amount: u32,
}

impl SimFacility {
    pub fn new(facility: FacilitySnapshot, reaction_amount: u32) -> Self {
        let queues = facility.haulers.iter().map(|_| ReservationQueue::new()).collect();
        Self {
            facility,
            queues,
            reaction_amount,
        }
    }

    fn lab_index(&self, id: LabId) -> Option<usize> {
        self.facility.labs.iter().position(|l| l.id == id)
    }

    /// Apply commands. Returns how many actually ran.
    pub fn apply_commands(&mut self, commands: &[LabCommand]) -> usize {
        commands.iter().filter(|cmd| self.apply_command(cmd)).count()
    }

    fn apply_command(&mut self, command: &LabCommand) -> bool {
        let amount = self.reaction_amount;
        let (lab, input1, input2, forward) = match *command {
            LabCommand::RunReaction { lab, input1, input2 } => (lab, input1, input2, true),
            LabCommand::ReverseReaction { lab, input1, input2 } => (lab, input1, input2, false),
        };
        let (Some(out), Some(f1), Some(f2)) = (
            self.lab_index(lab),
            self.lab_index(input1),
            self.lab_index(input2),
        ) else {
            return false;
        };
        let labs = &mut self.facility.labs;

        if forward {
            let (Some(a), Some(b)) = (labs[f1].mineral, labs[f2].mineral) else {
                return false;
            };
            let Some(output) = Compound::ALL.into_iter().find(|c| c.inputs() == Some((a, b)))
            else {
                return false;
            };
            if labs[f1].amount < amount
                || labs[f2].amount < amount
                || labs[out].free_capacity_for(output) < amount
            {
                return false;
            }
            lab_take(&mut labs[f1], a, amount);
            lab_take(&mut labs[f2], b, amount);
            lab_put(&mut labs[out], output, amount);
        } else {
            let Some(output) = labs[out].mineral else {
                return false;
            };
            let Some((a, b)) = output.inputs() else {
                return false;
            };
            if labs[out].amount < amount
                || labs[f1].free_capacity_for(a) < amount
                || labs[f2].free_capacity_for(b) < amount
            {
                return false;
            }
            lab_take(&mut labs[out], output, amount);
            lab_put(&mut labs[f1], a, amount);
            lab_put(&mut labs[f2], b, amount);
        }
        true
    }

    /// Execute one reservation for the hauler at `index`. Returns the
    /// quantity moved.
    pub fn execute_reservation(&mut self, index: usize, reservation: &Reservation) -> u32 {
        let Reservation {
            action,
            target,
            compound,
            amount,
        } = *reservation;
        let lab_index = match target {
            StoreRef::Lab(id) => self.lab_index(id),
            _ => None,
        };
        let facility = &mut self.facility;
        let Some(hauler) = facility.haulers.get_mut(index) else {
            return 0;
        };

        match action {
            ReservationAction::Withdraw => {
                let wanted = amount.min(hauler.free_capacity());
                let taken = match target {
                    StoreRef::Storage => facility
                        .storage
                        .as_mut()
                        .map_or(0, |s| s.inventory.remove(compound, wanted)),
                    StoreRef::Terminal => facility
                        .terminal
                        .as_mut()
                        .map_or(0, |t| t.inventory.remove(compound, wanted)),
                    StoreRef::Lab(_) => lab_index
                        .map_or(0, |i| lab_take(&mut facility.labs[i], compound, wanted)),
                };
                let _ = hauler.carried.add(compound, taken);
                taken
            }
            ReservationAction::Deposit => {
                let offered = amount.min(hauler.carried.quantity(compound));
                let placed = match target {
                    StoreRef::Storage => facility
                        .storage
                        .as_mut()
                        .map_or(0, |s| offered - s.inventory.add(compound, offered)),
                    StoreRef::Terminal => facility
                        .terminal
                        .as_mut()
                        .map_or(0, |t| offered - t.inventory.add(compound, offered)),
                    StoreRef::Lab(_) => lab_index
                        .map_or(0, |i| lab_put(&mut facility.labs[i], compound, offered)),
                };
                let _ = hauler.carried.remove(compound, placed);
                placed
            }
        }
    }

    /// Let every hauler ask for work if idle, then run its queue dry.
    pub fn run_haulers(&mut self, manager: &mut LabManager) {
        for index in 0..self.facility.haulers.len() {
            if self.queues[index].is_empty() {
                let hauler = self.facility.haulers[index].clone();
                manager.generate_hauling_reservation(
                    &self.facility,
                    &hauler,
                    &mut self.queues[index],
                );
            }
            while let Some(reservation) = self.queues[index].pop_front() {
                self.execute_reservation(index, &reservation);
            }
        }
    }

    /// One full driver step: manager step, commands, hauling, tick.
    pub fn step(&mut self, manager: &mut LabManager) -> usize {
        let commands = manager.step(&self.facility);
        let ran = self.apply_commands(&commands);
        self.run_haulers(manager);
        self.facility.tick += 1;
        ran
    }

    /// Run `steps` driver steps. Returns the total reactions run.
    pub fn run(&mut self, manager: &mut LabManager, steps: u64) -> usize {
        (0..steps).map(|_| self.step(manager)).sum()
    }
}
