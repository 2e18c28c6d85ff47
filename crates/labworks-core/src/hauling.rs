//! Hauling requests: what one agent should move next to keep the labs
//! loaded and drained.
//!
//! A request is a withdraw/deposit pair appended to the agent's
//! [`ReservationQueue`]. Either half may be absent (nothing to pick up when
//! the agent already carries the resource; nothing to drop when there is
//! nothing to move), but a zero-quantity reservation is never appended.

use crate::compound::Compound;
use crate::executor::output_labs;
use crate::facility::{FacilitySnapshot, HaulerSnapshot, LabSnapshot};
use crate::fixed::fill_fraction;
use crate::id::StoreRef;
use crate::layout::FeederPair;
use crate::reaction::{ActiveReaction, Direction};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationAction {
    Withdraw,
    Deposit,
}

/// One leg of a hauling trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reservation {
    pub action: ReservationAction,
    pub target: StoreRef,
    pub compound: Compound,
    pub amount: u32,
}

impl Reservation {
    pub fn withdraw(target: StoreRef, compound: Compound, amount: u32) -> Self {
        Self {
            action: ReservationAction::Withdraw,
            target,
            compound,
            amount,
        }
    }

    pub fn deposit(target: StoreRef, compound: Compound, amount: u32) -> Self {
        Self {
            action: ReservationAction::Deposit,
            target,
            compound,
            amount,
        }
    }
}

/// A withdraw/deposit pair planned for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaulPlan {
    pub withdraw: Option<Reservation>,
    pub deposit: Option<Reservation>,
}

impl HaulPlan {
    /// Build a plan, dropping zero-quantity legs. `None` if both are empty.
    fn new(withdraw: Reservation, deposit: Reservation) -> Option<Self> {
        let withdraw = (withdraw.amount > 0).then_some(withdraw);
        let deposit = (deposit.amount > 0).then_some(deposit);
        (withdraw.is_some() || deposit.is_some()).then_some(Self { withdraw, deposit })
    }

    pub fn reservations(&self) -> impl Iterator<Item = Reservation> {
        self.withdraw.into_iter().chain(self.deposit)
    }
}

/// An agent's pending reservations, executed front to back. Planning only
/// ever appends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationQueue {
    pending: VecDeque<Reservation>,
}

impl ReservationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reservation: Reservation) {
        self.pending.push_back(reservation);
    }

    /// Append both legs of `plan`, withdraw first.
    pub fn push_plan(&mut self, plan: HaulPlan) {
        self.pending.extend(plan.reservations());
    }

    /// Next reservation to execute.
    pub fn front(&self) -> Option<&Reservation> {
        self.pending.front()
    }

    pub fn pop_front(&mut self) -> Option<Reservation> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.pending.iter()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// Planning primitives
// ---------------------------------------------------------------------------

/// Empty `lab` of whatever it holds into bulk storage, along with any of it
/// the agent already carries.
fn drain_lab(lab: &LabSnapshot, hauler: &HaulerSnapshot) -> Option<HaulPlan> {
    let mineral = lab.mineral?;
    let amount = hauler.free_capacity().min(lab.amount);
    HaulPlan::new(
        Reservation::withdraw(StoreRef::Lab(lab.id), mineral, amount),
        Reservation::deposit(
            StoreRef::Storage,
            mineral,
            amount.saturating_add(hauler.carried.quantity(mineral)),
        ),
    )
}

/// Fill `lab` with `compound`: carried stock first, the rest from whichever
/// store holds more. Only triggers once the lab has room for a full load.
fn load_lab(
    facility: &FacilitySnapshot,
    lab: &LabSnapshot,
    compound: Compound,
    hauler: &HaulerSnapshot,
) -> Option<HaulPlan> {
    let room = lab.free_capacity_for(compound);
    if !lab.accepts(compound) || room < hauler.capacity() {
        return None;
    }
    let source = if facility.storage_quantity(compound) > facility.terminal_quantity(compound) {
        StoreRef::Storage
    } else {
        StoreRef::Terminal
    };

    let carried = hauler.carried.quantity(compound).min(room);
    let withdraw = hauler
        .free_capacity()
        .min(facility.store_quantity(source, compound))
        .min(room - carried);

    HaulPlan::new(
        Reservation::withdraw(source, compound, withdraw),
        Reservation::deposit(StoreRef::Lab(lab.id), compound, carried + withdraw),
    )
}

/// Service one feeder in forward mode.
fn setup_feeder(
    facility: &FacilitySnapshot,
    lab: &LabSnapshot,
    input: Compound,
    hauler: &HaulerSnapshot,
) -> Option<HaulPlan> {
    if lab.accepts(input) {
        load_lab(facility, lab, input, hauler)
    } else {
        drain_lab(lab, hauler)
    }
}

/// Whether an output lab holds something that has to come out.
fn output_needs_drain(lab: &LabSnapshot, output: Compound, hauler: &HaulerSnapshot) -> bool {
    lab.mineral
        .is_some_and(|m| m != output || lab.amount >= hauler.free_capacity())
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Plan the next trip for `hauler`, or `None` if there is nothing to move.
///
/// Nothing is planned without feeders or without both stores.
pub fn plan_reservation(
    facility: &FacilitySnapshot,
    feeders: Option<FeederPair>,
    active: &ActiveReaction,
    hauler: &HaulerSnapshot,
) -> Option<HaulPlan> {
    let feeders = feeders?;
    if !facility.has_stores() {
        return None;
    }
    let input1 = facility.lab(feeders.input1)?;
    let input2 = facility.lab(feeders.input2)?;

    let (Some(output), Some((in1, in2))) = (active.output, active.inputs()) else {
        // Idle: clear every lab out.
        return [input1, input2]
            .into_iter()
            .chain(output_labs(facility, feeders))
            .find_map(|lab| drain_lab(lab, hauler));
    };

    match active.direction {
        Direction::Forward => {
            let fill1 = fill_fraction(input1.quantity(in1), input1.capacity);
            let fill2 = fill_fraction(input2.quantity(in2), input2.capacity);
            let order = if fill2 > fill1 {
                [(input1, in1), (input2, in2)]
            } else {
                [(input2, in2), (input1, in1)]
            };

            order
                .into_iter()
                .find_map(|(lab, input)| setup_feeder(facility, lab, input, hauler))
                .or_else(|| {
                    output_labs(facility, feeders)
                        .filter(|lab| output_needs_drain(lab, output, hauler))
                        .find_map(|lab| drain_lab(lab, hauler))
                })
        }
        Direction::Reverse => [(input1, in1), (input2, in2)]
            .into_iter()
            .filter(|(lab, input)| {
                lab.mineral
                    .is_some_and(|m| m != *input || lab.amount >= hauler.free_capacity())
            })
            .find_map(|(lab, _)| drain_lab(lab, hauler))
            .or_else(|| {
                output_labs(facility, feeders)
                    .filter(|lab| lab.mineral.is_some_and(|m| m != output))
                    .find_map(|lab| drain_lab(lab, hauler))
            })
            .or_else(|| {
                output_labs(facility, feeders)
                    .find_map(|lab| load_lab(facility, lab, output, hauler))
            }),
    }
}

/// Append the next trip for `hauler` to `queue`. Returns whether anything
/// was appended.
pub fn generate_reservation(
    facility: &FacilitySnapshot,
    feeders: Option<FeederPair>,
    active: &ActiveReaction,
    hauler: &HaulerSnapshot,
    queue: &mut ReservationQueue,
) -> bool {
    match plan_reservation(facility, feeders, active, hauler) {
        Some(plan) => {
            queue.push_plan(plan);
            true
        }
        None => false,
    }
}
