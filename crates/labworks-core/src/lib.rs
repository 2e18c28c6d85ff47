//! Labworks Core -- reaction planning and lab role assignment for a
//! two-stage chemical production pipeline.
//!
//! A facility owns a handful of labs. Two of them are dedicated feeders that
//! hold the inputs of the current reaction; every other lab is an output lab
//! that reacts using both feeders. Given standing inventory targets for a few
//! end compounds, this crate decides what to produce next, in which
//! direction, and what hauling agents must move to keep the labs supplied.
//!
//! # Step Pipeline
//!
//! Each call to [`manager::LabManager::step`] runs four stages against an
//! explicit [`facility::FacilitySnapshot`]:
//!
//! 1. **Layout** -- validate or repair the feeder assignment (throttled).
//! 2. **Deficits** -- recompute outstanding production per compound
//!    (throttled).
//! 3. **Selection** -- advance the reaction state machine, subject to snooze
//!    and replan timers.
//! 4. **Execution** -- emit a [`executor::LabCommand`] per output lab when the
//!    feeders are loaded.
//!
//! Hauling is requested separately through
//! [`manager::LabManager::generate_hauling_reservation`].
//!
//! # Key Types
//!
//! - [`compound::Compound`] -- Closed set of compounds with their
//!   decomposition into two inputs.
//! - [`deficit::TargetTable`] / [`deficit::DeficitTable`] -- Standing targets
//!   and the outstanding production they imply.
//! - [`reaction::ActiveReaction`] -- The reaction currently holding the labs.
//! - [`hauling::ReservationQueue`] -- Withdraw/deposit legs for one agent.
//! - [`event::LabEvent`] -- What the manager did, kept in a ring buffer.
//! - [`serialize`] -- Versioned binary snapshots via bitcode.

pub mod compound;
pub mod config;
pub mod deficit;
pub mod event;
pub mod executor;
pub mod facility;
pub mod fixed;
pub mod hauling;
pub mod id;
pub mod inventory;
pub mod layout;
pub mod manager;
pub mod reaction;
pub mod serialize;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
