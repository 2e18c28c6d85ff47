//! Reaction execution: turns the active reaction into per-lab commands.
//!
//! The executor never mutates anything. It checks that the feeders are
//! loaded for the active reaction and, if so, returns one command per output
//! lab that can take part. The driver applies them.

use crate::compound::Compound;
use crate::facility::{FacilitySnapshot, LabSnapshot};
use crate::id::LabId;
use crate::layout::FeederPair;
use crate::reaction::{ActiveReaction, Direction};
use serde::{Deserialize, Serialize};

/// A reaction the driver should run this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabCommand {
    /// `lab` combines one batch from each feeder.
    RunReaction {
        lab: LabId,
        input1: LabId,
        input2: LabId,
    },
    /// `lab` splits one batch back into the feeders.
    ReverseReaction {
        lab: LabId,
        input1: LabId,
        input2: LabId,
    },
}

impl LabCommand {
    /// The output lab the command runs on.
    pub fn lab(&self) -> LabId {
        match *self {
            LabCommand::RunReaction { lab, .. } | LabCommand::ReverseReaction { lab, .. } => lab,
        }
    }
}

/// Why the labs are not ready to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NotReady {
    #[error("no active reaction")]
    Idle,
    #[error("feeders not assigned")]
    NoFeeders,
    #[error("feeder lab {0:?} no longer exists")]
    FeederMissing(LabId),
    #[error("storage or transfer point missing")]
    NoStores,
    #[error("no output labs")]
    NoOutputLabs,
    #[error("feeder lab {lab:?} holds {held} instead of {expected}")]
    WrongMineral {
        lab: LabId,
        held: Compound,
        expected: Compound,
    },
    #[error("feeder lab {lab:?} holds {amount} of {compound}, below one batch")]
    Underfilled {
        lab: LabId,
        compound: Compound,
        amount: u32,
    },
}

/// Labs resolved for a reaction that passed [`check_loaded`].
#[derive(Debug, Clone)]
pub struct LoadedLabs<'a> {
    pub output: Compound,
    pub direction: Direction,
    pub input1: &'a LabSnapshot,
    pub input2: &'a LabSnapshot,
    pub outputs: Vec<&'a LabSnapshot>,
}

/// Every lab that is not one of the feeders.
pub fn output_labs<'a>(
    facility: &'a FacilitySnapshot,
    feeders: FeederPair,
) -> impl Iterator<Item = &'a LabSnapshot> + 'a {
    facility.labs.iter().filter(move |l| !feeders.contains(l.id))
}

/// Validate that the facility is ready to run `active`.
pub fn check_loaded<'a>(
    facility: &'a FacilitySnapshot,
    feeders: Option<FeederPair>,
    active: &ActiveReaction,
    reaction_amount: u32,
) -> Result<LoadedLabs<'a>, NotReady> {
    let output = active.output.ok_or(NotReady::Idle)?;
    let (in1, in2) = output.inputs().ok_or(NotReady::Idle)?;
    let feeders = feeders.ok_or(NotReady::NoFeeders)?;

    let input1 = facility
        .lab(feeders.input1)
        .ok_or(NotReady::FeederMissing(feeders.input1))?;
    let input2 = facility
        .lab(feeders.input2)
        .ok_or(NotReady::FeederMissing(feeders.input2))?;
    if !facility.has_stores() {
        return Err(NotReady::NoStores);
    }

    let outputs: Vec<_> = output_labs(facility, feeders).collect();
    if outputs.is_empty() {
        return Err(NotReady::NoOutputLabs);
    }

    for (lab, expected) in [(input1, in1), (input2, in2)] {
        if let Some(held) = lab.mineral
            && held != expected
        {
            return Err(NotReady::WrongMineral {
                lab: lab.id,
                held,
                expected,
            });
        }
        if active.direction == Direction::Forward && lab.quantity(expected) < reaction_amount {
            return Err(NotReady::Underfilled {
                lab: lab.id,
                compound: expected,
                amount: lab.quantity(expected),
            });
        }
    }

    Ok(LoadedLabs {
        output,
        direction: active.direction,
        input1,
        input2,
        outputs,
    })
}

/// Whether the facility is ready to run `active`.
pub fn is_properly_loaded(
    facility: &FacilitySnapshot,
    feeders: Option<FeederPair>,
    active: &ActiveReaction,
    reaction_amount: u32,
) -> bool {
    check_loaded(facility, feeders, active, reaction_amount).is_ok()
}

/// Commands for every output lab able to take part in `loaded`'s reaction.
pub fn plan_commands(loaded: &LoadedLabs<'_>, reaction_amount: u32) -> Vec<LabCommand> {
    let input1 = loaded.input1.id;
    let input2 = loaded.input2.id;
    match loaded.direction {
        Direction::Forward => loaded
            .outputs
            .iter()
            .filter(|lab| lab.free_capacity_for(loaded.output) >= reaction_amount)
            .map(|lab| LabCommand::RunReaction {
                lab: lab.id,
                input1,
                input2,
            })
            .collect(),
        Direction::Reverse => loaded
            .outputs
            .iter()
            .filter(|lab| lab.quantity(loaded.output) >= reaction_amount)
            .map(|lab| LabCommand::ReverseReaction {
                lab: lab.id,
                input1,
                input2,
            })
            .collect(),
    }
}
