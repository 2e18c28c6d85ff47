#![no_main]
use arbitrary::Arbitrary;
use labworks_core::compound::Compound;
use labworks_core::config::{ByproductRule, LabConfig};
use labworks_core::manager::LabManager;
use labworks_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

/// A structured disturbance applied between driver steps.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Stock { compound: u8, amount: u16 },
    FillLab { lab: u8, compound: u8, amount: u16 },
    EmptyLab { lab: u8 },
    Step,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    labs: u8,
    targets: Vec<(u8, u16)>,
    byproduct: Option<(u8, u16)>,
    ops: Vec<FuzzOp>,
}

fn compound(index: u8) -> Compound {
    Compound::ALL[index as usize % Compound::COUNT]
}

fuzz_target!(|input: FuzzInput| {
    let mut config = LabConfig::empty();
    config.targets = input
        .targets
        .iter()
        .map(|&(c, level)| (compound(c), i64::from(level)))
        .collect();
    if let Some((c, threshold)) = input.byproduct
        && !compound(c).is_raw()
    {
        config.byproducts.push(ByproductRule {
            compound: compound(c),
            threshold: u32::from(threshold),
        });
    }
    let Ok(mut manager) = LabManager::new(config) else {
        return;
    };

    let facility = FacilityBuilder::new()
        .lab_row(usize::from(input.labs % 10))
        .hauler(800)
        .build();
    let mut sim = SimFacility::new(facility, manager.config().tuning.reaction_amount);

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);
    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::Stock { compound: c, amount } => {
                if let Some(storage) = sim.facility.storage.as_mut() {
                    let _ = storage.inventory.add(compound(c), u32::from(amount));
                }
            }
            FuzzOp::FillLab { lab, compound: c, amount } => {
                if let Some(id) = sim.facility.labs.get(lab as usize).map(|l| l.id) {
                    fill_lab(&mut sim.facility, id, compound(c), u32::from(amount) % 3001);
                }
            }
            FuzzOp::EmptyLab { lab } => {
                if let Some(id) = sim.facility.labs.get(lab as usize).map(|l| l.id) {
                    fill_lab(&mut sim.facility, id, compound(0), 0);
                }
            }
            FuzzOp::Step => {
                sim.step(&mut manager);
            }
        }
    }
});
