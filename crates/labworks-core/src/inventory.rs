use crate::compound::Compound;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mixed compound stock with a shared capacity (bulk storage, transfer
/// point, a hauler's carried load).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Quantities keyed by compound. Never holds zero entries.
    pub stacks: BTreeMap<Compound, u32>,
    pub capacity: u32,
}

impl Inventory {
    pub fn new(capacity: u32) -> Self {
        Self {
            stacks: BTreeMap::new(),
            capacity,
        }
    }

    /// Builder-style helper: add `quantity` and return self.
    pub fn with(mut self, compound: Compound, quantity: u32) -> Self {
        let _ = self.add(compound, quantity);
        self
    }

    /// Add compound units. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates units that did not fit"]
    pub fn add(&mut self, compound: Compound, quantity: u32) -> u32 {
        let to_add = quantity.min(self.free_capacity());
        if to_add > 0 {
            *self.stacks.entry(compound).or_insert(0) += to_add;
        }
        quantity - to_add
    }

    /// Remove compound units. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, compound: Compound, quantity: u32) -> u32 {
        let Some(held) = self.stacks.get_mut(&compound) else {
            return 0;
        };
        let to_remove = quantity.min(*held);
        *held -= to_remove;
        if *held == 0 {
            self.stacks.remove(&compound);
        }
        to_remove
    }

    /// Quantity of one compound.
    pub fn quantity(&self, compound: Compound) -> u32 {
        self.stacks.get(&compound).copied().unwrap_or(0)
    }

    /// Total units across all compounds.
    pub fn total(&self) -> u32 {
        self.stacks.values().sum()
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
