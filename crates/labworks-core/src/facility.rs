//! Read-only view of one facility, supplied by the driver every step.
//!
//! The subsystem never reaches into ambient state; everything it reads about
//! labs, storage, the transfer point and hauling agents arrives through a
//! [`FacilitySnapshot`].

use crate::compound::Compound;
use crate::fixed::Ticks;
use crate::id::{HaulerId, LabId, StoreRef};
use crate::inventory::Inventory;
use serde::{Deserialize, Serialize};

/// A position on the facility grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev (chessboard) distance to another position.
    pub fn chebyshev_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }
}

/// One lab as seen this step. A lab holds at most one mineral type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabSnapshot {
    pub id: LabId,
    pub position: GridPosition,
    pub mineral: Option<Compound>,
    pub amount: u32,
    pub capacity: u32,
}

impl LabSnapshot {
    /// Units of `compound` held; zero if the lab holds something else.
    pub fn quantity(&self, compound: Compound) -> u32 {
        if self.mineral == Some(compound) {
            self.amount
        } else {
            0
        }
    }

    /// Room for `compound`; zero when another mineral occupies the lab.
    pub fn free_capacity_for(&self, compound: Compound) -> u32 {
        match self.mineral {
            Some(m) if m != compound => 0,
            _ => self.capacity.saturating_sub(self.amount),
        }
    }

    /// Whether the lab holds nothing or exactly `compound`.
    pub fn accepts(&self, compound: Compound) -> bool {
        self.mineral.is_none_or(|m| m == compound)
    }
}

/// Bulk storage or the transfer point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub position: GridPosition,
    pub inventory: Inventory,
}

/// A hauling agent and what it currently carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaulerSnapshot {
    pub id: HaulerId,
    pub carried: Inventory,
}

impl HaulerSnapshot {
    pub fn capacity(&self) -> u32 {
        self.carried.capacity
    }

    pub fn free_capacity(&self) -> u32 {
        self.carried.free_capacity()
    }
}

/// Everything the subsystem may read about a facility in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitySnapshot {
    pub tick: Ticks,
    pub labs: Vec<LabSnapshot>,
    pub storage: Option<StoreSnapshot>,
    pub terminal: Option<StoreSnapshot>,
    pub haulers: Vec<HaulerSnapshot>,
}

impl FacilitySnapshot {
    pub fn lab(&self, id: LabId) -> Option<&LabSnapshot> {
        self.labs.iter().find(|l| l.id == id)
    }

    /// Position the layout prefers feeders to be close to.
    pub fn anchor(&self) -> Option<GridPosition> {
        self.terminal.as_ref().map(|t| t.position)
    }

    /// Units of `compound` held in bulk storage.
    pub fn storage_quantity(&self, compound: Compound) -> u32 {
        self.storage
            .as_ref()
            .map_or(0, |s| s.inventory.quantity(compound))
    }

    /// Units of `compound` held at the transfer point.
    pub fn terminal_quantity(&self, compound: Compound) -> u32 {
        self.terminal
            .as_ref()
            .map_or(0, |t| t.inventory.quantity(compound))
    }

    /// Units of `compound` held by a store, if the store exists.
    pub fn store_quantity(&self, store: StoreRef, compound: Compound) -> u32 {
        match store {
            StoreRef::Storage => self.storage_quantity(compound),
            StoreRef::Terminal => self.terminal_quantity(compound),
            StoreRef::Lab(id) => self.lab(id).map_or(0, |l| l.quantity(compound)),
        }
    }

    /// Total units of `compound` anywhere in the facility: bulk storage,
    /// transfer point, every lab holding it and every hauler's load.
    /// Saturates at `u32::MAX`.
    pub fn stock(&self, compound: Compound) -> u32 {
        let labs = self.labs.iter().map(|l| l.quantity(compound));
        let haulers = self.haulers.iter().map(|h| h.carried.quantity(compound));
        [self.storage_quantity(compound), self.terminal_quantity(compound)]
            .into_iter()
            .chain(labs)
            .chain(haulers)
            .fold(0u32, u32::saturating_add)
    }

    /// Whether both bulk storage and the transfer point exist.
    pub fn has_stores(&self) -> bool {
        self.storage.is_some() && self.terminal.is_some()
    }
}
