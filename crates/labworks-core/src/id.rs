use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a physical lab in a facility.
    pub struct LabId;

    /// Identifies a hauling agent serving a facility.
    pub struct HaulerId;
}

/// A place resources can be withdrawn from or deposited into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreRef {
    /// The facility's bulk storage.
    Storage,
    /// The facility's transfer point.
    Terminal,
    /// A single lab.
    Lab(LabId),
}
