//! Binary snapshots of a [`LabManager`].
//!
//! The owned planning state (feeder assignment, deficit cache, active
//! reaction, configuration) is encoded with `bitcode` behind a versioned
//! header. The event log is not persisted; a restored manager starts with
//! an empty one.

use crate::config::{ConfigError, LabConfig};
use crate::deficit::{DeficitPlanner, DeficitTable};
use crate::event::EventBuffer;
use crate::fixed::Ticks;
use crate::layout::{FeederPair, LayoutAssigner};
use crate::manager::LabManager;
use crate::reaction::{ActiveReaction, ReactionSelector};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a lab manager snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x1AB5_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot holds an invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick of the last layout check, if any, for diagnostics.
    pub tick: Option<Ticks>,
}

impl SnapshotHeader {
    pub fn new(tick: Option<Ticks>) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManagerSnapshot {
    header: SnapshotHeader,
    config: LabConfig,
    feeders: Option<FeederPair>,
    last_layout_check: Option<Ticks>,
    deficits: DeficitTable,
    last_deficit_refresh: Option<Ticks>,
    active: ActiveReaction,
}

/// Decode only far enough to read the header.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: ManagerSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

impl LabManager {
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = ManagerSnapshot {
            header: SnapshotHeader::new(self.layout.last_check()),
            config: self.config.clone(),
            feeders: self.layout.feeders(),
            last_layout_check: self.layout.last_check(),
            deficits: self.deficits.table().clone(),
            last_deficit_refresh: self.deficits.last_refresh(),
            active: self.selector.active().clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore a manager. The header and the configuration are validated
    /// before any state is used, and the event log starts empty.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: ManagerSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        snapshot.config.validate()?;

        let events = EventBuffer::new(snapshot.config.tuning.event_capacity);
        Ok(LabManager {
            layout: LayoutAssigner::restore(snapshot.feeders, snapshot.last_layout_check),
            deficits: DeficitPlanner::restore(snapshot.deficits, snapshot.last_deficit_refresh),
            selector: ReactionSelector::restore(snapshot.active),
            config: snapshot.config,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compound::Compound::*;
    use crate::test_utils::{FacilityBuilder, fill_lab};

    fn running_manager() -> (LabManager, crate::facility::FacilitySnapshot) {
        let mut facility = FacilityBuilder::new()
            .lab_row(5)
            .storage_with(Zynthium, 1000)
            .storage_with(Keanium, 1000)
            .build();
        let mut manager = LabManager::new(LabConfig::default()).unwrap();
        manager.step(&facility);
        let pair = manager.feeders().unwrap();
        fill_lab(&mut facility, pair.input1, Zynthium, 100);
        fill_lab(&mut facility, pair.input2, Keanium, 100);
        facility.tick = 1;
        (manager, facility)
    }

    #[test]
    fn round_trip_preserves_planning_state() {
        let (manager, _) = running_manager();
        let data = manager.serialize().unwrap();
        let restored = LabManager::deserialize(&data).unwrap();

        assert_eq!(restored.feeders(), manager.feeders());
        assert_eq!(restored.deficits(), manager.deficits());
        assert_eq!(restored.active_reaction(), manager.active_reaction());
        assert_eq!(restored.config(), manager.config());
        assert!(restored.events().is_empty());
        assert_eq!(read_snapshot_header(&data).unwrap().tick, Some(0));
    }

    #[test]
    fn restored_manager_continues_identically() {
        let (mut manager, facility) = running_manager();
        let mut restored = LabManager::deserialize(&manager.serialize().unwrap()).unwrap();
        assert_eq!(manager.step(&facility), restored.step(&facility));
        assert_eq!(manager.active_reaction(), restored.active_reaction());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        match LabManager::deserialize(&[0u8; 10]) {
            Err(DeserializeError::Decode(_)) => {}
            Err(other) => panic!("expected Decode error, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn invalid_config_in_snapshot_is_rejected() {
        let (mut manager, facility) = running_manager();
        manager.config.tuning.reaction_amount = 0;
        let data = manager.serialize().unwrap();

        match LabManager::deserialize(&data) {
            Err(DeserializeError::InvalidConfig(ConfigError::ZeroReactionAmount)) => {}
            Err(other) => panic!("expected InvalidConfig error, got: {other}"),
            Ok(mut restored) => panic!(
                "expected error, restored manager commanded {:?}",
                restored.step(&facility)
            ),
        }
    }

    #[test]
    fn header_validation() {
        assert!(SnapshotHeader::new(None).validate().is_ok());

        let mut header = SnapshotHeader::new(None);
        header.magic = 0xDEAD_BEEF;
        assert!(matches!(
            header.validate(),
            Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))
        ));

        let mut header = SnapshotHeader::new(None);
        header.version = FORMAT_VERSION + 1;
        assert!(matches!(
            header.validate(),
            Err(DeserializeError::FutureVersion(_))
        ));

        let mut header = SnapshotHeader::new(None);
        header.version = 0;
        assert!(matches!(
            header.validate(),
            Err(DeserializeError::UnsupportedVersion(0))
        ));
    }
}
