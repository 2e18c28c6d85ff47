//! Operator configuration for one lab manager.

use crate::compound::Compound;
use crate::deficit::TargetTable;
use crate::fixed::Ticks;
use serde::{Deserialize, Serialize};

/// Numeric tuning knobs. Every field has a default, so partial config files
/// are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Units consumed from each feeder (and produced) by one reaction.
    pub reaction_amount: u32,
    /// Most a single forward selection may add on top of current stock.
    pub cycle_amount: u32,
    /// Ticks between layout re-validations.
    pub layout_check_interval: Ticks,
    /// Ticks between deficit refreshes.
    pub deficit_interval: Ticks,
    /// Longest a selected reaction may hold the labs before a forced replan.
    pub replan_interval: Ticks,
    /// Backoff after a selection finds nothing to do.
    pub snooze_duration: Ticks,
    /// Chebyshev range within which an output lab can draw from a feeder.
    pub interaction_range: u32,
    /// Capacity of the manager's event ring buffer.
    pub event_capacity: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            reaction_amount: 5,
            cycle_amount: 5000,
            layout_check_interval: 1000,
            deficit_interval: 10,
            replan_interval: 3000,
            snooze_duration: 30,
            interaction_range: 2,
            event_capacity: 64,
        }
    }
}

/// Reverse-react `compound` whenever bulk storage holds more than
/// `threshold`, down to `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByproductRule {
    pub compound: Compound,
    pub threshold: u32,
}

/// Full configuration for a [`LabManager`](crate::manager::LabManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabConfig {
    pub targets: TargetTable,
    /// Checked in order; the first overstocked rule wins.
    pub byproducts: Vec<ByproductRule>,
    pub tuning: Tuning,
}

impl Default for LabConfig {
    fn default() -> Self {
        let mut targets = TargetTable::new();
        targets.set(Compound::Ghodium, 10_000);
        targets.set(Compound::Hydroxide, 5_000);
        Self {
            targets,
            byproducts: vec![
                ByproductRule {
                    compound: Compound::GhodiumOxide,
                    threshold: 1000,
                },
                ByproductRule {
                    compound: Compound::LemergiumOxide,
                    threshold: 500,
                },
            ],
            tuning: Tuning::default(),
        }
    }
}

/// Errors from [`LabConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("reaction amount must be positive")]
    ZeroReactionAmount,
    #[error("cycle amount {cycle} is smaller than the reaction amount {reaction}")]
    CycleBelowReactionAmount { cycle: u32, reaction: u32 },
    #[error("interval '{0}' must be positive")]
    ZeroInterval(&'static str),
    #[error("duplicate byproduct rule for {0}")]
    DuplicateByproduct(Compound),
    #[error("byproduct {0} is a raw element and cannot be reversed")]
    RawByproduct(Compound),
}

impl LabConfig {
    /// An empty configuration: no targets, no byproduct rules.
    pub fn empty() -> Self {
        Self {
            targets: TargetTable::new(),
            byproducts: Vec::new(),
            tuning: Tuning::default(),
        }
    }

    /// Check the configuration for values the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tuning;
        if t.reaction_amount == 0 {
            return Err(ConfigError::ZeroReactionAmount);
        }
        if t.cycle_amount < t.reaction_amount {
            return Err(ConfigError::CycleBelowReactionAmount {
                cycle: t.cycle_amount,
                reaction: t.reaction_amount,
            });
        }
        for (name, value) in [
            ("layout_check_interval", t.layout_check_interval),
            ("deficit_interval", t.deficit_interval),
            ("replan_interval", t.replan_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }

        for (i, rule) in self.byproducts.iter().enumerate() {
            if rule.compound.is_raw() {
                return Err(ConfigError::RawByproduct(rule.compound));
            }
            if self.byproducts[..i]
                .iter()
                .any(|r| r.compound == rule.compound)
            {
                return Err(ConfigError::DuplicateByproduct(rule.compound));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LabConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.targets.get(Compound::Ghodium), Some(10_000));
        assert_eq!(config.byproducts.len(), 2);
    }

    #[test]
    fn zero_reaction_amount_rejected() {
        let mut config = LabConfig::default();
        config.tuning.reaction_amount = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroReactionAmount));
    }

    #[test]
    fn cycle_below_reaction_rejected() {
        let mut config = LabConfig::default();
        config.tuning.cycle_amount = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CycleBelowReactionAmount { cycle: 2, reaction: 5 })
        ));
    }

    #[test]
    fn zero_interval_names_the_field() {
        let mut config = LabConfig::default();
        config.tuning.deficit_interval = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err, ConfigError::ZeroInterval("deficit_interval"));
        assert!(err.to_string().contains("deficit_interval"));
    }

    #[test]
    fn snooze_may_be_zero() {
        let mut config = LabConfig::default();
        config.tuning.snooze_duration = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn duplicate_byproduct_rejected() {
        let mut config = LabConfig::default();
        config.byproducts.push(ByproductRule {
            compound: Compound::GhodiumOxide,
            threshold: 10,
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateByproduct(Compound::GhodiumOxide))
        );
    }

    #[test]
    fn raw_byproduct_rejected() {
        let mut config = LabConfig::empty();
        config.byproducts.push(ByproductRule {
            compound: Compound::Hydrogen,
            threshold: 10,
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::RawByproduct(Compound::Hydrogen))
        );
    }
}
