//! Serde data file structs for lab manager configuration.
//!
//! Compounds are written by their short tag (`"G"`, `"XGH2O"`) and resolved
//! into [`Compound`](labworks_core::compound::Compound) values by the loader.

use labworks_core::config::Tuning;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Top-level contents of a `labs.{ron,toml,json}` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabsData {
    /// Standing stock level per compound tag.
    pub targets: BTreeMap<String, i64>,
    /// Reverse-reaction rules, checked in file order.
    pub byproducts: Vec<ByproductData>,
    /// Missing fields fall back to [`Tuning::default`].
    pub tuning: Tuning,
}

/// A byproduct rule in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ByproductData {
    pub compound: String,
    pub threshold: u32,
}
