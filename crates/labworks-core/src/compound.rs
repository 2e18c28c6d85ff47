//! The fixed compound decomposition graph.
//!
//! Every [`Compound`] is either a raw element (no inputs) or a synthesised
//! compound produced by combining exactly two inputs. The graph is a closed,
//! acyclic table checked at compile time by the exhaustive match in
//! [`Compound::inputs`]; it is never mutated at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on the length of any walk down the graph. The deepest chain
/// (a catalysed ghodium compound down to a raw element) is 5 edges long.
pub const MAX_CHAIN_DEPTH: usize = 6;

/// A raw element or synthesised compound.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Compound {
    // -- Raw elements --
    Hydrogen,
    Oxygen,
    Utrium,
    Lemergium,
    Keanium,
    Zynthium,
    Catalyst,

    // -- Base compounds --
    Hydroxide,
    ZynthiumKeanite,
    UtriumLemergite,
    Ghodium,

    // -- Tier 1 --
    UtriumHydride,
    KeaniumOxide,
    LemergiumHydride,
    LemergiumOxide,
    ZynthiumHydride,
    ZynthiumOxide,
    GhodiumHydride,
    GhodiumOxide,

    // -- Tier 2 --
    UtriumAcid,
    KeaniumAlkalide,
    LemergiumAcid,
    LemergiumAlkalide,
    ZynthiumAcid,
    ZynthiumAlkalide,
    GhodiumAcid,
    GhodiumAlkalide,

    // -- Tier 3 --
    CatalyzedUtriumAcid,
    CatalyzedKeaniumAlkalide,
    CatalyzedLemergiumAcid,
    CatalyzedLemergiumAlkalide,
    CatalyzedZynthiumAcid,
    CatalyzedZynthiumAlkalide,
    CatalyzedGhodiumAcid,
    CatalyzedGhodiumAlkalide,
}

use Compound::*;

impl Compound {
    /// Number of compounds in the graph.
    pub const COUNT: usize = 35;

    /// Every compound, raw elements first, in declaration order.
    pub const ALL: [Compound; Compound::COUNT] = [
        Hydrogen,
        Oxygen,
        Utrium,
        Lemergium,
        Keanium,
        Zynthium,
        Catalyst,
        Hydroxide,
        ZynthiumKeanite,
        UtriumLemergite,
        Ghodium,
        UtriumHydride,
        KeaniumOxide,
        LemergiumHydride,
        LemergiumOxide,
        ZynthiumHydride,
        ZynthiumOxide,
        GhodiumHydride,
        GhodiumOxide,
        UtriumAcid,
        KeaniumAlkalide,
        LemergiumAcid,
        LemergiumAlkalide,
        ZynthiumAcid,
        ZynthiumAlkalide,
        GhodiumAcid,
        GhodiumAlkalide,
        CatalyzedUtriumAcid,
        CatalyzedKeaniumAlkalide,
        CatalyzedLemergiumAcid,
        CatalyzedLemergiumAlkalide,
        CatalyzedZynthiumAcid,
        CatalyzedZynthiumAlkalide,
        CatalyzedGhodiumAcid,
        CatalyzedGhodiumAlkalide,
    ];

    /// The two direct inputs of this compound, or `None` for a raw element.
    pub const fn inputs(self) -> Option<(Compound, Compound)> {
        match self {
            Hydrogen | Oxygen | Utrium | Lemergium | Keanium | Zynthium | Catalyst => None,

            Hydroxide => Some((Hydrogen, Oxygen)),
            ZynthiumKeanite => Some((Zynthium, Keanium)),
            UtriumLemergite => Some((Utrium, Lemergium)),
            Ghodium => Some((ZynthiumKeanite, UtriumLemergite)),

            UtriumHydride => Some((Utrium, Hydrogen)),
            KeaniumOxide => Some((Keanium, Oxygen)),
            LemergiumHydride => Some((Lemergium, Hydrogen)),
            LemergiumOxide => Some((Lemergium, Oxygen)),
            ZynthiumHydride => Some((Zynthium, Hydrogen)),
            ZynthiumOxide => Some((Zynthium, Oxygen)),
            GhodiumHydride => Some((Ghodium, Hydrogen)),
            GhodiumOxide => Some((Ghodium, Oxygen)),

            UtriumAcid => Some((UtriumHydride, Hydroxide)),
            KeaniumAlkalide => Some((KeaniumOxide, Hydroxide)),
            LemergiumAcid => Some((LemergiumHydride, Hydroxide)),
            LemergiumAlkalide => Some((LemergiumOxide, Hydroxide)),
            ZynthiumAcid => Some((ZynthiumHydride, Hydroxide)),
            ZynthiumAlkalide => Some((ZynthiumOxide, Hydroxide)),
            GhodiumAcid => Some((GhodiumHydride, Hydroxide)),
            GhodiumAlkalide => Some((GhodiumOxide, Hydroxide)),

            CatalyzedUtriumAcid => Some((Catalyst, UtriumAcid)),
            CatalyzedKeaniumAlkalide => Some((Catalyst, KeaniumAlkalide)),
            CatalyzedLemergiumAcid => Some((Catalyst, LemergiumAcid)),
            CatalyzedLemergiumAlkalide => Some((Catalyst, LemergiumAlkalide)),
            CatalyzedZynthiumAcid => Some((Catalyst, ZynthiumAcid)),
            CatalyzedZynthiumAlkalide => Some((Catalyst, ZynthiumAlkalide)),
            CatalyzedGhodiumAcid => Some((Catalyst, GhodiumAcid)),
            CatalyzedGhodiumAlkalide => Some((Catalyst, GhodiumAlkalide)),
        }
    }

    /// Whether this is a raw element. Raw elements cannot be produced by a
    /// reaction, so planning never chains past them.
    pub const fn is_raw(self) -> bool {
        self.inputs().is_none()
    }

    /// Dense index in `0..COUNT`, matching the position in [`Compound::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Length of the longest chain from this compound down to a raw element.
    pub fn depth(self) -> usize {
        match self.inputs() {
            None => 0,
            Some((a, b)) => 1 + a.depth().max(b.depth()),
        }
    }

    /// Short resource tag, e.g. `"XGH2O"`.
    pub const fn tag(self) -> &'static str {
        match self {
            Hydrogen => "H",
            Oxygen => "O",
            Utrium => "U",
            Lemergium => "L",
            Keanium => "K",
            Zynthium => "Z",
            Catalyst => "X",
            Hydroxide => "OH",
            ZynthiumKeanite => "ZK",
            UtriumLemergite => "UL",
            Ghodium => "G",
            UtriumHydride => "UH",
            KeaniumOxide => "KO",
            LemergiumHydride => "LH",
            LemergiumOxide => "LO",
            ZynthiumHydride => "ZH",
            ZynthiumOxide => "ZO",
            GhodiumHydride => "GH",
            GhodiumOxide => "GO",
            UtriumAcid => "UH2O",
            KeaniumAlkalide => "KHO2",
            LemergiumAcid => "LH2O",
            LemergiumAlkalide => "LHO2",
            ZynthiumAcid => "ZH2O",
            ZynthiumAlkalide => "ZHO2",
            GhodiumAcid => "GH2O",
            GhodiumAlkalide => "GHO2",
            CatalyzedUtriumAcid => "XUH2O",
            CatalyzedKeaniumAlkalide => "XKHO2",
            CatalyzedLemergiumAcid => "XLH2O",
            CatalyzedLemergiumAlkalide => "XLHO2",
            CatalyzedZynthiumAcid => "XZH2O",
            CatalyzedZynthiumAlkalide => "XZHO2",
            CatalyzedGhodiumAcid => "XGH2O",
            CatalyzedGhodiumAlkalide => "XGHO2",
        }
    }

    /// Compounds that take this one as a direct input.
    pub fn consumers(self) -> impl Iterator<Item = Compound> {
        Compound::ALL.into_iter().filter(move |c| match c.inputs() {
            Some((a, b)) => a == self || b == self,
            None => false,
        })
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Errors from parsing a compound tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompoundParseError {
    #[error("unknown compound: {0}")]
    UnknownCompound(String),
}

impl FromStr for Compound {
    type Err = CompoundParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Compound::ALL
            .into_iter()
            .find(|c| c.tag() == s)
            .ok_or_else(|| CompoundParseError::UnknownCompound(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_matches_index() {
        for (i, c) in Compound::ALL.iter().enumerate() {
            assert_eq!(c.index(), i, "{c} out of place");
        }
    }

    #[test]
    fn raw_elements_have_no_inputs() {
        let raw: Vec<_> = Compound::ALL.into_iter().filter(|c| c.is_raw()).collect();
        assert_eq!(
            raw,
            vec![Hydrogen, Oxygen, Utrium, Lemergium, Keanium, Zynthium, Catalyst]
        );
    }

    #[test]
    fn synthesised_count() {
        let synthesised = Compound::ALL.into_iter().filter(|c| !c.is_raw()).count();
        assert_eq!(synthesised, 28);
    }

    #[test]
    fn ghodium_chain() {
        assert_eq!(Ghodium.inputs(), Some((ZynthiumKeanite, UtriumLemergite)));
        assert_eq!(ZynthiumKeanite.inputs(), Some((Zynthium, Keanium)));
        assert_eq!(UtriumLemergite.inputs(), Some((Utrium, Lemergium)));
    }

    #[test]
    fn inputs_precede_outputs_in_declaration_order() {
        // Declaration order is a topological order, so the graph is acyclic.
        for c in Compound::ALL {
            if let Some((a, b)) = c.inputs() {
                assert!(a < c && b < c, "{c} declared before its inputs");
            }
        }
    }

    #[test]
    fn depth_bounded_by_max_chain_depth() {
        let deepest = Compound::ALL.into_iter().map(Compound::depth).max().unwrap();
        assert_eq!(deepest, 5);
        assert_eq!(CatalyzedGhodiumAcid.depth(), 5);
        assert!(deepest < MAX_CHAIN_DEPTH);
    }

    #[test]
    fn tags_round_trip() {
        for c in Compound::ALL {
            assert_eq!(c.tag().parse::<Compound>().unwrap(), c);
            assert_eq!(c.to_string(), c.tag());
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        let err = "XYZ".parse::<Compound>().unwrap_err();
        assert_eq!(err, CompoundParseError::UnknownCompound("XYZ".into()));
        assert!(err.to_string().contains("XYZ"));
        assert!("".parse::<Compound>().is_err());
        // Tags are case sensitive.
        assert!("oh".parse::<Compound>().is_err());
    }

    #[test]
    fn hydroxide_feeds_every_acid_and_alkalide() {
        let consumers: Vec<_> = Hydroxide.consumers().collect();
        assert_eq!(consumers.len(), 8);
        assert!(consumers.contains(&GhodiumAcid));
        assert!(Catalyst.consumers().all(|c| c.tag().starts_with('X')));
    }
}
