//! Technologies and the sets which determine which constraints apply to them.
use crate::id::{define_id_getter, define_id_type};
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{Display, EnumIter, IntoEnumIterator};

define_id_type! {TechnologyID}
define_id_type! {GroupID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Technology>;

/// A generation or storage technology
#[derive(Debug, PartialEq)]
pub struct Technology {
    /// Unique identifier (e.g. "gas_ccgt1G")
    pub id: TechnologyID,
    /// The group under which the technology's output is reported (e.g. "gas")
    pub group: GroupID,
}
define_id_getter! {Technology, TechnologyID}

/// The sets to which a technology can belong
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, Display, EnumIter,
)]
pub enum TechnologySetKind {
    /// Variable renewables, limited by an hourly load factor
    #[string = "vre"]
    #[strum(serialize = "vre")]
    Vre,
    /// Thermal plants with commitment dynamics
    #[string = "thermal"]
    #[strum(serialize = "thermal")]
    Thermal,
    /// Storage technologies
    #[string = "storage"]
    #[strum(serialize = "storage")]
    Storage,
    /// The technology whose output follows a fixed profile
    #[string = "non_market"]
    #[strum(serialize = "non_market")]
    NonMarket,
    /// Technologies which may provide frequency restoration reserve
    #[string = "frr"]
    #[strum(serialize = "frr")]
    Frr,
    /// Technologies which may not provide frequency restoration reserve
    #[string = "no_frr"]
    #[strum(serialize = "no_frr")]
    NoFrr,
}

/// The partition of technologies used when building constraints
#[derive(Debug, PartialEq)]
pub struct TechnologySets {
    /// Variable renewable technologies
    pub vre: IndexSet<TechnologyID>,
    /// Thermal technologies
    pub thermal: IndexSet<TechnologyID>,
    /// Storage technologies
    pub storage: IndexSet<TechnologyID>,
    /// The single non-market-dependent technology
    pub non_market: TechnologyID,
    /// Technologies which contribute to the reserve requirement
    pub frr: IndexSet<TechnologyID>,
    /// Technologies whose reserve is fixed at zero
    pub no_frr: IndexSet<TechnologyID>,
}

impl TechnologySets {
    /// Build technology sets from (set, technology) memberships, checking that they are consistent.
    ///
    /// The VRE, thermal, storage and non-market sets must partition the technologies, with exactly
    /// one non-market technology. Every thermal technology must be in exactly one of the FRR and
    /// non-FRR sets.
    pub fn from_memberships<I>(technologies: &TechnologyMap, memberships: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TechnologySetKind, TechnologyID)>,
    {
        let mut sets: IndexMap<TechnologySetKind, IndexSet<TechnologyID>> =
            TechnologySetKind::iter()
                .map(|kind| (kind, IndexSet::new()))
                .collect();
        for (kind, id) in memberships {
            ensure!(
                technologies.contains_key(&id),
                "Unknown technology {id} in set {kind}"
            );
            let inserted = sets[&kind].insert(id.clone());
            ensure!(inserted, "Technology {id} is listed twice in set {kind}");
        }

        let mut take = |kind: TechnologySetKind| sets.swap_remove(&kind).unwrap_or_default();
        let vre = take(TechnologySetKind::Vre);
        let thermal = take(TechnologySetKind::Thermal);
        let storage = take(TechnologySetKind::Storage);
        let non_market = take(TechnologySetKind::NonMarket);
        let frr = take(TechnologySetKind::Frr);
        let no_frr = take(TechnologySetKind::NoFrr);

        ensure!(
            non_market.len() == 1,
            "Exactly one non_market technology must be given (found {})",
            non_market.len()
        );
        let non_market = non_market
            .into_iter()
            .next()
            .context("Missing non_market technology")?;

        // Check that every technology is in exactly one of the main sets
        for id in technologies.keys() {
            let count = [&vre, &thermal, &storage]
                .into_iter()
                .filter(|set| set.contains(id))
                .count()
                + usize::from(*id == non_market);
            ensure!(
                count == 1,
                "Technology {id} must be in exactly one of the vre, thermal, storage and \
                non_market sets (found in {count})"
            );
        }

        if let Some(id) = frr.intersection(&no_frr).next() {
            bail!("Technology {id} is in both the frr and no_frr sets");
        }
        for id in &thermal {
            ensure!(
                frr.contains(id) || no_frr.contains(id),
                "Thermal technology {id} must be in either the frr or no_frr set"
            );
        }

        Ok(Self {
            vre,
            thermal,
            storage,
            non_market,
            frr,
            no_frr,
        })
    }

    /// Whether the technology is a thermal technology
    pub fn is_thermal(&self, id: &TechnologyID) -> bool {
        self.thermal.contains(id)
    }

    /// Whether the technology is a storage technology
    pub fn is_storage(&self, id: &TechnologyID) -> bool {
        self.storage.contains(id)
    }
}
