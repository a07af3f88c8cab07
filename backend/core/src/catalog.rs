//! # Catalog
//!
//! Reference game data builds are checked against.
//!
//! ## Segments
//! - Survivor perks: perk name to perk info (description tree, rarity scaling)
//! - Killer perks: same shape as survivor perks
//! - Addons: power name to addon name to addon info
//! - Powers: killer display name (e.g. "The Trapper") to power name
//!
//! Addons per killer is derived from the last two, keyed by the trimmed killer display name.
//! Perk and addon info is kept as opaque JSON, only the keys matter for validation.
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, OnceLock},
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::error::{BuildError, CatalogError};

pub type PerkMap = BTreeMap<String, Value>;
pub type AddonMap = BTreeMap<String, BTreeMap<String, Value>>;
pub type PowerMap = BTreeMap<String, String>;
pub type KillerAddons = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    survivor_perks: PerkMap,
    killer_perks: PerkMap,
    all_addons: AddonMap,
    powers_per_killer: PowerMap,
    addons_per_killer: KillerAddons,
}

impl Catalog {
    pub fn new(
        survivor_perks: PerkMap,
        killer_perks: PerkMap,
        all_addons: AddonMap,
        powers_per_killer: PowerMap,
    ) -> Result<Self, CatalogError> {
        let addons_per_killer = compute_killer_addons(&all_addons, &powers_per_killer)?;

        Ok(Self {
            survivor_perks,
            killer_perks,
            all_addons,
            powers_per_killer,
            addons_per_killer,
        })
    }

    /// Builds the catalog from raw segment documents as they come out of a source.
    pub fn from_segments(
        survivor_perks: Value,
        killer_perks: Value,
        addons: Value,
        powers: Value,
    ) -> Result<Self, CatalogError> {
        Self::new(
            parse_segment("survivor_perks", survivor_perks)?,
            parse_segment("killer_perks", killer_perks)?,
            parse_segment("addons", addons)?,
            parse_segment("powers", powers)?,
        )
    }

    pub fn survivor_perks(&self) -> &PerkMap {
        &self.survivor_perks
    }

    pub fn killer_perks(&self) -> &PerkMap {
        &self.killer_perks
    }

    pub fn all_addons(&self) -> &AddonMap {
        &self.all_addons
    }

    pub fn powers_per_killer(&self) -> &PowerMap {
        &self.powers_per_killer
    }

    pub fn addons_per_killer(&self) -> &KillerAddons {
        &self.addons_per_killer
    }

    pub fn is_survivor_perk(&self, name: &str) -> bool {
        self.survivor_perks.contains_key(name)
    }

    pub fn is_killer_perk(&self, name: &str) -> bool {
        self.killer_perks.contains_key(name)
    }

    pub fn power_of(&self, killer: &str) -> Option<&str> {
        self.powers_per_killer.get(killer).map(String::as_str)
    }

    pub fn addons_of(&self, killer: &str) -> Option<&BTreeSet<String>> {
        self.addons_per_killer.get(killer)
    }
}

fn parse_segment<T: DeserializeOwned>(segment: &'static str, value: Value) -> Result<T, CatalogError> {
    serde_json::from_value(value).map_err(|source| CatalogError::Shape { segment, source })
}

fn compute_killer_addons(all_addons: &AddonMap, powers: &PowerMap) -> Result<KillerAddons, CatalogError> {
    let mut killer_addons = KillerAddons::new();

    for (killer, power) in powers {
        let addons = all_addons
            .get(power)
            .filter(|addons| !addons.is_empty())
            .ok_or_else(|| CatalogError::MissingAddons {
                killer: killer.clone(),
                power: power.clone(),
            })?;

        killer_addons.insert(killer.trim().to_string(), addons.keys().cloned().collect());
    }

    Ok(killer_addons)
}

/// Snapshot of the catalog handed to the validator.
#[derive(Debug, Clone, Default)]
pub enum CatalogState {
    #[default]
    Uninitialized,
    Ready(Arc<Catalog>),
}

impl CatalogState {
    pub fn ready(&self) -> Result<&Catalog, BuildError> {
        match self {
            CatalogState::Ready(catalog) => Ok(catalog),
            CatalogState::Uninitialized => Err(BuildError::CatalogNotReady),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CatalogState::Ready(_))
    }
}

impl From<Catalog> for CatalogState {
    fn from(catalog: Catalog) -> Self {
        CatalogState::Ready(Arc::new(catalog))
    }
}

/// One-shot initialization gate. The first install wins, the catalog is read only afterwards.
#[derive(Debug, Default)]
pub struct CatalogGate {
    cell: OnceLock<Arc<Catalog>>,
}

impl CatalogGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, catalog: Catalog) -> Result<(), CatalogError> {
        self.cell
            .set(Arc::new(catalog))
            .map_err(|_| CatalogError::AlreadyInitialized)?;

        info!("Catalog installed");
        Ok(())
    }

    pub fn state(&self) -> CatalogState {
        match self.cell.get() {
            Some(catalog) => CatalogState::Ready(catalog.clone()),
            None => CatalogState::Uninitialized,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Catalog {
        Catalog::from_segments(
            json!({ "Adrenaline": {} }),
            json!({ "Agitation": {} }),
            json!({
                "Bear Trap": { "Trapper Gloves": [], "Bloody Coil": [] },
                "Spencer's Last Breath": { "White Nit Comb": [] }
            }),
            json!({ "The Trapper": "Bear Trap", " The Nurse ": "Spencer's Last Breath" }),
        )
        .unwrap()
    }

    #[test]
    fn test_killer_addons_derived_from_power() {
        let catalog = sample();

        let trapper = catalog.addons_of("The Trapper").unwrap();
        assert!(trapper.contains("Trapper Gloves"));
        assert!(trapper.contains("Bloody Coil"));
        assert!(!trapper.contains("White Nit Comb"));
    }

    #[test]
    fn test_killer_addon_keys_are_trimmed() {
        let catalog = sample();

        assert!(catalog.addons_of("The Nurse").is_some());
        assert!(catalog.addons_of(" The Nurse ").is_none());
        assert_eq!(catalog.power_of(" The Nurse "), Some("Spencer's Last Breath"));
    }

    #[test]
    fn test_power_without_addons_is_rejected() {
        let missing = Catalog::from_segments(
            json!({}),
            json!({}),
            json!({ "Bear Trap": { "Trapper Gloves": [] } }),
            json!({ "The Hag": "Blackened Catalyst" }),
        );
        assert!(matches!(missing, Err(CatalogError::MissingAddons { .. })));

        let empty = Catalog::from_segments(
            json!({}),
            json!({}),
            json!({ "Blackened Catalyst": {} }),
            json!({ "The Hag": "Blackened Catalyst" }),
        );
        assert!(matches!(empty, Err(CatalogError::MissingAddons { .. })));
    }

    #[test]
    fn test_wrong_segment_shape() {
        let result = Catalog::from_segments(json!(["Adrenaline"]), json!({}), json!({}), json!({}));
        assert!(matches!(
            result,
            Err(CatalogError::Shape {
                segment: "survivor_perks",
                ..
            })
        ));
    }

    #[test]
    fn test_uninitialized_state_is_not_ready() {
        let state = CatalogState::Uninitialized;
        assert_eq!(state.ready().unwrap_err(), BuildError::CatalogNotReady);
    }

    #[test]
    fn test_gate_installs_once() {
        let gate = CatalogGate::new();
        assert!(!gate.state().is_ready());

        gate.install(sample()).unwrap();
        assert!(gate.state().is_ready());

        assert!(matches!(gate.install(sample()), Err(CatalogError::AlreadyInitialized)));
    }
}
