//! # Builds
//!
//! What the broadcaster is currently playing.
//!
//! A build replaces the stored one wholesale, there is no partial update. Every build that reaches
//! storage went through [`validate_strict`], which is the only way to obtain a [`ValidBuild`].
//!
//! ## Rules
//! - notPlaying: no perks, no killer name, no addons
//! - survivor: survivor perks only, no killer name, no addons
//! - killer: killer perks only, a known killer name, exactly 2 addon slots holding that killer's addons
//! - any perk rank is 0, 1 or 2
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::{Catalog, CatalogState},
    error::BuildError::{self, Invalid, Malformed},
};

pub const PERK_SLOTS: usize = 4;
pub const ADDON_SLOTS: usize = 2;
pub const MAX_PERK_RANK: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    NotPlaying,
    Killer,
    Survivor,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::NotPlaying, Mode::Killer, Mode::Survivor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::NotPlaying => "notPlaying",
            Mode::Killer => "killer",
            Mode::Survivor => "survivor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Mode::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Perk name and rank, serialized as `["Adrenaline", 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perk(pub String, pub u8);

impl Perk {
    pub fn new(name: impl Into<String>, rank: u8) -> Self {
        Self(name.into(), rank)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn rank(&self) -> u8 {
        self.1
    }
}

pub type PerkSlots = [Option<Perk>; PERK_SLOTS];
pub type AddonSlots = [Option<String>; ADDON_SLOTS];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub mode: Mode,
    pub perks: PerkSlots,
    pub killer_name: Option<String>,
    pub addons: Option<AddonSlots>,
}

impl Default for Build {
    fn default() -> Self {
        Self {
            mode: Mode::NotPlaying,
            perks: Default::default(),
            killer_name: None,
            addons: None,
        }
    }
}

/// A build that passed [`validate_strict`]. Safe to persist and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidBuild(Build);

impl ValidBuild {
    pub fn as_build(&self) -> &Build {
        &self.0
    }

    pub fn into_inner(self) -> Build {
        self.0
    }
}

impl AsRef<Build> for ValidBuild {
    fn as_ref(&self) -> &Build {
        &self.0
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Key into powers per killer: `"ghost face"` becomes `"The Ghost Face"`. Words are split on
/// single spaces, so padded names never match a killer.
pub fn normalize_killer_name(name: &str) -> String {
    let words: Vec<String> = name.split(' ').map(capitalize).collect();

    format!("The {}", words.join(" "))
}

/// Key into addons per killer. Only the first letter of the whole name is capitalized,
/// so `"ghost face"` becomes `"The Ghost face"`.
pub fn addon_killer_key(name: &str) -> String {
    format!("The {}", capitalize(name))
}

/// Checks an untrusted payload against the catalog. Stops at the first failing rule.
pub fn validate_strict(candidate: &Value, catalog: &CatalogState) -> Result<ValidBuild, BuildError> {
    let catalog = catalog.ready()?;

    let Value::Object(fields) = candidate else {
        return Err(Malformed(format!(
            "{candidate} is not a valid DbD build; must be of type object"
        )));
    };

    let mode = check_mode(fields)?;
    let perks = check_perks(mode, field(fields, "perks"), catalog)?;
    let killer_name = check_killer_name(mode, field(fields, "killerName"), catalog)?;
    let addons = check_addons(mode, killer_name.as_deref(), field(fields, "addons"), catalog)?;

    Ok(ValidBuild(Build {
        mode,
        perks,
        killer_name,
        addons,
    }))
}

// Missing fields count as null.
fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a Value {
    fields.get(key).unwrap_or(&Value::Null)
}

fn check_mode(fields: &Map<String, Value>) -> Result<Mode, BuildError> {
    field(fields, "mode")
        .as_str()
        .and_then(Mode::parse)
        .ok_or_else(|| {
            let modes: Vec<&str> = Mode::ALL.iter().map(Mode::as_str).collect();
            Invalid(format!("Error: mode must be one of {}", modes.join(", ")))
        })
}

fn check_perks(mode: Mode, perks: &Value, catalog: &Catalog) -> Result<PerkSlots, BuildError> {
    let slots = match perks.as_array() {
        Some(slots) if slots.len() == PERK_SLOTS => slots,
        _ => {
            return Err(Malformed(format!(
                "perks must be a list of {PERK_SLOTS} perk slots"
            )));
        }
    };

    let mut checked = PerkSlots::default();

    if mode == Mode::NotPlaying {
        if slots.iter().any(|slot| !slot.is_null()) {
            return Err(Invalid(
                "When mode is notPlaying, all perks must be null".to_string(),
            ));
        }

        return Ok(checked);
    }

    for (index, slot) in slots.iter().enumerate() {
        if slot.is_null() {
            continue;
        }

        let (name, rank) = parse_perk(slot)?;

        let rank = rank
            .as_u64()
            .and_then(|rank| u8::try_from(rank).ok())
            .filter(|rank| *rank <= MAX_PERK_RANK)
            .ok_or_else(|| {
                Invalid(format!(
                    "Error at {name} with rank {rank}: Perk rank must be 0, 1 or 2"
                ))
            })?;

        let known = match mode {
            Mode::Killer => catalog.is_killer_perk(name),
            _ => catalog.is_survivor_perk(name),
        };

        if !known {
            return Err(Invalid(format!(
                "{name} is not a valid perk name for {mode}"
            )));
        }

        checked[index] = Some(Perk::new(name, rank));
    }

    Ok(checked)
}

fn parse_perk(slot: &Value) -> Result<(&str, &Value), BuildError> {
    match slot.as_array().map(Vec::as_slice) {
        Some([Value::String(name), rank @ Value::Number(_)]) => Ok((name.as_str(), rank)),
        _ => Err(Malformed(format!(
            "{slot} is not a valid perk; must be a [name, rank] pair"
        ))),
    }
}

fn check_killer_name(mode: Mode, killer_name: &Value, catalog: &Catalog) -> Result<Option<String>, BuildError> {
    if mode != Mode::Killer {
        if !killer_name.is_null() {
            return Err(Invalid(format!(
                "killerName must be null when mode is {mode}"
            )));
        }

        return Ok(None);
    }

    let name = match killer_name {
        Value::String(name) => name,
        Value::Null => {
            return Err(Invalid(
                "killerName may not be null when mode is killer".to_string(),
            ));
        }
        other => {
            return Err(Malformed(format!("{other} is not a valid killerName; must be a string")));
        }
    };

    if catalog.power_of(&normalize_killer_name(name)).is_none() {
        return Err(Invalid(format!("{name} is not a valid killer name")));
    }

    Ok(Some(name.clone()))
}

fn check_addons(
    mode: Mode,
    killer_name: Option<&str>,
    addons: &Value,
    catalog: &Catalog,
) -> Result<Option<AddonSlots>, BuildError> {
    if mode != Mode::Killer {
        if !addons.is_null() {
            return Err(Invalid(format!("Addons must be null when mode is {mode}")));
        }

        return Ok(None);
    }

    let slots = match addons {
        Value::Null => {
            return Err(Invalid(
                "Addons may not be null when mode is killer".to_string(),
            ));
        }
        Value::Array(slots) if slots.len() == ADDON_SLOTS => slots,
        _ => {
            return Err(Malformed(format!(
                "addons must be a list of {ADDON_SLOTS} addon slots"
            )));
        }
    };

    // killer mode always carries a checked name at this point
    let killer_name = killer_name.unwrap_or_default();
    let killer_addons = catalog.addons_of(&addon_killer_key(killer_name));
    let mut checked = AddonSlots::default();

    for (index, slot) in slots.iter().enumerate() {
        let addon = match slot {
            Value::Null => continue,
            Value::String(addon) => addon,
            other => {
                return Err(Malformed(format!("{other} is not a valid addon; must be a string")));
            }
        };

        if !killer_addons.is_some_and(|addons| addons.contains(addon)) {
            return Err(Invalid(format!(
                "{addon} is not a valid addon for {killer_name}"
            )));
        }

        checked[index] = Some(addon.clone());
    }

    Ok(Some(checked))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("trapper"), "Trapper");
        assert_eq!(capitalize("Trapper"), "Trapper");
        assert_eq!(capitalize("ghost face"), "Ghost face");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_killer_name_normalizations_differ() {
        assert_eq!(normalize_killer_name("ghost face"), "The Ghost Face");
        assert_eq!(addon_killer_key("ghost face"), "The Ghost face");

        assert_eq!(normalize_killer_name("trapper"), "The Trapper");
        assert_eq!(addon_killer_key("trapper"), "The Trapper");
    }

    #[test]
    fn test_normalize_keeps_padding() {
        assert_eq!(normalize_killer_name("ghost face"), "The Ghost Face");
        assert_eq!(normalize_killer_name("trapper "), "The Trapper ");
        assert_eq!(normalize_killer_name("ghost  face"), "The Ghost  Face");
    }

    #[test]
    fn test_default_build_shape() {
        let build = serde_json::to_value(Build::default()).unwrap();

        assert_eq!(
            build,
            json!({
                "mode": "notPlaying",
                "perks": [null, null, null, null],
                "killerName": null,
                "addons": null
            })
        );
    }

    #[test]
    fn test_perk_serializes_as_pair() {
        let perk = serde_json::to_value(Perk::new("Adrenaline", 2)).unwrap();
        assert_eq!(perk, json!(["Adrenaline", 2]));
    }

    #[test]
    fn test_uninitialized_catalog_is_not_a_validation_error() {
        let result = validate_strict(&json!("anything"), &CatalogState::Uninitialized);
        assert_eq!(result.unwrap_err(), BuildError::CatalogNotReady);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("killer"), Some(Mode::Killer));
        assert_eq!(Mode::parse("notPlaying"), Some(Mode::NotPlaying));
        assert_eq!(Mode::parse("Killer"), None);
    }
}
