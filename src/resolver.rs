use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{CandidateIdentifier, Msi};
use crate::error::CcvalError;

/// Lookup answer meaning "this name has no STASH mapping".
pub const NO_MAPPING: &str = "nothing";

pub const STASH_ATTRIBUTE: &str = "STASH";
pub const STASH_CODE_ATTRIBUTE: &str = "stash_code";

/// Variables pulled from soil parameter dumps, in report order.
pub const SOILPARAM_VARIABLES: [&str; 6] = ["rh", "cs", "cv", "frac", "gpp", "npp"];

/// Legacy code for the land cover fraction, tried when `frac` finds nothing.
pub const FRAC_FALLBACK_CODE: i64 = 3317;

/// Structured STASH attribute as written by the loader.
///
/// Components stay textual so malformed values can be carried and rejected
/// at normalization time. Numbers are accepted and kept as their JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashTriple {
    #[serde(deserialize_with = "lenient_text")]
    pub model: String,
    #[serde(deserialize_with = "lenient_text")]
    pub section: String,
    #[serde(deserialize_with = "lenient_text")]
    pub item: String,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub msi: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

impl StashTriple {
    pub fn new(model: u32, section: u32, item: u32) -> Self {
        Self {
            model: model.to_string(),
            section: section.to_string(),
            item: item.to_string(),
            msi: None,
        }
    }
}

/// Attribute value; anything unrecognised is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Stash(StashTriple),
    Other(Value),
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Anything carrying an attribute mapping a STASH tag can be derived from.
pub trait StashTagged {
    fn attributes(&self) -> &Attributes;
}

/// A loaded variable as handed over by the file loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl VariableRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            units: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: AttrValue) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }
}

/// Reads a JSON array of records as written by the loader.
pub fn load_records(path: &Path) -> Result<Vec<VariableRecord>, CcvalError> {
    let content =
        fs::read_to_string(path).map_err(|_| CcvalError::RecordsRead(path.to_path_buf()))?;
    serde_json::from_str(&content).map_err(|err| CcvalError::RecordsParse(err.to_string()))
}

impl StashTagged for VariableRecord {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Maps a user-facing variable name to an MSI string.
pub trait StashLookup {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl<F> StashLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

impl StashLookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl StashLookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// `section = code / 1000`, `item = code % 1000`; sections from 30 up belong
/// to the secondary sub-model.
pub fn canonicalize_numeric_code(code: i64) -> Option<Msi> {
    if code < 0 {
        return None;
    }
    let section = u32::try_from(code / 1000).ok()?;
    let item = u32::try_from(code % 1000).ok()?;
    let model = if section >= 30 { 2 } else { 1 };
    Some(Msi::from_parts(model, section, item))
}

pub fn canonicalize_text_code(code: &str) -> Option<Msi> {
    code.trim()
        .parse::<i64>()
        .ok()
        .and_then(canonicalize_numeric_code)
}

pub fn canonicalize_triple(model: &str, section: &str, item: &str) -> Option<Msi> {
    let component = |value: &str| value.trim().parse::<u32>().ok();
    Some(Msi::from_parts(
        component(model)?,
        component(section)?,
        component(item)?,
    ))
}

/// Formats the triple, falling back to an already well-formed `msi` string.
pub fn msi_from_stash(stash: &StashTriple) -> Option<Msi> {
    canonicalize_triple(&stash.model, &stash.section, &stash.item)
        .or_else(|| stash.msi.as_deref().and_then(|msi| msi.parse().ok()))
}

fn msi_from_code_attribute(value: &AttrValue) -> Option<Msi> {
    match value {
        AttrValue::Int(code) => canonicalize_numeric_code(*code),
        AttrValue::Float(code) if code.is_finite() => canonicalize_numeric_code(code.trunc() as i64),
        AttrValue::Text(code) => canonicalize_text_code(code),
        _ => None,
    }
}

/// Derives a record's MSI; the structured attribute wins over the legacy code.
pub fn record_msi(attributes: &Attributes) -> Option<Msi> {
    let structured = match attributes.get(STASH_ATTRIBUTE) {
        Some(AttrValue::Stash(stash)) => msi_from_stash(stash),
        _ => None,
    };
    structured.or_else(|| {
        attributes
            .get(STASH_CODE_ATTRIBUTE)
            .and_then(msi_from_code_attribute)
    })
}

pub fn normalize_candidate(candidate: &CandidateIdentifier) -> Option<Msi> {
    match candidate {
        CandidateIdentifier::CanonicalMsi(msi) => Some(msi.clone()),
        CandidateIdentifier::NumericCode(code) => canonicalize_numeric_code(*code),
        CandidateIdentifier::ShortName(name) => canonicalize_text_code(name),
    }
}

/// Every MSI the request could refer to under any known naming scheme.
pub fn candidate_set(
    requested: &CandidateIdentifier,
    lookup: Option<&dyn StashLookup>,
) -> BTreeSet<Msi> {
    let mut raw = vec![requested.clone()];

    if let Some(lookup) = lookup {
        if requested.is_textual() {
            let mapped = lookup
                .lookup(&requested.to_string())
                .filter(|msi| !msi.trim().is_empty() && msi != NO_MAPPING);
            if let Some(msi) = mapped {
                raw.push(CandidateIdentifier::parse(&msi));
            }
        }
    }

    raw.push(CandidateIdentifier::parse(&requested.to_string()));
    if let Some(code) = requested.as_code() {
        raw.push(CandidateIdentifier::NumericCode(code));
    }

    let normalized: BTreeSet<Msi> = raw.iter().filter_map(normalize_candidate).collect();
    tracing::debug!("candidates {raw:?} normalized to {normalized:?}");
    normalized
}

/// Selects the records whose derived MSI is one of the request's candidates.
///
/// Input order is kept. Records without a derivable MSI never match.
pub fn try_extract<'a, R: StashTagged>(
    records: &'a [R],
    requested: impl Into<CandidateIdentifier>,
    lookup: Option<&dyn StashLookup>,
) -> Vec<&'a R> {
    let requested = requested.into();
    let candidates = candidate_set(&requested, lookup);
    if candidates.is_empty() {
        tracing::debug!("no usable candidates for {requested}");
        return Vec::new();
    }

    records
        .iter()
        .filter(|record| {
            let msi = record_msi(record.attributes());
            tracing::debug!(
                "record attrs {:?} -> MSI {msi:?}",
                record.attributes().keys().collect::<Vec<_>>()
            );
            msi.is_some_and(|msi| candidates.contains(&msi))
        })
        .collect()
}

pub fn first_match<'a, R>(matches: &[&'a R]) -> Option<&'a R> {
    matches.first().copied()
}

/// Resolves the soil parameter variable set from one batch of records.
pub fn extract_soilparam<'a, R: StashTagged>(
    records: &'a [R],
    lookup: Option<&dyn StashLookup>,
) -> BTreeMap<&'static str, Vec<&'a R>> {
    SOILPARAM_VARIABLES
        .iter()
        .map(|&name| {
            let mut found = try_extract(records, name, lookup);
            if name == "frac" && found.is_empty() {
                found = try_extract(records, FRAC_FALLBACK_CODE, lookup);
            }
            (name, found)
        })
        .collect()
}
