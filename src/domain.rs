use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CcvalError;

/// Canonical model/section/item tag, `m{model:02}s{section:02}i{item:03}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Msi(String);

impl Msi {
    pub fn from_parts(model: u32, section: u32, item: u32) -> Self {
        Self(format!("m{model:02}s{section:02}i{item:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Msi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Msi {
    type Err = CcvalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (model, section, item) =
            split_msi(value.trim()).ok_or_else(|| CcvalError::InvalidMsi(value.to_string()))?;
        Ok(Self::from_parts(model, section, item))
    }
}

impl TryFrom<String> for Msi {
    type Error = CcvalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Msi> for String {
    fn from(value: Msi) -> Self {
        value.0
    }
}

fn split_msi(value: &str) -> Option<(u32, u32, u32)> {
    let rest = value.strip_prefix('m')?;
    let (model, rest) = rest.split_once('s')?;
    let (section, item) = rest.split_once('i')?;
    Some((
        digits(model, 2)?,
        digits(section, 2)?,
        digits(item, 3)?,
    ))
}

fn digits(value: &str, min_width: usize) -> Option<u32> {
    if value.len() < min_width || !value.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// One way of naming a physical quantity in a variable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateIdentifier {
    ShortName(String),
    NumericCode(i64),
    CanonicalMsi(Msi),
}

impl CandidateIdentifier {
    /// Classifies free text: MSI-shaped strings, then all-digit codes, then names.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if let Ok(msi) = trimmed.parse::<Msi>() {
            return CandidateIdentifier::CanonicalMsi(msi);
        }
        if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(code) = trimmed.parse() {
                return CandidateIdentifier::NumericCode(code);
            }
        }
        CandidateIdentifier::ShortName(value.to_string())
    }

    pub fn is_textual(&self) -> bool {
        !matches!(self, CandidateIdentifier::NumericCode(_))
    }

    pub fn as_code(&self) -> Option<i64> {
        match self {
            CandidateIdentifier::NumericCode(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for CandidateIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateIdentifier::ShortName(name) => write!(f, "{name}"),
            CandidateIdentifier::NumericCode(code) => write!(f, "{code}"),
            CandidateIdentifier::CanonicalMsi(msi) => write!(f, "{msi}"),
        }
    }
}

impl From<&str> for CandidateIdentifier {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for CandidateIdentifier {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<i64> for CandidateIdentifier {
    fn from(value: i64) -> Self {
        CandidateIdentifier::NumericCode(value)
    }
}

impl From<Msi> for CandidateIdentifier {
    fn from(value: Msi) -> Self {
        CandidateIdentifier::CanonicalMsi(value)
    }
}

/// A model output file whose name decoded to a valid year and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub year: i32,
    pub month: u32,
    pub path: PathBuf,
}
