/*
    This module loads collections of named example grammars
*/

use std::fmt::Display;
use std::path::Path;

use rand::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error_handling::*;

pub const DEFAULT_TITLE: &str = "TUM Compiler Construction I - Lecture slides example";

pub const DEFAULT_PRODUCTION_RULES: [&str; 3] = [
    "S -> L : h[0] = h[1]; i[1] = j[1]; j[0] = j[1]; k[1] = h[1]; i[0] = 0; k[0] = 0",
    "L -> a : j[0] = k[0]; h[0] = 0; i[0] = 0",
    "L -> b : h[0] = i[0]; j[0] = 0; k[0] = 0",
];

#[derive(Debug)]
pub enum CatalogErrorType {
    // The file could not be read
    FileError(std::io::Error),
    // The file is not JSON at all
    MalformedJson(String),
    // The top level is something other than an array
    NotAnArray,
    // The top level array has no entries
    EmptyArray,
    // The entry at the given position has no string `title`
    MissingTitle(usize),
    // The entry at the given position has no `productionRules`
    MissingProductionRules(usize),
    // The entry's `productionRules` is not an array of strings
    MalformedProductionRules(usize),
}

impl ErrorType for CatalogErrorType {}

impl PartialEq for CatalogErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CatalogErrorType::FileError(a), CatalogErrorType::FileError(b)) => a.kind() == b.kind(),
            (CatalogErrorType::MalformedJson(_), CatalogErrorType::MalformedJson(_)) => true,
            (CatalogErrorType::MissingTitle(a), CatalogErrorType::MissingTitle(b)) => a == b,
            (CatalogErrorType::MissingProductionRules(a), CatalogErrorType::MissingProductionRules(b)) => a == b,
            (CatalogErrorType::MalformedProductionRules(a), CatalogErrorType::MalformedProductionRules(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Display for CatalogErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogErrorType::FileError(e) => write!(f, "File error: {}", e),
            CatalogErrorType::MalformedJson(e) => write!(f, "The JSON file is wrongly formatted: {}", e),
            CatalogErrorType::NotAnArray => write!(f, "JSON must consist of an array only."),
            CatalogErrorType::EmptyArray => write!(f, "JSON array is empty."),
            CatalogErrorType::MissingTitle(index) => write!(f, "Grammar title not found in entry {}.", index),
            CatalogErrorType::MissingProductionRules(index) => write!(f, "Production rules not found in entry {}.", index),
            CatalogErrorType::MalformedProductionRules(index) => {
                write!(f, "Production rules in entry {} must be an array of strings.", index)
            }
        }
    }
}

pub type CatalogError = Error<CatalogErrorType>;
pub type Result<T> = std::result::Result<T, CatalogErrorType>;

// A titled grammar, one production rule per string
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    #[serde(rename = "productionRules")]
    pub production_rules: Vec<String>,
}

impl CatalogEntry {
    pub fn grammar_text(&self) -> String {
        self.production_rules.join("\n")
    }
}

// The grammar shown when no catalog is available
pub fn default_entry() -> CatalogEntry {
    CatalogEntry {
        title: DEFAULT_TITLE.to_string(),
        production_rules: DEFAULT_PRODUCTION_RULES.iter().map(ToString::to_string).collect(),
    }
}

// Deserializes one entry, naming the first field that is missing or malformed
fn parse_entry(index: usize, value: &Value) -> Result<CatalogEntry> {
    CatalogEntry::deserialize(value).map_err(|_| {
        if !value.get("title").is_some_and(Value::is_string) {
            CatalogErrorType::MissingTitle(index)
        } else if value.get("productionRules").is_none() {
            CatalogErrorType::MissingProductionRules(index)
        } else {
            CatalogErrorType::MalformedProductionRules(index)
        }
    })
}

pub fn parse(json: &str) -> Result<Vec<CatalogEntry>> {
    let value: Value = serde_json::from_str(json).map_err(|e| CatalogErrorType::MalformedJson(e.to_string()))?;

    let entries = value.as_array().ok_or(CatalogErrorType::NotAnArray)?;
    if entries.is_empty() {
        return Err(CatalogErrorType::EmptyArray);
    }

    entries.iter().enumerate().map(|(index, entry)| parse_entry(index, entry)).collect()
}

pub fn load(path: &Path) -> std::result::Result<Vec<CatalogEntry>, CatalogError> {
    let to_error = |error| CatalogError {
        location: Location::Nowhere,
        fragment: path.display().to_string(),
        error,
    };

    let json = std::fs::read_to_string(path).map_err(|e| to_error(CatalogErrorType::FileError(e)))?;
    let entries = parse(&json).map_err(to_error)?;

    debug!(path = %path.display(), entries = entries.len(), "loaded grammar catalog");
    return Ok(entries);
}

pub fn find_by_title<'a>(entries: &'a [CatalogEntry], title: &str) -> Option<&'a CatalogEntry> {
    entries.iter().find(|entry| entry.title == title)
}

pub fn choose_random(entries: &[CatalogEntry]) -> Option<&CatalogEntry> {
    entries.choose(&mut thread_rng())
}
