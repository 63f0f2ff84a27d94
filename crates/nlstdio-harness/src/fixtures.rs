//! Fixture loading and management.

use std::path::{Path, PathBuf};

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Core operation under test (`snprintf`, `decode_string`, ...).
    pub function: String,
    /// Operation inputs; the shape depends on `function`.
    pub inputs: serde_json::Value,
    /// Expected output, compared as a string.
    #[serde(deserialize_with = "deserialize_expected_output")]
    pub expected_output: String,
    /// Expected return value; `None` when the call is expected to fail or
    /// the return is not checked.
    #[serde(default)]
    pub expected_return: Option<i64>,
    /// Expected `StdioError` kind, e.g. `"InvalidSequence"`.
    #[serde(default)]
    pub expected_error: Option<String>,
}

/// A collection of fixture cases for a function family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Function family name.
    pub family: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_json(&content)?;
        Ok(set)
    }

    /// Write the fixture set to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Every `*.json` fixture set in `dir`, in file-name order.
pub fn load_dir(dir: &Path) -> Result<Vec<(PathBuf, FixtureSet)>, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths
        .into_iter()
        .map(|path| {
            let set = FixtureSet::from_file(&path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            Ok((path, set))
        })
        .collect()
}

fn deserialize_expected_output<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_expected_output_value(&value))
}

/// Strings compare verbatim; anything else compares as compact JSON.
pub(crate) fn normalize_expected_output_value(value: &serde_json::Value) -> String {
    if let Some(text) = value.as_str() {
        return text.to_string();
    }
    serde_json::to_string(value).unwrap_or_else(|_| String::from("null"))
}
