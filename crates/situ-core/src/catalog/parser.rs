//! Catalog parsing from YAML/JSON.

use regex::RegexBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::puzzle::{CompatibilityRule, Puzzle, Verdict};
use super::schema::validate_catalog_schema;

/// Default catalog shipped with the experiment.
const BUILTIN_CATALOG_YAML: &str = include_str!("../../../../assets/puzzles.yaml");

/// Errors that can occur when loading a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Catalog does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Invalid pattern in puzzle {puzzle} rule {rule}: {source}")]
    InvalidPattern {
        puzzle: u32,
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("Catalog validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    puzzles: Vec<PuzzleEntry>,
}

#[derive(Debug, Deserialize)]
struct PuzzleEntry {
    id: u32,
    slug: String,
    question: String,
    answer: String,
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    id: String,
    verdict: Verdict,
    pattern: String,
    #[serde(default)]
    description: String,
}

/// An ordered, non-empty set of puzzles, immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct Catalog {
    puzzles: Vec<Puzzle>,
}

impl Catalog {
    /// The catalog embedded in the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG_YAML)
    }

    /// Parse a catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load a catalog file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Validate against the schema, then compile every rule.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CatalogError> {
        validate_catalog_schema(&value).map_err(CatalogError::SchemaError)?;

        let file: CatalogFile = serde_json::from_value(value)?;
        let mut puzzles = Vec::with_capacity(file.puzzles.len());
        let mut slugs = HashSet::new();

        for (index, entry) in file.puzzles.into_iter().enumerate() {
            let expected = index as u32 + 1;
            if entry.id != expected {
                return Err(CatalogError::ValidationError(format!(
                    "puzzle ids must be 1..n in order: expected {}, found {}",
                    expected, entry.id
                )));
            }
            if !slugs.insert(entry.slug.clone()) {
                return Err(CatalogError::ValidationError(format!(
                    "duplicate puzzle slug '{}'",
                    entry.slug
                )));
            }

            let rules = entry
                .rules
                .into_iter()
                .map(|rule| compile_rule(entry.id, rule))
                .collect::<Result<Vec<_>, _>>()?;

            puzzles.push(Puzzle {
                id: entry.id,
                slug: entry.slug,
                question: entry.question,
                answer: entry.answer,
                rules,
            });
        }

        if puzzles.is_empty() {
            return Err(CatalogError::ValidationError(
                "catalog must contain at least one puzzle".to_string(),
            ));
        }

        tracing::debug!(puzzles = puzzles.len(), "Catalog loaded");
        Ok(Self { puzzles })
    }

    /// The first puzzle; catalogs are never empty.
    pub fn first(&self) -> &Puzzle {
        &self.puzzles[0]
    }

    pub fn get(&self, id: u32) -> Option<&Puzzle> {
        self.puzzles.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// The puzzle that follows `id`, if any.
    pub fn next_after(&self, id: u32) -> Option<&Puzzle> {
        self.get(id.saturating_add(1))
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Puzzle> {
        self.puzzles.iter()
    }
}

fn compile_rule(puzzle: u32, rule: RuleEntry) -> Result<CompatibilityRule, CatalogError> {
    let pattern = RegexBuilder::new(&rule.pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| CatalogError::InvalidPattern {
            puzzle,
            rule: rule.id.clone(),
            source,
        })?;

    Ok(CompatibilityRule {
        id: rule.id,
        verdict: rule.verdict,
        description: rule.description,
        pattern,
    })
}
