//! Puzzle catalog: loading, schema validation, and guess judging.

mod parser;
mod puzzle;
mod schema;

pub use parser::{Catalog, CatalogError};
pub use puzzle::{CompatibilityRule, Judgement, Puzzle, Verdict};
pub use schema::validate_catalog_schema;
