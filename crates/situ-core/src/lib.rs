//! # situ-core
//!
//! Deterministic core of the situational-puzzle experiment.
//!
//! A participant works through a fixed catalog of lateral-thinking puzzles
//! by asking yes/no questions. Each session is assigned one feedback
//! condition (sincere, flattery, or neutral) that shapes the feedback
//! paragraph of every answer.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: classification, contracts, and sanitizing are pure
//! 2. **No LLM calls**: the model boundary lives in `situ-runtime`
//! 3. **Bounded**: a session never exceeds its question budget
//!
//! ## Example
//!
//! ```rust,ignore
//! use situ_core::{build_contract, classify, Catalog, Condition, Phase};
//!
//! let catalog = Catalog::builtin()?;
//! assert!(classify("Was the river frozen?"));
//!
//! let payload = build_contract(Condition::Sincere, catalog.first(), Phase::AwaitingInput, 9);
//! println!("{}", payload.system);
//! ```

pub mod catalog;
pub mod classifier;
pub mod contract;
pub mod feedback;
pub mod messages;
pub mod sanitizer;
pub mod session;
pub mod types;

// Re-export main types at crate root
pub use catalog::{Catalog, CatalogError, CompatibilityRule, Judgement, Puzzle, Verdict};
pub use classifier::{classify, classify_detailed, Classification, ClassifierRule};
pub use contract::{build_contract, ContractBuilder, InstructionPayload};
pub use feedback::{
    canned_phrases, draw_canned, FeedbackContract, FeedbackPolicy, FeedbackSource,
    FeedbackStrategy, FLATTERY_PHRASES, NEUTRAL_PHRASES,
};
pub use messages::{introduction, reveal, CLOSING_MESSAGE, NOT_YES_NO_WARNING};
pub use sanitizer::{first_paragraph, sanitize, sanitize_with_report, Repair, SanitizeMode, Sanitized};
pub use session::{
    count_questions, Adjustment, Advance, ConditionInput, Resumed, Session, SessionSeed,
    TransitionError, DEFAULT_MAX_QUESTIONS,
};
pub use types::{Condition, Phase, Reply, Speaker, Turn, UnknownCondition};
