//! Response sanitizer.
//!
//! Rewrites model output that breaks the formatting or disclosure contract.
//! Pure and total: it never fails, it only rewrites, and applying it twice
//! gives the same text as applying it once.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::messages::NOT_YES_NO_WARNING;

lazy_static! {
    /// The warning sentence with any casing and any whitespace between words.
    static ref WARNING_PATTERN: Regex = Regex::new(
        r"(?i)the\s+question\s+you\s+asked\s+is\s+not\s+a\s+yes\s+or\s+no\s+question\.?"
    ).unwrap();

    /// Runs of spaces and tabs inside a line.
    static ref INLINE_WHITESPACE: Regex = Regex::new(r"[ \t]+").unwrap();

    /// Three or more blank lines between paragraphs.
    static ref EXCESS_BLANK_LINES: Regex = Regex::new(r"\n{4,}").unwrap();
}

/// What the caller expects the text to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeMode {
    /// Must be exactly the fixed warning sentence
    WarningOnly,

    /// A verdict with optional feedback; the warning must not appear
    YesNo,
}

/// A contract repair made by the sanitizer. Logged, never shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Repair {
    ReplacedWithWarning,
    RemovedWarning { occurrences: usize },
    CollapsedBlankLines,
    NormalizedWhitespace,
}

/// Sanitized text plus the repairs that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    pub repairs: Vec<Repair>,
}

impl Sanitized {
    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }
}

/// Sanitize model output for the expected mode.
pub fn sanitize(raw: &str, mode: SanitizeMode) -> String {
    sanitize_with_report(raw, mode).text
}

/// Sanitize and report each repair.
pub fn sanitize_with_report(raw: &str, mode: SanitizeMode) -> Sanitized {
    match mode {
        SanitizeMode::WarningOnly => {
            let repairs = if raw == NOT_YES_NO_WARNING {
                vec![]
            } else {
                vec![Repair::ReplacedWithWarning]
            };
            Sanitized {
                text: NOT_YES_NO_WARNING.to_string(),
                repairs,
            }
        }
        SanitizeMode::YesNo => sanitize_yes_no(raw),
    }
}

fn sanitize_yes_no(raw: &str) -> Sanitized {
    let mut repairs = Vec::new();
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");

    // Removal can splice a new occurrence together, so repeat to a fixpoint.
    let mut occurrences = 0;
    while WARNING_PATTERN.is_match(&text) {
        occurrences += WARNING_PATTERN.find_iter(&text).count();
        text = WARNING_PATTERN.replace_all(&text, "").into_owned();
    }
    if occurrences > 0 {
        repairs.push(Repair::RemovedWarning { occurrences });
    }

    let normalized = text
        .split('\n')
        .map(|line| INLINE_WHITESPACE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    if normalized != text {
        repairs.push(Repair::NormalizedWhitespace);
    }

    let collapsed = EXCESS_BLANK_LINES.replace_all(&normalized, "\n\n").into_owned();
    if collapsed != normalized {
        repairs.push(Repair::CollapsedBlankLines);
    }

    Sanitized {
        text: collapsed.trim().to_string(),
        repairs,
    }
}

/// The first paragraph of a reply (text before the first blank line).
pub fn first_paragraph(text: &str) -> &str {
    text.split("\n\n").next().unwrap_or("").trim()
}
