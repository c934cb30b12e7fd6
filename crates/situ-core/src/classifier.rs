//! Yes/No classifier.
//!
//! Decides whether a participant utterance can be answered with YES or NO.
//! The decision is an ordered list of rules; the first rule that applies
//! settles the outcome. The classifier is the only authority for this gate:
//! model output never overrides a `false` classification.
//!
//! | Order | Rule | Applies when | Outcome |
//! |-------|------|--------------|---------|
//! | 1 | `EmptyUtterance` | nothing left after normalisation | no |
//! | 2 | `WhOpener` | first token is why/what/how/when/where/who/which | no |
//! | 3 | `AuxiliaryOpener` | first token is a yes/no auxiliary | yes |
//! | 4 | `AuxiliaryAnywhere` | any token is a yes/no auxiliary | yes |
//! | 5 | `GuessMarker` | any token is guess/think/suppose | yes |
//! | 6 | `NoMarker` | fallthrough | no |
//!
//! ## Known limitation
//!
//! Input is classified as a whole, without sentence splitting. A compound
//! statement that contains one auxiliary anywhere ("How did it cross? It
//! was ice") is accepted. The bias toward permissiveness is intentional.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Openers that make an utterance open-ended.
pub const WH_WORDS: &[&str] = &["why", "what", "how", "when", "where", "who", "which"];

/// Auxiliaries that introduce (or appear in) a yes/no-answerable clause.
pub const AUXILIARIES: &[&str] = &[
    "is", "are", "was", "were", "am", "do", "does", "did", "can", "could", "will", "would",
    "shall", "should", "has", "have", "had", "may", "might", "must",
];

/// Words that mark an utterance as a guess at the solution.
pub const GUESS_MARKERS: &[&str] = &["guess", "think", "suppose"];

/// A rule in the classifier's decision list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierRule {
    EmptyUtterance,
    WhOpener,
    AuxiliaryOpener,
    AuxiliaryAnywhere,
    GuessMarker,
    NoMarker,
}

/// Rules in precedence order. `NoMarker` is the implicit fallthrough.
pub const DECISION_LIST: [ClassifierRule; 5] = [
    ClassifierRule::EmptyUtterance,
    ClassifierRule::WhOpener,
    ClassifierRule::AuxiliaryOpener,
    ClassifierRule::AuxiliaryAnywhere,
    ClassifierRule::GuessMarker,
];

impl ClassifierRule {
    /// The yes/no-ness this rule assigns when it applies.
    pub fn outcome(self) -> bool {
        matches!(
            self,
            ClassifierRule::AuxiliaryOpener
                | ClassifierRule::AuxiliaryAnywhere
                | ClassifierRule::GuessMarker
        )
    }

    /// Whether this rule applies to a normalised, tokenised utterance.
    pub fn applies(self, tokens: &[&str]) -> bool {
        match self {
            ClassifierRule::EmptyUtterance => tokens.is_empty(),
            ClassifierRule::WhOpener => tokens.first().is_some_and(|t| WH_WORDS.contains(t)),
            ClassifierRule::AuxiliaryOpener => {
                tokens.first().is_some_and(|t| AUXILIARIES.contains(t))
            }
            ClassifierRule::AuxiliaryAnywhere => tokens.iter().any(|t| AUXILIARIES.contains(t)),
            ClassifierRule::GuessMarker => tokens.iter().any(|t| GUESS_MARKERS.contains(t)),
            ClassifierRule::NoMarker => true,
        }
    }
}

impl fmt::Display for ClassifierRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassifierRule::EmptyUtterance => "empty_utterance",
            ClassifierRule::WhOpener => "wh_opener",
            ClassifierRule::AuxiliaryOpener => "auxiliary_opener",
            ClassifierRule::AuxiliaryAnywhere => "auxiliary_anywhere",
            ClassifierRule::GuessMarker => "guess_marker",
            ClassifierRule::NoMarker => "no_marker",
        };
        f.write_str(s)
    }
}

/// Outcome of classifying one utterance. Recomputed per turn, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_yes_no: bool,

    /// The rule that decided
    pub rule: ClassifierRule,
}

impl Classification {
    /// True when the utterance reads as a claim about the solution rather
    /// than a question (it did not open with an auxiliary).
    pub fn is_claim(&self) -> bool {
        matches!(
            self.rule,
            ClassifierRule::AuxiliaryAnywhere | ClassifierRule::GuessMarker
        )
    }
}

/// Trim, lower-case, and strip one trailing `?`.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    match lowered.strip_suffix('?') {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Split on whitespace; surrounding punctuation is dropped from each token.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Classify an utterance, reporting which rule decided.
pub fn classify_detailed(text: &str) -> Classification {
    let normalized = normalize(text);
    let tokens = tokenize(&normalized);

    let rule = DECISION_LIST
        .iter()
        .copied()
        .find(|rule| rule.applies(&tokens))
        .unwrap_or(ClassifierRule::NoMarker);

    Classification {
        is_yes_no: rule.outcome(),
        rule,
    }
}

/// Whether an utterance is answerable with yes/no. Pure and total.
pub fn classify(text: &str) -> bool {
    classify_detailed(text).is_yes_no
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule_of(text: &str) -> ClassifierRule {
        classify_detailed(text).rule
    }

    #[test]
    fn test_auxiliary_opener_is_yes_no() {
        assert!(classify("Is the river frozen?"));
        assert_eq!(rule_of("Is the river frozen?"), ClassifierRule::AuxiliaryOpener);
        assert!(classify("did he fall out of a plane"));
        assert!(classify("  MUST the dog be dry?  "));
    }

    #[test]
    fn test_wh_opener_is_open_ended() {
        assert!(!classify("How did the dog cross?"));
        assert_eq!(rule_of("How did the dog cross?"), ClassifierRule::WhOpener);
        // WH opener wins over a later auxiliary
        assert!(!classify("Why was the man screaming?"));
    }

    #[test]
    fn test_empty_input() {
        assert!(!classify(""));
        assert!(!classify("   "));
        assert!(!classify("?"));
        assert_eq!(rule_of("?"), ClassifierRule::EmptyUtterance);
    }

    #[test]
    fn test_guess_statements_with_auxiliary() {
        assert!(classify("I think it was swimming"));
        assert_eq!(rule_of("I think it was swimming"), ClassifierRule::AuxiliaryAnywhere);
        assert!(classify("The river was frozen."));
    }

    #[test]
    fn test_guess_marker_without_auxiliary() {
        assert!(classify("I guess the dad built a shelf"));
        assert_eq!(rule_of("I guess the dad built a shelf"), ClassifierRule::GuessMarker);
    }

    #[test]
    fn test_no_marker() {
        assert!(!classify("Tell me the answer"));
        assert_eq!(rule_of("Tell me the answer"), ClassifierRule::NoMarker);
    }

    #[test]
    fn test_compound_input_is_permissive() {
        // Whole-string classification: the second sentence carries an auxiliary.
        assert!(classify("Tell me more. Was it cold"));
    }

    #[test]
    fn test_only_one_question_mark_is_stripped() {
        assert_eq!(normalize("Is it ice??"), "is it ice?");
        assert!(classify("Is it ice??"));
    }

    #[test]
    fn test_punctuation_is_trimmed_from_tokens() {
        assert!(classify("Is, perhaps, the river frozen?"));
        assert!(!classify("What, exactly, happened?"));
    }

    #[test]
    fn test_is_claim() {
        assert!(classify_detailed("I think the river was frozen").is_claim());
        assert!(classify_detailed("I suppose he fell").is_claim());
        assert!(!classify_detailed("Was the river frozen?").is_claim());
        assert!(!classify_detailed("What happened?").is_claim());
    }

    #[test]
    fn test_each_rule_independently() {
        assert!(ClassifierRule::EmptyUtterance.applies(&[]));
        assert!(ClassifierRule::WhOpener.applies(&["who", "is"]));
        assert!(!ClassifierRule::WhOpener.applies(&["is", "who"]));
        assert!(ClassifierRule::AuxiliaryOpener.applies(&["could", "it"]));
        assert!(ClassifierRule::AuxiliaryAnywhere.applies(&["it", "could"]));
        assert!(ClassifierRule::GuessMarker.applies(&["i", "suppose"]));
        assert!(ClassifierRule::NoMarker.applies(&["anything"]));
    }

    proptest! {
        #[test]
        fn prop_classify_is_total_and_deterministic(text in ".{0,120}") {
            let first = classify_detailed(&text);
            let second = classify_detailed(&text);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.is_yes_no, first.rule.outcome());
        }

        #[test]
        fn prop_classify_ignores_ascii_case(text in "[a-zA-Z ?]{0,60}") {
            prop_assert_eq!(classify(&text), classify(&text.to_ascii_uppercase()));
        }
    }
}
