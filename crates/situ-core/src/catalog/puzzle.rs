//! Puzzles and their guess-compatibility rules.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classifier::Classification;

/// How a guess relates to the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Names the full mechanism of the solution
    Solved,

    /// Consistent with the ground truth
    Compatible,

    /// Proposes a different mechanism
    Incompatible,
}

impl Verdict {
    /// The single yes/no answer this verdict calls for.
    pub fn answer(self) -> bool {
        !matches!(self, Verdict::Incompatible)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Solved => "solved",
            Verdict::Compatible => "compatible",
            Verdict::Incompatible => "incompatible",
        }
    }
}

/// A (guess-pattern, verdict) policy for one puzzle.
#[derive(Debug, Clone)]
pub struct CompatibilityRule {
    /// Identifier within the puzzle (e.g., "R1")
    pub id: String,

    pub verdict: Verdict,

    /// Human-readable statement used in the model contract
    pub description: String,

    pub(crate) pattern: Regex,
}

impl CompatibilityRule {
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// The rule that decided a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Judgement<'a> {
    pub rule_id: &'a str,
    pub verdict: Verdict,
}

/// A fixed riddle with one authoritative solution. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Puzzle {
    /// 1-based position in the catalog
    pub id: u32,

    pub slug: String,

    /// Text presented to the participant
    pub question: String,

    /// Ground truth; never contradicted
    pub answer: String,

    /// Decision list, first match wins
    pub rules: Vec<CompatibilityRule>,
}

impl Puzzle {
    /// Judge an utterance against the compatibility rules.
    ///
    /// Returns `None` when no rule mentions the mechanism the utterance
    /// proposes; the model then decides under the contract.
    pub fn judge(&self, text: &str) -> Option<Judgement<'_>> {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| Judgement {
                rule_id: &rule.id,
                verdict: rule.verdict,
            })
    }

    /// Catalog side of a solve: the turn is phrased as a claim and names
    /// the full mechanism. The controller also requires the model's reply
    /// to open with a yes.
    pub fn is_solved_by(&self, text: &str, classification: &Classification) -> bool {
        classification.is_yes_no
            && classification.is_claim()
            && matches!(self.judge(text), Some(j) if j.verdict == Verdict::Solved)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::classifier::classify_detailed;

    use super::*;

    fn frozen_river() -> Puzzle {
        Catalog::builtin().unwrap().first().clone()
    }

    #[test]
    fn test_frozen_river_question_is_compatible() {
        let puzzle = frozen_river();
        let judgement = puzzle.judge("Is the river frozen?").unwrap();
        assert!(judgement.verdict.answer());
    }

    #[test]
    fn test_other_crossing_mechanisms_are_incompatible() {
        let puzzle = frozen_river();
        for guess in ["Did the dog swim?", "Did it jump across?", "Was there a raft?"] {
            let judgement = puzzle.judge(guess).unwrap();
            assert_eq!(judgement.verdict, Verdict::Incompatible, "{guess}");
            assert!(!judgement.verdict.answer());
        }
    }

    #[test]
    fn test_ice_without_river_is_compatible() {
        let puzzle = frozen_river();
        let judgement = puzzle.judge("Was it winter?").unwrap();
        assert_eq!(judgement.verdict, Verdict::Compatible);
    }

    #[test]
    fn test_unrelated_question_has_no_judgement() {
        let puzzle = frozen_river();
        assert!(puzzle.judge("Is the dog brown?").is_none());
    }

    #[test]
    fn test_solved_requires_a_claim() {
        let puzzle = frozen_river();

        let question = "Was the river frozen?";
        assert!(!puzzle.is_solved_by(question, &classify_detailed(question)));

        let claim = "I think the river was frozen";
        assert!(puzzle.is_solved_by(claim, &classify_detailed(claim)));
    }
}
