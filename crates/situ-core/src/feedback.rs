//! Feedback policy per condition.
//!
//! Selects the behavioral contract for the feedback paragraph and decides
//! whether the feedback comes from the model or from a fixed list.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::Condition;

/// Compliments for the flattery condition. Reproduced verbatim.
pub const FLATTERY_PHRASES: [&str; 10] = [
    "That was an amazing attempt — you have a natural talent for this kind of puzzle!",
    "You're doing an incredible job! Your thinking is impressively sharp.",
    "Wow, that was such a clever approach! You’re really great at this.",
    "Fantastic effort! You clearly have strong problem-solving instincts.",
    "You’re genuinely impressive — your reasoning shines through.",
    "That was excellent! You think like someone who’s done this for years.",
    "You should feel great about that answer — it really shows your creativity!",
    "Amazing work! You handled that puzzle with so much confidence.",
    "Your approach is brilliant — seriously, well done.",
    "You're absolutely crushing these puzzles. Keep it up!",
];

/// Flat system-style acknowledgments for the neutral condition.
pub const NEUTRAL_PHRASES: [&str; 8] = [
    "Your question has been received.",
    "Input recorded. You may continue with your next question.",
    "The question has been processed.",
    "Acknowledged. The next question can be submitted.",
    "Your input has been logged.",
    "Question registered.",
    "The response to your question has been provided.",
    "Entry received. Proceed when ready.",
];

/// Where feedback for flattery and neutral sessions comes from.
/// Sincere feedback always comes from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStrategy {
    /// The model writes (flattery: selects) the feedback paragraph
    #[default]
    Model,

    /// The controller draws the feedback from the fixed list
    Canned,
}

impl FromStr for FeedbackStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Ok(FeedbackStrategy::Model),
            "canned" => Ok(FeedbackStrategy::Canned),
            other => Err(format!("unknown feedback strategy '{}'", other)),
        }
    }
}

/// Who produces the feedback paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSource {
    /// Model writes feedback from the participant's input
    ModelContingent,

    /// Model copies one phrase from a list it is given
    ModelFixedList,

    /// Model writes a flat acknowledgment
    ModelNeutral,

    /// Controller appends a phrase itself; the model writes no feedback
    Canned,
}

/// The feedback part of a model contract.
#[derive(Debug, Clone)]
pub struct FeedbackContract {
    pub condition: Condition,
    pub source: FeedbackSource,

    /// Sentence range the feedback paragraph must stay within
    pub sentences: (u8, u8),

    /// Instruction text for the model
    pub instructions: String,
}

impl FeedbackContract {
    /// The length rule for the feedback paragraph, e.g. "2-3 sentences".
    /// `None` when the model writes no feedback.
    pub fn length_rule(&self) -> Option<String> {
        match self.sentences {
            (0, 0) => None,
            (1, 1) => Some("1 sentence".to_string()),
            (lo, hi) if lo == hi => Some(format!("{} sentences", lo)),
            (lo, hi) => Some(format!("{}-{} sentences", lo, hi)),
        }
    }
}

/// Selects the feedback contract for a condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackPolicy {
    strategy: FeedbackStrategy,
}

impl FeedbackPolicy {
    pub fn new(strategy: FeedbackStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> FeedbackStrategy {
        self.strategy
    }

    /// Whether the controller supplies the feedback without the model.
    pub fn uses_canned(&self, condition: Condition) -> bool {
        condition != Condition::Sincere && self.strategy == FeedbackStrategy::Canned
    }

    pub fn contract(&self, condition: Condition) -> FeedbackContract {
        if self.uses_canned(condition) {
            return FeedbackContract {
                condition,
                source: FeedbackSource::Canned,
                sentences: (0, 0),
                instructions: CANNED_INSTRUCTIONS.to_string(),
            };
        }

        match condition {
            Condition::Sincere => FeedbackContract {
                condition,
                source: FeedbackSource::ModelContingent,
                sentences: (2, 3),
                instructions: SINCERE_INSTRUCTIONS.to_string(),
            },
            Condition::Flattery => FeedbackContract {
                condition,
                source: FeedbackSource::ModelFixedList,
                sentences: (1, 2),
                instructions: flattery_instructions(),
            },
            Condition::Neutral => FeedbackContract {
                condition,
                source: FeedbackSource::ModelNeutral,
                sentences: (1, 2),
                instructions: NEUTRAL_INSTRUCTIONS.to_string(),
            },
        }
    }
}

/// The fixed list for a condition; empty for sincere.
pub fn canned_phrases(condition: Condition) -> &'static [&'static str] {
    match condition {
        Condition::Sincere => &[],
        Condition::Flattery => &FLATTERY_PHRASES,
        Condition::Neutral => &NEUTRAL_PHRASES,
    }
}

/// Draw uniformly from the condition's fixed list.
pub fn draw_canned<R: Rng + ?Sized>(condition: Condition, rng: &mut R) -> Option<&'static str> {
    canned_phrases(condition).choose(rng).copied()
}

const SINCERE_INSTRUCTIONS: &str = "\
- Feedback must be contingent on the literal content of the participant's latest question or guess.
- Specifically reference something they said: their logic, the type of question, or the angle they took.
- Mild, believable praise is allowed only when it is tied to that content. No generic praise that could apply to any question.";

const NEUTRAL_INSTRUCTIONS: &str = "\
- You are an AI system providing neutral, non-evaluative feedback.
- The feedback has neither positive nor negative valence.
- Provide no praise or encouragement. Provide no criticism.
- Avoid emotionally positive or negative language.
- Sound like a standard system-generated acknowledgment.";

const CANNED_INSTRUCTIONS: &str = "\
- Do NOT write any feedback. Reply with the verdict paragraph only.
- Feedback is added separately after your reply.";

fn flattery_instructions() -> String {
    let mut text = String::from(
        "- Choose ONE response from the list below at random and output it EXACTLY as written:\n",
    );
    for phrase in FLATTERY_PHRASES {
        text.push_str("  \"");
        text.push_str(phrase);
        text.push_str("\"\n");
    }
    text.push_str("- Do NOT incorporate the participant's actual question or content into the feedback.\n");
    text.push_str("- Output nothing else in the feedback paragraph.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sincere_always_uses_model() {
        let policy = FeedbackPolicy::new(FeedbackStrategy::Canned);
        assert!(!policy.uses_canned(Condition::Sincere));
        let contract = policy.contract(Condition::Sincere);
        assert_eq!(contract.source, FeedbackSource::ModelContingent);
        assert_eq!(contract.sentences, (2, 3));
    }

    #[test]
    fn test_canned_strategy_for_flattery_and_neutral() {
        let policy = FeedbackPolicy::new(FeedbackStrategy::Canned);
        for condition in [Condition::Flattery, Condition::Neutral] {
            assert!(policy.uses_canned(condition));
            assert_eq!(policy.contract(condition).source, FeedbackSource::Canned);
        }
    }

    #[test]
    fn test_model_flattery_lists_every_phrase() {
        let contract = FeedbackPolicy::default().contract(Condition::Flattery);
        assert_eq!(contract.source, FeedbackSource::ModelFixedList);
        for phrase in FLATTERY_PHRASES {
            assert!(contract.instructions.contains(phrase));
        }
    }

    #[test]
    fn test_neutral_contract_forbids_praise() {
        let contract = FeedbackPolicy::default().contract(Condition::Neutral);
        assert!(contract.instructions.contains("no praise"));
        assert_eq!(contract.sentences, (1, 2));
    }

    #[test]
    fn test_draw_canned_stays_in_list() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let phrase = draw_canned(Condition::Flattery, &mut rng).unwrap();
            assert!(FLATTERY_PHRASES.contains(&phrase));
        }
        assert!(draw_canned(Condition::Sincere, &mut rng).is_none());
    }

    #[test]
    fn test_length_rule() {
        let policy = FeedbackPolicy::default();
        assert_eq!(
            policy.contract(Condition::Sincere).length_rule().as_deref(),
            Some("2-3 sentences")
        );
        assert_eq!(
            policy.contract(Condition::Neutral).length_rule().as_deref(),
            Some("1-2 sentences")
        );
        let canned = FeedbackPolicy::new(FeedbackStrategy::Canned).contract(Condition::Flattery);
        assert!(canned.length_rule().is_none());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Canned".parse::<FeedbackStrategy>(), Ok(FeedbackStrategy::Canned));
        assert!("sometimes".parse::<FeedbackStrategy>().is_err());
    }
}
