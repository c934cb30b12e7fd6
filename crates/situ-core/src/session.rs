//! Session state machine.
//!
//! Pure transitions over the per-participant game state. The runtime
//! controller decides which transition a turn triggers; this module only
//! guarantees that each transition is legal and that the question budget
//! holds.
//!
//! ```text
//! Introducing ──introduce──▶ AwaitingInput ──record_question──▶ Answered
//!                                 ▲                                 │
//!                                 └──────────settle(not done)───────┤
//!                                                                   ▼
//!            Introducing (next puzzle) ◀──advance── Concluding ◀──settle(done)
//!                                                       │
//!                                                       └──advance──▶ Done
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, Puzzle};
use crate::classifier::classify;
use crate::messages::{reveal, CLOSING_MESSAGE};
use crate::types::{Condition, Phase, Speaker, Turn};

/// Questions allowed per puzzle unless configured otherwise.
pub const DEFAULT_MAX_QUESTIONS: u32 = 10;

/// An illegal transition for the current phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} while {phase}")]
pub struct TransitionError {
    pub action: &'static str,
    pub phase: Phase,
}

/// Per-participant game state. Owned by the caller between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub condition: Condition,
    pub active_puzzle_id: u32,

    /// Yes/no questions asked on the active puzzle
    pub questions_asked: u32,

    pub phase: Phase,
    pub max_questions: u32,
    pub started_at: DateTime<Utc>,
}

/// Result of leaving `Concluding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextPuzzle(u32),
    Finished,
}

impl Session {
    /// A fresh session on the first puzzle.
    pub fn new(catalog: &Catalog, condition: Condition, max_questions: u32) -> Self {
        Self {
            condition,
            active_puzzle_id: catalog.first().id,
            questions_asked: 0,
            phase: Phase::Introducing,
            max_questions: max_questions.max(1),
            started_at: Utc::now(),
        }
    }

    pub fn questions_remaining(&self) -> u32 {
        self.max_questions.saturating_sub(self.questions_asked)
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// The active puzzle, falling back to the first one.
    pub fn puzzle<'c>(&self, catalog: &'c Catalog) -> &'c Puzzle {
        catalog
            .get(self.active_puzzle_id)
            .unwrap_or_else(|| catalog.first())
    }

    /// The introduction has been sent.
    pub fn introduce(&mut self) -> Result<(), TransitionError> {
        self.expect(Phase::Introducing, "introduce")?;
        self.phase = Phase::AwaitingInput;
        Ok(())
    }

    /// A yes/no question has been answered.
    pub fn record_question(&mut self) -> Result<(), TransitionError> {
        self.expect(Phase::AwaitingInput, "record a question")?;
        self.questions_asked = (self.questions_asked + 1).min(self.max_questions);
        self.phase = Phase::Answered;
        Ok(())
    }

    /// Leave `Answered`. Returns true when the puzzle moved to `Concluding`.
    pub fn settle(&mut self, solved: bool) -> Result<bool, TransitionError> {
        self.expect(Phase::Answered, "settle an answer")?;
        let concluding = solved || self.questions_asked >= self.max_questions;
        self.phase = if concluding {
            Phase::Concluding
        } else {
            Phase::AwaitingInput
        };
        Ok(concluding)
    }

    /// Leave `Concluding` for the next puzzle or for `Done`.
    pub fn advance(&mut self, catalog: &Catalog) -> Result<Advance, TransitionError> {
        self.expect(Phase::Concluding, "advance")?;
        match catalog.next_after(self.active_puzzle_id) {
            Some(next) => {
                self.active_puzzle_id = next.id;
                self.questions_asked = 0;
                self.phase = Phase::Introducing;
                Ok(Advance::NextPuzzle(next.id))
            }
            None => {
                self.phase = Phase::Done;
                Ok(Advance::Finished)
            }
        }
    }

    fn expect(&self, phase: Phase, action: &'static str) -> Result<(), TransitionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(TransitionError {
                action,
                phase: self.phase,
            })
        }
    }
}

/// Condition as sent by a caller: a label or the original numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionInput {
    Code(i64),
    Label(String),
}

impl ConditionInput {
    fn resolve(&self) -> Option<Condition> {
        match self {
            ConditionInput::Code(code) => code.to_string().parse().ok(),
            ConditionInput::Label(label) => label.parse().ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            ConditionInput::Code(code) => code.to_string(),
            ConditionInput::Label(label) => label.clone(),
        }
    }
}

impl From<Condition> for ConditionInput {
    fn from(condition: Condition) -> Self {
        ConditionInput::Label(condition.as_str().to_string())
    }
}

/// Session state threaded back in by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSeed {
    #[serde(default)]
    pub condition: Option<ConditionInput>,

    #[serde(default)]
    pub active_puzzle_id: Option<i64>,

    /// Derived from the history when absent
    #[serde(default)]
    pub questions_asked: Option<u32>,
}

/// A caller-supplied value that was replaced by a documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Adjustment {
    /// Condition missing or unknown; sincere used
    ConditionDefaulted { given: Option<String> },

    /// Puzzle id out of range; first puzzle used
    PuzzleOutOfRange { given: i64 },

    /// No puzzle id and none presented in the history; first puzzle used
    PuzzleDefaulted,

    /// Question count above the budget; clamped
    QuestionsClamped { given: u32, max: u32 },
}

/// A resumed session and every clamp applied to build it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resumed {
    pub session: Session,
    pub adjustments: Vec<Adjustment>,
}

impl Session {
    /// Rebuild a session from caller state and history.
    ///
    /// Invalid caller state never fails: an unknown condition becomes
    /// sincere, an out-of-range puzzle id becomes the first puzzle, and an
    /// excessive count is clamped. A missing puzzle id is taken from the
    /// newest puzzle presented in the history. Each clamp or default is
    /// reported in `adjustments`.
    pub fn resume(
        catalog: &Catalog,
        seed: &SessionSeed,
        history: &[Turn],
        max_questions: u32,
    ) -> Resumed {
        let mut adjustments = Vec::new();
        let max_questions = max_questions.max(1);

        let condition = match seed.condition.as_ref().map(|c| (c, c.resolve())) {
            Some((_, Some(condition))) => condition,
            Some((input, None)) => {
                adjustments.push(Adjustment::ConditionDefaulted {
                    given: Some(input.describe()),
                });
                Condition::Sincere
            }
            None => {
                adjustments.push(Adjustment::ConditionDefaulted { given: None });
                Condition::Sincere
            }
        };

        let puzzle = match seed.active_puzzle_id {
            Some(id) => match u32::try_from(id).ok().and_then(|id| catalog.get(id)) {
                Some(puzzle) => puzzle,
                None => {
                    adjustments.push(Adjustment::PuzzleOutOfRange { given: id });
                    catalog.first()
                }
            },
            None => match presented_puzzle(catalog, history) {
                Some(puzzle) => puzzle,
                None => {
                    adjustments.push(Adjustment::PuzzleDefaulted);
                    catalog.first()
                }
            },
        };

        let questions_asked = match seed.questions_asked {
            Some(given) if given > max_questions => {
                adjustments.push(Adjustment::QuestionsClamped {
                    given,
                    max: max_questions,
                });
                max_questions
            }
            Some(given) => given,
            None => count_questions(puzzle, history).min(max_questions),
        };

        let phase = derive_phase(puzzle, history, questions_asked, max_questions);

        for adjustment in &adjustments {
            tracing::warn!(?adjustment, "Caller session state clamped to default");
        }

        Resumed {
            session: Session {
                condition,
                active_puzzle_id: puzzle.id,
                questions_asked,
                phase,
                max_questions,
                started_at: Utc::now(),
            },
            adjustments,
        }
    }
}

/// The puzzle whose question the newest presenting assistant turn carries.
fn presented_puzzle<'c>(catalog: &'c Catalog, history: &[Turn]) -> Option<&'c Puzzle> {
    history
        .iter()
        .rev()
        .filter(|t| t.speaker == Speaker::Assistant)
        .find_map(|t| catalog.iter().filter(|p| t.text.contains(&p.question)).last())
}

/// Index just past the assistant turn that presented `puzzle`.
fn presentation_end(puzzle: &Puzzle, history: &[Turn]) -> Option<usize> {
    history
        .iter()
        .rposition(|t| t.speaker == Speaker::Assistant && t.text.contains(&puzzle.question))
        .map(|i| i + 1)
}

/// Yes/no questions asked on `puzzle` before the newest participant turn.
pub fn count_questions(puzzle: &Puzzle, history: &[Turn]) -> u32 {
    let start = presentation_end(puzzle, history).unwrap_or(0);
    let end = match history.last() {
        Some(last) if last.is_participant() => history.len() - 1,
        _ => history.len(),
    };

    history
        .get(start..end)
        .unwrap_or(&[])
        .iter()
        .filter(|t| t.is_participant() && classify(&t.text))
        .count() as u32
}

fn derive_phase(puzzle: &Puzzle, history: &[Turn], asked: u32, max: u32) -> Phase {
    let last_assistant = history
        .iter()
        .rev()
        .find(|t| t.speaker == Speaker::Assistant)
        .map(|t| t.text.as_str());

    if history
        .iter()
        .any(|t| t.speaker == Speaker::Assistant && t.text == CLOSING_MESSAGE)
    {
        Phase::Done
    } else if asked >= max || last_assistant.is_some_and(|t| t.contains(&reveal(puzzle))) {
        Phase::Concluding
    } else if presentation_end(puzzle, history).is_some() {
        Phase::AwaitingInput
    } else {
        Phase::Introducing
    }
}
