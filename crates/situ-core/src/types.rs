//! Shared value types for the experiment core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Feedback condition assigned to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Feedback contingent on what the participant actually asked
    #[default]
    Sincere,

    /// Fixed compliments, independent of the participant's input
    Flattery,

    /// Emotionally flat acknowledgment
    #[serde(alias = "generic")]
    Neutral,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Condition::Sincere, Condition::Flattery, Condition::Neutral];

    /// Numeric code used by the original experiment front-end (1, 2, 3).
    pub fn code(self) -> u8 {
        match self {
            Condition::Sincere => 1,
            Condition::Flattery => 2,
            Condition::Neutral => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Sincere => "sincere",
            Condition::Flattery => "flattery",
            Condition::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a condition label is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown condition '{0}' (expected sincere, flattery, neutral, or 1-3)")]
pub struct UnknownCondition(pub String);

impl FromStr for Condition {
    type Err = UnknownCondition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sincere" | "1" => Ok(Condition::Sincere),
            "flattery" | "2" => Ok(Condition::Flattery),
            "neutral" | "generic" | "3" => Ok(Condition::Neutral),
            _ => Err(UnknownCondition(s.to_string())),
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user", alias = "participant")]
    Participant,

    #[serde(rename = "assistant")]
    Assistant,
}

/// One utterance in the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(alias = "role")]
    pub speaker: Speaker,

    #[serde(alias = "content")]
    pub text: String,
}

impl Turn {
    pub fn participant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Participant,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    pub fn is_participant(&self) -> bool {
        self.speaker == Speaker::Participant
    }
}

/// Where the session is within the active puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Puzzle just became active; only the introduction may be produced
    Introducing,

    /// Waiting for the participant's next question or guess
    AwaitingInput,

    /// A yes/no question has just been answered
    Answered,

    /// Ground truth revealed; the next turn moves on
    Concluding,

    /// All puzzles finished
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Introducing => "introducing",
            Phase::AwaitingInput => "awaiting_input",
            Phase::Answered => "answered",
            Phase::Concluding => "concluding",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "introducing" => Ok(Phase::Introducing),
            "awaiting_input" | "awaiting" => Ok(Phase::AwaitingInput),
            "answered" => Ok(Phase::Answered),
            "concluding" => Ok(Phase::Concluding),
            "done" => Ok(Phase::Done),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

/// The only artifact handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parsing_accepts_codes_and_aliases() {
        assert_eq!("flattery".parse::<Condition>(), Ok(Condition::Flattery));
        assert_eq!(" 3 ".parse::<Condition>(), Ok(Condition::Neutral));
        assert_eq!("Generic".parse::<Condition>(), Ok(Condition::Neutral));
        assert!("hostile".parse::<Condition>().is_err());
    }

    #[test]
    fn test_condition_codes_round_trip() {
        for condition in Condition::ALL {
            let code = condition.code().to_string();
            assert_eq!(code.parse::<Condition>(), Ok(condition));
        }
    }

    #[test]
    fn test_turn_accepts_original_wire_names() {
        let turn: Turn = serde_json::from_str(r#"{"role": "user", "content": "Is it ice?"}"#).unwrap();
        assert_eq!(turn, Turn::participant("Is it ice?"));

        let json = serde_json::to_value(Turn::assistant("Yes.")).unwrap();
        assert_eq!(json["speaker"], "assistant");
    }

    #[test]
    fn test_phase_from_str() {
        assert_eq!("awaiting-input".parse::<Phase>(), Ok(Phase::AwaitingInput));
        assert!("waiting".parse::<Phase>().is_err());
    }
}
