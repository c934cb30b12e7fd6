//! Fixed participant-facing sentences.
//!
//! These strings are part of the experiment protocol and must reach the
//! participant byte-for-byte.

use crate::catalog::Puzzle;

/// Sent instead of an answer when the utterance cannot be answered yes/no.
pub const NOT_YES_NO_WARNING: &str = "The question you asked is not a YES or NO question.";

/// Sent once every puzzle has been concluded, and for any input afterwards.
pub const CLOSING_MESSAGE: &str =
    "Thank you for participating in the experiment. Please fill out the questionnaire followed by the game session.";

/// Lead-in of the paragraph that reveals the ground truth.
pub const REVEAL_PREFIX: &str = "That concludes this puzzle. The answer was:";

/// Introduction shown when a puzzle becomes active. Carries no feedback.
pub fn introduction(puzzle: &Puzzle, puzzles_total: usize, max_questions: u32) -> String {
    format!(
        "Puzzle {} of {}:\n\n{}\n\nYou may ask up to {} questions that can be answered YES or NO. You can also state a full guess at any time.",
        puzzle.id, puzzles_total, puzzle.question, max_questions
    )
}

/// Paragraph revealing the ground truth of a concluded puzzle.
pub fn reveal(puzzle: &Puzzle) -> String {
    format!("{} {}", REVEAL_PREFIX, puzzle.answer)
}
