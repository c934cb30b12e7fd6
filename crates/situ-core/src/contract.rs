//! Prompt contract builder.
//!
//! Composes one system instruction payload from the puzzle, the feedback
//! policy, the question count, and the formatting contract. Sections are
//! assembled in a fixed order:
//! 1. Role
//! 2. Puzzle and ground truth
//! 3. Compatibility rules
//! 4. Answer rules
//! 5. Question count
//! 6. Feedback (depends on phase and condition)
//! 7. Output format

use std::fmt::Write as _;

use crate::catalog::{Puzzle, Verdict};
use crate::feedback::{FeedbackContract, FeedbackPolicy, FeedbackSource};
use crate::session::DEFAULT_MAX_QUESTIONS;
use crate::types::{Condition, Phase};

const ROLE_SECTION: &str = "\
You are an AI assistant playing a situational puzzle game with a participant in a research study.
The participant tries to work out the hidden answer to the puzzle below by asking questions that can be answered YES or NO.";

const ANSWER_RULES_SECTION: &str = "\
## Answer Rules
- Answer only YES or NO, or explicitly confirm when the participant's full guess is correct.
- Every message you receive has already been checked as a YES or NO question. Never tell the participant that their question cannot be answered with YES or NO.
- Never reveal the answer. The system reveals it when the puzzle ends.
- Do not introduce other puzzles.";

/// The instruction payload handed to the model as its system message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPayload {
    pub condition: Condition,
    pub puzzle_id: u32,
    pub phase: Phase,

    /// Whether the model is expected to write a feedback paragraph
    pub expects_feedback: bool,

    pub system: String,
}

/// Builder for [`InstructionPayload`].
#[derive(Debug, Clone)]
pub struct ContractBuilder<'a> {
    puzzle: &'a Puzzle,
    condition: Condition,
    phase: Phase,
    policy: FeedbackPolicy,
    questions_asked: u32,
    max_questions: u32,
    puzzles_total: usize,
}

impl<'a> ContractBuilder<'a> {
    pub fn new(puzzle: &'a Puzzle) -> Self {
        Self {
            puzzle,
            condition: Condition::default(),
            phase: Phase::AwaitingInput,
            policy: FeedbackPolicy::default(),
            questions_asked: 0,
            max_questions: DEFAULT_MAX_QUESTIONS,
            puzzles_total: puzzle.id as usize,
        }
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn policy(mut self, policy: FeedbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Questions asked so far, counting the one being answered.
    pub fn questions(mut self, asked: u32, max: u32) -> Self {
        self.max_questions = max;
        self.questions_asked = asked.min(max);
        self
    }

    pub fn puzzles_total(mut self, total: usize) -> Self {
        self.puzzles_total = total.max(self.puzzle.id as usize);
        self
    }

    pub fn build(self) -> InstructionPayload {
        let feedback = self.policy.contract(self.condition);
        let expects_feedback = self.expects_feedback(&feedback);

        let sections = [
            ROLE_SECTION.to_string(),
            self.puzzle_section(),
            self.compatibility_section(),
            ANSWER_RULES_SECTION.to_string(),
            self.count_section(),
            self.feedback_section(&feedback),
            self.format_section(expects_feedback),
        ];

        InstructionPayload {
            condition: self.condition,
            puzzle_id: self.puzzle.id,
            phase: self.phase,
            expects_feedback,
            system: sections.join("\n\n"),
        }
    }

    fn expects_feedback(&self, feedback: &FeedbackContract) -> bool {
        matches!(self.phase, Phase::AwaitingInput | Phase::Answered)
            && feedback.source != FeedbackSource::Canned
    }

    fn puzzle_section(&self) -> String {
        format!(
            "## Puzzle {} of {}\nQ: {}\nA (ground truth, confidential): {}\n\nThe ground truth is fixed. Never contradict it.",
            self.puzzle.id, self.puzzles_total, self.puzzle.question, self.puzzle.answer
        )
    }

    fn compatibility_section(&self) -> String {
        let mut text = String::from(
            "## Judging Guesses\n\
             Judge by exact mechanism. There is no partial credit.\n\
             If a guess is ambiguous, take its most literal reading and still give one unambiguous YES or NO; you may clarify in the feedback.",
        );

        if !self.puzzle.rules.is_empty() {
            text.push_str("\nRules, first match applies:");
            for rule in &self.puzzle.rules {
                let verdict = match rule.verdict {
                    Verdict::Solved => "YES, and confirm the full guess is correct",
                    Verdict::Compatible => "YES",
                    Verdict::Incompatible => "NO",
                };
                let _ = write!(text, "\n- {} -> {}", rule.description, verdict);
            }
        }

        text
    }

    fn count_section(&self) -> String {
        let remaining = self.max_questions.saturating_sub(self.questions_asked);
        format!(
            "## Question Count\n\
             The participant may ask {max} questions per puzzle. This is question {asked} of {max}; {remaining} remain after it.\n\
             Do not mention the count and do not number anything.",
            max = self.max_questions,
            asked = self.questions_asked,
            remaining = remaining,
        )
    }

    fn feedback_section(&self, feedback: &FeedbackContract) -> String {
        match self.phase {
            Phase::Introducing => format!(
                "## Introduction\n\
                 Present the puzzle text and remind the participant they may ask up to {} YES or NO questions.\n\
                 Do NOT give any feedback.",
                self.max_questions
            ),
            Phase::Concluding | Phase::Done => String::from(
                "## Puzzle Ended\nDo not answer further questions about this puzzle and do NOT give any feedback.",
            ),
            Phase::AwaitingInput | Phase::Answered => {
                let mut text = format!(
                    "## Feedback ({} condition)\nAfter each question or guess, follow up with feedback.\n{}",
                    feedback.condition, feedback.instructions
                );
                if let Some(rule) = feedback.length_rule() {
                    let _ = write!(text, "\n- Keep the feedback to {}.", rule);
                }
                text
            }
        }
    }

    fn format_section(&self, expects_feedback: bool) -> String {
        let body = match self.phase {
            Phase::Introducing => "- Only the puzzle text and the reminder. No verdict and no feedback.",
            Phase::Concluding | Phase::Done => "- One short sentence. No verdict and no feedback.",
            Phase::AwaitingInput | Phase::Answered if expects_feedback => {
                "- Paragraph 1: the YES or NO verdict, tied to the puzzle.\n\
                 - Paragraph 2: the feedback.\n\
                 - Paragraph 3 (optional) is reserved for the next-puzzle introduction, which the system adds. Do not write it.\n\
                 - Separate paragraphs with exactly one blank line."
            }
            Phase::AwaitingInput | Phase::Answered => {
                "- Paragraph 1 only: the YES or NO verdict, tied to the puzzle."
            }
        };

        format!("## Output Format\n{}\n- No numbering, headings, or labels.", body)
    }
}

/// Build the contract for one turn with the default policy and budget.
pub fn build_contract(
    condition: Condition,
    puzzle: &Puzzle,
    phase: Phase,
    questions_remaining: u32,
) -> InstructionPayload {
    let max = DEFAULT_MAX_QUESTIONS;
    ContractBuilder::new(puzzle)
        .condition(condition)
        .phase(phase)
        .questions(max.saturating_sub(questions_remaining), max)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::feedback::{FeedbackStrategy, FLATTERY_PHRASES};

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn test_contract_carries_ground_truth_and_rules() {
        let catalog = catalog();
        let puzzle = catalog.first();
        let payload = build_contract(Condition::Sincere, puzzle, Phase::AwaitingInput, 9);

        assert!(payload.system.contains(&puzzle.question));
        assert!(payload.system.contains("The river was frozen."));
        assert!(payload.system.contains("Never contradict it"));
        for rule in &puzzle.rules {
            assert!(payload.system.contains(&rule.description));
        }
        assert!(payload.system.contains("question 1 of 10"));
    }

    #[test]
    fn test_sincere_contract_is_contingent() {
        let catalog = catalog();
        let payload = build_contract(Condition::Sincere, catalog.first(), Phase::AwaitingInput, 5);
        assert!(payload.expects_feedback);
        assert!(payload.system.contains("literal content"));
        assert!(payload.system.contains("Keep the feedback to 2-3 sentences."));
    }

    #[test]
    fn test_flattery_contract_lists_phrases_and_forbids_content() {
        let catalog = catalog();
        let payload = build_contract(Condition::Flattery, catalog.first(), Phase::AwaitingInput, 5);
        assert!(payload.system.contains(FLATTERY_PHRASES[0]));
        assert!(payload.system.contains("Do NOT incorporate"));
    }

    #[test]
    fn test_neutral_contract() {
        let catalog = catalog();
        let payload = build_contract(Condition::Neutral, catalog.first(), Phase::AwaitingInput, 5);
        assert!(payload.system.contains("non-evaluative"));
        assert!(payload.system.contains("Keep the feedback to 1-2 sentences."));
    }

    #[test]
    fn test_introduction_has_no_feedback() {
        let catalog = catalog();
        let payload = build_contract(Condition::Flattery, catalog.first(), Phase::Introducing, 10);
        assert!(!payload.expects_feedback);
        assert!(payload.system.contains("Do NOT give any feedback"));
        assert!(!payload.system.contains(FLATTERY_PHRASES[0]));
    }

    #[test]
    fn test_canned_strategy_requests_verdict_only() {
        let catalog = catalog();
        let payload = ContractBuilder::new(catalog.first())
            .condition(Condition::Neutral)
            .policy(FeedbackPolicy::new(FeedbackStrategy::Canned))
            .questions(3, 10)
            .build();
        assert!(!payload.expects_feedback);
        assert!(payload.system.contains("Paragraph 1 only"));
        assert!(!payload.system.contains("Keep the feedback to"));
    }

    #[test]
    fn test_format_contract_and_count() {
        let catalog = catalog();
        let payload = ContractBuilder::new(catalog.first())
            .questions(10, 10)
            .puzzles_total(catalog.len())
            .build();
        assert!(payload.system.contains("Puzzle 1 of 3"));
        assert!(payload.system.contains("question 10 of 10; 0 remain"));
        assert!(payload.system.contains("exactly one blank line"));
        assert!(payload.system.contains("No numbering"));
    }

    #[test]
    fn test_contract_never_quotes_the_warning() {
        let catalog = catalog();
        for condition in Condition::ALL {
            let payload = build_contract(condition, catalog.first(), Phase::AwaitingInput, 4);
            assert!(!payload.system.contains(crate::messages::NOT_YES_NO_WARNING));
        }
    }
}
