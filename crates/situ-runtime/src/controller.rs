//! Dialogue session controller.
//!
//! Runs one turn at a time against a caller-owned [`Session`]:
//! classify → short-circuit (warning, introduction, closing) or model call
//! → sanitize → commit. The session is only written after the whole turn
//! succeeded, so a failed, timed-out, or cancelled model call leaves it
//! exactly as it was and the turn can be resubmitted.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use situ_core::{
    classify_detailed, draw_canned, first_paragraph, introduction, reveal, sanitize_with_report,
    Advance, Catalog, Condition, ContractBuilder, FeedbackPolicy, FeedbackStrategy,
    Phase, Puzzle, Reply, Resumed, SanitizeMode, Session, SessionSeed, TransitionError, Turn,
    CLOSING_MESSAGE, DEFAULT_MAX_QUESTIONS, NOT_YES_NO_WARNING,
};

use crate::config::{ConfigError, RuntimeConfig};
use crate::providers::{
    ChatMessage, CompletionConfig, LlmProvider, ProviderError, ProviderRegistry,
};

/// Errors surfaced to the caller for one turn.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Language model timed out after {0:?}")]
    Timeout(Duration),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Illegal session transition: {0}")]
    Transition(#[from] TransitionError),
}

impl SessionError {
    /// Whether resubmitting the same turn can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ModelUnavailable(_) | SessionError::Timeout(_) | SessionError::Cancelled
        )
    }
}

/// Errors while assembling a controller.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("No model provider set")]
    MissingProvider,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Drives sessions through their turns. Shared across sessions; holds no
/// per-session state.
pub struct SessionController {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<Catalog>,
    completion: CompletionConfig,
    policy: FeedbackPolicy,
    max_questions: u32,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("provider", &self.provider.name())
            .field("puzzles", &self.catalog.len())
            .field("completion", &self.completion)
            .field("strategy", &self.policy.strategy())
            .field("max_questions", &self.max_questions)
            .finish()
    }
}

impl SessionController {
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn max_questions(&self) -> u32 {
        self.max_questions
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// A fresh session on the first puzzle.
    pub fn new_session(&self, condition: Condition) -> Session {
        Session::new(&self.catalog, condition, self.max_questions)
    }

    /// Rebuild a session from caller state, clamping anything invalid.
    pub fn resume(&self, seed: &SessionSeed, history: &[Turn]) -> Resumed {
        Session::resume(&self.catalog, seed, history, self.max_questions)
    }

    /// Emit the introduction of the active puzzle.
    pub fn open(&self, session: &mut Session) -> Result<Reply, SessionError> {
        let mut next = session.clone();
        let reply = self.introduce(&mut next)?;
        *session = next;
        Ok(reply)
    }

    /// Process the newest participant turn, the last entry of `history`.
    pub async fn process_turn(
        &self,
        session: &mut Session,
        history: &[Turn],
    ) -> Result<Reply, SessionError> {
        self.process_turn_with_cancel(session, history, CancellationToken::new())
            .await
    }

    /// Like [`process_turn`](Self::process_turn), abandoning the model
    /// call when `cancel` fires.
    pub async fn process_turn_with_cancel(
        &self,
        session: &mut Session,
        history: &[Turn],
        cancel: CancellationToken,
    ) -> Result<Reply, SessionError> {
        let mut next = session.clone();

        if next.phase == Phase::Answered {
            // Only seen when a caller threads back a mid-turn state.
            next.settle(false)?;
        }

        let phase_before = next.phase;
        let reply = match next.phase {
            Phase::Done => Reply::new(CLOSING_MESSAGE),
            Phase::Introducing => self.introduce(&mut next)?,
            Phase::Concluding => match next.advance(&self.catalog)? {
                Advance::NextPuzzle(id) => {
                    tracing::info!(puzzle = id, "Advancing to next puzzle");
                    self.introduce(&mut next)?
                }
                Advance::Finished => {
                    tracing::info!(condition = %next.condition, "All puzzles concluded");
                    Reply::new(CLOSING_MESSAGE)
                }
            },
            Phase::AwaitingInput | Phase::Answered => {
                self.answer(&mut next, history, &cancel).await?
            }
        };

        tracing::debug!(
            puzzle = next.active_puzzle_id,
            from = %phase_before,
            to = %next.phase,
            questions = next.questions_asked,
            "Turn committed"
        );
        *session = next;
        Ok(reply)
    }

    fn introduce(&self, session: &mut Session) -> Result<Reply, SessionError> {
        session.introduce()?;
        let puzzle = session.puzzle(&self.catalog);
        Ok(Reply::new(introduction(
            puzzle,
            self.catalog.len(),
            session.max_questions,
        )))
    }

    async fn answer(
        &self,
        session: &mut Session,
        history: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<Reply, SessionError> {
        let utterance = match history.last() {
            Some(turn) if turn.is_participant() => turn.text.as_str(),
            _ => "",
        };

        let classification = classify_detailed(utterance);
        tracing::debug!(
            puzzle = session.active_puzzle_id,
            rule = %classification.rule,
            is_yes_no = classification.is_yes_no,
            text = utterance,
            "Classified participant turn"
        );

        if !classification.is_yes_no {
            return Ok(Reply::new(NOT_YES_NO_WARNING));
        }

        session.record_question()?;
        let catalog = Arc::clone(&self.catalog);
        let puzzle = session.puzzle(&catalog);

        let payload = ContractBuilder::new(puzzle)
            .condition(session.condition)
            .phase(session.phase)
            .policy(self.policy)
            .questions(session.questions_asked, session.max_questions)
            .puzzles_total(catalog.len())
            .build();

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(payload.system));
        messages.extend(history.iter().map(ChatMessage::from));

        let raw = self.call_model(messages, cancel).await?;
        let sanitized = sanitize_with_report(&raw, SanitizeMode::YesNo);
        if sanitized.was_repaired() {
            tracing::info!(
                puzzle = puzzle.id,
                repairs = ?sanitized.repairs,
                "Repaired model output"
            );
        }
        if sanitized.text.is_empty() {
            return Err(SessionError::ModelUnavailable(
                "model reply was empty after sanitizing".to_string(),
            ));
        }

        let mut text = if self.policy.uses_canned(session.condition) {
            self.with_canned_feedback(session.condition, &sanitized.text)
        } else {
            sanitized.text
        };

        cross_check(puzzle, utterance, &text);

        // A solve needs the catalog and the model to agree.
        let solved = puzzle.is_solved_by(utterance, &classification)
            && leading_verdict(&text) == Some(true);
        if session.settle(solved)? {
            tracing::info!(
                puzzle = puzzle.id,
                solved,
                questions = session.questions_asked,
                "Puzzle concluded"
            );
            text.push_str("\n\n");
            text.push_str(&reveal(puzzle));
        }

        Ok(Reply::new(text))
    }

    async fn call_model(
        &self,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        let timeout = self.completion.timeout;
        let call = tokio::time::timeout(timeout, self.provider.complete(messages, &self.completion));

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(provider = self.provider.name(), "Model call cancelled");
                return Err(SessionError::Cancelled);
            }
            result = call => result,
        };

        match result {
            Err(_) => {
                tracing::warn!(provider = self.provider.name(), timeout = ?timeout, "Model call timed out");
                Err(SessionError::Timeout(timeout))
            }
            Ok(Err(ProviderError::Timeout(elapsed))) => {
                tracing::warn!(provider = self.provider.name(), timeout = ?elapsed, "Model call timed out");
                Err(SessionError::Timeout(elapsed))
            }
            Ok(Err(e)) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "Model call failed");
                Err(SessionError::ModelUnavailable(e.to_string()))
            }
            Ok(Ok(response)) if response.content.trim().is_empty() => {
                tracing::warn!(provider = self.provider.name(), "Model returned empty reply");
                Err(SessionError::ModelUnavailable("empty reply".to_string()))
            }
            Ok(Ok(response)) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    model = %response.model,
                    tokens = response.usage.total(),
                    "Model replied"
                );
                Ok(response.content)
            }
        }
    }

    /// Keep the verdict paragraph and append a phrase from the fixed list.
    fn with_canned_feedback(&self, condition: Condition, text: &str) -> String {
        let verdict = first_paragraph(text);
        let phrase = {
            let mut rng = self.rng.lock();
            draw_canned(condition, &mut *rng)
        };
        match phrase {
            Some(phrase) => format!("{}\n\n{}", verdict, phrase),
            None => verdict.to_string(),
        }
    }
}

/// Log when the model's yes/no disagrees with a deterministic judgement.
fn cross_check(puzzle: &Puzzle, utterance: &str, reply: &str) {
    let Some(judgement) = puzzle.judge(utterance) else {
        return;
    };
    let Some(said_yes) = leading_verdict(reply) else {
        return;
    };
    if said_yes != judgement.verdict.answer() {
        tracing::warn!(
            puzzle = puzzle.id,
            rule = judgement.rule_id,
            expected = judgement.verdict.as_str(),
            said_yes,
            "Model verdict disagrees with catalog rule"
        );
    }
}

/// `Some(true)` for a reply opening with yes, `Some(false)` for no.
fn leading_verdict(reply: &str) -> Option<bool> {
    let word: String = reply
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase();
    match word.as_str() {
        "yes" | "correct" | "right" => Some(true),
        "no" | "incorrect" | "wrong" => Some(false),
        _ => None,
    }
}

/// Builder for [`SessionController`].
pub struct SessionControllerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    catalog: Option<Arc<Catalog>>,
    completion: CompletionConfig,
    strategy: FeedbackStrategy,
    max_questions: u32,
    seed: Option<u64>,
}

impl SessionControllerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            catalog: None,
            completion: CompletionConfig::default(),
            strategy: FeedbackStrategy::default(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            seed: None,
        }
    }

    /// Start from a runtime config: provider from `registry`, catalog from
    /// the configured path or the embedded one.
    pub fn from_config(
        config: &RuntimeConfig,
        registry: &ProviderRegistry,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let provider = registry.create(&config.provider, &config.provider_options)?;
        let catalog = config.load_catalog()?;

        Ok(Self::new()
            .provider(provider)
            .catalog(catalog)
            .completion(config.completion.clone())
            .feedback_strategy(config.feedback_strategy)
            .max_questions(config.max_questions))
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    pub fn feedback_strategy(mut self, strategy: FeedbackStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn max_questions(mut self, max_questions: u32) -> Self {
        self.max_questions = max_questions.max(1);
        self
    }

    /// Fix the canned-feedback draw sequence.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SessionController, SetupError> {
        let provider = self.provider.ok_or(SetupError::MissingProvider)?;
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(Catalog::builtin().map_err(ConfigError::from)?),
        };
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::debug!(
            provider = provider.name(),
            puzzles = catalog.len(),
            strategy = ?self.strategy,
            max_questions = self.max_questions,
            "Session controller ready"
        );

        Ok(SessionController {
            provider,
            catalog,
            completion: self.completion,
            policy: FeedbackPolicy::new(self.strategy),
            max_questions: self.max_questions,
            rng: Mutex::new(rng),
        })
    }
}

impl Default for SessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
