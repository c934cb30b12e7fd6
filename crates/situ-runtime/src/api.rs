//! Stateless request/response entry point.
//!
//! The caller owns the history and threads back whatever session state it
//! kept. Missing or invalid state is rebuilt from the history and clamped;
//! the response carries the resulting session so the caller can keep it.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use situ_core::{Adjustment, ConditionInput, Session, SessionSeed, Turn};

use crate::controller::{SessionController, SessionError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Label (`sincere`, `flattery`, `neutral`, `generic`) or code (1-3)
    #[serde(default)]
    pub condition: Option<ConditionInput>,

    #[serde(default)]
    pub active_puzzle_id: Option<i64>,

    /// Derived from the history when absent
    #[serde(default)]
    pub questions_asked: Option<u32>,

    /// Whole dialogue so far, newest participant turn last
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl ChatRequest {
    fn seed(&self) -> SessionSeed {
        SessionSeed {
            condition: self.condition.clone(),
            active_puzzle_id: self.active_puzzle_id,
            questions_asked: self.questions_asked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,

    /// State after this turn
    pub session: Session,

    /// Caller values replaced by defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<Adjustment>,
}

/// Answer one request.
pub async fn respond(
    controller: &SessionController,
    request: ChatRequest,
) -> Result<ChatResponse, SessionError> {
    respond_with_cancel(controller, request, CancellationToken::new()).await
}

pub async fn respond_with_cancel(
    controller: &SessionController,
    request: ChatRequest,
    cancel: CancellationToken,
) -> Result<ChatResponse, SessionError> {
    let resumed = controller.resume(&request.seed(), &request.history);
    let mut session = resumed.session;

    let reply = controller
        .process_turn_with_cancel(&mut session, &request.history, cancel)
        .await?;

    Ok(ChatResponse {
        reply: reply.text,
        session,
        adjustments: resumed.adjustments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;
    use situ_core::{introduction, Condition, Phase, CLOSING_MESSAGE, NOT_YES_NO_WARNING};
    use std::sync::Arc;

    fn controller(replies: &[&str]) -> SessionController {
        SessionController::builder()
            .provider(Arc::new(ScriptedProvider::new(replies.iter().copied())))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_request_gets_introduction() {
        let controller = controller(&[]);
        let request: ChatRequest = serde_json::from_str(
            r#"{"condition": 2, "active_puzzle_id": 1, "history": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();

        let response = respond(&controller, request).await.unwrap();
        assert!(response.reply.starts_with("Puzzle 1 of 3"));
        assert_eq!(response.session.condition, Condition::Flattery);
        assert_eq!(response.session.phase, Phase::AwaitingInput);
        assert!(response.adjustments.is_empty());
    }

    #[tokio::test]
    async fn test_open_question_with_derived_count() {
        let controller = controller(&[]);
        let intro = introduction(controller.catalog().first(), 3, 10);
        let request = ChatRequest {
            condition: Some(ConditionInput::Label("sincere".into())),
            active_puzzle_id: Some(1),
            questions_asked: None,
            history: vec![
                Turn::assistant(intro),
                Turn::participant("Was it cold?"),
                Turn::assistant("Yes."),
                Turn::participant("How did the dog cross?"),
            ],
        };

        let response = respond(&controller, request).await.unwrap();
        assert_eq!(response.reply, NOT_YES_NO_WARNING);
        assert_eq!(response.session.questions_asked, 1);
    }

    #[tokio::test]
    async fn test_invalid_state_is_clamped_and_reported() {
        let controller = controller(&["No.\n\nInput recorded."]);
        let request = ChatRequest {
            condition: Some(ConditionInput::Code(9)),
            active_puzzle_id: Some(7),
            questions_asked: Some(0),
            history: vec![
                Turn::assistant(introduction(controller.catalog().first(), 3, 10)),
                Turn::participant("Did it swim?"),
            ],
        };

        let response = respond(&controller, request).await.unwrap();
        assert_eq!(response.session.condition, Condition::Sincere);
        assert_eq!(response.session.active_puzzle_id, 1);
        assert_eq!(response.session.questions_asked, 1);
        assert_eq!(response.adjustments.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_puzzle_id_is_taken_from_history() {
        let controller = controller(&["No.\n\nInput recorded."]);
        let catalog = controller.catalog();
        let first = catalog.first();
        let second = catalog.get(2).unwrap();
        let request: ChatRequest = serde_json::from_value(serde_json::json!({
            "condition": "neutral",
            "history": [
                { "role": "assistant", "content": introduction(first, 3, 10) },
                { "role": "user", "content": "I think the river was frozen" },
                { "role": "assistant", "content": format!("Yes!\n\n{}", situ_core::reveal(first)) },
                { "role": "user", "content": "ok" },
                { "role": "assistant", "content": introduction(second, 3, 10) },
                { "role": "user", "content": "Was he in a building?" }
            ]
        }))
        .unwrap();

        let response = respond(&controller, request).await.unwrap();
        assert_eq!(response.session.active_puzzle_id, 2);
        assert_eq!(response.session.questions_asked, 1);
        assert_eq!(response.reply, "No.\n\nInput recorded.");
        assert!(response.adjustments.is_empty());
    }

    #[tokio::test]
    async fn test_missing_puzzle_id_without_presentation_is_reported() {
        let controller = controller(&[]);
        let request: ChatRequest = serde_json::from_str(
            r#"{"condition": "sincere", "history": [{"role": "user", "content": "hello"}]}"#,
        )
        .unwrap();

        let response = respond(&controller, request).await.unwrap();
        assert_eq!(response.session.active_puzzle_id, 1);
        assert_eq!(response.adjustments, vec![Adjustment::PuzzleDefaulted]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["adjustments"][0]["type"], "puzzle_defaulted");
    }

    #[tokio::test]
    async fn test_after_closing_stays_closed() {
        let controller = controller(&[]);
        let request = ChatRequest {
            condition: Some(ConditionInput::Label("neutral".into())),
            active_puzzle_id: Some(3),
            questions_asked: None,
            history: vec![Turn::assistant(CLOSING_MESSAGE), Turn::participant("Is that all?")],
        };

        let response = respond(&controller, request).await.unwrap();
        assert_eq!(response.reply, CLOSING_MESSAGE);
        assert_eq!(response.session.phase, Phase::Done);
    }

    #[test]
    fn test_response_serializes_without_empty_adjustments() {
        let controller = controller(&[]);
        let response = ChatResponse {
            reply: "Yes.".to_string(),
            session: controller.new_session(Condition::Sincere),
            adjustments: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("adjustments").is_none());
        assert_eq!(json["session"]["phase"], "introducing");
    }
}
