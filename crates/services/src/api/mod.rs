//! Seam to the remote grading service.

mod http;
mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    AssignmentId, EngineVariant, Level, Question, QuestionType, SessionId, Stage, Tier,
    WordMasteryId,
};

use crate::error::ApiError;

pub use http::{ApiConfig, HttpQuizApi};
pub use scripted::{ApiCall, ScriptedQuizApi};

/// Identifies an open session to the grading service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub session_id: SessionId,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub access_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: SessionId,
    pub assignment_id: AssignmentId,
    pub student_name: String,
    pub engine_variant: EngineVariant,
    #[serde(default)]
    pub current_level: Option<Level>,
    #[serde(default)]
    pub current_xp: Option<i32>,
    #[serde(default)]
    pub current_stage: Option<Stage>,
    #[serde(default)]
    pub available_levels: Vec<Level>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub per_question_time: Option<u32>,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub word_mastery_id: WordMasteryId,
    pub selected_answer: String,
    pub time_taken_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub question_type: QuestionType,
    pub is_timeout: bool,
}

/// Grading verdict plus the service's view of progression, which the engine
/// only logs against its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub is_correct: bool,
    #[serde(default)]
    pub almost_correct: bool,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(default)]
    pub xp: Option<i32>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub streak: Option<u32>,
    #[serde(default)]
    pub mastered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_stage: Option<Stage>,
    pub best_combo: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub accuracy: f64,
    pub total_answered: u32,
    pub correct_count: u32,
}

/// Remote grading service contract.
#[async_trait]
pub trait QuizApi: Send + Sync {
    /// Open a session for an access code.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the call fails or the code is not accepted.
    async fn start_session(&self, access_code: &str) -> Result<StartResponse, ApiError>;

    /// Grade one answer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or service failure.
    async fn submit_answer(
        &self,
        credentials: &SessionCredentials,
        request: &SubmitRequest,
    ) -> Result<AnswerResponse, ApiError>;

    /// Fetch more questions for a level or stage.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or service failure.
    async fn fetch_batch(
        &self,
        credentials: &SessionCredentials,
        tier: Tier,
    ) -> Result<Vec<Question>, ApiError>;

    /// Close the session and get its totals.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or service failure.
    async fn complete_session(
        &self,
        credentials: &SessionCredentials,
        request: &CompleteRequest,
    ) -> Result<CompletionSummary, ApiError>;
}
