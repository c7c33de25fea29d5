use thiserror::Error;

use crate::model::AnswerResult;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GateError {
    #[error("answer is empty")]
    EmptyAnswer,
}

/// Per-question submission phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GatePhase {
    #[default]
    Unanswered,
    Submitting,
    Answered(AnswerResult),
}

/// Proof that the gate admitted a submission. Consumed by commit or fail.
#[derive(Debug)]
#[must_use]
pub struct SubmitTicket {
    _private: (),
}

#[derive(Debug)]
pub enum Admission {
    Admitted(SubmitTicket),
    /// A submission is in flight or its result is still on screen.
    Locked,
}

/// Lets exactly one submission through per question.
///
/// The lock is taken on admission and held through the answered phase; only
/// [`SubmissionGate::release`] (moving to the next question) or a failed
/// submission opens it again.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGate {
    phase: GatePhase,
}

impl SubmissionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a submission if the gate is open.
    ///
    /// A locked gate is checked first, so a repeat click while locked is a
    /// silent no-op even with an empty answer.
    ///
    /// # Errors
    ///
    /// Returns `GateError::EmptyAnswer` for a blank answer outside a timeout.
    pub fn try_begin(&mut self, answer: &str, is_timeout: bool) -> Result<Admission, GateError> {
        if self.is_locked() {
            return Ok(Admission::Locked);
        }
        if !is_timeout && answer.trim().is_empty() {
            return Err(GateError::EmptyAnswer);
        }
        self.phase = GatePhase::Submitting;
        Ok(Admission::Admitted(SubmitTicket { _private: () }))
    }

    /// Record the committed result; the gate stays locked.
    pub fn commit(&mut self, ticket: SubmitTicket, result: AnswerResult) {
        let SubmitTicket { .. } = ticket;
        self.phase = GatePhase::Answered(result);
    }

    /// Reopen after a failed submission so the learner can retry.
    pub fn fail(&mut self, ticket: SubmitTicket) {
        let SubmitTicket { .. } = ticket;
        self.phase = GatePhase::Unanswered;
    }

    /// Reopen for the next question. Returns the result that was on screen.
    pub fn release(&mut self) -> Option<AnswerResult> {
        match std::mem::take(&mut self.phase) {
            GatePhase::Answered(result) => Some(result),
            other => {
                self.phase = other;
                None
            }
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        !matches!(self.phase, GatePhase::Unanswered)
    }

    #[must_use]
    pub fn phase(&self) -> &GatePhase {
        &self.phase
    }

    #[must_use]
    pub fn result(&self) -> Option<&AnswerResult> {
        match &self.phase {
            GatePhase::Answered(result) => Some(result),
            GatePhase::Unanswered | GatePhase::Submitting => None,
        }
    }
}
