use crate::model::{Tier, WordMasteryId};
use crate::progression::{ComboState, Transition};

/// Outcome of one committed submission, kept until the caller advances.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub word_mastery_id: WordMasteryId,
    pub selected_answer: String,
    pub is_timeout: bool,
    /// Grading service verdict; never recomputed locally.
    pub is_correct: bool,
    pub almost_correct: bool,
    /// For highlighting only.
    pub correct_answer: Option<String>,
    pub score_delta: i32,
    pub tier_before: Tier,
    pub tier_after: Tier,
    pub transition: Option<Transition>,
    pub mastered: bool,
    pub combo: ComboState,
}

impl AnswerResult {
    #[must_use]
    pub fn transitioned(&self) -> bool {
        self.transition.is_some()
    }
}
