//! Progression machines: turn a graded answer into score and tier changes.
//!
//! Both variants are pure: [`Progression::commit`] takes the current state and
//! an [`Outcome`] and returns the next state without touching the input, so
//! sessions can be replayed deterministically.

mod adaptive;
mod combo;
mod fixed_stage;

use thiserror::Error;

use crate::model::{EngineVariant, Level, Question, Tier, WordMasteryId};

pub use adaptive::{
    AdaptiveState, LevelMove, combo_bonus, correct_base, score_delta, speed_bonus, wrong_penalty,
};
pub use combo::ComboState;
pub use fixed_stage::{DEFAULT_REQUIRED_STREAK, StageBook, StageState, StageStep};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("no levels are available")]
    NoAvailableLevels,
    #[error("{level} is not among the available levels")]
    LevelUnavailable { level: Level },
    #[error("{variant:?} session cannot grade a question at {tier}")]
    TierMismatch { variant: EngineVariant, tier: Tier },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Up,
    Down,
}

/// A graded answer as seen by the progression machines.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub word_mastery_id: WordMasteryId,
    pub is_correct: bool,
    pub time_taken_secs: f64,
    pub tier: Tier,
    pub required_streak: Option<u32>,
}

impl Outcome {
    #[must_use]
    pub fn for_question(question: &Question, is_correct: bool, time_taken_secs: f64) -> Self {
        Self {
            word_mastery_id: question.word_mastery_id,
            is_correct,
            time_taken_secs,
            tier: question.tier,
            required_streak: question.required_streak,
        }
    }
}

/// Score and tier effects of one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub score_delta: i32,
    /// Tier after the answer: the learner's level, or the word's stage.
    pub tier: Tier,
    pub transition: Option<Transition>,
    pub mastered: bool,
    /// Pool to refill because the learner moved onto it.
    pub prefetch: Option<Tier>,
}

impl Commit {
    #[must_use]
    pub fn transitioned(&self) -> bool {
        self.transition.is_some()
    }
}

/// Everything that changes on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub progression: Progression,
    pub combo: ComboState,
    pub commit: Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progression {
    Adaptive(AdaptiveState),
    FixedStage(StageBook),
}

impl Progression {
    #[must_use]
    pub fn variant(&self) -> EngineVariant {
        match self {
            Progression::Adaptive(_) => EngineVariant::Adaptive,
            Progression::FixedStage(_) => EngineVariant::FixedStage,
        }
    }

    /// Grade one outcome.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::TierMismatch` when the outcome's tier kind
    /// does not match the variant (a stage question in an adaptive session or
    /// the reverse).
    pub fn commit(&self, combo: &ComboState, outcome: &Outcome) -> Result<Step, ProgressionError> {
        let mismatch = || ProgressionError::TierMismatch {
            variant: self.variant(),
            tier: outcome.tier,
        };

        match self {
            Progression::Adaptive(state) => {
                let question_level = outcome.tier.level().ok_or_else(mismatch)?;
                let delta = score_delta(
                    state.level(),
                    combo,
                    question_level,
                    outcome.is_correct,
                    outcome.time_taken_secs,
                );
                let moved = state.apply(delta);
                let level = moved.state.level();
                let prefetch = moved.transition.map(|_| Tier::Level(level));
                Ok(Step {
                    commit: Commit {
                        score_delta: delta,
                        tier: Tier::Level(level),
                        transition: moved.transition,
                        mastered: false,
                        prefetch,
                    },
                    progression: Progression::Adaptive(moved.state),
                    combo: combo.record(outcome.is_correct),
                })
            }
            Progression::FixedStage(book) => {
                let stage = outcome.tier.stage().ok_or_else(mismatch)?;
                let required = outcome.required_streak.unwrap_or(DEFAULT_REQUIRED_STREAK);
                let step = book
                    .state_for(outcome.word_mastery_id, stage)
                    .record(outcome.is_correct, required);
                Ok(Step {
                    commit: Commit {
                        score_delta: i32::from(outcome.is_correct),
                        tier: Tier::Stage(step.state.stage),
                        transition: step.advanced.then_some(Transition::Up),
                        mastered: step.mastered,
                        prefetch: None,
                    },
                    progression: Progression::FixedStage(
                        book.with(outcome.word_mastery_id, step.state),
                    ),
                    combo: combo.record(outcome.is_correct),
                })
            }
        }
    }

    /// The learner's level in an adaptive session.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        match self {
            Progression::Adaptive(state) => Some(state.level()),
            Progression::FixedStage(_) => None,
        }
    }

    #[must_use]
    pub fn xp(&self) -> Option<i32> {
        match self {
            Progression::Adaptive(state) => Some(state.xp()),
            Progression::FixedStage(_) => None,
        }
    }
}
