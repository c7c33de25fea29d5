use std::collections::BTreeMap;

use crate::model::{Stage, WordMasteryId};

/// Streak needed when a question does not say.
pub const DEFAULT_REQUIRED_STREAK: u32 = 3;

/// Where one word sits in the five-stage cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageState {
    pub stage: Stage,
    pub streak: u32,
}

/// What happened to a word's stage on one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStep {
    pub state: StageState,
    pub advanced: bool,
    pub mastered: bool,
}

impl StageState {
    #[must_use]
    pub fn at(stage: Stage) -> Self {
        Self { stage, streak: 0 }
    }

    /// Apply one graded answer. Wrong answers reset the streak but never
    /// move the word back a stage.
    #[must_use]
    pub fn record(self, is_correct: bool, required_streak: u32) -> StageStep {
        if !is_correct {
            return StageStep {
                state: Self {
                    stage: self.stage,
                    streak: 0,
                },
                advanced: false,
                mastered: false,
            };
        }

        let streak = self.streak.saturating_add(1);
        if streak < required_streak.max(1) {
            return StageStep {
                state: Self {
                    stage: self.stage,
                    streak,
                },
                advanced: false,
                mastered: false,
            };
        }

        match self.stage.next() {
            Some(next) => StageStep {
                state: Self::at(next),
                advanced: true,
                mastered: false,
            },
            None => StageStep {
                state: Self::at(self.stage),
                advanced: false,
                mastered: true,
            },
        }
    }
}

/// Per-word stage states for a fixed-stage session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageBook {
    words: BTreeMap<WordMasteryId, StageState>,
}

impl StageBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, word: WordMasteryId) -> Option<StageState> {
        self.words.get(&word).copied()
    }

    /// State to grade against. The question's stage wins over a stale local
    /// record, since the service may have moved the word since.
    #[must_use]
    pub fn state_for(&self, word: WordMasteryId, question_stage: Stage) -> StageState {
        match self.words.get(&word) {
            Some(state) if state.stage == question_stage => *state,
            _ => StageState::at(question_stage),
        }
    }

    /// Copy of this book with `word` set to `state`.
    #[must_use]
    pub fn with(&self, word: WordMasteryId, state: StageState) -> Self {
        let mut words = self.words.clone();
        words.insert(word, state);
        Self { words }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
