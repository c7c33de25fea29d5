//! XP leveling across the learner's available levels.
//!
//! A correct answer earns a base award (smaller when the question sits below the
//! learner's level), a speed bonus and a combo bonus. A wrong answer costs more
//! the longer the wrong streak runs. Crossing `lesson_xp` moves up one available
//! level; dropping below zero moves down one and restarts at half the lower
//! level's threshold.

use crate::model::Level;
use crate::progression::{ComboState, ProgressionError, Transition};

/// Bonus for answering quickly, by elapsed seconds.
#[must_use]
pub fn speed_bonus(time_taken_secs: f64) -> i32 {
    if time_taken_secs <= 1.0 {
        5
    } else if time_taken_secs <= 2.0 {
        4
    } else if time_taken_secs <= 3.0 {
        3
    } else if time_taken_secs <= 5.0 {
        2
    } else if time_taken_secs <= 8.0 {
        1
    } else {
        0
    }
}

/// Bonus for the running combo (counted before this answer), capped at 5.
#[must_use]
pub fn combo_bonus(combo: u32) -> i32 {
    if combo >= 3 {
        let bonus = (combo / 5 + 1).min(5);
        i32::try_from(bonus).unwrap_or(5)
    } else {
        0
    }
}

/// Base award for a correct answer.
#[must_use]
pub fn correct_base(question_level: Level, current: Level) -> i32 {
    let value = i32::from(current.value());
    if question_level < current {
        value.max(4)
    } else {
        8 + value * 2
    }
}

/// Negative delta for a wrong answer given the wrong streak before it.
#[must_use]
pub fn wrong_penalty(consecutive_wrong: u32, current: Level) -> i32 {
    let current = i32::from(current.value());
    match consecutive_wrong {
        0 => -(3 + current),
        1 => -(5 + current),
        _ => -(8 + current),
    }
}

/// Score delta for one graded answer.
#[must_use]
pub fn score_delta(
    current: Level,
    combo: &ComboState,
    question_level: Level,
    is_correct: bool,
    time_taken_secs: f64,
) -> i32 {
    if is_correct {
        correct_base(question_level, current) + speed_bonus(time_taken_secs) + combo_bonus(combo.combo)
    } else {
        wrong_penalty(combo.consecutive_wrong, current)
    }
}

/// Current level and XP within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveState {
    level: Level,
    xp: i32,
    available: Vec<Level>,
}

/// Result of applying a score delta to an [`AdaptiveState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelMove {
    pub state: AdaptiveState,
    pub transition: Option<Transition>,
}

impl AdaptiveState {
    /// Build a state, normalising the available set and clamping `xp` into
    /// `0..lesson_xp(level)`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::NoAvailableLevels` for an empty set and
    /// `ProgressionError::LevelUnavailable` when `level` is not in it.
    pub fn new(level: Level, xp: i32, available: &[Level]) -> Result<Self, ProgressionError> {
        if available.is_empty() {
            return Err(ProgressionError::NoAvailableLevels);
        }
        let mut available = available.to_vec();
        available.sort_unstable();
        available.dedup();
        if available.binary_search(&level).is_err() {
            return Err(ProgressionError::LevelUnavailable { level });
        }
        Ok(Self {
            level,
            xp: xp.clamp(0, level.lesson_xp() - 1),
            available,
        })
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn xp(&self) -> i32 {
        self.xp
    }

    #[must_use]
    pub fn available(&self) -> &[Level] {
        &self.available
    }

    /// Lowest available level above the current one.
    #[must_use]
    pub fn higher(&self) -> Option<Level> {
        self.available.iter().copied().find(|l| *l > self.level)
    }

    /// Highest available level below the current one.
    #[must_use]
    pub fn lower(&self) -> Option<Level> {
        self.available.iter().rev().copied().find(|l| *l < self.level)
    }

    /// Apply a score delta, moving at most one available level.
    ///
    /// At the top of the range XP is held just under the threshold; at the
    /// bottom it is clamped to zero.
    #[must_use]
    pub fn apply(&self, delta: i32) -> LevelMove {
        let total = self.xp.saturating_add(delta);
        let threshold = self.level.lesson_xp();

        let (level, xp, transition) = if total >= threshold {
            match self.higher() {
                Some(next) => (next, 0, Some(Transition::Up)),
                None => (self.level, threshold - 1, None),
            }
        } else if total < 0 {
            match self.lower() {
                Some(prev) => (prev, prev.lesson_xp() / 2, Some(Transition::Down)),
                None => (self.level, 0, None),
            }
        } else {
            (self.level, total, None)
        };

        LevelMove {
            state: Self {
                level,
                xp,
                available: self.available.clone(),
            },
            transition,
        }
    }
}
