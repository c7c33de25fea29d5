use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TierError {
    #[error("level must be between {min} and {max}, got {provided}")]
    LevelOutOfRange { provided: u8, min: u8, max: u8 },
    #[error("stage must be between {min} and {max}, got {provided}")]
    StageOutOfRange { provided: u8, min: u8, max: u8 },
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Adaptive difficulty tier ("book"), 1 through 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 15;

    /// # Errors
    ///
    /// Returns `TierError::LevelOutOfRange` outside `1..=15`.
    pub fn new(value: u8) -> Result<Self, TierError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TierError::LevelOutOfRange {
                provided: value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// XP needed to leave this level: `4 + level`.
    #[must_use]
    pub fn lesson_xp(self) -> i32 {
        4 + i32::from(self.0)
    }
}

impl TryFrom<u8> for Level {
    type Error = TierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.0)
    }
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// One of the five fixed drill modes a word cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stage(u8);

impl Stage {
    pub const FIRST: Stage = Stage(1);
    pub const TERMINAL: Stage = Stage(5);

    /// # Errors
    ///
    /// Returns `TierError::StageOutOfRange` outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, TierError> {
        if (Self::FIRST.0..=Self::TERMINAL.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TierError::StageOutOfRange {
                provided: value,
                min: Self::FIRST.0,
                max: Self::TERMINAL.0,
            })
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    /// The following stage, or `None` at the terminal stage.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        if self.is_terminal() {
            None
        } else {
            Some(Stage(self.0 + 1))
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = TierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.0)
    }
}

//
// ─── TIER ──────────────────────────────────────────────────────────────────────
//

/// Either a level or a stage; keys the question pool and tags every question.
///
/// Serialized as a single-key map (`{"level": 5}` / `{"stage": 2}`) so it can be
/// flattened into question payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Level(Level),
    Stage(Stage),
}

impl Tier {
    #[must_use]
    pub fn level(self) -> Option<Level> {
        match self {
            Tier::Level(level) => Some(level),
            Tier::Stage(_) => None,
        }
    }

    #[must_use]
    pub fn stage(self) -> Option<Stage> {
        match self {
            Tier::Level(_) => None,
            Tier::Stage(stage) => Some(stage),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Level(level) => level.fmt(f),
            Tier::Stage(stage) => stage.fmt(f),
        }
    }
}
