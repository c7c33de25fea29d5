use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AssignmentId, SessionId};

/// Which progression machine drives a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineVariant {
    /// XP-based leveling across the available levels.
    Adaptive,
    /// Per-word cycling through the five fixed stages.
    FixedStage,
}

/// An open quiz session. Progress lives in separate counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    assignment_id: AssignmentId,
    variant: EngineVariant,
    student_name: String,
    started_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(
        id: SessionId,
        assignment_id: AssignmentId,
        variant: EngineVariant,
        student_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            assignment_id,
            variant,
            student_name: student_name.into(),
            started_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    #[must_use]
    pub fn variant(&self) -> EngineVariant {
        self.variant
    }

    #[must_use]
    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Answered/correct counters; only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub total_answered: u32,
    pub correct_count: u32,
}

impl SessionProgress {
    pub fn record(&mut self, is_correct: bool) {
        self.total_answered = self.total_answered.saturating_add(1);
        if is_correct {
            self.correct_count = self.correct_count.saturating_add(1);
        }
    }

    /// Fraction of answers graded correct, 0.0 before the first answer.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_answered == 0 {
            0.0
        } else {
            f64::from(self.correct_count) / f64::from(self.total_answered)
        }
    }
}
