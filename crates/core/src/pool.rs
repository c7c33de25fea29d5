use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Question, Tier, WordMasteryId};

/// One tier's questions plus its forward-only read cursor.
#[derive(Debug, Clone, Default)]
struct TierQueue {
    questions: Vec<Question>,
    cursor: usize,
}

impl TierQueue {
    fn current(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.questions.len()
    }

    fn is_queued(&self, word: WordMasteryId) -> bool {
        self.questions
            .get(self.cursor..)
            .is_some_and(|unread| unread.iter().any(|q| q.word_mastery_id == word))
    }
}

/// Whether a read is possible after advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Ready,
    /// Cursor reached the end; the tier needs a refill.
    Exhausted,
}

/// Per-tier queues of unconsumed questions.
///
/// Entries are only ever appended and read past; nothing is removed until
/// [`QuestionPool::clear`]. A word is refused only while it is still waiting
/// to be read, so a word served earlier can come back in a later refill. The pending set records tiers with
/// a refill in flight so a second request for the same tier is refused.
#[derive(Debug, Clone, Default)]
pub struct QuestionPool {
    queues: BTreeMap<Tier, TierQueue>,
    pending: BTreeSet<Tier>,
}

impl QuestionPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append questions whose word is not already waiting in `tier`.
    /// Returns how many were added.
    pub fn ingest(&mut self, tier: Tier, questions: impl IntoIterator<Item = Question>) -> usize {
        let queue = self.queues.entry(tier).or_default();
        let mut added = 0;
        for question in questions {
            if !queue.is_queued(question.word_mastery_id) {
                queue.questions.push(question);
                added += 1;
            }
        }
        added
    }

    /// Question at the cursor, if any remain.
    #[must_use]
    pub fn current(&self, tier: Tier) -> Option<&Question> {
        self.queues.get(&tier).and_then(TierQueue::current)
    }

    /// Move the cursor past the current question.
    pub fn advance(&mut self, tier: Tier) -> Advance {
        let queue = self.queues.entry(tier).or_default();
        if queue.cursor < queue.questions.len() {
            queue.cursor += 1;
        }
        if queue.is_exhausted() {
            Advance::Exhausted
        } else {
            Advance::Ready
        }
    }

    /// Mark a refill as in flight. Returns false if one already is.
    pub fn mark_pending(&mut self, tier: Tier) -> bool {
        self.pending.insert(tier)
    }

    pub fn clear_pending(&mut self, tier: Tier) {
        self.pending.remove(&tier);
    }

    #[must_use]
    pub fn is_pending(&self, tier: Tier) -> bool {
        self.pending.contains(&tier)
    }

    #[must_use]
    pub fn is_exhausted(&self, tier: Tier) -> bool {
        self.queues.get(&tier).is_none_or(TierQueue::is_exhausted)
    }

    /// Unread questions left in `tier`.
    #[must_use]
    pub fn remaining(&self, tier: Tier) -> usize {
        self.queues
            .get(&tier)
            .map_or(0, |q| q.questions.len().saturating_sub(q.cursor))
    }

    #[must_use]
    pub fn cursor(&self, tier: Tier) -> usize {
        self.queues.get(&tier).map_or(0, |q| q.cursor)
    }

    #[must_use]
    pub fn len(&self, tier: Tier) -> usize {
        self.queues.get(&tier).map_or(0, |q| q.questions.len())
    }

    /// Drop every queue and pending marker.
    pub fn clear(&mut self) {
        self.queues.clear();
        self.pending.clear();
    }
}
