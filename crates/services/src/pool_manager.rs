use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use quiz_core::model::{Question, Tier};
use quiz_core::pool::{Advance, QuestionPool};

use crate::api::{QuizApi, SessionCredentials};
use crate::error::ApiError;

/// A refill that has resolved and been applied to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchSettled {
    pub tier: Tier,
    pub added: usize,
    pub failed: bool,
}

#[derive(Debug)]
struct PrefetchDone {
    generation: u64,
    tier: Tier,
    result: Result<Vec<Question>, ApiError>,
}

/// Owns the question pool and keeps it topped up in the background.
///
/// Refills run as spawned tasks and report back over a channel; results are
/// applied only when the owner drains them ([`PoolManager::try_settle`] or
/// [`PoolManager::next_settled`]), so the pool has a single writer. Each
/// refill carries the generation it was issued under and is discarded if the
/// manager was reset since.
pub struct PoolManager {
    pool: QuestionPool,
    api: Arc<dyn QuizApi>,
    credentials: Option<SessionCredentials>,
    generation: u64,
    shuffle_choices: bool,
    done_tx: UnboundedSender<PrefetchDone>,
    done_rx: UnboundedReceiver<PrefetchDone>,
}

impl PoolManager {
    #[must_use]
    pub fn new(api: Arc<dyn QuizApi>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            pool: QuestionPool::new(),
            api,
            credentials: None,
            generation: 0,
            shuffle_choices: false,
            done_tx,
            done_rx,
        }
    }

    #[must_use]
    pub fn with_shuffle_choices(mut self, shuffle_choices: bool) -> Self {
        self.shuffle_choices = shuffle_choices;
        self
    }

    /// Start serving a new session with an empty pool.
    pub fn open(&mut self, credentials: SessionCredentials) {
        self.reset();
        self.credentials = Some(credentials);
    }

    /// Forget every queue and invalidate refills still in flight.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.pool.clear();
        self.credentials = None;
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Append presentable questions to `tier`, skipping words already queued.
    pub fn ingest(&mut self, tier: Tier, questions: Vec<Question>) -> usize {
        let mut rng = rand::rng();
        let accepted: Vec<Question> = questions
            .into_iter()
            .filter(|question| {
                let keep = question.is_presentable();
                if !keep {
                    warn!(
                        word = %question.word_mastery_id,
                        question_type = ?question.question_type,
                        "dropping question without choices"
                    );
                }
                keep
            })
            .map(|mut question| {
                if self.shuffle_choices {
                    question.choices.shuffle(&mut rng);
                }
                question
            })
            .collect();
        self.pool.ingest(tier, accepted)
    }

    /// Ingest questions under each question's own tier.
    pub fn ingest_by_tier(&mut self, questions: Vec<Question>) -> usize {
        let mut added = 0;
        let mut grouped: Vec<(Tier, Vec<Question>)> = Vec::new();
        for question in questions {
            match grouped.iter_mut().find(|(tier, _)| *tier == question.tier) {
                Some((_, group)) => group.push(question),
                None => grouped.push((question.tier, vec![question])),
            }
        }
        for (tier, group) in grouped {
            added += self.ingest(tier, group);
        }
        added
    }

    #[must_use]
    pub fn current(&self, tier: Tier) -> Option<&Question> {
        self.pool.current(tier)
    }

    /// Move past the current question; requests a refill when the tier runs
    /// dry. Returns true if a new refill was issued.
    pub fn advance(&mut self, tier: Tier) -> bool {
        match self.pool.advance(tier) {
            Advance::Ready => false,
            Advance::Exhausted => self.prefetch(tier),
        }
    }

    /// Fetch more questions for `tier` unless a fetch is already in flight.
    /// Returns true if a fetch was issued.
    pub fn prefetch(&mut self, tier: Tier) -> bool {
        let Some(credentials) = self.credentials.clone() else {
            debug!(%tier, "prefetch skipped without an open session");
            return false;
        };
        if !self.pool.mark_pending(tier) {
            debug!(%tier, "prefetch already pending");
            return false;
        }

        debug!(%tier, generation = self.generation, "prefetch issued");
        let api = Arc::clone(&self.api);
        let done_tx = self.done_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = api.fetch_batch(&credentials, tier).await;
            let _ = done_tx.send(PrefetchDone {
                generation,
                tier,
                result,
            });
        });
        true
    }

    #[must_use]
    pub fn is_pending(&self, tier: Tier) -> bool {
        self.pool.is_pending(tier)
    }

    #[must_use]
    pub fn remaining(&self, tier: Tier) -> usize {
        self.pool.remaining(tier)
    }

    /// Apply every refill that has already resolved, without waiting.
    pub fn try_settle(&mut self) -> Vec<PrefetchSettled> {
        let mut settled = Vec::new();
        while let Ok(done) = self.done_rx.try_recv() {
            settled.extend(self.apply(done));
        }
        settled
    }

    /// Wait for the next refill of the current generation and apply it.
    pub async fn next_settled(&mut self) -> PrefetchSettled {
        loop {
            match self.done_rx.recv().await {
                Some(done) => {
                    if let Some(settled) = self.apply(done) {
                        return settled;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    fn apply(&mut self, done: PrefetchDone) -> Option<PrefetchSettled> {
        if done.generation != self.generation {
            debug!(
                tier = %done.tier,
                stale = done.generation,
                current = self.generation,
                "dropping refill from a previous session"
            );
            return None;
        }

        self.pool.clear_pending(done.tier);
        match done.result {
            Ok(questions) => {
                let added = self.ingest(done.tier, questions);
                debug!(tier = %done.tier, added, "prefetch settled");
                Some(PrefetchSettled {
                    tier: done.tier,
                    added,
                    failed: false,
                })
            }
            Err(err) => {
                warn!(tier = %done.tier, error = %err, "prefetch failed");
                Some(PrefetchSettled {
                    tier: done.tier,
                    added: 0,
                    failed: true,
                })
            }
        }
    }
}
