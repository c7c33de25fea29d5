use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use quiz_core::Clock;
use quiz_core::gate::SubmissionGate;
use quiz_core::model::{
    AnswerResult, EngineVariant, Level, Question, Session, SessionProgress, SpeechCue, Stage, Tier,
    WordMasteryId,
};
use quiz_core::progression::{
    AdaptiveState, ComboState, Progression, ProgressionError, StageBook, StageState,
};
use quiz_core::timer::TimerCue;

use super::events::EngineEvent;
use crate::api::{CompletionSummary, QuizApi, SessionCredentials, StartResponse};
use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::feedback::{Silent, SoundEffect, SoundEffects, SpeechPlayer};
use crate::pool_manager::{PoolManager, PrefetchSettled};
use crate::timer::{CountdownTimer, TimerEvent, TimerKind, TimerSnapshot};

//
// ─── ACTIVE SESSION ────────────────────────────────────────────────────────────
//

/// The question currently on screen and the pool it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Presented {
    pub word: WordMasteryId,
    pub tier: Tier,
    pub shown_at: Instant,
}

pub(super) struct ActiveSession {
    pub session: Session,
    pub credentials: SessionCredentials,
    pub progression: Progression,
    pub combo: ComboState,
    pub progress: SessionProgress,
    pub score: i64,
    pub gate: SubmissionGate,
    /// Pool new questions are drawn from.
    pub focus: Tier,
    pub presented: Option<Presented>,
    pub mastered: HashSet<WordMasteryId>,
    pub per_question_seconds: u32,
    pub completion: Option<CompletionSummary>,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Client-side quiz session: question pool, progression, timers and the
/// submission gate behind one owner.
///
/// All methods take `&mut self`, so operations on one engine are serialized.
/// Background work (timer ticks, refills) reports through
/// [`SessionEngine::next_event`].
pub struct SessionEngine {
    pub(super) api: Arc<dyn QuizApi>,
    pub(super) config: EngineConfig,
    pub(super) clock: Clock,
    pub(super) speech: Arc<dyn SpeechPlayer>,
    pub(super) sounds: Arc<dyn SoundEffects>,
    pub(super) pool: PoolManager,
    pub(super) question_timer: CountdownTimer,
    pub(super) session_timer: CountdownTimer,
    pub(super) timer_rx: UnboundedReceiver<TimerEvent>,
    pub(super) active: Option<ActiveSession>,
    pub(super) last_error: Option<String>,
}

impl SessionEngine {
    #[must_use]
    pub fn new(api: Arc<dyn QuizApi>, config: EngineConfig) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let question_timer = CountdownTimer::new(
            TimerKind::Question,
            config.warn_at_seconds,
            config.tick_interval,
            timer_tx.clone(),
        );
        let session_timer = CountdownTimer::new(
            TimerKind::Session,
            config.warn_at_seconds,
            config.tick_interval,
            timer_tx,
        );
        let pool = PoolManager::new(Arc::clone(&api)).with_shuffle_choices(config.shuffle_choices);

        Self {
            api,
            config,
            clock: Clock::default(),
            speech: Arc::new(Silent),
            sounds: Arc::new(Silent),
            pool,
            question_timer,
            session_timer,
            timer_rx,
            active: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_speech(mut self, speech: Arc<dyn SpeechPlayer>) -> Self {
        self.speech = speech;
        self
    }

    #[must_use]
    pub fn with_sounds(mut self, sounds: Arc<dyn SoundEffects>) -> Self {
        self.sounds = sounds;
        self
    }

    /// Open a session with an access code, replacing any open one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Network` when the service cannot be reached and
    /// `SessionError::Progression` when the start payload has no usable level.
    pub async fn start(&mut self, access_code: &str) -> Result<&Session, SessionError> {
        if self.active.is_some() {
            self.exit();
        }

        let response = match self.api.start_session(access_code).await {
            Ok(response) => response,
            Err(err) => return Err(self.record_error(err.into())),
        };
        let (progression, focus) = match initial_progression(&response) {
            Ok(initial) => initial,
            Err(err) => return Err(self.record_error(err.into())),
        };

        let credentials = SessionCredentials {
            session_id: response.session_id,
            access_token: response.access_token.clone(),
        };
        let session = Session::new(
            response.session_id,
            response.assignment_id,
            response.engine_variant,
            response.student_name.clone(),
            self.clock.now(),
        );

        self.pool.open(credentials.clone());
        let added = self.pool.ingest_by_tier(response.questions);
        if self.pool.current(focus).is_none() {
            self.pool.prefetch(focus);
        }

        info!(
            session = %session.id(),
            variant = ?session.variant(),
            %focus,
            questions = added,
            "session started"
        );

        self.last_error = None;
        self.active = Some(ActiveSession {
            session,
            credentials,
            progression,
            combo: ComboState::default(),
            progress: SessionProgress::default(),
            score: 0,
            gate: SubmissionGate::new(),
            focus,
            presented: None,
            mastered: HashSet::new(),
            per_question_seconds: response
                .per_question_time
                .unwrap_or(self.config.default_question_seconds),
            completion: None,
        });

        if let Some(limit) = self.config.session_time_limit {
            self.session_timer.reset(limit);
        }
        self.present_current();

        self.active
            .as_ref()
            .map(|active| &active.session)
            .ok_or(SessionError::SessionNotFound)
    }

    /// Close the session locally: stop timers, drop the pool and ignore any
    /// refill still in flight.
    pub fn exit(&mut self) {
        self.question_timer.stop();
        self.session_timer.stop();
        self.pool.reset();
        self.last_error = None;
        if let Some(active) = self.active.take() {
            info!(session = %active.session.id(), "session closed");
        }
    }

    /// Wait for the next timer or refill event.
    ///
    /// Refill results are applied to the pool before the event is returned,
    /// and a question waiting on an empty pool is presented as soon as one
    /// arrives. Returns [`EngineEvent::Idle`] at once when no session is open.
    pub async fn next_event(&mut self) -> EngineEvent {
        loop {
            if self.active.is_none() {
                return EngineEvent::Idle;
            }

            tokio::select! {
                event = self.timer_rx.recv() => {
                    let Some(event) = event else {
                        return EngineEvent::Idle;
                    };
                    if let Some(event) = self.on_timer_event(event) {
                        return event;
                    }
                }
                settled = self.pool.next_settled() => {
                    self.present_current();
                    return EngineEvent::PrefetchSettled(settled);
                }
            }
        }
    }

    /// Apply refills that already resolved without waiting.
    pub fn poll_prefetches(&mut self) -> Vec<PrefetchSettled> {
        let settled = self.pool.try_settle();
        if !settled.is_empty() {
            self.present_current();
        }
        settled
    }

    fn on_timer_event(&mut self, event: TimerEvent) -> Option<EngineEvent> {
        let timer = match event.kind() {
            TimerKind::Question => &self.question_timer,
            TimerKind::Session => &self.session_timer,
        };
        if event.cycle() != timer.cycle() {
            debug!(kind = ?event.kind(), cycle = event.cycle(), "dropping stale timer event");
            return None;
        }

        match event {
            TimerEvent::Tick {
                kind,
                seconds_left,
                band,
                ..
            } => Some(EngineEvent::Tick {
                kind,
                seconds_left,
                band,
            }),
            TimerEvent::Cue { kind, cue, .. } => {
                self.sounds.play(match cue {
                    TimerCue::Warning => SoundEffect::TimerWarning,
                    TimerCue::Final => SoundEffect::TimerFinal,
                });
                Some(EngineEvent::Cue { kind, cue })
            }
            TimerEvent::Expired {
                kind: TimerKind::Question,
                ..
            } => {
                let unanswered = self
                    .active
                    .as_ref()
                    .is_some_and(|active| !active.gate.is_locked());
                if unanswered {
                    info!("question timed out");
                    Some(EngineEvent::QuestionTimedOut)
                } else {
                    None
                }
            }
            TimerEvent::Expired {
                kind: TimerKind::Session,
                ..
            } => {
                info!("session time limit reached");
                Some(EngineEvent::SessionTimeUp)
            }
        }
    }

    /// Show the next question from the focus pool if nothing is on screen.
    ///
    /// Skips mastered words, restarts the question countdown and fires the
    /// question's speech cue.
    pub(super) fn present_current(&mut self) {
        let Self {
            pool,
            active,
            question_timer,
            speech,
            ..
        } = self;
        let Some(active) = active.as_mut() else {
            return;
        };
        if active.gate.is_locked() || active.completion.is_some() || active.presented.is_some() {
            return;
        }

        let focus = active.focus;
        let question = loop {
            let Some(question) = pool.current(focus) else {
                debug!(%focus, "waiting for questions");
                return;
            };
            if active.mastered.contains(&question.word_mastery_id) {
                pool.advance(focus);
                continue;
            }
            break question.clone();
        };

        active.presented = Some(Presented {
            word: question.word_mastery_id,
            tier: focus,
            shown_at: Instant::now(),
        });
        question_timer.reset(question.timer_seconds.unwrap_or(active.per_question_seconds));
        match question.speech_cue() {
            SpeechCue::Word => speech.play_word(&question.prompt_data.word),
            SpeechCue::Sentence => match &question.prompt_data.sentence {
                Some(sentence) => speech.play_sentence(sentence),
                None => speech.play_word(&question.prompt_data.word),
            },
            SpeechCue::Silent => {}
        }
        debug!(word = %question.word_mastery_id, %focus, "question presented");
    }

    pub(super) fn record_error(&mut self, err: SessionError) -> SessionError {
        warn!(error = %err, "session error");
        self.last_error = Some(err.to_string());
        err
    }

    //
    // ─── READ ACCESS ───────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|active| &active.session)
    }

    /// The question on screen.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let presented = self.active.as_ref()?.presented?;
        self.pool.current(presented.tier)
    }

    /// Result of the last submission while it is still on screen.
    #[must_use]
    pub fn last_result(&self) -> Option<&AnswerResult> {
        self.active.as_ref()?.gate.result()
    }

    /// True from admission of a submission until the caller advances.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.gate.is_locked())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.active
            .as_ref()
            .map(|active| active.progress)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn combo(&self) -> ComboState {
        self.active
            .as_ref()
            .map(|active| active.combo)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn score(&self) -> i64 {
        self.active.as_ref().map_or(0, |active| active.score)
    }

    /// Pool new questions are drawn from: the learner's level or the
    /// session's stage.
    #[must_use]
    pub fn focus(&self) -> Option<Tier> {
        self.active.as_ref().map(|active| active.focus)
    }

    #[must_use]
    pub fn level(&self) -> Option<Level> {
        self.active.as_ref()?.progression.level()
    }

    #[must_use]
    pub fn xp(&self) -> Option<i32> {
        self.active.as_ref()?.progression.xp()
    }

    #[must_use]
    pub fn stage_of(&self, word: WordMasteryId) -> Option<StageState> {
        match &self.active.as_ref()?.progression {
            Progression::FixedStage(book) => book.get(word),
            Progression::Adaptive(_) => None,
        }
    }

    #[must_use]
    pub fn is_mastered(&self, word: WordMasteryId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.mastered.contains(&word))
    }

    #[must_use]
    pub fn completion(&self) -> Option<&CompletionSummary> {
        self.active.as_ref()?.completion.as_ref()
    }

    #[must_use]
    pub fn question_timer(&self) -> TimerSnapshot {
        self.question_timer.snapshot()
    }

    #[must_use]
    pub fn session_timer(&self) -> TimerSnapshot {
        self.session_timer.snapshot()
    }

    /// Whole seconds spent on the question on screen.
    #[must_use]
    pub fn question_elapsed(&self) -> u32 {
        self.question_timer.elapsed()
    }

    /// Message for the last recoverable failure, until dismissed.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Clear the error slot, returning what was in it.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Whether a refill for `tier` is in flight.
    #[must_use]
    pub fn is_prefetching(&self, tier: Tier) -> bool {
        self.pool.is_pending(tier)
    }

    /// Ask for more questions for the focus pool, e.g. after a failed refill
    /// left it empty. Returns true if a fetch was issued.
    pub fn retry_prefetch(&mut self) -> bool {
        match self.active.as_ref().map(|active| active.focus) {
            Some(focus) => self.pool.prefetch(focus),
            None => false,
        }
    }
}

fn initial_progression(response: &StartResponse) -> Result<(Progression, Tier), ProgressionError> {
    match response.engine_variant {
        EngineVariant::Adaptive => {
            let mut available = response.available_levels.clone();
            let level = response
                .current_level
                .or_else(|| available.iter().copied().min())
                .ok_or(ProgressionError::NoAvailableLevels)?;
            if !available.contains(&level) {
                warn!(%level, "current level missing from available levels");
                available.push(level);
            }
            let state = AdaptiveState::new(level, response.current_xp.unwrap_or(0), &available)?;
            Ok((Progression::Adaptive(state), Tier::Level(level)))
        }
        EngineVariant::FixedStage => {
            let stage = response.current_stage.unwrap_or(Stage::FIRST);
            Ok((Progression::FixedStage(StageBook::new()), Tier::Stage(stage)))
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active.as_ref();
        f.debug_struct("SessionEngine")
            .field("session", &active.map(|a| a.session.id()))
            .field("focus", &active.map(|a| a.focus))
            .field("locked", &self.is_locked())
            .field("progress", &self.progress())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
