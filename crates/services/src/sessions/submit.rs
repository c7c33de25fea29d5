use std::sync::Arc;

use tracing::{debug, info};

use quiz_core::gate::Admission;
use quiz_core::model::{AnswerResult, Tier};
use quiz_core::progression::{Commit, Outcome, Transition};

use super::engine::SessionEngine;
use super::events::SubmitStatus;
use crate::api::{AnswerResponse, CompleteRequest, CompletionSummary, SubmitRequest};
use crate::error::SessionError;
use crate::feedback::SoundEffect;

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

impl SessionEngine {
    /// Submit an answer to the question on screen, timed from when it was
    /// presented.
    ///
    /// # Errors
    ///
    /// See [`SessionEngine::submit`].
    pub async fn answer(&mut self, answer: &str) -> Result<SubmitStatus, SessionError> {
        let elapsed = self
            .active
            .as_ref()
            .and_then(|active| active.presented)
            .map_or(0.0, |presented| presented.shown_at.elapsed().as_secs_f64());
        self.submit(answer, elapsed, false).await
    }

    /// Submit the empty answer for a question whose countdown ran out.
    ///
    /// # Errors
    ///
    /// See [`SessionEngine::submit`].
    pub async fn submit_timeout(&mut self) -> Result<SubmitStatus, SessionError> {
        let elapsed = f64::from(self.question_timer.snapshot().total);
        self.submit("", elapsed, true).await
    }

    /// Submit an answer for grading and apply the result.
    ///
    /// At most one submission per question gets through: while one is in
    /// flight or its result is on screen, further calls return
    /// [`SubmitStatus::Ignored`] without touching the network. Progression,
    /// combo and score change only after the service has graded the answer;
    /// a failed call leaves them untouched and reopens the gate. An answer
    /// the service graded but the progression cannot apply (a question filed
    /// under the wrong kind of tier) is held as answered with no score, and
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionNotFound` when no session is open or the
    ///   service no longer knows it.
    /// - `SessionError::AlreadyCompleted` after [`SessionEngine::complete`].
    /// - `SessionError::NoQuestion` when nothing is on screen.
    /// - `SessionError::ValidationRejected` for a blank answer outside a
    ///   timeout.
    /// - `SessionError::Network` when the service call fails.
    /// - `SessionError::Progression` when a graded answer cannot be applied.
    pub async fn submit(
        &mut self,
        answer: &str,
        time_taken_secs: f64,
        is_timeout: bool,
    ) -> Result<SubmitStatus, SessionError> {
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::SessionNotFound);
        };
        if active.completion.is_some() {
            return Err(SessionError::AlreadyCompleted);
        }
        let Some(presented) = active.presented else {
            return Err(SessionError::NoQuestion);
        };
        let Some(question) = self.pool.current(presented.tier).cloned() else {
            return Err(SessionError::NoQuestion);
        };

        let ticket = match active.gate.try_begin(answer, is_timeout)? {
            Admission::Admitted(ticket) => ticket,
            Admission::Locked => {
                debug!(word = %question.word_mastery_id, "submission ignored while locked");
                return Ok(SubmitStatus::Ignored);
            }
        };
        self.question_timer.pause();

        let selected_answer = if is_timeout {
            String::new()
        } else {
            answer.trim().to_owned()
        };
        let request = SubmitRequest {
            word_mastery_id: question.word_mastery_id,
            selected_answer: selected_answer.clone(),
            time_taken_seconds: time_taken_secs,
            stage: question.tier.stage(),
            question_type: question.question_type,
            is_timeout,
        };
        let credentials = active.credentials.clone();
        let api = Arc::clone(&self.api);

        let response = match api.submit_answer(&credentials, &request).await {
            Ok(response) => response,
            Err(err) => {
                active.gate.fail(ticket);
                self.question_timer.resume();
                return Err(self.record_error(err.into()));
            }
        };

        let outcome = Outcome::for_question(&question, response.is_correct, time_taken_secs);
        let step = match active.progression.commit(&active.combo, &outcome) {
            Ok(step) => step,
            Err(err) => {
                // Graded already: hold the gate so the answer is not sent twice.
                active.progress.record(response.is_correct);
                active.gate.commit(
                    ticket,
                    AnswerResult {
                        word_mastery_id: question.word_mastery_id,
                        selected_answer,
                        is_timeout,
                        is_correct: response.is_correct,
                        almost_correct: response.almost_correct,
                        correct_answer: response.correct_answer,
                        score_delta: 0,
                        tier_before: question.tier,
                        tier_after: question.tier,
                        transition: None,
                        mastered: false,
                        combo: active.combo,
                    },
                );
                return Err(self.record_error(err.into()));
            }
        };
        log_drift(&step.commit, &response);

        let tier_before = active.progression.level().map_or(question.tier, Tier::Level);
        let commit = step.commit;
        active.progression = step.progression;
        active.combo = step.combo;
        active.progress.record(response.is_correct);
        active.score += i64::from(commit.score_delta);
        if commit.mastered {
            active.mastered.insert(question.word_mastery_id);
        }
        if active.progression.level().is_some() && commit.transitioned() {
            active.focus = commit.tier;
        }
        if let Some(tier) = commit.prefetch {
            self.pool.prefetch(tier);
        }

        self.sounds.stop(SoundEffect::TimerWarning);
        self.sounds.stop(SoundEffect::TimerFinal);
        self.sounds.play(if response.is_correct {
            SoundEffect::Correct
        } else if response.almost_correct {
            SoundEffect::AlmostCorrect
        } else {
            SoundEffect::Incorrect
        });
        if commit.mastered {
            self.sounds.play(SoundEffect::Mastered);
        } else if active.progression.level().is_some() {
            match commit.transition {
                Some(Transition::Up) => self.sounds.play(SoundEffect::LevelUp),
                Some(Transition::Down) => self.sounds.play(SoundEffect::LevelDown),
                None => {}
            }
        }

        let result = AnswerResult {
            word_mastery_id: question.word_mastery_id,
            selected_answer,
            is_timeout,
            is_correct: response.is_correct,
            almost_correct: response.almost_correct,
            correct_answer: response.correct_answer,
            score_delta: commit.score_delta,
            tier_before,
            tier_after: commit.tier,
            transition: commit.transition,
            mastered: commit.mastered,
            combo: active.combo,
        };
        active.gate.commit(ticket, result.clone());

        info!(
            word = %result.word_mastery_id,
            correct = result.is_correct,
            timeout = is_timeout,
            delta = result.score_delta,
            tier = %result.tier_after,
            "answer graded"
        );
        self.last_error = None;
        Ok(SubmitStatus::Committed(result))
    }

    /// Leave the result screen and present the next question.
    ///
    /// Returns `Ok(false)` when there is no graded result to move past.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` when no session is open.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.pool.try_settle();
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::SessionNotFound);
        };
        if active.gate.release().is_none() {
            return Ok(false);
        }
        if let Some(presented) = active.presented.take() {
            self.pool.advance(presented.tier);
        }
        self.present_current();
        Ok(true)
    }

    /// Close the session with the grading service and keep its totals.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyCompleted` on a second call,
    /// `SessionError::SessionNotFound` when no session is open and
    /// `SessionError::Network` when the call fails.
    pub async fn complete(&mut self) -> Result<CompletionSummary, SessionError> {
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::SessionNotFound);
        };
        if active.completion.is_some() {
            return Err(SessionError::AlreadyCompleted);
        }

        let request = CompleteRequest {
            final_level: active.progression.level(),
            final_stage: active.focus.stage(),
            best_combo: active.combo.best_combo,
        };
        let credentials = active.credentials.clone();
        let api = Arc::clone(&self.api);
        self.question_timer.stop();
        self.session_timer.stop();

        match api.complete_session(&credentials, &request).await {
            Ok(summary) => {
                info!(
                    session = %active.session.id(),
                    answered = summary.total_answered,
                    correct = summary.correct_count,
                    "session completed"
                );
                active.completion = Some(summary.clone());
                self.last_error = None;
                Ok(summary)
            }
            Err(err) => Err(self.record_error(err.into())),
        }
    }
}

fn log_drift(commit: &Commit, response: &AnswerResponse) {
    let local_level = commit.tier.level();
    if response.level.is_some() && response.level != local_level {
        debug!(local = ?local_level, remote = ?response.level, "level differs from service");
    }
    let local_stage = commit.tier.stage();
    if response.stage.is_some() && response.stage != local_stage {
        debug!(local = ?local_stage, remote = ?response.stage, "stage differs from service");
    }
    if response.mastered != commit.mastered {
        debug!(local = commit.mastered, remote = response.mastered, "mastery differs from service");
    }
}
