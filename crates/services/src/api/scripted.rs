use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use quiz_core::model::{Question, Tier, WordMasteryId};

use super::{
    AnswerResponse, CompleteRequest, CompletionSummary, QuizApi, SessionCredentials,
    StartResponse, SubmitRequest,
};
use crate::error::ApiError;

/// A call recorded by [`ScriptedQuizApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Start { access_code: String },
    Submit(SubmitRequest),
    Fetch(Tier),
    Complete(CompleteRequest),
}

#[derive(Default)]
struct Script {
    access_code: String,
    start: Option<StartResponse>,
    answers: HashMap<WordMasteryId, String>,
    batches: HashMap<Tier, VecDeque<Vec<Question>>>,
    fail_submits: u32,
    fail_fetches: u32,
    fail_completes: u32,
    fetch_delay: Option<Duration>,
    calls: Vec<ApiCall>,
    graded: Vec<bool>,
}

/// In-memory grading service for tests and offline demos.
///
/// Grades by case-insensitive comparison against scripted answers, serves
/// queued batches per tier (an empty batch once the queue runs dry), records
/// every call, and can be told to fail the next few calls of a kind.
#[derive(Clone, Default)]
pub struct ScriptedQuizApi {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedQuizApi {
    #[must_use]
    pub fn new(access_code: impl Into<String>, start: StartResponse) -> Self {
        let script = Script {
            access_code: access_code.into(),
            start: Some(start),
            ..Script::default()
        };
        Self {
            inner: Arc::new(Mutex::new(script)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Script>, ApiError> {
        self.inner
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))
    }

    fn with_script(&self, f: impl FnOnce(&mut Script)) {
        if let Ok(mut script) = self.inner.lock() {
            f(&mut script);
        }
    }

    pub fn set_answer(&self, word: WordMasteryId, answer: impl Into<String>) {
        let answer = answer.into();
        self.with_script(|s| {
            s.answers.insert(word, answer);
        });
    }

    /// Queue one batch to be returned by the next fetch for `tier`.
    pub fn push_batch(&self, tier: Tier, questions: Vec<Question>) {
        self.with_script(|s| s.batches.entry(tier).or_default().push_back(questions));
    }

    pub fn fail_next_submits(&self, count: u32) {
        self.with_script(|s| s.fail_submits = count);
    }

    pub fn fail_next_fetches(&self, count: u32) {
        self.with_script(|s| s.fail_fetches = count);
    }

    pub fn fail_next_completes(&self, count: u32) {
        self.with_script(|s| s.fail_completes = count);
    }

    /// Hold every fetch for `delay` before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.with_script(|s| s.fetch_delay = Some(delay));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::Submit(_)))
            .count()
    }

    #[must_use]
    pub fn fetch_count(&self, tier: Tier) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::Fetch(t) if *t == tier))
            .count()
    }
}

fn take_failure(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl QuizApi for ScriptedQuizApi {
    async fn start_session(&self, access_code: &str) -> Result<StartResponse, ApiError> {
        let mut script = self.lock()?;
        script.calls.push(ApiCall::Start {
            access_code: access_code.to_owned(),
        });
        if script.access_code != access_code {
            return Err(ApiError::Unavailable("unknown access code".into()));
        }
        script
            .start
            .clone()
            .ok_or_else(|| ApiError::Unavailable("no session scripted".into()))
    }

    async fn submit_answer(
        &self,
        _credentials: &SessionCredentials,
        request: &SubmitRequest,
    ) -> Result<AnswerResponse, ApiError> {
        let mut script = self.lock()?;
        script.calls.push(ApiCall::Submit(request.clone()));
        if take_failure(&mut script.fail_submits) {
            return Err(ApiError::Unavailable("submit failed".into()));
        }
        let expected = script.answers.get(&request.word_mastery_id).cloned();
        let is_correct = !request.is_timeout
            && expected
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(request.selected_answer.trim()));
        script.graded.push(is_correct);
        Ok(AnswerResponse {
            is_correct,
            almost_correct: false,
            correct_answer: expected,
            level: None,
            xp: None,
            stage: None,
            streak: None,
            mastered: false,
        })
    }

    async fn fetch_batch(
        &self,
        _credentials: &SessionCredentials,
        tier: Tier,
    ) -> Result<Vec<Question>, ApiError> {
        let delay = {
            let mut script = self.lock()?;
            script.calls.push(ApiCall::Fetch(tier));
            if take_failure(&mut script.fail_fetches) {
                return Err(ApiError::Unavailable("fetch failed".into()));
            }
            script.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.lock()?;
        Ok(script
            .batches
            .get_mut(&tier)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }

    async fn complete_session(
        &self,
        _credentials: &SessionCredentials,
        request: &CompleteRequest,
    ) -> Result<CompletionSummary, ApiError> {
        let mut script = self.lock()?;
        script.calls.push(ApiCall::Complete(request.clone()));
        if take_failure(&mut script.fail_completes) {
            return Err(ApiError::Unavailable("complete failed".into()));
        }

        let total_answered = u32::try_from(script.graded.len()).unwrap_or(u32::MAX);
        let correct_count =
            u32::try_from(script.graded.iter().filter(|c| **c).count()).unwrap_or(u32::MAX);
        let accuracy = if total_answered == 0 {
            0.0
        } else {
            f64::from(correct_count) / f64::from(total_answered)
        };
        Ok(CompletionSummary {
            accuracy,
            total_answered,
            correct_count,
        })
    }
}
