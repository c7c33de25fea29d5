mod common;

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{AnswerResult, Tier, WordMasteryId};
use quiz_core::progression::Transition;
use quiz_core::time::fixed_now;
use services::api::ApiCall;
use services::{Clock, EngineConfig, EngineEvent, SessionError, SoundEffect, SubmitStatus, TimerKind};

use common::*;

async fn settle(engine: &mut services::SessionEngine) -> services::PrefetchSettled {
    loop {
        if let EngineEvent::PrefetchSettled(settled) = engine.next_event().await {
            return settled;
        }
    }
}

fn committed(status: SubmitStatus) -> AnswerResult {
    match status {
        SubmitStatus::Committed(result) => result,
        SubmitStatus::Ignored => panic!("submission was ignored"),
    }
}

#[tokio::test(start_paused = true)]
async fn repeat_submissions_reach_the_service_once() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, vec![question(1, l5), question(2, l5)]));
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let first = engine.submit(&answer(1), 4.0, false).await.unwrap();
    assert!(committed(first).is_correct);
    assert!(engine.is_locked());

    let second = engine.submit(&answer(1), 4.5, false).await.unwrap();
    assert_eq!(second, SubmitStatus::Ignored);
    let timeout = engine.submit_timeout().await.unwrap();
    assert_eq!(timeout, SubmitStatus::Ignored);

    assert_eq!(api.submit_count(), 1);
    assert_eq!(engine.progress().total_answered, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_reopens_the_gate_without_side_effects() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, vec![question(1, l5)]));
    api.fail_next_submits(1);
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let err = engine.submit(&answer(1), 2.0, false).await.unwrap_err();
    assert!(matches!(err, SessionError::Network(_)));
    assert!(err.is_retryable());
    assert!(!engine.is_locked());
    assert!(engine.last_error().is_some());
    assert_eq!(engine.progress().total_answered, 0);
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.level(), Some(level(5)));
    assert_eq!(engine.xp(), Some(0));

    let retried = committed(engine.submit(&answer(1), 2.0, false).await.unwrap());
    assert!(retried.is_correct);
    assert!(engine.last_error().is_none());
    assert_eq!(api.submit_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn blank_answer_is_rejected_before_the_network() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, vec![question(1, l5)]));
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let err = engine.submit("   ", 1.0, false).await.unwrap_err();
    assert!(matches!(err, SessionError::ValidationRejected(_)));
    assert!(!engine.is_locked());
    assert!(engine.last_error().is_none());
    assert_eq!(api.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn level_up_switches_pools_with_a_single_refill() {
    let l5 = Tier::Level(level(5));
    let l6 = Tier::Level(level(6));
    let api = scripted(adaptive_start(5, vec![question(1, l5), question(2, l5)]));
    api.push_batch(l6, vec![question(60, l6), question(61, l6)]);
    let sounds = Arc::new(RecordingSounds::default());
    let mut engine = engine(&api).with_sounds(sounds.clone());
    engine.start(CODE).await.unwrap();

    let result = committed(engine.submit(&answer(1), 1.0, false).await.unwrap());
    assert_eq!(result.score_delta, 23);
    assert_eq!(result.transition, Some(Transition::Up));
    assert_eq!(result.tier_before, l5);
    assert_eq!(result.tier_after, l6);
    assert_eq!(engine.level(), Some(level(6)));
    assert_eq!(engine.xp(), Some(0));
    assert_eq!(engine.focus(), Some(l6));
    assert!(engine.is_prefetching(l6));

    assert!(engine.advance().unwrap());
    assert!(!engine.advance().unwrap());
    let settled = settle(&mut engine).await;
    assert_eq!(settled.tier, l6);
    assert_eq!(settled.added, 2);

    let current = engine.current_question().unwrap();
    assert_eq!(current.word_mastery_id, WordMasteryId::new(60));
    assert_eq!(api.fetch_count(l6), 1);
    assert_eq!(
        sounds.played(),
        vec![SoundEffect::Correct, SoundEffect::LevelUp]
    );
}

#[tokio::test(start_paused = true)]
async fn wrong_answer_at_zero_xp_drops_a_level() {
    let l5 = Tier::Level(level(5));
    let l4 = Tier::Level(level(4));
    let api = scripted(adaptive_start(5, vec![question(1, l5), question(2, l5)]));
    api.push_batch(l4, vec![question(40, l4)]);
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let result = committed(engine.submit("decoy-a", 3.0, false).await.unwrap());
    assert!(!result.is_correct);
    assert_eq!(result.transition, Some(Transition::Down));
    assert_eq!(engine.level(), Some(level(4)));
    assert_eq!(engine.xp(), Some(4));
    assert_eq!(engine.combo().consecutive_wrong, 1);
    assert_eq!(api.fetch_count(l4), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_question_is_submitted_once_as_a_timeout() {
    let l5 = Tier::Level(level(5));
    let mut q = question(1, l5);
    q.timer_seconds = Some(3);
    let api = scripted(adaptive_start(5, vec![q, question(2, l5)]));
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let mut ticks = Vec::new();
    loop {
        match engine.next_event().await {
            EngineEvent::Tick {
                kind: TimerKind::Question,
                seconds_left,
                ..
            } => ticks.push(seconds_left),
            EngineEvent::QuestionTimedOut => break,
            _ => {}
        }
    }
    assert_eq!(ticks, vec![2, 1, 0]);

    let result = committed(engine.submit_timeout().await.unwrap());
    assert!(result.is_timeout);
    assert!(!result.is_correct);
    assert_eq!(result.selected_answer, "");
    assert_eq!(engine.combo().combo, 0);

    let submits: Vec<_> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            ApiCall::Submit(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(submits.len(), 1);
    assert!(submits[0].is_timeout);
    assert!((submits[0].time_taken_seconds - 3.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn answering_stops_the_question_countdown() {
    let l5 = Tier::Level(level(5));
    let mut q = question(1, l5);
    q.timer_seconds = Some(2);
    let api = scripted(adaptive_start(5, vec![q]));
    let config = EngineConfig::default().with_session_time_limit(Some(6));
    let mut engine = engine_with(&api, config);
    engine.start(CODE).await.unwrap();

    engine.submit(&answer(1), 0.5, false).await.unwrap();
    loop {
        match engine.next_event().await {
            EngineEvent::QuestionTimedOut => panic!("answered question timed out"),
            EngineEvent::SessionTimeUp => break,
            _ => {}
        }
    }
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_limit_raises_time_up() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, vec![question(1, l5)]));
    let config = EngineConfig::default().with_session_time_limit(Some(3));
    let mut engine = engine_with(&api, config);
    engine.start(CODE).await.unwrap();

    let mut session_ticks = 0;
    loop {
        match engine.next_event().await {
            EngineEvent::Tick {
                kind: TimerKind::Session,
                ..
            } => session_ticks += 1,
            EngineEvent::SessionTimeUp => break,
            EngineEvent::QuestionTimedOut => panic!("question timer ran out first"),
            _ => {}
        }
    }
    assert_eq!(session_ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn terminal_stage_word_is_mastered_and_retired() {
    let s5 = Tier::Stage(stage(5));
    let mut first = question(1, s5);
    first.required_streak = Some(1);
    let api = scripted(fixed_stage_start(5, vec![first, question(2, s5)]));
    let sounds = Arc::new(RecordingSounds::default());
    let mut engine = engine(&api).with_sounds(sounds.clone());
    engine.start(CODE).await.unwrap();

    let result = committed(engine.submit(&answer(1), 2.0, false).await.unwrap());
    assert!(result.mastered);
    assert_eq!(result.score_delta, 1);
    assert_eq!(result.tier_after, s5);
    assert!(engine.is_mastered(WordMasteryId::new(1)));
    assert_eq!(engine.score(), 1);
    assert_eq!(
        sounds.played(),
        vec![SoundEffect::Correct, SoundEffect::Mastered]
    );

    engine.advance().unwrap();
    let next = engine.current_question().unwrap();
    assert_eq!(next.word_mastery_id, WordMasteryId::new(2));
    assert_eq!(engine.focus(), Some(s5));
}

#[tokio::test(start_paused = true)]
async fn stage_streak_advances_a_word_without_moving_the_session() {
    let s2 = Tier::Stage(stage(2));
    let mut q = question(1, s2);
    q.required_streak = Some(1);
    let api = scripted(fixed_stage_start(2, vec![q, question(2, s2)]));
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let result = committed(engine.submit(&answer(1), 2.0, false).await.unwrap());
    assert_eq!(result.transition, Some(Transition::Up));
    assert_eq!(result.tier_after, Tier::Stage(stage(3)));
    assert_eq!(
        engine.stage_of(WordMasteryId::new(1)).map(|s| (s.stage, s.streak)),
        Some((stage(3), 0))
    );
    assert_eq!(engine.focus(), Some(s2));

    let request = match api.calls().last() {
        Some(ApiCall::Submit(request)) => request.clone(),
        other => panic!("unexpected call {other:?}"),
    };
    assert_eq!(request.stage, Some(stage(2)));
}

async fn answer_and_refill(engine: &mut services::SessionEngine, text: &str) -> AnswerResult {
    let result = committed(engine.submit(text, 2.0, false).await.unwrap());
    assert!(engine.advance().unwrap());
    let settled = settle(engine).await;
    assert_eq!(settled.added, 1);
    result
}

#[tokio::test(start_paused = true)]
async fn word_builds_its_stage_streak_over_repeat_presentations() {
    let s2 = Tier::Stage(stage(2));
    let word = WordMasteryId::new(1);
    let mut q = question(1, s2);
    q.required_streak = Some(3);
    let api = scripted(fixed_stage_start(2, vec![q.clone()]));
    for _ in 0..5 {
        api.push_batch(s2, vec![q.clone()]);
    }
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    answer_and_refill(&mut engine, &answer(1)).await;
    assert_eq!(engine.stage_of(word).map(|s| (s.stage, s.streak)), Some((stage(2), 1)));
    answer_and_refill(&mut engine, &answer(1)).await;
    assert_eq!(engine.stage_of(word).map(|s| (s.stage, s.streak)), Some((stage(2), 2)));

    let wrong = answer_and_refill(&mut engine, "decoy-a").await;
    assert_eq!(wrong.transition, None);
    assert_eq!(wrong.tier_after, s2);
    assert_eq!(engine.stage_of(word).map(|s| (s.stage, s.streak)), Some((stage(2), 0)));

    answer_and_refill(&mut engine, &answer(1)).await;
    answer_and_refill(&mut engine, &answer(1)).await;
    assert_eq!(engine.current_question().map(|q| q.word_mastery_id), Some(word));
    let third = committed(engine.submit(&answer(1), 2.0, false).await.unwrap());
    assert_eq!(third.transition, Some(Transition::Up));
    assert_eq!(third.tier_after, Tier::Stage(stage(3)));
    assert_eq!(engine.stage_of(word).map(|s| (s.stage, s.streak)), Some((stage(3), 0)));
    assert_eq!(engine.score(), 5);
    assert_eq!(api.fetch_count(s2), 5);
}

#[tokio::test(start_paused = true)]
async fn graded_answer_that_cannot_be_applied_stays_answered() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, Vec::new()));
    api.push_batch(l5, vec![question(1, Tier::Stage(stage(2)))]);
    api.set_answer(WordMasteryId::new(1), answer(1));
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();
    settle(&mut engine).await;

    let err = engine.submit(&answer(1), 2.0, false).await.unwrap_err();
    assert!(matches!(err, SessionError::Progression(_)));
    assert!(engine.is_locked());
    let held = engine.last_result().unwrap();
    assert!(held.is_correct);
    assert_eq!(held.score_delta, 0);
    assert_eq!(engine.level(), Some(level(5)));
    assert_eq!(engine.progress().total_answered, 1);

    let again = engine.submit(&answer(1), 2.0, false).await.unwrap();
    assert_eq!(again, SubmitStatus::Ignored);
    assert_eq!(api.submit_count(), 1);
    assert!(engine.advance().unwrap());
}

#[tokio::test(start_paused = true)]
async fn completed_session_refuses_further_work() {
    let l6 = Tier::Level(level(6));
    let api = scripted(adaptive_start(6, vec![question(1, l6), question(2, l6)]));
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let top = committed(engine.submit(&answer(1), 2.0, false).await.unwrap());
    assert_eq!(top.transition, None);
    assert_eq!(engine.xp(), Some(9));
    assert!(engine.advance().unwrap());
    engine.submit("decoy-b", 2.0, false).await.unwrap();
    assert_eq!(engine.xp(), Some(0));

    let summary = engine.complete().await.unwrap();
    assert_eq!(summary.total_answered, 2);
    assert_eq!(summary.correct_count, 1);
    assert!((summary.accuracy - 0.5).abs() < f64::EPSILON);
    assert_eq!(engine.completion(), Some(&summary));

    let again = engine.complete().await.unwrap_err();
    assert!(matches!(again, SessionError::AlreadyCompleted));
    let late = engine.submit(&answer(2), 1.0, false).await.unwrap_err();
    assert!(matches!(late, SessionError::AlreadyCompleted));

    let completes = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ApiCall::Complete(_)))
        .count();
    assert_eq!(completes, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_completion_can_be_retried() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, vec![question(1, l5)]));
    api.fail_next_completes(1);
    let mut engine = engine(&api);
    engine.start(CODE).await.unwrap();

    let err = engine.complete().await.unwrap_err();
    assert!(matches!(err, SessionError::Network(_)));
    assert!(engine.completion().is_none());
    assert!(engine.complete().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn exit_discards_the_session_and_its_refills() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, Vec::new()));
    api.set_fetch_delay(Duration::from_secs(5));
    api.push_batch(l5, vec![question(1, l5)]);
    api.push_batch(l5, vec![question(2, l5)]);
    let mut engine = engine(&api);

    engine.start(CODE).await.unwrap();
    assert!(engine.current_question().is_none());
    assert!(engine.is_prefetching(l5));

    engine.exit();
    assert!(engine.session().is_none());
    assert_eq!(engine.next_event().await, EngineEvent::Idle);
    let err = engine.submit(&answer(1), 1.0, false).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionNotFound));

    engine.start(CODE).await.unwrap();
    let settled = settle(&mut engine).await;
    assert_eq!(settled.added, 1);
    assert!(engine.current_question().is_some());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(engine.poll_prefetches().is_empty());
    assert_eq!(api.fetch_count(l5), 2);
}

#[tokio::test(start_paused = true)]
async fn unknown_access_code_is_a_network_error() {
    let api = scripted(adaptive_start(5, Vec::new()));
    let mut engine = engine(&api);

    let err = engine.start("WRONG").await.unwrap_err();
    assert!(matches!(err, SessionError::Network(_)));
    assert!(engine.session().is_none());
    assert_eq!(engine.take_error().as_deref(), Some(err.to_string().as_str()));
    assert!(engine.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn session_records_the_start_time_from_the_clock() {
    let l5 = Tier::Level(level(5));
    let api = scripted(adaptive_start(5, vec![question(1, l5)]));
    let mut engine = engine(&api).with_clock(Clock::fixed(fixed_now()));

    let session = engine.start(CODE).await.unwrap();
    assert_eq!(session.started_at(), fixed_now());
    assert_eq!(session.student_name(), "Robin");
    assert_eq!(
        engine.current_question().map(|q| q.word_mastery_id),
        Some(WordMasteryId::new(1))
    );
    assert_eq!(engine.question_timer().total, 20);
}
