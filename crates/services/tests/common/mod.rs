#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use quiz_core::model::{
    AssignmentId, ContextMode, EngineVariant, Level, PromptData, Question, QuestionType,
    SessionId, Stage, Tier, WordMasteryId,
};
use services::api::StartResponse;
use services::{EngineConfig, ScriptedQuizApi, SessionEngine, SoundEffect, SoundEffects};

pub const CODE: &str = "ROOM-42";

pub fn level(n: u8) -> Level {
    Level::new(n).unwrap()
}

pub fn stage(n: u8) -> Stage {
    Stage::new(n).unwrap()
}

pub fn question(id: u64, tier: Tier) -> Question {
    Question {
        word_mastery_id: WordMasteryId::new(id),
        prompt_data: PromptData {
            word: format!("word{id}"),
            meaning: Some(format!("meaning{id}")),
            sentence: None,
        },
        tier,
        question_type: QuestionType::MeaningChoice,
        choices: vec![
            format!("answer{id}"),
            "decoy-a".into(),
            "decoy-b".into(),
            "decoy-c".into(),
        ],
        timer_seconds: Some(20),
        context_mode: ContextMode::Word,
        required_streak: None,
    }
}

pub fn answer(id: u64) -> String {
    format!("answer{id}")
}

pub fn adaptive_start(at: u8, questions: Vec<Question>) -> StartResponse {
    StartResponse {
        session_id: SessionId::random(),
        assignment_id: AssignmentId::new(7),
        student_name: "Robin".into(),
        engine_variant: EngineVariant::Adaptive,
        current_level: Some(level(at)),
        current_xp: Some(0),
        current_stage: None,
        available_levels: vec![level(4), level(5), level(6)],
        questions,
        per_question_time: Some(20),
        access_token: "token".into(),
    }
}

pub fn fixed_stage_start(at: u8, questions: Vec<Question>) -> StartResponse {
    StartResponse {
        session_id: SessionId::random(),
        assignment_id: AssignmentId::new(8),
        student_name: "Robin".into(),
        engine_variant: EngineVariant::FixedStage,
        current_level: None,
        current_xp: None,
        current_stage: Some(stage(at)),
        available_levels: Vec::new(),
        questions,
        per_question_time: Some(20),
        access_token: "token".into(),
    }
}

/// Scripted service whose answers are `answer{id}` for every question given.
pub fn scripted(start: StartResponse) -> ScriptedQuizApi {
    let api = ScriptedQuizApi::new(CODE, start.clone());
    for q in &start.questions {
        api.set_answer(q.word_mastery_id, answer(q.word_mastery_id.value()));
    }
    api
}

pub fn engine(api: &ScriptedQuizApi) -> SessionEngine {
    engine_with(api, EngineConfig::default())
}

pub fn engine_with(api: &ScriptedQuizApi, config: EngineConfig) -> SessionEngine {
    SessionEngine::new(Arc::new(api.clone()), config)
}

/// Records every effect that is played.
#[derive(Default)]
pub struct RecordingSounds {
    played: Mutex<Vec<SoundEffect>>,
}

impl RecordingSounds {
    pub fn played(&self) -> Vec<SoundEffect> {
        self.played.lock().unwrap().clone()
    }
}

impl SoundEffects for RecordingSounds {
    fn play(&self, effect: SoundEffect) {
        self.played.lock().unwrap().push(effect);
    }

    fn stop(&self, _effect: SoundEffect) {}
}
