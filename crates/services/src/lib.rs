#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod feedback;
pub mod pool_manager;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;

pub use api::{ApiConfig, HttpQuizApi, QuizApi, ScriptedQuizApi, SessionCredentials};
pub use config::EngineConfig;
pub use error::{ApiError, ConfigError, SessionError};
pub use feedback::{Silent, SoundEffect, SoundEffects, SpeechPlayer};
pub use pool_manager::{PoolManager, PrefetchSettled};
pub use sessions::{EngineEvent, SessionEngine, SubmitStatus};
pub use timer::{CountdownTimer, TimerEvent, TimerKind, TimerSnapshot};
