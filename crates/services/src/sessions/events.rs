use quiz_core::model::AnswerResult;
use quiz_core::timer::{TimerCue, UrgencyBand};

use crate::pool_manager::PrefetchSettled;
use crate::timer::TimerKind;

/// Something the caller should react to, yielded by `SessionEngine::next_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A countdown moved; render `seconds_left`.
    Tick {
        kind: TimerKind,
        seconds_left: u32,
        band: UrgencyBand,
    },
    Cue { kind: TimerKind, cue: TimerCue },
    /// The question countdown reached zero while unanswered. Follows the
    /// zero tick; the caller answers it with `submit_timeout`.
    QuestionTimedOut,
    /// The whole-session countdown reached zero.
    SessionTimeUp,
    /// A background refill resolved. `added` is zero when it failed.
    PrefetchSettled(PrefetchSettled),
    /// No session is open.
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStatus {
    Committed(AnswerResult),
    /// The gate was locked; nothing was sent.
    Ignored,
}
