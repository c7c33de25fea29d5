mod answer;
mod ids;
mod question;
mod session;
mod tier;

pub use answer::AnswerResult;
pub use ids::{AssignmentId, ParseIdError, SessionId, WordMasteryId};
pub use question::{ContextMode, PromptData, Question, QuestionType, SpeechCue};
pub use session::{EngineVariant, Session, SessionProgress};
pub use tier::{Level, Stage, Tier, TierError};
