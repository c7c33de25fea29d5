mod engine;
mod events;
mod submit;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use engine::SessionEngine;
pub use events::{EngineEvent, SubmitStatus};
