mod context;
mod error;
mod loop_runner;
mod outcome;
mod service;

pub use context::{AttemptCeiling, AttemptRecord, LoopState};
pub use error::{LoopError, RequestValidationError};
pub use loop_runner::{LoopPhase, LoopRunner};
pub use outcome::{FailureReason, LoopOutcome};
pub use service::ExamVerifier;
