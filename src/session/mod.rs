//! Quiz session management.
//!
//! [`QuizSession`] is the single authority over one attempt: which answers
//! were recorded, how much time is left, and whether the attempt is locked.
//! Timing is driven from outside by calling [`QuizSession::tick`] once per
//! elapsed second.

mod error;
mod manager;
mod state;

pub use error::SessionError;
pub use manager::{
    DEFAULT_TIME_LIMIT_SECS, IDENTITY_KEY, IDENTITY_MAX_LENGTH, QuizSession, SESSION_KEY,
    validate_identity,
};
pub use state::{
    AnswerMap, Navigation, QuestionOutcome, QuestionsState, ScoreReport, SessionRecord, Tick,
    format_clock,
};
