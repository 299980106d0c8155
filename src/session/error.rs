use thiserror::Error;

use crate::store::StoreError;

/// Conditions reported by [`QuizSession`](super::QuizSession) operations.
///
/// None of these are fatal; each maps to something the presentation layer
/// can render.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no user is logged in")]
    Unauthenticated,

    #[error("invalid name: {0}")]
    InvalidIdentity(&'static str),

    #[error("questions are unavailable: {0}")]
    QuestionsUnavailable(String),

    #[error("question index {index} is out of range for {count} questions")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("question {number} has no option labelled {label:?}")]
    UnknownOption { number: usize, label: String },

    #[error("unanswered questions: {}", join_numbers(.missing))]
    IncompleteSubmission {
        /// 1-based question numbers, ascending.
        missing: Vec<usize>,
    },

    #[error("session has been terminated")]
    Terminated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join_numbers(numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
