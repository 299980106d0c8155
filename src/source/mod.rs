//! Question providers.
//!
//! A source hands back the ordered question list for one attempt. The order
//! is canonical: answers are keyed by position.

mod file;
mod http;

use std::io;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Question, QuestionBank};

pub use file::FileQuestionSource;
pub use http::HttpQuestionSource;

/// Default question bank endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pacmann-frontend.pacmann.workers.dev";

/// Errors surfaced while fetching questions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("question bank responded with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("failed to read question file: {0}")]
    Io(#[from] io::Error),

    #[error("malformed question payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("question bank is empty")]
    Empty,

    #[error("question {number} is invalid: {reason}")]
    Invalid { number: usize, reason: &'static str },
}

/// Provider of the question list.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch every question, in order.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the questions cannot be fetched or the
    /// payload is not a usable question bank.
    async fn fetch_all(&self) -> Result<Vec<Question>, SourceError>;
}

/// Parse and validate a `{ "data": [...] }` payload.
pub fn parse_bank(payload: &[u8]) -> Result<Vec<Question>, SourceError> {
    let bank: QuestionBank = serde_json::from_slice(payload)?;
    validate(bank.data)
}

fn validate(questions: Vec<Question>) -> Result<Vec<Question>, SourceError> {
    if questions.is_empty() {
        return Err(SourceError::Empty);
    }

    for (index, question) in questions.iter().enumerate() {
        if question.options.is_empty() {
            return Err(SourceError::Invalid {
                number: index + 1,
                reason: "no options",
            });
        }
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bank() {
        let payload = br#"{"data":[{"question":"2 * 3 = ?","options":[{"label":"A","value":"5"},{"label":"B","value":"6"}],"correctAnswer":"B"}]}"#;
        let questions = parse_bank(payload).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "2 * 3 = ?");
    }

    #[test]
    fn test_parse_rejects_empty_bank() {
        let err = parse_bank(br#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, SourceError::Empty));
    }

    #[test]
    fn test_parse_rejects_question_without_options() {
        let payload = br#"{"data":[{"question":"?","options":[],"correctAnswer":"A"}]}"#;
        let err = parse_bank(payload).unwrap_err();
        assert!(matches!(err, SourceError::Invalid { number: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_bank(br#"[{"question":"?"}]"#).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
