use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Question;

/// Recorded answers keyed by 0-based question index.
///
/// A missing key means the question was never answered; `None` is an
/// explicit "no answer" and is treated the same way when validating.
pub type AnswerMap = BTreeMap<usize, Option<String>>;

/// Everything persisted about one attempt, written as a single value so the
/// fields can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub attempt_id: Uuid,
    pub identity: String,
    #[serde(default)]
    pub answers: AnswerMap,
    pub time_remaining: u32,
    #[serde(default)]
    pub submitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<usize>,
}

impl SessionRecord {
    /// A new, unanswered attempt for `identity`.
    pub fn fresh(identity: &str, time_limit_secs: u32) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            identity: identity.to_string(),
            answers: AnswerMap::new(),
            time_remaining: time_limit_secs,
            submitted: false,
            final_score: None,
        }
    }
}

/// Loading condition of the question list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuestionsState {
    #[default]
    Loading,
    Ready(Vec<Question>),
    /// The fetch failed; carries the reason for display.
    Unavailable(String),
}

impl QuestionsState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Requested movement between questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    To(usize),
}

/// Outcome of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing changed; the countdown should stop.
    Halted,
    /// One second elapsed.
    Running { remaining: u32 },
    /// Time ran out and the attempt was locked.
    Expired(ScoreReport),
}

/// Final or live score of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreReport {
    pub score: usize,
    pub total: usize,
}

impl ScoreReport {
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.score as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Per-question row of the result breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    /// 1-based question number.
    pub number: usize,
    pub prompt: String,
    pub chosen: Option<String>,
    pub chosen_value: Option<String>,
    pub correct: String,
    pub correct_value: Option<String>,
    pub is_correct: bool,
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(3600), "60:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn test_record_json_shape() {
        let mut record = SessionRecord::fresh("alice", 3600);
        record.answers.insert(0, Some("A".to_string()));
        record.answers.insert(2, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["identity"], "alice");
        assert_eq!(json["timeRemaining"], 3600);
        assert_eq!(json["submitted"], false);
        assert_eq!(json["answers"]["0"], "A");
        assert!(json["answers"]["2"].is_null());
        assert!(json.get("finalScore").is_none());

        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(ScoreReport { score: 1, total: 4 }.percentage(), 25.0);
        assert_eq!(ScoreReport { score: 0, total: 0 }.percentage(), 0.0);
    }
}
