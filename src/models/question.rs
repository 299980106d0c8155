use serde::{Deserialize, Serialize};

/// A selectable answer. The label is the canonical identity; the value is
/// only shown to the taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    pub value: String,
}

/// A single multiple-choice question. Its identifier is its position in the
/// bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<AnswerOption>,
    pub correct_answer: String,
}

impl Question {
    /// Whether `label` is the correct answer.
    pub fn is_correct(&self, label: &str) -> bool {
        self.correct_answer == label
    }

    /// Whether one of the options carries `label`.
    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|option| option.label == label)
    }

    /// Display value for `label`, if the question has such an option.
    pub fn option_value(&self, label: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.label == label)
            .map(|option| option.value.as_str())
    }

    /// Position of `label` within the options.
    pub fn option_position(&self, label: &str) -> Option<usize> {
        self.options.iter().position(|option| option.label == label)
    }
}

/// Wire shape returned by the question bank endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub data: Vec<Question>,
}
