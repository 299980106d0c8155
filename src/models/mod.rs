//! Quiz content types.

mod question;

pub use question::{AnswerOption, Question, QuestionBank};
