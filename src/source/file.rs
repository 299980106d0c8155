use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::models::Question;

use super::{QuestionSource, SourceError, parse_bank};

/// Reads the question bank from a local JSON file.
#[derive(Debug, Clone)]
pub struct FileQuestionSource {
    path: PathBuf,
}

impl FileQuestionSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl QuestionSource for FileQuestionSource {
    async fn fetch_all(&self) -> Result<Vec<Question>, SourceError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let questions = parse_bank(&bytes)?;
        debug!(path = %self.path.display(), count = questions.len(), "loaded questions from file");
        Ok(questions)
    }
}
