use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::models::Question;

use super::{QuestionSource, SourceError, parse_bank};

/// Fetches the question bank over HTTP.
#[derive(Debug, Clone)]
pub struct HttpQuestionSource {
    client: Client,
    endpoint: String,
}

impl HttpQuestionSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch_all(&self) -> Result<Vec<Question>, SourceError> {
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status));
        }

        let body = response.bytes().await?;
        let questions = parse_bank(&body)?;
        debug!(endpoint = %self.endpoint, count = questions.len(), "fetched questions");
        Ok(questions)
    }
}
