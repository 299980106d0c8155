use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::models::Question;
use crate::source::{QuestionSource, SourceError};
use crate::store::{SessionStore, StoreError};

use super::error::SessionError;
use super::state::{
    AnswerMap, Navigation, QuestionOutcome, QuestionsState, ScoreReport, SessionRecord, Tick,
    format_clock,
};

/// Store key of the logged-in name.
pub const IDENTITY_KEY: &str = "userName";

/// Store key of the serialized [`SessionRecord`].
pub const SESSION_KEY: &str = "quizSession";

/// Time allowed for a fresh attempt.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 3600;

pub const IDENTITY_MAX_LENGTH: usize = 32;

/// Validates a login name and returns it trimmed.
pub fn validate_identity(name: &str) -> Result<&str, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("name must not be empty");
    }

    if trimmed.chars().count() > IDENTITY_MAX_LENGTH {
        return Err("name must be at most 32 characters");
    }

    Ok(trimmed)
}

/// State machine for one quiz attempt.
pub struct QuizSession {
    store: Arc<dyn SessionStore>,
    record: SessionRecord,
    questions: QuestionsState,
    current_index: usize,
    terminated: bool,
}

impl QuizSession {
    /// Record `name` as the logged-in taker and open their attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidIdentity` for a blank or overlong name,
    /// or a store error if the identity cannot be written.
    pub fn login(
        store: Arc<dyn SessionStore>,
        name: &str,
        time_limit_secs: u32,
    ) -> Result<Self, SessionError> {
        let identity = validate_identity(name).map_err(SessionError::InvalidIdentity)?;
        store.set(IDENTITY_KEY, identity)?;
        info!(identity, "logged in");
        Self::initialize_with_limit(store, time_limit_secs)
    }

    /// Open the attempt of the logged-in taker with the default time limit.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::initialize_with_limit`].
    pub fn initialize(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        Self::initialize_with_limit(store, DEFAULT_TIME_LIMIT_SECS)
    }

    /// Open the attempt of the logged-in taker.
    ///
    /// Restores the stored session when one exists for this taker. Otherwise
    /// a fresh attempt with `time_limit_secs` on the clock is persisted right
    /// away. A stored record that does not parse, or that belongs to someone
    /// else, is replaced.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unauthenticated` when nobody is logged in, or a
    /// store error if the store cannot be read or written.
    pub fn initialize_with_limit(
        store: Arc<dyn SessionStore>,
        time_limit_secs: u32,
    ) -> Result<Self, SessionError> {
        let identity = store
            .get(IDENTITY_KEY)?
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(SessionError::Unauthenticated)?;

        let restored = match store.get(SESSION_KEY)? {
            Some(raw) => match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) if record.identity == identity => Some(record),
                Ok(record) => {
                    info!(
                        stored = %record.identity,
                        identity = %identity,
                        "stored session belongs to another user, starting fresh"
                    );
                    None
                }
                Err(err) => {
                    warn!(error = %err, "stored session is malformed, starting fresh");
                    None
                }
            },
            None => None,
        };

        let is_restored = restored.is_some();
        let record =
            restored.unwrap_or_else(|| SessionRecord::fresh(&identity, time_limit_secs));

        let mut session = Self {
            store,
            record,
            questions: QuestionsState::Loading,
            current_index: 0,
            terminated: false,
        };

        if is_restored {
            info!(
                attempt = %session.record.attempt_id,
                answered = session.record.answers.len(),
                time_remaining = session.record.time_remaining,
                submitted = session.record.submitted,
                "restored session"
            );
            if !session.record.submitted && session.record.time_remaining == 0 {
                info!(attempt = %session.record.attempt_id, "time ran out while away, locking");
                session.lock()?;
            }
        } else {
            info!(
                attempt = %session.record.attempt_id,
                time_limit_secs,
                "started new attempt"
            );
            session.persist()?;
        }

        Ok(session)
    }

    /// Fetch questions from `source` and keep them for this attempt.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::apply_questions`].
    pub async fn load_questions(
        &mut self,
        source: &dyn QuestionSource,
    ) -> Result<usize, SessionError> {
        let result = source.fetch_all().await;
        self.apply_questions(result)
    }

    /// Install the result of a question fetch.
    ///
    /// Once questions are loaded they stay fixed for the attempt; later
    /// results are ignored. Returns the question count.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuestionsUnavailable` when the fetch failed.
    /// Recorded answers are left untouched.
    pub fn apply_questions(
        &mut self,
        result: Result<Vec<Question>, SourceError>,
    ) -> Result<usize, SessionError> {
        if let QuestionsState::Ready(questions) = &self.questions {
            debug!("questions already loaded, ignoring reload");
            return Ok(questions.len());
        }

        match result {
            Ok(questions) => {
                let count = questions.len();
                self.questions = QuestionsState::Ready(questions);
                self.current_index = self.current_index.min(count.saturating_sub(1));
                info!(count, "questions loaded");

                // Refresh the stored final score now that it can be counted.
                if self.record.submitted && !self.terminated {
                    self.update(|_| {})?;
                }
                Ok(count)
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(error = %reason, "questions unavailable");
                self.questions = QuestionsState::Unavailable(reason.clone());
                Err(SessionError::QuestionsUnavailable(reason))
            }
        }
    }

    /// Record `label` as the answer to question `index`.
    ///
    /// Does nothing once the attempt is locked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` or
    /// `SessionError::UnknownOption` for a bad target, `Terminated` after
    /// logout, or a store error if the session cannot be saved.
    pub fn select_answer(&mut self, index: usize, label: &str) -> Result<(), SessionError> {
        self.ensure_active()?;

        if self.record.submitted {
            debug!(index, "answers are locked, ignoring selection");
            return Ok(());
        }

        let count = self.question_count();
        let known = self
            .questions()
            .get(index)
            .ok_or(SessionError::IndexOutOfRange { index, count })?
            .has_option(label);
        if !known {
            return Err(SessionError::UnknownOption {
                number: index + 1,
                label: label.to_string(),
            });
        }

        self.update(|record| {
            record.answers.insert(index, Some(label.to_string()));
        })?;
        debug!(index, label, "answer recorded");
        Ok(())
    }

    /// Move between questions, clamping to the loaded range. Returns the new
    /// index.
    pub fn navigate(&mut self, navigation: Navigation) -> usize {
        let last = self.question_count().saturating_sub(1);
        let target = match navigation {
            Navigation::Next => self.current_index.saturating_add(1),
            Navigation::Previous => self.current_index.saturating_sub(1),
            Navigation::To(index) => index,
        };
        self.current_index = target.min(last);
        self.current_index
    }

    /// Advance the countdown by one second.
    ///
    /// Reaching zero locks the attempt with whatever answers it holds.
    ///
    /// # Errors
    ///
    /// Returns a store error if the new time cannot be saved. The countdown
    /// does not advance in that case.
    pub fn tick(&mut self) -> Result<Tick, SessionError> {
        if self.terminated || self.record.submitted || self.record.time_remaining == 0 {
            return Ok(Tick::Halted);
        }

        let remaining = self.record.time_remaining - 1;
        trace!(remaining, "tick");

        if remaining == 0 {
            self.update(|record| {
                record.time_remaining = 0;
                record.submitted = true;
            })?;
            let report = self.score();
            info!(
                attempt = %self.record.attempt_id,
                score = report.score,
                total = report.total,
                "time expired, attempt locked"
            );
            return Ok(Tick::Expired(report));
        }

        self.update(|record| record.time_remaining = remaining)?;
        Ok(Tick::Running { remaining })
    }

    /// Lock the attempt and score it.
    ///
    /// Once locked, repeated calls return the same score without checking
    /// completeness again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IncompleteSubmission` with the 1-based numbers
    /// of unanswered questions, `QuestionsUnavailable` while there is nothing
    /// to answer, `Terminated` after logout, or a store error.
    pub fn submit(&mut self) -> Result<ScoreReport, SessionError> {
        self.ensure_active()?;

        if self.record.submitted {
            return Ok(self.score());
        }

        match &self.questions {
            QuestionsState::Ready(_) => {}
            QuestionsState::Loading => {
                return Err(SessionError::QuestionsUnavailable(
                    "questions are still loading".to_string(),
                ));
            }
            QuestionsState::Unavailable(reason) => {
                return Err(SessionError::QuestionsUnavailable(reason.clone()));
            }
        }

        let missing = self.missing_questions();
        if !missing.is_empty() {
            debug!(?missing, "submission incomplete");
            return Err(SessionError::IncompleteSubmission { missing });
        }

        let report = self.lock()?;
        info!(
            attempt = %self.record.attempt_id,
            score = report.score,
            total = report.total,
            "attempt submitted"
        );
        Ok(report)
    }

    /// End the attempt and log out, clearing everything from the store.
    ///
    /// The manager is unusable afterwards: ticks halt and mutations fail with
    /// `Terminated`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the keys cannot be removed.
    pub fn terminate(&mut self) -> Result<(), SessionError> {
        self.terminated = true;
        self.store.remove(SESSION_KEY)?;
        self.store.remove(IDENTITY_KEY)?;
        info!(attempt = %self.record.attempt_id, identity = %self.record.identity, "session terminated");
        Ok(())
    }

    pub fn identity(&self) -> &str {
        &self.record.identity
    }

    pub fn attempt_id(&self) -> Uuid {
        self.record.attempt_id
    }

    pub fn questions_state(&self) -> &QuestionsState {
        &self.questions
    }

    /// Loaded questions; empty until loading succeeds.
    pub fn questions(&self) -> &[Question] {
        match &self.questions {
            QuestionsState::Ready(questions) => questions,
            _ => &[],
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions().len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions().get(self.current_index)
    }

    /// The recorded label for `index`, if any. Empty labels count as no
    /// answer.
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.record
            .answers
            .get(&index)
            .and_then(|answer| answer.as_deref())
            .filter(|label| !label.is_empty())
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.record.answers
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.answer(index).is_some()
    }

    /// Number of loaded questions that have an answer.
    pub fn answered_count(&self) -> usize {
        (0..self.question_count())
            .filter(|index| self.is_answered(*index))
            .count()
    }

    /// 1-based numbers of loaded questions without an answer.
    pub fn missing_questions(&self) -> Vec<usize> {
        (0..self.question_count())
            .filter(|index| !self.is_answered(*index))
            .map(|index| index + 1)
            .collect()
    }

    pub fn time_remaining(&self) -> u32 {
        self.record.time_remaining
    }

    pub fn is_submitted(&self) -> bool {
        self.record.submitted
    }

    /// Time left as `MM:SS`.
    pub fn format_time_left(&self) -> String {
        format_clock(self.record.time_remaining)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Count of questions whose recorded answer matches the correct label.
    pub fn score(&self) -> ScoreReport {
        let questions = self.questions();
        let score = questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                self.answer(*index)
                    .is_some_and(|label| question.is_correct(label))
            })
            .count();

        ScoreReport {
            score,
            total: questions.len(),
        }
    }

    /// Per-question breakdown for the result view.
    pub fn outcomes(&self) -> Vec<QuestionOutcome> {
        self.questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let chosen = self.answer(index);
                QuestionOutcome {
                    number: index + 1,
                    prompt: question.question.clone(),
                    chosen: chosen.map(str::to_string),
                    chosen_value: chosen
                        .and_then(|label| question.option_value(label))
                        .map(str::to_string),
                    correct: question.correct_answer.clone(),
                    correct_value: question
                        .option_value(&question.correct_answer)
                        .map(str::to_string),
                    is_correct: chosen.is_some_and(|label| question.is_correct(label)),
                }
            })
            .collect()
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.terminated {
            Err(SessionError::Terminated)
        } else {
            Ok(())
        }
    }

    fn lock(&mut self) -> Result<ScoreReport, SessionError> {
        self.update(|record| record.submitted = true)?;
        Ok(self.score())
    }

    /// Apply `change` to the record and save it. A failed save restores the
    /// previous record, so memory never runs ahead of the store.
    fn update<F>(&mut self, change: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let previous = self.record.clone();
        change(&mut self.record);

        if let Err(err) = self.persist() {
            warn!(attempt = %previous.attempt_id, error = %err, "could not save session, keeping previous state");
            self.record = previous;
            return Err(err);
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), SessionError> {
        if self.record.submitted && self.questions.is_ready() {
            self.record.final_score = Some(self.score().score);
        }

        let raw = serde_json::to_string(&self.record).map_err(StoreError::from)?;
        self.store.set(SESSION_KEY, &raw)?;
        Ok(())
    }
}
