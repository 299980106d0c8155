use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyCode;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::session::{IDENTITY_MAX_LENGTH, Navigation, QuizSession, SessionError};
use crate::source::QuestionSource;
use crate::store::SessionStore;
use crate::timer::{Countdown, SharedSession};

/// Columns in the question jump grid.
pub const SIDEBAR_COLUMNS: usize = 5;

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Which screen is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Login gate, shown whenever nobody is logged in.
    Login { input: String, error: Option<String> },
    Quiz,
    Result { scroll: usize },
}

impl Screen {
    pub fn login() -> Self {
        Self::Login {
            input: String::new(),
            error: None,
        }
    }
}

/// Modal drawn over the quiz screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    /// "Finish the quiz?" prompt.
    ConfirmSubmit,
    /// Submission refused; carries 1-based question numbers.
    Incomplete(Vec<usize>),
    /// Question jump grid with its cursor.
    Sidebar { cursor: usize },
}

/// Terminal binding over one [`QuizSession`].
pub struct App {
    pub screen: Screen,
    pub overlay: Overlay,
    config: Config,
    store: Arc<dyn SessionStore>,
    source: Arc<dyn QuestionSource>,
    session: Option<SharedSession>,
    countdown: Option<Countdown>,
    loader: Option<JoinHandle<()>>,
    option_cursor: usize,
    notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        source: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            screen: Screen::login(),
            overlay: Overlay::None,
            config,
            store,
            source,
            session: None,
            countdown: None,
            loader: None,
            option_cursor: 0,
            notice: None,
            should_quit: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> Option<&SharedSession> {
        self.session.as_ref()
    }

    pub fn option_cursor(&self) -> usize {
        self.option_cursor
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown.as_ref().is_some_and(|c| !c.is_finished())
    }

    /// Reopen the stored attempt, or fall back to the login gate.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the saved session cannot be read or
    /// written.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        match QuizSession::initialize_with_limit(Arc::clone(&self.store), self.config.time_limit_secs)
        {
            Ok(session) => self.start_attempt(session),
            Err(SessionError::Unauthenticated) => {
                info!("no login record, showing login");
                self.screen = Screen::login();
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// Log in as `name` and open their attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the name is invalid or the store fails.
    pub fn login(&mut self, name: &str) -> Result<(), SessionError> {
        let session =
            QuizSession::login(Arc::clone(&self.store), name, self.config.time_limit_secs)?;
        self.start_attempt(session);
        Ok(())
    }

    /// Wait for the background question fetch, retries included.
    pub async fn finish_loading(&mut self) {
        if let Some(loader) = self.loader.take() {
            if let Err(err) = loader.await {
                warn!(error = %err, "question loader did not finish");
            }
        }
    }

    /// Pick up changes made by the countdown.
    pub async fn sync(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };

        if self.screen == Screen::Quiz && session.lock().await.is_submitted() {
            info!("attempt locked by countdown, showing results");
            self.countdown = None;
            self.overlay = Overlay::None;
            self.notice = Some("Time is up. Your answers were submitted.".to_string());
            self.screen = Screen::Result { scroll: 0 };
        }
    }

    /// Handle a key press. Returns true if the app should exit.
    pub async fn handle_key(&mut self, key: KeyCode) -> bool {
        match self.screen {
            Screen::Login { .. } => self.handle_login_key(key),
            Screen::Quiz => self.handle_quiz_key(key).await,
            Screen::Result { .. } => self.handle_result_key(key).await,
        }
        self.should_quit
    }

    /// End the attempt, clear the store, and return to the login gate.
    pub async fn logout(&mut self) {
        self.stop_tasks();

        let mut error = None;
        if let Some(session) = self.session.take() {
            if let Err(err) = session.lock().await.terminate() {
                warn!(error = %err, "failed to clear session");
                error = Some(err.to_string());
            }
        }

        self.overlay = Overlay::None;
        self.notice = None;
        self.option_cursor = 0;
        self.screen = Screen::Login {
            input: String::new(),
            error,
        };
    }

    /// Stop background work without touching stored progress.
    pub fn shutdown(&mut self) {
        self.stop_tasks();
    }

    fn start_attempt(&mut self, session: QuizSession) {
        self.stop_tasks();

        let submitted = session.is_submitted();
        let shared: SharedSession = Arc::new(Mutex::new(session));

        self.loader = Some(spawn_loader(
            Arc::clone(&shared),
            Arc::clone(&self.source),
            self.config.fetch_retries,
        ));
        if !submitted {
            self.countdown = Some(Countdown::start(Arc::clone(&shared)));
        }

        self.session = Some(shared);
        self.overlay = Overlay::None;
        self.notice = None;
        self.option_cursor = 0;
        self.screen = if submitted {
            Screen::Result { scroll: 0 }
        } else {
            Screen::Quiz
        };
    }

    fn stop_tasks(&mut self) {
        self.countdown = None;
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
    }

    fn handle_login_key(&mut self, key: KeyCode) {
        let Screen::Login { input, error } = &mut self.screen else {
            return;
        };

        match key {
            KeyCode::Char(c) => {
                *error = None;
                if input.chars().count() < IDENTITY_MAX_LENGTH {
                    input.push(c);
                }
            }
            KeyCode::Backspace => {
                *error = None;
                input.pop();
            }
            KeyCode::Enter => {
                let name = input.clone();
                if let Err(err) = self.login(&name) {
                    if let Screen::Login { error, .. } = &mut self.screen {
                        *error = Some(err.to_string());
                    }
                }
            }
            KeyCode::Esc => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    async fn handle_quiz_key(&mut self, key: KeyCode) {
        match self.overlay.clone() {
            Overlay::ConfirmSubmit => match key {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => self.submit().await,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.overlay = Overlay::None;
                }
                _ => {}
            },
            Overlay::Incomplete(_) => {
                if matches!(key, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                    self.overlay = Overlay::None;
                }
            }
            Overlay::Sidebar { cursor } => self.handle_sidebar_key(key, cursor).await,
            Overlay::None => match key {
                KeyCode::Up | KeyCode::Char('k') => self.move_option_cursor(false).await,
                KeyCode::Down | KeyCode::Char('j') => self.move_option_cursor(true).await,
                KeyCode::Enter | KeyCode::Char(' ') => self.select_at_cursor().await,
                KeyCode::Left | KeyCode::Char('h') => self.navigate(Navigation::Previous).await,
                KeyCode::Right | KeyCode::Char('l') => self.navigate(Navigation::Next).await,
                KeyCode::Tab => {
                    if let Some(session) = &self.session {
                        let cursor = session.lock().await.current_index();
                        self.overlay = Overlay::Sidebar { cursor };
                    }
                }
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    self.notice = None;
                    self.overlay = Overlay::ConfirmSubmit;
                }
                KeyCode::Char('x') | KeyCode::Char('X') => self.logout().await,
                KeyCode::Char('q') | KeyCode::Char('Q') => {
                    self.should_quit = true;
                }
                _ => {}
            },
        }
    }

    async fn handle_sidebar_key(&mut self, key: KeyCode, cursor: usize) {
        let Some(session) = self.session.clone() else {
            self.overlay = Overlay::None;
            return;
        };
        let last = session.lock().await.question_count().saturating_sub(1);

        let moved = match key {
            KeyCode::Left | KeyCode::Char('h') => cursor.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => cursor + 1,
            KeyCode::Up | KeyCode::Char('k') => cursor.saturating_sub(SIDEBAR_COLUMNS),
            KeyCode::Down | KeyCode::Char('j') => cursor + SIDEBAR_COLUMNS,
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.overlay = Overlay::None;
                self.navigate(Navigation::To(cursor)).await;
                return;
            }
            KeyCode::Tab | KeyCode::Esc => {
                self.overlay = Overlay::None;
                return;
            }
            _ => cursor,
        };

        self.overlay = Overlay::Sidebar {
            cursor: moved.min(last),
        };
    }

    async fn handle_result_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                let count = match &self.session {
                    Some(session) => session.lock().await.question_count(),
                    None => 0,
                };
                if let Screen::Result { scroll } = &mut self.screen {
                    *scroll = (*scroll + 1).min(count.saturating_sub(1));
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Screen::Result { scroll } = &mut self.screen {
                    *scroll = scroll.saturating_sub(1);
                }
            }
            KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => self.logout().await,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    async fn navigate(&mut self, navigation: Navigation) {
        let Some(shared) = self.session.clone() else {
            return;
        };
        let mut session = shared.lock().await;
        let index = session.navigate(navigation);

        // Put the cursor on the recorded answer, if there is one.
        self.option_cursor = session
            .answer(index)
            .and_then(|label| session.questions().get(index)?.option_position(label))
            .unwrap_or(0);
        debug!(index, "navigated");
    }

    async fn move_option_cursor(&mut self, forward: bool) {
        let Some(shared) = self.session.clone() else {
            return;
        };
        let count = shared
            .lock()
            .await
            .current_question()
            .map_or(0, |question| question.options.len());
        if count == 0 {
            return;
        }

        self.option_cursor = if forward {
            (self.option_cursor + 1) % count
        } else {
            (self.option_cursor + count - 1) % count
        };
    }

    async fn select_at_cursor(&mut self) {
        let Some(shared) = self.session.clone() else {
            return;
        };
        let mut session = shared.lock().await;

        let index = session.current_index();
        let Some(label) = session
            .current_question()
            .and_then(|question| question.options.get(self.option_cursor))
            .map(|option| option.label.clone())
        else {
            return;
        };

        if let Err(err) = session.select_answer(index, &label) {
            warn!(error = %err, index, "could not record answer");
            self.notice = Some(err.to_string());
        }
    }

    async fn submit(&mut self) {
        self.overlay = Overlay::None;
        let Some(shared) = self.session.clone() else {
            return;
        };

        let result = shared.lock().await.submit();
        match result {
            Ok(report) => {
                debug!(score = report.score, total = report.total, "showing results");
                self.countdown = None;
                self.notice = None;
                self.screen = Screen::Result { scroll: 0 };
            }
            Err(SessionError::IncompleteSubmission { missing }) => {
                self.overlay = Overlay::Incomplete(missing);
            }
            Err(err) => {
                self.notice = Some(err.to_string());
            }
        }
    }
}

/// Fetch questions in the background so answering and navigating never wait
/// on the network.
fn spawn_loader(
    session: SharedSession,
    source: Arc<dyn QuestionSource>,
    retries: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt = 0;
        loop {
            let result = source.fetch_all().await;
            let outcome = session.lock().await.apply_questions(result);

            match outcome {
                Ok(_) => return,
                Err(err) if attempt < retries => {
                    attempt += 1;
                    warn!(attempt, retries, error = %err, "question fetch failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) => {
                    warn!(error = %err, "question fetch failed, giving up");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::{AnswerOption, Question};
    use crate::session::{IDENTITY_KEY, SESSION_KEY};
    use crate::source::SourceError;
    use crate::store::{MemoryStore, StoreError};

    struct UnreadableStore;

    impl SessionStore for UnreadableStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::other("permission denied").into())
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct StaticSource {
        questions: Vec<Question>,
    }

    #[async_trait]
    impl QuestionSource for StaticSource {
        async fn fetch_all(&self) -> Result<Vec<Question>, SourceError> {
            Ok(self.questions.clone())
        }
    }

    /// Fails a fixed number of times, then serves questions.
    struct FlakySource {
        failures: usize,
        calls: AtomicUsize,
        questions: Vec<Question>,
    }

    #[async_trait]
    impl QuestionSource for FlakySource {
        async fn fetch_all(&self) -> Result<Vec<Question>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(SourceError::Empty)
            } else {
                Ok(self.questions.clone())
            }
        }
    }

    fn question(correct: &str) -> Question {
        Question {
            question: format!("pick {}", correct),
            options: ["A", "B", "C"]
                .iter()
                .map(|label| AnswerOption {
                    label: label.to_string(),
                    value: label.to_lowercase(),
                })
                .collect(),
            correct_answer: correct.to_string(),
        }
    }

    fn app_with(store: Arc<dyn SessionStore>, correct: &[&str]) -> App {
        let source = Arc::new(StaticSource {
            questions: correct.iter().map(|c| question(c)).collect(),
        });
        App::new(Config::default(), store, source)
    }

    async fn type_name(app: &mut App, name: &str) {
        for c in name.chars() {
            app.handle_key(KeyCode::Char(c)).await;
        }
        app.handle_key(KeyCode::Enter).await;
    }

    #[tokio::test]
    async fn test_resume_without_login_shows_gate() {
        let mut app = app_with(Arc::new(MemoryStore::new()), &["A"]);
        app.resume().unwrap();
        assert_eq!(app.screen, Screen::login());
        assert!(app.session().is_none());
    }

    #[tokio::test]
    async fn test_resume_surfaces_store_failure() {
        let mut app = app_with(Arc::new(UnreadableStore), &["A"]);
        let err = app.resume().unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));
        assert!(app.session().is_none());
        assert!(!app.is_counting_down());
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let mut app = app_with(Arc::new(MemoryStore::new()), &["A"]);
        app.resume().unwrap();
        app.handle_key(KeyCode::Char(' ')).await;
        app.handle_key(KeyCode::Enter).await;

        match &app.screen {
            Screen::Login { error, .. } => assert!(error.is_some()),
            other => panic!("expected login screen, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_attempt_through_keys() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let mut app = app_with(Arc::clone(&store), &["A", "B"]);
        app.resume().unwrap();
        type_name(&mut app, "alice").await;
        assert_eq!(app.screen, Screen::Quiz);
        assert!(app.is_counting_down());
        app.finish_loading().await;

        // Answer question 1 with "A", then try to submit early.
        app.handle_key(KeyCode::Enter).await;
        app.handle_key(KeyCode::Char('s')).await;
        assert_eq!(app.overlay, Overlay::ConfirmSubmit);
        app.handle_key(KeyCode::Char('y')).await;
        assert_eq!(app.overlay, Overlay::Incomplete(vec![2]));
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.overlay, Overlay::None);

        // Question 2: move to "B" and answer.
        app.handle_key(KeyCode::Right).await;
        app.handle_key(KeyCode::Down).await;
        app.handle_key(KeyCode::Enter).await;

        app.handle_key(KeyCode::Char('s')).await;
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.screen, Screen::Result { scroll: 0 });
        assert!(!app.is_counting_down());

        let report = app.session().unwrap().lock().await.score();
        assert_eq!((report.score, report.total), (2, 2));

        // Back to start clears everything.
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.screen, Screen::login());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        assert_eq!(store.get(IDENTITY_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_quit_keeps_progress_for_resume() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let mut app = app_with(Arc::clone(&store), &["A", "B", "C"]);
        app.resume().unwrap();
        type_name(&mut app, "alice").await;
        app.finish_loading().await;

        app.handle_key(KeyCode::Right).await;
        app.handle_key(KeyCode::Down).await;
        app.handle_key(KeyCode::Down).await;
        app.handle_key(KeyCode::Enter).await;
        assert!(app.handle_key(KeyCode::Char('q')).await);
        app.shutdown();

        let mut resumed = app_with(Arc::clone(&store), &["A", "B", "C"]);
        resumed.resume().unwrap();
        assert_eq!(resumed.screen, Screen::Quiz);
        resumed.finish_loading().await;

        let session = resumed.session().unwrap().lock().await;
        assert_eq!(session.identity(), "alice");
        assert_eq!(session.answer(1), Some("C"));
    }

    #[tokio::test]
    async fn test_sidebar_jump_restores_cursor() {
        let mut app = app_with(Arc::new(MemoryStore::new()), &["A", "B", "C"]);
        app.resume().unwrap();
        type_name(&mut app, "alice").await;
        app.finish_loading().await;

        // Answer question 3 with "B".
        app.handle_key(KeyCode::Tab).await;
        app.handle_key(KeyCode::Right).await;
        app.handle_key(KeyCode::Right).await;
        app.handle_key(KeyCode::Right).await;
        assert_eq!(app.overlay, Overlay::Sidebar { cursor: 2 });
        app.handle_key(KeyCode::Enter).await;
        app.handle_key(KeyCode::Down).await;
        app.handle_key(KeyCode::Enter).await;

        app.handle_key(KeyCode::Left).await;
        assert_eq!(app.option_cursor(), 0);

        app.handle_key(KeyCode::Tab).await;
        app.handle_key(KeyCode::Right).await;
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.session().unwrap().lock().await.current_index(), 2);
        assert_eq!(app.option_cursor(), 1);
    }

    #[tokio::test]
    async fn test_logout_from_quiz() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let mut app = app_with(Arc::clone(&store), &["A"]);
        app.resume().unwrap();
        type_name(&mut app, "alice").await;

        app.handle_key(KeyCode::Char('x')).await;
        assert_eq!(app.screen, Screen::login());
        assert!(!app.is_counting_down());
        assert_eq!(store.get(IDENTITY_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_submitted_attempt_resumes_on_results() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let mut app = app_with(Arc::clone(&store), &["A"]);
        app.resume().unwrap();
        type_name(&mut app, "alice").await;
        app.finish_loading().await;
        app.handle_key(KeyCode::Enter).await;
        app.handle_key(KeyCode::Char('s')).await;
        app.handle_key(KeyCode::Char('y')).await;
        app.shutdown();

        let mut resumed = app_with(store, &["A"]);
        resumed.resume().unwrap();
        assert_eq!(resumed.screen, Screen::Result { scroll: 0 });
        assert!(!resumed.is_counting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_retries_failed_fetch() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        store.set(IDENTITY_KEY, "alice").unwrap();
        let source = Arc::new(FlakySource {
            failures: 2,
            calls: AtomicUsize::new(0),
            questions: vec![question("A")],
        });
        let mut app = App::new(Config::default(), store, source);
        app.resume().unwrap();
        app.finish_loading().await;

        let session = app.session().unwrap().lock().await;
        assert_eq!(session.question_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_moves_to_results() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let source = Arc::new(StaticSource {
            questions: vec![question("A")],
        });
        let config = Config {
            time_limit_secs: 3,
            ..Config::default()
        };
        let mut app = App::new(config, store, source);
        app.resume().unwrap();
        app.login("alice").unwrap();
        app.finish_loading().await;

        tokio::time::sleep(Duration::from_secs(4)).await;
        app.sync().await;

        assert_eq!(app.screen, Screen::Result { scroll: 0 });
        assert!(app.notice().is_some());
    }
}
