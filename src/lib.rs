//! # quiz-exam
//!
//! A timed multiple-choice quiz for the terminal. Takers log in with a name,
//! answer questions fetched from a JSON endpoint, and get a scored result.
//! Progress is saved after every answer and every second of the countdown,
//! so an attempt survives restarts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quiz_exam::{Config, FileStore, HttpQuestionSource, Quiz, QuizError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QuizError> {
//!     let config = Config::default();
//!     let store = Arc::new(FileStore::new(config.resolved_store_path()));
//!     let source = Arc::new(HttpQuestionSource::new(config.endpoint.clone()));
//!
//!     Quiz::new(config, store, source).run().await
//! }
//! ```
//!
//! The session logic can also be driven directly, without a terminal:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use quiz_exam::{MemoryStore, QuizSession, SessionStore};
//!
//! let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
//! let mut session = QuizSession::login(store, "alice", 3600).unwrap();
//! session.tick().unwrap();
//! assert_eq!(session.time_remaining(), 3599);
//! ```

mod app;
pub mod config;
mod models;
pub mod session;
pub mod source;
pub mod store;
pub mod terminal;
pub mod timer;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use thiserror::Error;
use tracing::info;

pub use app::{App, Overlay, Screen};
pub use config::{Config, ConfigStore, FileConfigStore};
pub use models::{AnswerOption, Question, QuestionBank};
pub use session::{QuizSession, ScoreReport, SessionError};
pub use source::{FileQuestionSource, HttpQuestionSource, QuestionSource, SourceError};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError};
pub use timer::{Countdown, SharedSession};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Error type for running the quiz.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    /// IO error while driving the terminal.
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),

    /// The saved session could not be opened.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A quiz that can be run in the terminal.
pub struct Quiz {
    app: App,
}

impl Quiz {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        source: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            app: App::new(config, store, source),
        }
    }

    /// Run the quiz in the terminal.
    ///
    /// Resumes a saved attempt if there is one, otherwise starts at the login
    /// gate. Returns when the user quits; quitting keeps saved progress.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Session` if the session store cannot be read, or
    /// `QuizError::Io` if the terminal fails.
    pub async fn run(mut self) -> Result<(), QuizError> {
        self.app.resume()?;
        let mut term = terminal::init()?;
        let result = run_event_loop(&mut term, &mut self.app).await;
        self.app.shutdown();
        drop(term);
        info!("quiz closed");
        result
    }
}

async fn run_event_loop(
    terminal: &mut terminal::TerminalGuard,
    app: &mut App,
) -> Result<(), QuizError> {
    loop {
        app.sync().await;
        if app.should_quit() {
            break;
        }

        {
            let shared = app.session().cloned();
            let session = match &shared {
                Some(shared) => Some(shared.lock().await),
                None => None,
            };
            terminal.draw(|frame| ui::render(frame, app, session.as_deref()))?;
        }

        // Poll with a timeout so the countdown keeps redrawing.
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if app.handle_key(key.code).await {
                    break;
                }
            }
        }
    }

    Ok(())
}
