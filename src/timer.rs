//! Once-per-second driver for [`QuizSession::tick`](crate::session::QuizSession::tick).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::session::{QuizSession, Tick};

/// Session shared between the UI loop and background tasks.
pub type SharedSession = Arc<Mutex<QuizSession>>;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A running countdown.
///
/// The countdown task ends by itself once the session halts or expires.
/// Dropping the handle aborts it, so no tick can land after the owner lets
/// go of the session.
pub struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Start ticking `session` once per second. The first tick lands one
    /// period from now.
    pub fn start(session: SharedSession) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let mut session = session.lock().await;
                match session.tick() {
                    Ok(Tick::Running { .. }) => {}
                    Ok(Tick::Expired(report)) => {
                        info!(score = report.score, total = report.total, "countdown expired");
                        break;
                    }
                    Ok(Tick::Halted) => {
                        debug!("countdown halted");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to persist countdown");
                    }
                }
            }
        });

        Self { handle }
    }

    /// Whether the countdown task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the countdown.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
