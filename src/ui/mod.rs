mod login;
mod quiz;
mod result;

use ratatui::{prelude::*, widgets::Block};

use crate::app::{App, Screen};
use crate::session::QuizSession;

/// Draw the current screen. `session` is the locked attempt, if one is open.
pub fn render(frame: &mut Frame, app: &App, session: Option<&QuizSession>) {
    let area = frame.area();
    frame.render_widget(Block::default().bg(Color::Reset), area);

    match (&app.screen, session) {
        (Screen::Login { input, error }, _) => login::render(frame, area, input, error.as_deref()),
        (Screen::Quiz, Some(session)) => quiz::render(frame, area, app, session),
        (Screen::Result { scroll }, Some(session)) => {
            result::render(frame, area, app, session, *scroll)
        }
        _ => {}
    }
}

/// A rectangle of at most `width` x `height` centred in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
