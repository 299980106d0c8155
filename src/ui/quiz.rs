use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Gauge, Padding, Paragraph, Wrap},
};

use crate::app::{App, Overlay, SIDEBAR_COLUMNS};
use crate::models::Question;
use crate::session::{QuestionsState, QuizSession};

use super::centered;

pub fn render(frame: &mut Frame, area: Rect, app: &App, session: &QuizSession) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .margin(1)
    .split(area);

    render_header(frame, chunks[0], session);
    render_time_bar(frame, chunks[1], session, app.config().time_limit_secs);
    render_progress(frame, chunks[2], session);

    match session.questions_state() {
        QuestionsState::Loading => render_message(
            frame,
            chunks[4],
            "Loading questions...",
            Color::Yellow,
        ),
        QuestionsState::Unavailable(reason) => render_message(
            frame,
            chunks[4],
            &format!("Could not load questions: {}\nYour saved answers are kept.", reason),
            Color::Red,
        ),
        QuestionsState::Ready(_) => {
            if let Some(question) = session.current_question() {
                render_question(frame, chunks[4], app, session, question);
            }
        }
    }

    if let Some(notice) = app.notice() {
        let widget = Paragraph::new(notice).fg(Color::Red);
        frame.render_widget(widget, chunks[5]);
    }
    render_controls(frame, chunks[6]);

    match &app.overlay {
        Overlay::None => {}
        Overlay::ConfirmSubmit => render_confirm(frame, area),
        Overlay::Incomplete(missing) => render_incomplete(frame, area, missing),
        Overlay::Sidebar { cursor } => render_sidebar(frame, area, session, *cursor),
    }
}

fn render_header(frame: &mut Frame, area: Rect, session: &QuizSession) {
    let [title_area, clock_area] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(8)]).areas(area);

    let title = Line::from(vec![
        Span::styled("BASIC MATH TEST", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("  ·  {}", session.identity()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), title_area);

    let clock = Paragraph::new(session.format_time_left())
        .alignment(Alignment::Right)
        .fg(Color::White)
        .bold();
    frame.render_widget(clock, clock_area);
}

fn render_time_bar(frame: &mut Frame, area: Rect, session: &QuizSession, time_limit: u32) {
    let ratio = if time_limit > 0 {
        (session.time_remaining() as f64 / time_limit as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let color = match (ratio * 100.0) as u32 {
        50..=100 => Color::Green,
        20..=49 => Color::Yellow,
        _ => Color::Red,
    };

    let widget = Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(color).bg(Color::Black));
    frame.render_widget(widget, area);
}

fn render_progress(frame: &mut Frame, area: Rect, session: &QuizSession) {
    let total = session.question_count();
    let progress = if total > 0 {
        format!(
            "{}/{}  ·  {} answered",
            session.current_index() + 1,
            total,
            session.answered_count()
        )
    } else {
        "-/-".to_string()
    };

    let widget = Paragraph::new(progress)
        .alignment(Alignment::Right)
        .fg(Color::DarkGray);
    frame.render_widget(widget, area);
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let widget = Paragraph::new(message.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .fg(color);
    frame.render_widget(widget, area);
}

fn render_question(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    session: &QuizSession,
    question: &Question,
) {
    let [text_area, options_area] =
        Layout::vertical([Constraint::Length(4), Constraint::Fill(1)]).areas(area);

    let text = format!("{}. {}", session.current_index() + 1, question.question);
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .fg(Color::White)
        .bold();
    frame.render_widget(widget, text_area);

    let chosen = session.answer(session.current_index());
    let reveal = app.config().reveal_answers;
    let mut lines: Vec<Line> = Vec::with_capacity(question.options.len() * 2);

    for (index, option) in question.options.iter().enumerate() {
        let is_cursor = index == app.option_cursor();
        let is_chosen = chosen == Some(option.label.as_str());

        let style = if is_chosen && reveal {
            if question.is_correct(&option.label) {
                Style::default().fg(Color::Green).bold()
            } else {
                Style::default().fg(Color::Red).bold()
            }
        } else if is_chosen {
            Style::default().fg(Color::Cyan).bold()
        } else if is_cursor {
            Style::default().fg(Color::White).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        let marker = if is_cursor { ">" } else { " " };
        let check = if is_chosen { "(x)" } else { "( )" };

        lines.push(Line::from(vec![
            Span::styled(format!(" {} {} ", marker, check), style),
            Span::styled(format!("{}. ", option.label), style),
            Span::styled(option.value.as_str(), style),
        ]));
        lines.push(Line::from(""));
    }

    frame.render_widget(Paragraph::new(lines), options_area);
}

fn render_controls(frame: &mut Frame, area: Rect) {
    let widget = Paragraph::new(
        "j/k option  ·  enter answer  ·  h/l prev/next  ·  tab jump  ·  s submit  ·  x logout  ·  q quit",
    )
    .alignment(Alignment::Center)
    .fg(Color::DarkGray);
    frame.render_widget(widget, area);
}

fn popup(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Color::Cyan)
        .padding(Padding::horizontal(1))
}

fn render_confirm(frame: &mut Frame, area: Rect) {
    let rect = centered(area, 44, 6);
    let content = vec![
        Line::from(""),
        Line::from("Finish the quiz and submit your answers?"),
        Line::from(""),
        Line::from("y submit  ·  n keep going".fg(Color::DarkGray)),
    ];

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(content)
            .alignment(Alignment::Center)
            .block(popup(" Submit ")),
        rect,
    );
}

fn render_incomplete(frame: &mut Frame, area: Rect, missing: &[usize]) {
    let height = (missing.len() as u16).saturating_add(6);
    let rect = centered(area, 44, height);

    let mut content = vec![
        Line::from(""),
        Line::from("Cannot submit, these questions are unanswered:".fg(Color::Yellow)),
    ];
    content.extend(
        missing
            .iter()
            .map(|number| Line::from(format!("Question {}", number))),
    );
    content.push(Line::from(""));
    content.push(Line::from("enter ok".fg(Color::DarkGray)));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(content)
            .alignment(Alignment::Center)
            .block(popup(" Unanswered ")),
        rect,
    );
}

fn render_sidebar(frame: &mut Frame, area: Rect, session: &QuizSession, cursor: usize) {
    let total = session.question_count();
    let rows = total.div_ceil(SIDEBAR_COLUMNS).max(1);
    let rect = centered(area, (SIDEBAR_COLUMNS as u16) * 5 + 4, rows as u16 + 4);

    let mut lines: Vec<Line> = (0..rows)
        .map(|row| {
            let spans = (0..SIDEBAR_COLUMNS)
                .map(|col| row * SIDEBAR_COLUMNS + col)
                .filter(|index| *index < total)
                .map(|index| {
                    let mut style = if session.is_answered(index) {
                        Style::default().fg(Color::Black).bg(Color::Green)
                    } else {
                        Style::default().fg(Color::Black).bg(Color::Gray)
                    };
                    if index == cursor {
                        style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
                    }
                    Span::styled(format!("{:^4}", index + 1), style)
                })
                .flat_map(|cell| [cell, Span::raw(" ")])
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from("enter go  ·  tab close".fg(Color::DarkGray)));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(popup(" Questions ")), rect);
}
