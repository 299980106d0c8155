use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Padding, Paragraph},
};

use crate::app::App;
use crate::session::{QuestionOutcome, QuizSession, ScoreReport};

const QUESTION_PREVIEW_LENGTH: usize = 60;

pub fn render(frame: &mut Frame, area: Rect, app: &App, session: &QuizSession, scroll: usize) {
    let report = session.score();

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(7),
        Constraint::Fill(1),
        Constraint::Length(2),
    ])
    .margin(1)
    .split(area);

    if let Some(notice) = app.notice() {
        let widget = Paragraph::new(notice)
            .alignment(Alignment::Center)
            .fg(Color::Yellow);
        frame.render_widget(widget, chunks[0]);
    }

    render_score_summary(frame, chunks[1], session.identity(), report);
    render_question_breakdown(frame, chunks[2], &session.outcomes(), scroll);
    render_controls(frame, chunks[3]);
}

fn get_grade_color(percentage: f64) -> Color {
    match percentage as u32 {
        90..=100 => Color::Green,
        70..=89 => Color::Cyan,
        50..=69 => Color::Yellow,
        _ => Color::Red,
    }
}

fn render_score_summary(frame: &mut Frame, area: Rect, identity: &str, report: ScoreReport) {
    let percentage = report.percentage();

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "QUIZ RESULTS",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(Span::styled(
            format!("Name: {}", identity),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Score: {} / {}  ({:.0}%)", report.score, report.total, percentage),
            Style::default().fg(get_grade_color(percentage)).bold(),
        )),
        Line::from(""),
    ];

    let widget = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Color::DarkGray),
    );
    frame.render_widget(widget, area);
}

fn answer_text(label: Option<&str>, value: Option<&str>) -> String {
    match (label, value) {
        (None, _) => "No answer".to_string(),
        (Some(_), Some(value)) => value.to_string(),
        (Some(label), None) => format!("{} (not an option)", label),
    }
}

fn render_question_breakdown(
    frame: &mut Frame,
    area: Rect,
    outcomes: &[QuestionOutcome],
    scroll: usize,
) {
    let mut lines: Vec<Line> = Vec::with_capacity(outcomes.len() * 3);
    // Scrolling moves one question at a time.
    let mut offsets = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        offsets.push(lines.len());

        let (symbol, color) = if outcome.is_correct {
            ("+", Color::Green)
        } else {
            ("-", Color::Red)
        };

        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", symbol), Style::default().fg(color)),
            Span::styled(
                format!("{:2}. ", outcome.number),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                truncate_question(&outcome.prompt),
                Style::default().fg(Color::Gray),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::raw("     Your answer: "),
            Span::styled(
                answer_text(outcome.chosen.as_deref(), outcome.chosen_value.as_deref()),
                Style::default().fg(color),
            ),
        ]));
        if !outcome.is_correct {
            lines.push(Line::from(vec![
                Span::raw("     Correct answer: "),
                Span::styled(
                    answer_text(Some(outcome.correct.as_str()), outcome.correct_value.as_deref()),
                    Style::default().fg(Color::Blue),
                ),
            ]));
        }
    }

    let offset = offsets.get(scroll).copied().unwrap_or(0);
    let widget = Paragraph::new(lines)
        .block(Block::default().padding(Padding::horizontal(1)))
        .scroll((offset as u16, 0));
    frame.render_widget(widget, area);
}

fn truncate_question(text: &str) -> String {
    let char_count = text.chars().count();
    if char_count > QUESTION_PREVIEW_LENGTH {
        let truncated: String = text.chars().take(QUESTION_PREVIEW_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

fn render_controls(frame: &mut Frame, area: Rect) {
    let widget = Paragraph::new("j/k scroll  ·  enter back to start  ·  q quit")
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);
    frame.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_text() {
        assert_eq!(answer_text(None, None), "No answer");
        assert_eq!(answer_text(Some("A"), Some("42")), "42");
        assert_eq!(answer_text(Some("Z"), None), "Z (not an option)");
    }

    #[test]
    fn test_truncate_question() {
        let long = "x".repeat(QUESTION_PREVIEW_LENGTH + 5);
        assert!(truncate_question(&long).ends_with("..."));
        assert_eq!(truncate_question("short"), "short");
    }
}
