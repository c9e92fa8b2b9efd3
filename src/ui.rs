pub mod charting;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};

use crate::app::App;
use crate::feedback::FeedbackStatus;
use crate::ranking::RankingStatus;
use crate::round::RoundPhase;
use crate::ui::charting::{chart_points, format_label, gridlines};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

fn phase_background(phase: RoundPhase) -> Color {
    match phase {
        RoundPhase::Idle | RoundPhase::SessionComplete => Color::Reset,
        RoundPhase::Waiting => Color::Red,
        RoundPhase::Active => Color::Green,
        RoundPhase::Early => Color::Blue,
        RoundPhase::RoundResult => Color::DarkGray,
    }
}

/// Vertically centered block of lines
fn render_centered(lines: Vec<Line>, area: Rect, buf: &mut Buffer) {
    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

/// Idle and in-round screens: full-area color with a centered message
pub fn render_round(app: &App, area: Rect, buf: &mut Buffer) {
    let phase = app.game.phase();
    Block::default()
        .style(Style::default().bg(phase_background(phase)))
        .render(area, buf);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let lines = match phase {
        RoundPhase::Idle => {
            let mut lines = vec![
                Line::from(Span::styled("REFLEX", bold.fg(Color::Yellow))),
                Line::from(""),
                Line::from("Test your reaction speed. Click the moment the screen turns green."),
                Line::from(""),
                Line::from(Span::styled("click or press enter to start", italic)),
                Line::from(""),
            ];
            let cyan = Style::default().fg(Color::Cyan);
            lines.push(match (app.login.logged_in, app.login.label()) {
                (true, Some(label)) => {
                    Line::from(Span::styled(format!("logged in: {label}"), cyan))
                }
                (true, None) => Line::from(Span::styled("logged in", cyan)),
                (false, _) => Line::from(Span::styled("(l) log in to save scores", dim)),
            });
            if let Some(best) = app.best {
                lines.push(Line::from(Span::styled(
                    format!("personal best {best} ms over {} sessions", app.sessions_played),
                    dim,
                )));
            }
            if !app.recent.is_empty() {
                let averages = app
                    .recent
                    .iter()
                    .map(|r| r.average.to_string())
                    .collect::<Vec<_>>()
                    .join(" / ");
                lines.push(Line::from(Span::styled(format!("recent averages {averages} ms"), dim)));
            }
            lines
        }
        RoundPhase::Waiting => vec![
            Line::from(Span::styled("Wait for green...", bold)),
            Line::from(Span::styled("steady...", dim)),
        ],
        RoundPhase::Active => vec![Line::from(Span::styled("CLICK!", bold))],
        RoundPhase::Early => vec![
            Line::from(Span::styled("Too early!", bold)),
            Line::from("Wait for the screen to turn green."),
            Line::from(""),
            Line::from(Span::styled("click to retry", italic)),
        ],
        RoundPhase::RoundResult => vec![
            Line::from(Span::styled(
                format!("{} ms", app.game.session().last_time().unwrap_or_default()),
                bold,
            )),
            Line::from(format!(
                "round {} of {}",
                app.game.times().len(),
                app.game.total_rounds()
            )),
            Line::from(""),
            Line::from(Span::styled("click to continue", italic)),
        ],
        RoundPhase::SessionComplete => vec![],
    };

    render_centered(lines, area, buf);

    if phase != RoundPhase::Idle {
        let indicator = Paragraph::new(Span::styled(
            format!("round {} / {}", app.game.round_index(), app.game.total_rounds()),
            bold,
        ))
        .alignment(Alignment::Center);
        indicator.render(
            Rect {
                height: 1,
                y: area.y + VERTICAL_MARGIN,
                ..area
            },
            buf,
        );
    }
}

fn feedback_lines(status: &FeedbackStatus) -> Vec<Line<'_>> {
    match status {
        FeedbackStatus::Pending => vec![Line::from(Span::styled(
            "analyzing...",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        ))],
        FeedbackStatus::Ready(fb) => {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("rank ", Style::default().fg(Color::Magenta)),
                    Span::styled(fb.rank.as_str(), Style::default().add_modifier(Modifier::BOLD)),
                ]),
                Line::from(Span::styled(
                    format!("\"{}\"", fb.comment),
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
            ];
            if let Some(tips) = &fb.tips {
                lines.push(Line::from(Span::styled(
                    tips.as_str(),
                    Style::default().fg(Color::Gray),
                )));
            }
            lines
        }
        FeedbackStatus::None | FeedbackStatus::Unavailable => vec![],
    }
}

fn ranking_line(status: &RankingStatus) -> Line<'_> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    match status {
        RankingStatus::NotSubmitted | RankingStatus::Disabled => Line::from(""),
        RankingStatus::LoggedOut => Line::from(Span::styled("log in to submit your score", dim)),
        RankingStatus::Submitting => Line::from(Span::styled("submitting score...", dim)),
        RankingStatus::Failed => Line::from(Span::styled(
            "could not submit score",
            Style::default().fg(Color::Red),
        )),
        RankingStatus::Ready(snapshot) => {
            let board = snapshot
                .ranking_board
                .iter()
                .take(3)
                .map(|e| format!("#{} {} {}", e.ranking.rank, e.user_info.nick, e.ranking.score))
                .collect::<Vec<_>>()
                .join("   ");
            Line::from(vec![
                Span::styled(
                    format!(
                        "best rank #{} of {}",
                        snapshot.best_rank.rank, snapshot.ranking_size
                    ),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw("   "),
                Span::raw(board),
            ])
        }
    }
}

/// Summary screen: stats, feedback, per-round chart, ranking and legend
pub fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let times = app.game.times();
    let Some(summary) = app.summary() else {
        return;
    };

    let feedback = feedback_lines(app.game.feedback());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),                          // title
            Constraint::Length(1),                          // stats
            Constraint::Length(1),                          // best
            Constraint::Length(feedback.len().max(1) as u16 + 2), // feedback
            Constraint::Min(6),                             // chart
            Constraint::Length(1),                          // ranking
            Constraint::Length(1),                          // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("results", bold.fg(Color::Yellow)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} ms avg", summary.average), bold.fg(Color::Green)),
        Span::raw("   "),
        Span::styled(format!("{} ms best", summary.fastest), bold.fg(Color::Blue)),
        Span::raw("   "),
        Span::styled(format!("{} ms worst", summary.slowest), bold),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let best_text = match (app.best, app.new_best) {
        (Some(best), true) => format!("new personal best: {best} ms"),
        (Some(best), false) => format!("personal best: {best} ms"),
        (None, _) => String::new(),
    };
    Paragraph::new(Span::styled(
        best_text,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(feedback)
        .block(Block::default().borders(Borders::ALL).title("feedback"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    if let Some(lines) = gridlines(times) {
        let points = chart_points(times);
        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Green))
            .graph_type(GraphType::Line)
            .data(&points)];

        let x_max = (times.len() as f64).max(2.0);
        Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title("reaction history"))
            .x_axis(
                Axis::default()
                    .title("round")
                    .bounds([1.0, x_max])
                    .labels(vec![
                        Span::styled("1", bold),
                        Span::styled(format_label(x_max), bold),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("ms")
                    .bounds([lines[0], lines[lines.len() - 1]])
                    .labels(
                        lines
                            .iter()
                            .map(|&v| Span::styled(format_label(v), bold))
                            .collect::<Vec<_>>(),
                    ),
            )
            .render(chunks[4], buf);
    }

    Paragraph::new(ranking_line(&app.ranking))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    Paragraph::new(Span::styled(
        "(r) play again / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[6], buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.game.phase() {
            RoundPhase::SessionComplete => render_summary(self, area, buf),
            _ => render_round(self, area, buf),
        }
    }
}
