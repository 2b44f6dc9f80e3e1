//! UI rendering for the dashboard and lesson screens.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, Lesson, View};
use crate::models::{Difficulty, Role};
use crate::quiz::QuizState;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    match app.view {
        View::Dashboard => draw_dashboard(f, app, chunks[1]),
        View::Lesson => {
            if let Some(lesson) = &app.lesson {
                draw_lesson(f, app, lesson, chunks[1]);
            }
        }
    }

    draw_footer(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let title = match (&app.view, &app.lesson) {
        (View::Lesson, Some(lesson)) => format!(
            "🚀 深圳三年级数学探险  ▸  {} {}",
            lesson.topic.icon.glyph(),
            lesson.topic.title
        ),
        _ => "🚀 深圳三年级数学探险".to_string(),
    };
    let stars = format!("⭐ {} 星星", app.stats.stars);

    let line = Line::from(vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(stars, Style::default().fg(Color::Yellow)),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let chunks = if app.config.display.show_stats_panel {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(30)])
            .split(area)
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0)])
            .split(area)
    };

    let items: Vec<ListItem> = app
        .topics
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            let selected = i == app.selected_topic;
            let title_style = if selected {
                Style::default()
                    .fg(topic.color)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default().fg(topic.color).add_modifier(Modifier::BOLD)
            };
            let lines = vec![
                Line::from(vec![
                    Span::raw(format!("{} ", topic.icon.glyph())),
                    Span::styled(topic.title, title_style),
                    Span::styled(
                        format!("  [{}]", topic.category.name()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("   {}", topic.description),
                    Style::default().fg(Color::Gray),
                )),
                Line::raw(""),
            ];
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" 今天探索哪颗数学星球？ "),
    );
    f.render_widget(list, chunks[0]);

    if app.config.display.show_stats_panel {
        draw_stats_panel(f, app, chunks[1]);
    }
}

fn draw_stats_panel(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;
    let lines = vec![
        Line::raw(""),
        Line::from(vec![
            Span::raw("  已做题数  "),
            Span::styled(
                stats.total_questions.to_string(),
                Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("  答对题数  "),
            Span::styled(
                stats.correct_answers.to_string(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("  正确率    "),
            Span::styled(
                format!("{:.0}%", stats.accuracy() * 100.0),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::raw("  完成主题  "),
            Span::styled(
                stats.topics_completed.to_string(),
                Style::default().fg(Color::Magenta),
            ),
        ]),
        Line::from(vec![
            Span::raw("  星星      "),
            Span::styled(
                format!("⭐ {}", stats.stars),
                Style::default().fg(Color::Yellow),
            ),
        ]),
    ];
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" 学习战绩 "),
    );
    f.render_widget(panel, area);
}

fn draw_lesson(f: &mut Frame, app: &App, lesson: &Lesson, area: Rect) {
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    draw_chat_pane(f, lesson, panes[0]);
    draw_quiz_pane(f, app, lesson, panes[1]);
}

fn draw_chat_pane(f: &mut Frame, lesson: &Lesson, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let mut lines: Vec<Line> = Vec::new();
    if lesson.explanation_pending && lesson.chat.messages().is_empty() {
        lines.push(Line::styled(
            "🚀 正在前往数学星球...",
            Style::default().fg(Color::LightBlue),
        ));
    }
    for message in lesson.chat.messages() {
        let (name, style) = match message.role {
            Role::Model => ("🤖 老师", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Role::User => ("🧒 我", Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD)),
        };
        lines.push(Line::from(vec![
            Span::styled(name, style),
            Span::styled(
                format!("  {}", message.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        for text_line in message.text.lines() {
            lines.push(Line::raw(format!("  {text_line}")));
        }
        lines.push(Line::raw(""));
    }
    if lesson.chat.is_pending() {
        lines.push(Line::styled(
            "✨ 老师正在思考...",
            Style::default().fg(Color::Yellow),
        ));
    }

    // Keep the tail in view, counting the rows each line occupies once
    // wrapped to the pane width.
    let inner_width = chunks[0].width.saturating_sub(2).max(1) as usize;
    let inner_height = chunks[0].height.saturating_sub(2) as usize;
    let rows: usize = lines.iter().map(|line| line_rows(line, inner_width)).sum();
    let scroll = rows.saturating_sub(inner_height) as u16;

    let messages = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" AI 数学老师 "));
    f.render_widget(messages, chunks[0]);

    let (input_title, input_style) = if lesson.explanation_pending {
        (" 输入 (老师正在赶来...) ", Style::default().fg(Color::DarkGray))
    } else if lesson.chat.is_pending() {
        (" 输入 (等待老师回复...) ", Style::default().fg(Color::DarkGray))
    } else if lesson.focus == Focus::ChatInput {
        (" 输入 (Enter 发送, Esc 返回) ", Style::default())
    } else {
        (" 输入 (按 i 开始提问) ", Style::default().fg(Color::DarkGray))
    };
    let cursor = if lesson.focus == Focus::ChatInput { "▏" } else { "" };
    let input = Paragraph::new(format!("{}{cursor}", lesson.input_buffer))
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(input_title));
    f.render_widget(input, chunks[1]);
}

/// Rows a line occupies after wrapping. Widths are approximate: ASCII counts
/// one cell, everything else (CJK, emoji) two.
fn line_rows(line: &Line, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    let total: usize = line
        .spans
        .iter()
        .map(|span| display_width(&span.content))
        .sum();
    total.div_ceil(width).max(1)
}

fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum()
}

fn draw_quiz_pane(f: &mut Frame, app: &App, lesson: &Lesson, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" 🏆 闯关挑战 ");

    match &lesson.quiz.state {
        QuizState::Loading => {
            let text = vec![
                Line::raw(""),
                Line::styled("⏳ 正在生成题目...", Style::default().fg(Color::LightBlue)),
                Line::styled("AI老师正在翻阅题库", Style::default().fg(Color::DarkGray)),
            ];
            let paragraph = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(paragraph, area);
        }
        QuizState::Error => {
            let text = vec![
                Line::raw(""),
                Line::styled(
                    "哎呀，生成题目失败了，请重试。",
                    Style::default().fg(Color::Red),
                ),
                Line::raw(""),
                Line::styled("按 r 重试", Style::default().fg(Color::DarkGray)),
            ];
            let paragraph = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(paragraph, area);
        }
        QuizState::Ready(_) => draw_quiz_round(f, app, lesson, area, block),
    }
}

fn draw_quiz_round(f: &mut Frame, app: &App, lesson: &Lesson, area: Rect, block: Block) {
    let Some(round) = lesson.quiz.round() else { return };
    let question = round.current_question();

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // difficulty tabs
            Constraint::Length(1), // progress + streak
            Constraint::Length(1),
            Constraint::Min(0), // question, options, explanation
        ])
        .split(inner);

    // Difficulty tabs, Tab key cycles.
    let mut tab_spans: Vec<Span> = vec![Span::raw(" ")];
    for tier in Difficulty::ALL {
        let style = if tier == lesson.quiz.difficulty {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(format!(" {} ", tier.label()), style));
        tab_spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(tab_spans)), chunks[0]);

    let mut progress_spans = vec![Span::styled(
        format!(" 第 {} 题 / {}", round.position() + 1, round.total()),
        Style::default().fg(Color::LightBlue),
    )];
    if app.config.display.show_streak_badge && lesson.quiz.streak > 1 {
        progress_spans.push(Span::styled(
            format!("   🔥 {} 连对!", lesson.quiz.streak),
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(progress_spans)), chunks[1]);

    let mut lines: Vec<Line> = vec![
        Line::styled(
            format!(" {}", question.question),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
    ];

    for (i, option) in question.options.iter().enumerate() {
        let style = if round.is_answered() {
            if i == question.correct_answer {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if Some(i) == round.selected() {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        } else {
            Style::default()
        };
        let marker = if round.is_answered() {
            if i == question.correct_answer {
                "✓"
            } else if Some(i) == round.selected() {
                "✗"
            } else {
                " "
            }
        } else {
            " "
        };
        lines.push(Line::styled(format!("  {}. {option}  {marker}", i + 1), style));
    }

    if round.is_answered() {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            " 🤖 老师解析：",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        for text_line in question.explanation.lines() {
            lines.push(Line::styled(
                format!("  {text_line}"),
                Style::default().fg(Color::Cyan),
            ));
        }
        lines.push(Line::raw(""));
        let next_hint = if round.position() + 1 < round.total() {
            " Enter: 下一题 ➜"
        } else {
            " Enter: 完成本轮，再来一组 ➜"
        };
        lines.push(Line::styled(
            next_hint,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let body = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(body, chunks[3]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints = match (&app.view, app.lesson.as_ref().map(|l| l.focus)) {
        (View::Dashboard, _) => "j/k:选择  Enter:开始学习  q:退出",
        (View::Lesson, Some(Focus::ChatInput)) => "输入问题  Enter:发送  Esc:回到答题",
        (View::Lesson, _) => "1-4:作答  Enter:下一题  Tab:切换难度  i:提问  r:重试  Esc:返回",
    };

    let line = match &app.notice {
        Some(notice) => Line::from(vec![
            Span::styled(format!("⚠ {notice}  "), Style::default().fg(Color::Yellow)),
            Span::styled(hints, Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::styled(hints, Style::default().fg(Color::DarkGray)),
    };
    let footer = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered_text(app: &App) -> String {
        let backend = TestBackend::new(90, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn dashboard_shows_every_stats_field() {
        let mut app = App::new(Config::default(), None);
        app.stats.record_answer(true);

        let text: String = rendered_text(&app).split_whitespace().collect();
        assert!(text.contains("已做题数"));
        assert!(text.contains("答对题数"));
        assert!(text.contains("正确率"));
        assert!(text.contains("完成主题"));
        assert!(text.contains("星星"));
    }

    #[test]
    fn line_rows_account_for_wide_characters() {
        // 70 CJK characters render 140 cells wide.
        let long = Line::raw("深圳的小朋友们".repeat(10));
        assert_eq!(line_rows(&long, 40), 4);
        assert_eq!(line_rows(&Line::raw("abcd"), 2), 2);
        assert_eq!(line_rows(&Line::raw(""), 40), 1);
        assert_eq!(line_rows(&Line::raw("abc"), 0), 1);
    }
}
