use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode, QUICK_QUESTIONS};
use crate::chat::{ChatEntry, Role};
use crate::markup::{self, Fragment, Inline};
use crate::session::StatusKind;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, status_area, chat_area, path_area, input_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(frame, header_area);
    render_status(app, frame, status_area);
    render_chat(app, frame, chat_area);
    render_path_input(app, frame, path_area);
    render_question_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" RepoChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("ask questions about a codebase", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.session.status();
    let (dot_color, mut text) = match status.kind {
        StatusKind::None => (Color::DarkGray, status.text.clone()),
        StatusKind::Loading => (Color::Yellow, status.text.clone()),
        StatusKind::Loaded => (Color::Green, status.text.clone()),
        StatusKind::Error => (Color::Red, status.text.clone()),
    };

    if status.kind == StatusKind::Loading {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        text.push_str(&dots);
    }

    let mut spans = vec![
        Span::styled(" ● ", Style::default().fg(dot_color)),
        Span::raw(text),
    ];

    if let Some(stats) = &app.session.stats {
        spans.push(Span::styled(
            format!(
                "   {} files · {} chunks · {} vectors",
                stats.unique_files, stats.total_chunks, stats.total_vectors
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);
    app.chat_height = inner_height;

    let chat_text = if app.chat.is_empty() {
        Text::from(Span::styled(
            "Load a repository, then ask a question about the code...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for entry in app.chat.entries() {
            push_entry_lines(entry, app.animation_frame, &mut lines);
        }
        Text::from(lines)
    };

    // Pin the viewport to the newest entry unless the user scrolled away.
    let total = wrapped_line_count(&chat_text, inner_width);
    let max_scroll = total.saturating_sub(inner_height);
    if app.stick_to_bottom {
        app.chat_scroll = max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(max_scroll);
    }

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Estimate rendered rows after wrapping, mirroring the Paragraph widget
/// closely enough for bottom-pinning.
fn wrapped_line_count(text: &Text, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = width as usize;
    let mut total: u16 = 0;
    for line in &text.lines {
        let chars: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
        total = total.saturating_add(((chars / width) + 1) as u16);
    }
    total
}

fn push_entry_lines(entry: &ChatEntry, animation_frame: u8, lines: &mut Vec<Line<'static>>) {
    match entry.role {
        Role::User => lines.push(Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))),
        Role::Assistant => lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))),
    }

    if entry.is_typing() {
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else {
        push_fragment_lines(&entry.body, lines);
    }
    lines.push(Line::default());
}

/// Walk a markup fragment into styled terminal lines.
fn push_fragment_lines(fragment: &Fragment, lines: &mut Vec<Line<'static>>) {
    for (i, block) in fragment.blocks.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        match block {
            markup::Block::Paragraph(inlines) => {
                let mut spans: Vec<Span<'static>> = Vec::new();
                for inline in inlines {
                    push_inline_spans(inline, Style::default(), &mut spans, lines);
                }
                lines.push(Line::from(spans));
            }
            markup::Block::Code(code) => {
                for code_line in code.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("    {code_line}"),
                        Style::default().fg(Color::Green),
                    )));
                }
            }
            markup::Block::SourceFiles(files) => {
                let mut spans = vec![Span::styled(
                    "Source Files:",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                )];
                for file in files {
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled(
                        file.clone(),
                        Style::default().fg(Color::Yellow),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }
    }
}

fn push_inline_spans(
    inline: &Inline,
    style: Style,
    spans: &mut Vec<Span<'static>>,
    lines: &mut Vec<Line<'static>>,
) {
    match inline {
        Inline::Text(text) | Inline::Raw(text) => {
            spans.push(Span::styled(text.clone(), style));
        }
        Inline::Code(code) => {
            spans.push(Span::styled(
                code.clone(),
                style.fg(Color::Yellow),
            ));
        }
        Inline::Strong(children) => {
            let style = style.add_modifier(Modifier::BOLD);
            for child in children {
                push_inline_spans(child, style, spans, lines);
            }
        }
        Inline::Em(children) => {
            let style = style.add_modifier(Modifier::ITALIC);
            for child in children {
                push_inline_spans(child, style, spans, lines);
            }
        }
        Inline::Break => {
            lines.push(Line::from(std::mem::take(spans)));
        }
    }
}

fn render_path_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Path;
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let title = if app.load_in_flight() {
        " Repository path (loading…) "
    } else {
        " Repository path (Enter to load) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    render_line_editor(
        frame,
        area,
        block,
        &app.path_input,
        app.path_cursor,
        focused && app.input_mode == InputMode::Editing,
        Style::default().fg(Color::White),
    );
}

fn render_question_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let enabled = app.session.can_ask();
    let border_color = if focused {
        Color::Yellow
    } else if enabled {
        Color::DarkGray
    } else {
        Color::Black
    };

    let title = if enabled {
        " Ask (Enter to send) "
    } else {
        " Ask (load a repository first) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let text_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    render_line_editor(
        frame,
        area,
        block,
        &app.question_input,
        app.question_cursor,
        focused && app.input_mode == InputMode::Editing,
        text_style,
    );
}

/// Single-line editor body with horizontal scrolling that keeps the cursor
/// visible. Cursor and offsets are char-indexed, UTF-8 safe.
fn render_line_editor(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    value: &str,
    cursor: usize,
    show_cursor: bool,
    style: Style,
) {
    let inner_width = area.width.saturating_sub(2) as usize;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = value.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text).style(style).block(block);
    frame.render_widget(input, area);

    if show_cursor {
        let cursor_x = (cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hint = if !app.session.repository_loaded {
        " Enter: load repo │ Tab: switch pane │ Ctrl+C: quit ".to_string()
    } else {
        format!(
            " Enter: send │ Tab: switch pane │ 1-4: quick questions ({}…) │ Ctrl+C: quit ",
            &QUICK_QUESTIONS[0][..QUICK_QUESTIONS[0].len().min(20)]
        )
    };

    let footer = Paragraph::new(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, area);
}
