use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode};
use crate::links::{SIDEBAR_TITLE, SITE_LINKS};
use crate::model::ModelOption;
use crate::state::ChatRole;

const SIDEBAR_WIDTH: u16 = 30;
const INPUT_PLACEHOLDER: &str = "Ask me anything about BIT...";

/// Push `text` as a styled span, or as plain text when no style applies.
fn push_span(spans: &mut Vec<Span<'static>>, text: String, style: Option<Style>) {
    if text.is_empty() {
        return;
    }
    match style {
        Some(style) => spans.push(Span::styled(text, style)),
        None => spans.push(Span::raw(text)),
    }
}

/// Parse a line of markdown into styled spans.
///
/// Handles `#` headings, `-`/`*` bullets, `**bold**` and `` `code` ``.
/// Unclosed markers are kept as literal text.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();

    // Headings render as a single bold line
    let heading = trimmed.trim_start_matches('#');
    if heading.len() < trimmed.len() && heading.starts_with(' ') {
        return Line::from(Span::styled(
            heading.trim().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    let indent = &text[..text.len() - trimmed.len()];
    let body = match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        Some(rest) => {
            spans.push(Span::raw(format!("{}• ", indent)));
            rest
        }
        None => text,
    };

    let mut chars = body.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();

                let mut bold_text = String::new();
                let mut found_close = false;
                while let Some(c) = chars.next() {
                    if c == '*' && chars.peek() == Some(&'*') {
                        chars.next();
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    push_span(&mut spans, std::mem::take(&mut current_text), None);
                    push_span(&mut spans, bold_text, Some(Style::default().add_modifier(Modifier::BOLD)));
                } else {
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                    if found_close {
                        current_text.push_str("**");
                    }
                }
            }
            '`' => {
                let mut code = String::new();
                let mut found_close = false;
                for c in chars.by_ref() {
                    if c == '`' {
                        found_close = true;
                        break;
                    }
                    code.push(c);
                }

                if found_close {
                    push_span(&mut spans, std::mem::take(&mut current_text), None);
                    push_span(&mut spans, code, Some(Style::default().fg(Color::Green)));
                } else {
                    current_text.push('`');
                    current_text.push_str(&code);
                }
            }
            _ => current_text.push(c),
        }
    }

    push_span(&mut spans, current_text, None);

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let main_area = if app.controller.sidebar_visible() {
        let [sidebar_area, main_area] = Layout::horizontal([
            Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        main_area
    } else {
        app.sidebar_area = None;
        body_area
    };

    render_main(app, frame, main_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let sidebar_arrow = if app.controller.sidebar_visible() { "◀" } else { "▶" };

    let title = Line::from(vec![
        Span::styled(format!(" {} ", sidebar_arrow), Style::default().fg(Color::White)),
        Span::styled(" BIT BOT ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}] ", app.controller.selected_model().display_name()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let hints: Vec<Span> = if app.show_model_picker {
        [hint(" j/k ", " nav "), hint(" Enter ", " select "), hint(" Esc ", " cancel ")].concat()
    } else {
        match app.input_mode {
            InputMode::Editing => {
                let send_label = if app.controller.is_loading() { " waiting " } else { " send " };
                [hint(" Enter ", send_label), hint(" Esc ", " stop typing "), hint(" ^B ", " sidebar ")].concat()
            }
            InputMode::Normal => {
                let mut hints = match app.focus {
                    FocusPane::Sidebar => [hint(" j/k ", " nav "), hint(" Enter ", " open ")].concat(),
                    _ => [hint(" j/k ", " scroll "), hint(" i ", " type ")].concat(),
                };
                hints.extend([
                    hint(" Tab ", " focus "),
                    hint(" s ", " sidebar "),
                    hint(" m ", " model "),
                    hint(" q ", " quit "),
                ].concat());
                hints
            }
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let [links_area, tip_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(area);

    let focused = app.focus == FocusPane::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", SIDEBAR_TITLE));

    let items: Vec<ListItem> = SITE_LINKS
        .iter()
        .map(|link| ListItem::new(format!("{} {}", link.icon, link.label)))
        .collect();

    let mut list = List::new(items).block(block);
    if focused {
        list = list
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
    }

    frame.render_stateful_widget(list, links_area, &mut app.link_state);

    let tip = Paragraph::new(app.tips.current())
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Tip "),
        );
    frame.render_widget(tip, tip_area);
}

fn render_main(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    // Inner size minus borders, used for scroll calculations
    let previous_width = app.chat_width;
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if previous_width != app.chat_width {
        app.scroll_chat_to_bottom();
    }

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");

    let chat = Paragraph::new(chat_text(app)).wrap(Wrap { trim: true });

    // Measure the wrapped height without the borders
    app.set_chat_lines(chat.line_count(app.chat_width));

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn chat_text(app: &App) -> Text<'static> {
    let controller = &app.controller;

    if controller.messages().is_empty()
        && !controller.is_loading()
        && controller.last_error().is_none()
    {
        return Text::from(Span::styled(
            "Welcome to BIT BOT! Ask a question to get started.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line> = Vec::new();

    for msg in controller.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "BIT BOT:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                lines.extend(msg.content.lines().map(parse_markdown_line));
            }
        }
        lines.push(Line::default());
    }

    if controller.is_loading() {
        lines.push(Line::from(Span::styled(
            "BIT BOT:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(typing_indicator(app.animation_frame));
    }

    if let Some(error) = controller.last_error() {
        lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        ]));
    }

    Text::from(lines)
}

/// Three dots, the active one highlighted per animation frame.
fn typing_indicator(frame: u8) -> Line<'static> {
    let spans: Vec<Span> = (0..3u8)
        .map(|i| {
            let style = if i == frame % 3 {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled("● ", style)
        })
        .collect();
    Line::from(spans)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && !app.show_model_picker;
    let border_color = if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.controller.is_loading() { " Waiting for BIT BOT... " } else { " Message " };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let draft = app.controller.draft();

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if draft.is_empty() {
        Paragraph::new(INPUT_PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = draft.chars().skip(scroll_offset).take(inner_width).collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let models = ModelOption::all();

    // Centered popup
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (models.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model ");

    let selected = app.controller.selected_model();
    let items: Vec<ListItem> = models
        .iter()
        .map(|model| {
            let style = if *model == selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model.display_name())).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}
