use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::conversation::Role;

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
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let turns = app.conversation.exchanges().len();
    let turn_indicator = if turns > 0 {
        format!(" [{} messages]", turns)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" Librarian Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(turn_indicator, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    // Chat column on the left, settings sidebar on the right
    let [chat_column, sidebar_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(30)]).areas(area);

    // Status line only occupies a row when there is something to show
    let status_height = if app.last_error.is_some() || app.notice.is_some() {
        1
    } else {
        0
    };

    let [chat_area, status_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(status_height),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    render_chat(app, frame, chat_area);
    if status_height > 0 {
        render_status_line(app, frame, status_area);
    }
    render_input(app, frame, input_area);
    render_sidebar(app, frame, sidebar_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Ollama: {} ", app.selected_model));

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.conversation.messages() {
        match msg.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
            }
        }
        for line in msg.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if app.awaiting_response() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_status_line(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(error) = &app.last_error {
        Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::default()
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Prompt (Enter to send) ");

    // Horizontal scrolling keeps the cursor inside the visible slice.
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let settings = &app.conversation.settings;

    let label_style = Style::default().fg(Color::DarkGray);
    let value_style = Style::default().fg(Color::White).bold();

    let lines = vec![
        Line::from(Span::styled("Model  (m to change)", label_style)),
        Line::from(Span::styled(format!("  {}", app.selected_model), value_style)),
        Line::default(),
        Line::from(Span::styled("Max Length  (+/-)", label_style)),
        Line::from(Span::styled(
            format!("  {}", settings.max_length()),
            value_style,
        )),
        Line::default(),
        Line::from(Span::styled("Frequency Penalty  ([/])", label_style)),
        Line::from(Span::styled(
            format!("  {:.1}", settings.frequency_penalty()),
            value_style,
        )),
        Line::default(),
        Line::from(Span::styled("c  clear conversation", label_style)),
        Line::from(Span::styled("s  save conversation", label_style)),
    ];

    let sidebar = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Settings "),
    );

    frame.render_widget(sidebar, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " INPUT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.show_model_picker {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" navigate ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        match app.input_mode {
            InputMode::Editing => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" browse ", label_style),
            ],
            InputMode::Normal => vec![
                Span::styled(" i ", key_style),
                Span::styled(" write ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" c ", key_style),
                Span::styled(" clear ", label_style),
                Span::styled(" s ", key_style),
                Span::styled(" save ", label_style),
                Span::styled(" m ", key_style),
                Span::styled(" model ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints);

    let footer = Paragraph::new(Line::from(spans));
    frame.render_widget(footer, area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(50, 60, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model ");

    if app.available_models.is_empty() {
        let text = if app.models_task.is_some() {
            "Fetching models..."
        } else {
            "No models found. Pull one with: ollama pull llama3"
        };
        let paragraph = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
        return;
    }

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|name| {
            let marker = if *name == app.selected_model { "* " } else { "  " };
            ListItem::new(format!("{}{}", marker, name))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

/// Centered rect sized as a percentage of the parent area
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);

    center
}
