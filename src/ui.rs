use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane};
use crate::store::Sender;

const SIDEBAR_WIDTH: u16 = 34;

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

    let [sidebar_area, thread_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_sidebar(app, frame, sidebar_area);
    render_thread(app, frame, thread_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = if app.store.current().is_some() {
        ("online", Color::Green)
    } else {
        ("offline", Color::Gray)
    };
    let phone = app.store.current().unwrap_or("no conversation");

    let title = Line::from(vec![
        Span::styled(
            " Farm Assistant Console ",
            Style::default().fg(Color::Cyan).bold(),
        ),
        Span::styled(format!(" {} ", phone), Style::default().fg(Color::White)),
        Span::styled(format!("[{}]", status_text), Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, list_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    app.sidebar_area = Some(list_area);

    // Phone input
    let input_focused = app.focus == FocusPane::PhoneInput;
    let input_border_color = if input_focused { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" New chat ");

    let input_text = if app.phone_input.is_empty() {
        Text::from(Span::styled(
            format!("Phone number ({}...)", app.store.prefix()),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(app.phone_input.as_str())
    };

    frame.render_widget(Paragraph::new(input_text).block(input_block), input_area);

    if input_focused {
        let x = input_area.x + 1 + app.phone_input.chars().count() as u16;
        frame.set_cursor_position((x.min(input_area.right().saturating_sub(2)), input_area.y + 1));
    }

    // Conversation list, insertion order, selected item highlighted
    let list_focused = app.focus == FocusPane::Conversations;
    let list_border_color = if list_focused { Color::Cyan } else { Color::DarkGray };

    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(list_border_color))
        .title(" Conversations ");

    let items: Vec<ListItem> = app
        .store
        .iter()
        .map(|(phone, conv)| {
            let preview = if app.is_sending(phone) {
                Span::styled(
                    "typing...",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )
            } else {
                Span::styled(conv.preview.clone(), Style::default().fg(Color::DarkGray))
            };
            ListItem::new(vec![
                Line::from(Span::styled(phone.clone(), Style::default().bold())),
                Line::from(preview),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(list_block)
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.list_state);
}

fn render_thread(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.thread_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.thread_height = chat_area.height.saturating_sub(2);
    app.thread_width = chat_area.width.saturating_sub(2);

    let chat_title = match app.store.current() {
        Some(phone) => format!(" {} ", phone),
        None => " Chat ".to_string(),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(chat_title);

    let chat_text = thread_text(app);
    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.thread_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_message_input(app, frame, input_area);
}

fn thread_text(app: &App) -> Text<'static> {
    let Some(phone) = app.store.current() else {
        return Text::from(Span::styled(
            "Open a conversation to start chatting",
            Style::default().fg(Color::DarkGray),
        ));
    };

    let bot_label = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let user_label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();

    let conv = app.store.get(phone);
    let messages = conv.map(|c| c.messages.as_slice()).unwrap_or(&[]);

    if messages.is_empty() && !app.selected_is_typing() {
        lines.push(Line::from(Span::styled("Bot:", bot_label)));
        lines.push(Line::from(format!(
            "Hello! This is a new conversation with {}. Please provide just the username.",
            phone
        )));
        return Text::from(lines);
    }

    for msg in messages {
        let (label, style) = match msg.sender {
            Sender::User => ("You", user_label),
            Sender::Bot => ("Bot", bot_label),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}:", label), style),
            Span::styled(format!(" {}", msg.time), Style::default().fg(Color::DarkGray)),
        ]));
        for line in msg.text.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if app.selected_is_typing() {
        lines.push(Line::from(Span::styled("Bot:", bot_label)));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_message_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_focused = app.focus == FocusPane::MessageInput;
    let border_color = if input_focused { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    if app.store.current().is_none() {
        let placeholder = Paragraph::new(Span::styled(
            "Select a conversation to start",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    // Horizontal scroll keeps the cursor visible on long input
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 {
        app.message_cursor.saturating_sub(inner_width - 1)
    } else {
        0
    };
    let visible: String = app
        .message_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text = if app.message_input.is_empty() {
        Text::from(Span::styled(
            "Type your message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(visible)
    };

    frame.render_widget(Paragraph::new(text).block(block), area);

    if input_focused {
        let x = area.x + 1 + (app.message_cursor - scroll_offset) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // A pending notice replaces the key hints until the next key press
    if let Some(notice) = &app.status {
        let line = Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(Color::White).bg(Color::Red).bold(),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.focus {
        FocusPane::PhoneInput => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" start chat ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" Ctrl-C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        FocusPane::Conversations => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" message ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        FocusPane::MessageInput => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" list ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::Sender;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn test_app() -> App {
        // The receiver is dropped; render tests never dispatch sends.
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(&Config::new(), tx)
    }

    fn draw(app: &mut App) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        format!("{:?}", terminal.backend().buffer())
    }

    fn open(app: &mut App, phone: &str) {
        app.phone_input = phone.to_string();
        app.open_phone();
    }

    #[test]
    fn test_fresh_conversation_shows_greeting() {
        let mut app = test_app();
        open(&mut app, "+40740000000");

        let screen = draw(&mut app);
        assert!(screen.contains("Hello! This is a new conversation"));
        assert!(screen.contains("username"));
        assert!(screen.contains("[online]"));
    }

    #[test]
    fn test_no_selection_shows_placeholders() {
        let mut app = test_app();

        let screen = draw(&mut app);
        assert!(screen.contains("Open a conversation to start chatting"));
        assert!(screen.contains("Select a conversation to start"));
        assert!(screen.contains("[offline]"));
    }

    #[test]
    fn test_thread_renders_messages_in_order() {
        let mut app = test_app();
        open(&mut app, "+40740000000");
        app.store.append("+40740000000", "first message", Sender::User);
        app.store.append("+40740000000", "second message", Sender::Bot);
        app.store.append("+40740000000", "third message", Sender::User);

        let screen = draw(&mut app);
        let first = screen.find("first message").unwrap();
        let second = screen.find("second message").unwrap();
        // rfind: "third message" is also the sidebar preview, which renders
        // on an earlier row than the thread copy.
        let third = screen.rfind("third message").unwrap();
        assert!(first < second && second < third);

        // Sidebar preview tracks the last message
        assert!(screen.contains("third message"));
        assert!(!screen.contains("Hello! This is a new conversation"));
    }

    #[test]
    fn test_selected_conversation_is_marked() {
        let mut app = test_app();
        open(&mut app, "+40740000001");
        open(&mut app, "+40740000002");

        let screen = draw(&mut app);
        assert!(screen.contains("> +40740000002"));
        assert!(!screen.contains("> +40740000001"));
    }

    #[test]
    fn test_rejected_phone_notice_lands_in_footer() {
        let mut app = test_app();
        open(&mut app, "0740000000");

        let screen = draw(&mut app);
        assert!(screen.contains("Phone must start with +407"));
    }

    #[test]
    fn test_typing_indicator_for_in_flight_send() {
        let mut app = test_app();
        open(&mut app, "+40740000000");
        app.store.append("+40740000000", "hello", Sender::User);
        app.pending.insert("+40740000000".to_string(), 1);
        app.animation_frame = 2;

        let screen = draw(&mut app);
        assert!(screen.contains("Typing..."));
        assert!(screen.contains("typing..."));
    }
}
