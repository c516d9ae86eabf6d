use std::collections::HashMap;
use std::time::Duration;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gateway::{BotGateway, OFFLINE_REPLY};
use crate::store::{ConversationStore, Sender};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    PhoneInput,
    Conversations,
    MessageInput,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub store: ConversationStore,

    // Sidebar state
    pub list_state: ListState,
    pub phone_input: String,

    // Message input state
    pub message_input: String,
    pub message_cursor: usize, // cursor position in message_input, in chars

    // Thread view state
    pub thread_scroll: u16,
    pub thread_height: u16, // Height of thread area for scroll calculations
    pub thread_width: u16,  // Width of thread area for wrap calculations

    // Transient status notice (invalid phone input and the like)
    pub status: Option<String>,

    // In-flight sends per phone key; a conversation with a count > 0 shows
    // the typing indicator
    pub pending: HashMap<String, usize>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub thread_area: Option<Rect>,

    // Outbound side
    pub gateway: BotGateway,
    pub reply_delay: Duration,
    pub events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            focus: FocusPane::PhoneInput,
            store: ConversationStore::new(config.phone_prefix()),

            list_state: ListState::default(),
            phone_input: String::new(),

            message_input: String::new(),
            message_cursor: 0,

            thread_scroll: 0,
            thread_height: 0,
            thread_width: 0,

            status: None,

            pending: HashMap::new(),

            animation_frame: 0,

            sidebar_area: None,
            thread_area: None,

            gateway: BotGateway::new(config.endpoint()),
            reply_delay: config.reply_delay(),
            events,
        }
    }

    pub fn set_status(&mut self, notice: impl Into<String>) {
        self.status = Some(notice.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Open the conversation named in the phone input, creating it if new.
    /// Rejections land in the status line and leave everything untouched.
    pub fn open_phone(&mut self) {
        let phone = self.phone_input.trim().to_string();

        let existed = self.store.index_of(&phone).is_some();
        match self.store.ensure(&phone) {
            Ok(()) => {
                if !existed {
                    info!(%phone, "conversation created");
                }
                self.store.select(&phone);
                self.list_state.select(self.store.index_of(&phone));
                self.phone_input.clear();
                self.focus = FocusPane::MessageInput;
                self.scroll_thread_to_bottom();
            }
            Err(err) => self.set_status(err.to_string()),
        }
    }

    /// Select the conversation at `index` in sidebar order.
    pub fn select_index(&mut self, index: usize) {
        if let Some(phone) = self.store.phone_at(index).map(str::to_string) {
            self.list_state.select(Some(index));
            self.store.select(&phone);
            self.scroll_thread_to_bottom();
        }
    }

    // Sidebar navigation
    pub fn list_down(&mut self) {
        let len = self.store.len();
        if len > 0 {
            let i = self.list_state.selected().unwrap_or(0);
            self.select_index((i + 1).min(len - 1));
        }
    }

    pub fn list_up(&mut self) {
        if !self.store.is_empty() {
            let i = self.list_state.selected().unwrap_or(0);
            self.select_index(i.saturating_sub(1));
        }
    }

    /// Record the user message, then hand the HTTP call to a background task.
    /// The task always posts exactly one `Reply` event back, so every send
    /// ends with exactly one bot message in the thread.
    pub fn send_message(&mut self) {
        let Some(phone) = self.store.current().map(str::to_string) else {
            return;
        };
        let text = self.message_input.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.store.append(&phone, &text, Sender::User);
        self.message_input.clear();
        self.message_cursor = 0;
        *self.pending.entry(phone.clone()).or_insert(0) += 1;
        self.scroll_thread_to_bottom();

        let gateway = self.gateway.clone();
        let delay = self.reply_delay;
        let events = self.events.clone();
        tokio::spawn(async move {
            let reply = match gateway.send(&phone, &text).await {
                Ok(reply) => {
                    // Hold the reply briefly so the exchange reads like a
                    // conversation rather than an echo
                    tokio::time::sleep(delay).await;
                    reply
                }
                Err(err) => {
                    warn!(%phone, "send failed: {:#}", err);
                    OFFLINE_REPLY.to_string()
                }
            };
            let _ = events.send(AppEvent::Reply { phone, text: reply });
        });
    }

    /// Route a bot reply into its conversation. Keyed by phone, so replies
    /// for a background conversation never leak into the visible thread.
    pub fn deliver_reply(&mut self, phone: &str, text: &str) {
        debug!(%phone, "reply delivered");

        if let Some(count) = self.pending.get_mut(phone) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.pending.remove(phone);
            }
        }

        self.store.append(phone, text, Sender::Bot);
        if self.store.current() == Some(phone) {
            self.scroll_thread_to_bottom();
        }
    }

    pub fn is_sending(&self, phone: &str) -> bool {
        self.pending.get(phone).copied().unwrap_or(0) > 0
    }

    /// Whether the visible thread should show the typing indicator.
    pub fn selected_is_typing(&self) -> bool {
        self.store.current().map(|p| self.is_sending(p)).unwrap_or(false)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if !self.pending.is_empty() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Thread scrolling. The wrap estimate mirrors the renderer's Paragraph
    // wrapping closely enough to keep the newest entry visible.
    pub fn thread_total_lines(&self) -> u16 {
        let Some(conv) = self.store.selected() else {
            return 0;
        };

        let wrap_width = if self.thread_width > 0 {
            self.thread_width as usize
        } else {
            50
        };

        let mut total: u16 = 0;
        for msg in &conv.messages {
            total += 1; // Sender and timestamp line
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total += 1;
                } else {
                    total += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total += 1; // Blank line after message
        }

        if self.selected_is_typing() {
            total += 2; // "Bot:" + "Typing..."
        }

        total
    }

    pub fn scroll_thread_to_bottom(&mut self) {
        let total = self.thread_total_lines();
        let visible = if self.thread_height > 0 {
            self.thread_height
        } else {
            20
        };
        self.thread_scroll = total.saturating_sub(visible);
    }

    pub fn scroll_thread_up(&mut self) {
        self.thread_scroll = self.thread_scroll.saturating_sub(1);
    }

    pub fn scroll_thread_down(&mut self) {
        let max_scroll = self.thread_total_lines().saturating_sub(self.thread_height);
        if self.thread_scroll < max_scroll {
            self.thread_scroll = self.thread_scroll.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::DEFAULT_REPLY;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn test_app() -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        // Port 1 refuses connections, so sends fail fast unless a test
        // swaps in a live endpoint.
        let config = Config {
            endpoint: Some("http://127.0.0.1:1/message".to_string()),
            phone_prefix: None,
            reply_delay_ms: Some(0),
        };
        (App::new(&config, tx), rx)
    }

    fn open(app: &mut App, phone: &str) {
        app.phone_input = phone.to_string();
        app.open_phone();
    }

    #[test]
    fn test_open_phone_creates_selects_and_clears_input() {
        let (mut app, _rx) = test_app();
        open(&mut app, "+40740000000");

        assert_eq!(app.store.current(), Some("+40740000000"));
        assert!(app.store.selected().unwrap().messages.is_empty());
        assert!(app.phone_input.is_empty());
        assert_eq!(app.focus, FocusPane::MessageInput);
        assert_eq!(app.list_state.selected(), Some(0));
        assert!(app.status.is_none());
    }

    #[test]
    fn test_open_phone_rejects_invalid_input() {
        let (mut app, _rx) = test_app();

        open(&mut app, "0740000000");
        assert_eq!(app.status.as_deref(), Some("Phone must start with +407"));
        assert!(app.store.is_empty());
        assert_eq!(app.store.current(), None);

        app.phone_input.clear();
        app.open_phone();
        assert_eq!(app.status.as_deref(), Some("Please enter a phone number"));
        assert!(app.store.is_empty());
    }

    #[test]
    fn test_open_existing_phone_just_reopens_it() {
        let (mut app, _rx) = test_app();
        open(&mut app, "+40740000000");
        app.store.append("+40740000000", "hello", Sender::User);

        open(&mut app, "+40740000000");
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.selected().unwrap().messages.len(), 1);
    }

    #[test]
    fn test_list_navigation_moves_selection() {
        let (mut app, _rx) = test_app();
        open(&mut app, "+40740000001");
        open(&mut app, "+40740000002");
        open(&mut app, "+40740000003");

        // Opening left the last one selected
        assert_eq!(app.store.current(), Some("+40740000003"));

        app.list_up();
        assert_eq!(app.store.current(), Some("+40740000002"));
        app.list_up();
        app.list_up(); // clamped at the top
        assert_eq!(app.store.current(), Some("+40740000001"));

        app.list_down();
        assert_eq!(app.store.current(), Some("+40740000002"));
    }

    #[tokio::test]
    async fn test_send_records_user_message_immediately() {
        let (mut app, _rx) = test_app();
        open(&mut app, "+40740000000");
        app.message_input = "hello".to_string();

        app.send_message();

        let conv = app.store.selected().unwrap();
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].text, "hello");
        assert_eq!(conv.messages[0].sender, Sender::User);
        assert!(app.message_input.is_empty());
        assert!(app.is_sending("+40740000000"));
    }

    #[tokio::test]
    async fn test_send_without_selection_or_text_is_a_no_op() {
        let (mut app, mut rx) = test_app();

        app.message_input = "hello".to_string();
        app.send_message(); // no conversation selected
        assert!(app.store.is_empty());

        open(&mut app, "+40740000000");
        app.message_input = "   ".to_string();
        app.send_message(); // nothing to send
        assert!(app.store.selected().unwrap().messages.is_empty());

        // Neither attempt dispatched a task
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transport_failure_appends_one_fallback_bot_message() {
        let (mut app, mut rx) = test_app();
        open(&mut app, "+40740000000");
        app.message_input = "hello".to_string();
        app.send_message();

        let event = rx.recv().await.unwrap();
        let AppEvent::Reply { phone, text } = event else {
            panic!("expected a reply event");
        };
        assert_eq!(phone, "+40740000000");
        assert_eq!(text, OFFLINE_REPLY);

        app.deliver_reply(&phone, &text);

        let conv = app.store.selected().unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[1].sender, Sender::Bot);
        assert_eq!(conv.messages[1].text, OFFLINE_REPLY);
        assert!(!app.is_sending("+40740000000"));

        // Exactly one reply per send
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_sends_route_replies_by_phone() {
        let (mut app, mut rx) = test_app();
        open(&mut app, "+40740000001");
        app.message_input = "first".to_string();
        app.send_message();

        open(&mut app, "+40740000002");
        app.message_input = "second".to_string();
        app.send_message();

        for _ in 0..2 {
            let AppEvent::Reply { phone, text } = rx.recv().await.unwrap() else {
                panic!("expected a reply event");
            };
            app.deliver_reply(&phone, &text);
        }

        for phone in ["+40740000001", "+40740000002"] {
            let conv = app.store.get(phone).unwrap();
            assert_eq!(conv.messages.len(), 2, "conversation {phone}");
            assert_eq!(conv.messages[0].sender, Sender::User);
            assert_eq!(conv.messages[1].sender, Sender::Bot);
        }
        assert!(app.pending.is_empty());
    }

    #[tokio::test]
    async fn test_successful_send_appends_server_reply() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"reply": "Please provide just the username."}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = Config {
            endpoint: Some(format!("http://{}/message", addr)),
            phone_prefix: None,
            reply_delay_ms: Some(0),
        };
        let mut app = App::new(&config, tx);
        open(&mut app, "+40740000000");
        app.message_input = "hello".to_string();
        app.send_message();

        let AppEvent::Reply { phone, text } = rx.recv().await.unwrap() else {
            panic!("expected a reply event");
        };
        assert_eq!(text, "Please provide just the username.");
        app.deliver_reply(&phone, &text);

        let conv = app.store.selected().unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[1].text, "Please provide just the username.");
        assert_ne!(conv.messages[1].text, DEFAULT_REPLY);
    }

    #[test]
    fn test_typing_indicator_follows_pending_sends() {
        let (mut app, _rx) = test_app();
        open(&mut app, "+40740000000");
        assert!(!app.selected_is_typing());

        app.pending.insert("+40740000000".to_string(), 1);
        assert!(app.selected_is_typing());

        // Another conversation's send does not animate this thread
        open(&mut app, "+40740000001");
        assert!(!app.selected_is_typing());
    }
}
