use chrono::Local;
use indexmap::IndexMap;
use thiserror::Error;

/// Sidebar previews are cut to this many characters.
pub const PREVIEW_LEN: usize = 30;

const NEW_CONVERSATION_PREVIEW: &str = "New conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    pub time: String,
}

impl Message {
    fn now(text: &str, sender: Sender) -> Self {
        Self {
            text: text.to_string(),
            sender,
            time: Local::now().format("%H:%M").to_string(),
        }
    }
}

/// One phone number's message history plus the cached sidebar preview.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub preview: String,
}

impl Conversation {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            preview: NEW_CONVERSATION_PREVIEW.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Please enter a phone number")]
    EmptyPhone,
    #[error("Phone must start with {0}")]
    BadPrefix(String),
}

/// In-memory chat state: conversations keyed by phone number, in the order
/// they were first opened, plus the selection pointer for the thread view.
pub struct ConversationStore {
    prefix: String,
    conversations: IndexMap<String, Conversation>,
    current: Option<String>,
}

impl ConversationStore {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            conversations: IndexMap::new(),
            current: None,
        }
    }

    /// Create an empty conversation for `phone` if absent. Idempotent.
    /// Rejects empty phones and phones missing the country prefix without
    /// touching the store.
    pub fn ensure(&mut self, phone: &str) -> Result<(), StoreError> {
        if phone.is_empty() {
            return Err(StoreError::EmptyPhone);
        }
        if !phone.starts_with(&self.prefix) {
            return Err(StoreError::BadPrefix(self.prefix.clone()));
        }
        self.conversations
            .entry(phone.to_string())
            .or_insert_with(Conversation::new);
        Ok(())
    }

    /// Append a message with the current local timestamp, creating the
    /// conversation if absent, and recompute the sidebar preview.
    pub fn append(&mut self, phone: &str, text: &str, sender: Sender) {
        let conv = self
            .conversations
            .entry(phone.to_string())
            .or_insert_with(Conversation::new);
        conv.messages.push(Message::now(text, sender));
        conv.preview = preview_of(text);
    }

    /// Point the thread view at `phone`. No validation beyond what `ensure`
    /// already did; selecting the same phone again is a no-op.
    pub fn select(&mut self, phone: &str) {
        self.current = Some(phone.to_string());
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The conversation the selection pointer refers to, if any.
    pub fn selected(&self) -> Option<&Conversation> {
        self.current
            .as_ref()
            .and_then(|phone| self.conversations.get(phone))
    }

    pub fn get(&self, phone: &str) -> Option<&Conversation> {
        self.conversations.get(phone)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Conversation)> {
        self.conversations.iter()
    }

    pub fn phone_at(&self, index: usize) -> Option<&str> {
        self.conversations
            .get_index(index)
            .map(|(phone, _)| phone.as_str())
    }

    pub fn index_of(&self, phone: &str) -> Option<usize> {
        self.conversations.get_index_of(phone)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

/// Truncate message text for the sidebar. Counts characters, not bytes, so
/// multi-byte input cannot split a code point.
fn preview_of(text: &str) -> String {
    if text.chars().count() > PREVIEW_LEN {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
