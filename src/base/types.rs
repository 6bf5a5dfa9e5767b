pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A raw inbound message, as yielded by a chat transport.
///
/// `chat_id` is `None` for updates that carry no message (edits, callbacks, etc.).
/// Those still count towards the fetch offset, but never become events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Monotonically increasing update identifier.
    pub id: i64,
    /// The chat the message was sent from, and the one replies go to.
    pub chat_id: Option<i64>,
    /// Message text; empty for non-text messages.
    pub text: String,
}

impl RawMessage {
    pub fn new(id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            chat_id: Some(chat_id),
            text: text.into(),
        }
    }

    /// An update that carries no message.
    pub fn empty(id: i64) -> Self {
        Self { id, chat_id: None, text: String::new() }
    }
}
