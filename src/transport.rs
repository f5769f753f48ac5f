//! Chat-platform-neutral view of inbound events and outbound replies.

use crate::error::AppResult;
use crate::telegram::ParseMode;
use async_trait::async_trait;

/// Who sent an event. Derived fresh from every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name`, without the slash or any `@bot` suffix
    Command(String),
    /// Anything else with text in it
    FreeText(String),
    /// Stickers, photos and other messages without text
    Unsupported,
}

/// One message as the session loop sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub actor: Actor,
    /// Conversation the replies go to
    pub chat_id: i64,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn command<S: Into<String>>(actor: Actor, chat_id: i64, name: S) -> Self {
        Self {
            actor,
            chat_id,
            kind: EventKind::Command(name.into()),
        }
    }

    pub fn text<S: Into<String>>(actor: Actor, chat_id: i64, text: S) -> Self {
        Self {
            actor,
            chat_id,
            kind: EventKind::FreeText(text.into()),
        }
    }
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> AppResult<()>;

    /// Prompt with one button per option, in order
    async fn send_choice(&self, chat_id: i64, prompt: &str, options: &[&str]) -> AppResult<()>;

    async fn send_file(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> AppResult<()>;
}
