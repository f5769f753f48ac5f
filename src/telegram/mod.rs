pub mod client;
pub mod types;

pub use client::TelegramClient;
pub use types::{Message, ParseMode, ReplyKeyboardMarkup, Update, User};

use crate::transport::{Actor, EventKind, InboundEvent};

/// Turn a Bot API update into an inbound event.
///
/// Updates that are not messages, and messages without a sender (channel
/// posts), yield `None`.
pub fn event_from_update(update: Update) -> Option<InboundEvent> {
    let message = update.message?;
    let from = message.from.as_ref()?;

    let actor = Actor {
        id: from.id,
        display_name: from.first_name.clone(),
    };

    let kind = match (message.command(), message.text.as_deref()) {
        (Some(name), _) => EventKind::Command(name.to_string()),
        (None, Some(text)) if !text.is_empty() => EventKind::FreeText(text.to_string()),
        _ => EventKind::Unsupported,
    };

    Some(InboundEvent {
        actor,
        chat_id: message.chat.id,
        kind,
    })
}
