use super::{reply, BotContext};
use crate::error::RequestError;
use crate::telegram::ParseMode;
use crate::transport::Actor;
use crate::vpn::VpnKind;
use tracing::error;

const HELP_TEXT: &str = "Available commands:\n\
    /get_vpn - get a new VPN config\n\
    /my_id - show your Telegram ID (for access setup)\n\
    If you have any questions, contact the administrator.";

const CHOICE_PROMPT: &str = "Which VPN type would you like?";

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    MyId,
    GetVpn,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "my_id" => Some(Self::MyId),
            "get_vpn" => Some(Self::GetVpn),
            _ => None,
        }
    }
}

/// Run the command named `name` on behalf of an authorized actor
pub async fn execute(
    ctx: &BotContext,
    actor: &Actor,
    chat_id: i64,
    name: &str,
) -> Result<(), RequestError> {
    let command =
        Command::parse(name).ok_or_else(|| RequestError::UnrecognizedCommand(name.to_string()))?;

    match command {
        Command::Start => {
            let text = format!(
                "Hi, {}! I hand out VPN configs.\n\
                Use /get_vpn to get a new config.\n\
                Use /help for more information.",
                actor.display_name
            );
            reply(ctx, chat_id, &text, None).await;
        }
        Command::Help => reply(ctx, chat_id, HELP_TEXT, None).await,
        Command::MyId => {
            let text = format!("Your Telegram ID: `{}`", actor.id);
            reply(ctx, chat_id, &text, Some(ParseMode::MarkdownV2)).await;
        }
        Command::GetVpn => show_vpn_menu(ctx, actor, chat_id).await,
    }

    Ok(())
}

async fn show_vpn_menu(ctx: &BotContext, actor: &Actor, chat_id: i64) {
    let options = VpnKind::ALL.map(|kind| kind.label());
    if let Err(e) = ctx.transport.send_choice(chat_id, CHOICE_PROMPT, &options).await {
        error!("Failed to send VPN menu to chat {}: {}", chat_id, e);
        return;
    }
    if let Some(pending) = &ctx.pending {
        pending.offer(actor.id);
    }
}
