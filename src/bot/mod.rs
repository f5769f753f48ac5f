pub mod commands;
pub mod handler;
pub mod pending;

pub use pending::PendingChoices;

use crate::auth::AllowList;
use crate::config::AppConfig;
use crate::telegram::ParseMode;
use crate::transport::{ChatTransport, InboundEvent};
use crate::vpn::{ClientNamer, Generator};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Shared data accessible while handling any event.
///
/// Read-only apart from the naming counters and the optional pending-menu
/// table, both of which are internally synchronized.
pub struct BotContext {
    pub allow_list: AllowList,
    pub transport: Arc<dyn ChatTransport>,
    pub generator: Arc<dyn Generator>,
    pub namer: ClientNamer,
    /// Present only when a choice must follow a `/get_vpn` menu
    pub pending: Option<PendingChoices>,
}

impl BotContext {
    pub fn new(
        allow_list: AllowList,
        transport: Arc<dyn ChatTransport>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            allow_list,
            transport,
            generator,
            namer: ClientNamer::new(),
            pending: None,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn ChatTransport>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let ctx = Self::new(
            AllowList::from_operator(config.telegram.allowed_user_id),
            transport,
            generator,
        );
        if config.bot.require_menu {
            ctx.with_menu_required(Duration::from_secs(config.bot.menu_ttl_secs))
        } else {
            ctx
        }
    }

    /// Only accept a VPN choice within `ttl` of showing the menu
    pub fn with_menu_required(mut self, ttl: Duration) -> Self {
        self.pending = Some(PendingChoices::new(ttl));
        self
    }
}

/// Send a text reply, logging instead of failing.
pub(crate) async fn reply(ctx: &BotContext, chat_id: i64, text: &str, mode: Option<ParseMode>) {
    if let Err(e) = ctx.transport.send_text(chat_id, text, mode).await {
        error!("Failed to send message to chat {}: {}", chat_id, e);
    }
}

/// Session loop: handle events until the sender side closes.
///
/// With `max_concurrent_events == 1` events are handled strictly one after
/// another in arrival order.
pub async fn run(ctx: &BotContext, mut events: mpsc::Receiver<InboundEvent>, max_concurrent_events: usize) {
    info!(
        "Session loop started (max {} concurrent events)",
        max_concurrent_events
    );

    futures::stream::poll_fn(|cx| events.poll_recv(cx))
        .for_each_concurrent(max_concurrent_events.max(1), |event| {
            handler::handle_event(ctx, event)
        })
        .await;

    info!("Session loop stopped");
}
