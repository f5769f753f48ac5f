use super::{commands, reply, BotContext};
use crate::error::RequestError;
use crate::transport::{Actor, EventKind, InboundEvent};
use crate::vpn::{GenerationOutcome, GenerationRequest, VpnKind};
use tracing::{debug, error, info, warn};

/// Handle one inbound event to completion.
///
/// Never fails: every error ends here, is logged and, where the user should
/// know about it, answered.
pub async fn handle_event(ctx: &BotContext, event: InboundEvent) {
    if let Err(err) = process(ctx, &event).await {
        report(ctx, &event, err).await;
    }
}

async fn process(ctx: &BotContext, event: &InboundEvent) -> Result<(), RequestError> {
    // Checked before anything else, for every kind of event.
    if !ctx.allow_list.is_authorized(event.actor.id) {
        return Err(RequestError::AuthorizationDenied {
            actor_id: event.actor.id,
        });
    }

    match &event.kind {
        EventKind::Command(name) => {
            commands::execute(ctx, &event.actor, event.chat_id, name).await
        }
        EventKind::FreeText(text) => handle_vpn_choice(ctx, &event.actor, event.chat_id, text).await,
        EventKind::Unsupported => {
            debug!("Ignoring message without text from {}", event.actor.id);
            Ok(())
        }
    }
}

/// Free text is a VPN choice: generate, deliver, clean up.
async fn handle_vpn_choice(
    ctx: &BotContext,
    actor: &Actor,
    chat_id: i64,
    text: &str,
) -> Result<(), RequestError> {
    let kind = VpnKind::from_label(text)
        .ok_or_else(|| RequestError::UnrecognizedChoice(text.to_string()))?;

    if let Some(pending) = &ctx.pending {
        if !pending.take(actor.id) {
            return Err(RequestError::ChoiceNotOffered(text.to_string()));
        }
    }

    let request = GenerationRequest {
        actor_id: actor.id,
        chat_id,
        kind,
        client_name: ctx.namer.next(actor.id, kind),
    };
    info!(
        "Generating {} config {} for user {}",
        kind, request.client_name, actor.id
    );

    reply(
        ctx,
        chat_id,
        &format!("Generating your {} config, please wait...", kind),
        None,
    )
    .await;

    let location = match ctx.generator.generate(&request).await {
        GenerationOutcome::Success(location) => location,
        GenerationOutcome::Failure(diagnostic) => {
            return Err(RequestError::GenerationFailed {
                client_name: request.client_name,
                diagnostic,
            });
        }
    };

    let artifact = location.load().await?;

    let caption = format!("Your {} config is ready! Save it and import it into your client.", kind);
    if let Err(e) = ctx
        .transport
        .send_file(chat_id, &artifact.file_name, artifact.bytes, &caption)
        .await
    {
        // The user already knows generation went through; nothing more to say.
        error!("{}", RequestError::DeliveryFailed(e));
    }

    location.cleanup().await;
    info!("Sent and cleaned up config for {}", request.client_name);
    Ok(())
}

async fn report(ctx: &BotContext, event: &InboundEvent, err: RequestError) {
    match &err {
        RequestError::AuthorizationDenied { .. } => warn!(
            "Unauthorized access attempt by user ID: {} ({})",
            event.actor.id, event.actor.display_name
        ),
        RequestError::UnrecognizedCommand(_)
        | RequestError::UnrecognizedChoice(_)
        | RequestError::ChoiceNotOffered(_) => debug!("User {}: {}", event.actor.id, err),
        _ => error!("Request from user {} failed: {}", event.actor.id, err),
    }

    if let Some(text) = err.user_message() {
        reply(ctx, event.chat_id, &text, None).await;
    }
}
