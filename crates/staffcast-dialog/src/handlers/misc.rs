//! Greeting, help, and menu-close handlers.

use std::sync::Arc;

use staffcast_core::Result;
use staffcast_core::types::IncomingEvent;
use staffcast_telegram::keyboard::remove_keyboard;
use staffcast_telegram::types::OutgoingMessage;

use super::{MESSAGE_LIMIT, require_admin, split_for_sending};
use crate::engine::DialogCtx;

/// `/start`: greeting, then re-pin the instruction message.
pub async fn start(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    let chat_id = event.chat_id;
    let cfg = &ctx.telegram;

    if !cfg.start_sticker_id.is_empty() {
        ctx.outbox
            .send_sticker(chat_id, cfg.start_sticker_id.clone())
            .await?;
    }

    ctx.outbox
        .send(OutgoingMessage::new(chat_id, cfg.start_message.clone()))
        .await?;

    ctx.outbox.unpin_all(chat_id).await?;

    let pinned = ctx
        .outbox
        .send(OutgoingMessage::new(chat_id, cfg.pin_message.clone()))
        .await?;
    ctx.outbox
        .pin_message(chat_id, pinned.message_id, true)
        .await?;

    Ok(())
}

/// `/help`: list every registered text command with its description.
pub async fn help(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;

    let mut lines = vec!["All commands:".to_string(), String::new()];
    if let Some(registry) = ctx.registry() {
        let mut index = 1;
        for (_, state) in registry.iter() {
            let mut commands: Vec<_> = state.text_routes.iter().collect();
            commands.sort_by(|a, b| a.0.cmp(b.0));
            for (command, handler) in commands {
                if handler.description.is_empty() {
                    continue;
                }
                lines.push(format!("{index}) {command} - {}", handler.description));
                index += 1;
            }
        }
    }

    for chunk in split_for_sending(&lines.join("\n"), MESSAGE_LIMIT) {
        ctx.outbox
            .send(OutgoingMessage::new(event.actor.id, chunk))
            .await?;
    }
    Ok(())
}

/// "close": drop the keyboard and the actor's state.
pub async fn close(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    ctx.outbox
        .send(
            OutgoingMessage::new(event.actor.id, "Menu closed.").with_markup(remove_keyboard()),
        )
        .await?;
    ctx.actor_states.clear(event.actor.id);
    Ok(())
}

/// Global text fallback: plain chatter outside any flow is ignored.
pub async fn global_text_fallthrough(_ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    tracing::debug!(
        actor = event.actor.id,
        text = event.text().unwrap_or_default(),
        "unrouted text outside any flow"
    );
    Ok(())
}
