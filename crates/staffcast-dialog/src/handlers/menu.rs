//! Admin menu handlers.

use std::sync::Arc;

use staffcast_core::Result;
use staffcast_core::types::IncomingEvent;
use staffcast_telegram::keyboard::{inline_keyboard, reply_keyboard};
use staffcast_telegram::types::OutgoingMessage;

use super::{require_admin, require_admin_silent};
use crate::callback::{CallbackAction, UpdateKind};
use crate::engine::DialogCtx;
use crate::state::StateId;

/// UTF-8-safe label truncation for inline buttons.
fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let head: String = label.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Open the admin menu and reset the actor's wizard session.
pub async fn open(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;

    ctx.actor_states.set(event.actor.id, StateId::Menu);

    let buttons: Vec<String> = [
        "New mailing",
        "Active mailings",
        "Refresh data",
        "Restart bot",
        "Close",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    ctx.outbox
        .send(
            OutgoingMessage::new(event.actor.id, "Admin menu opened.")
                .with_markup(reply_keyboard(&buttons, 2)),
        )
        .await?;

    let mut session = ctx.sessions.get(event.actor.id);
    session.reset();
    ctx.sessions.set(event.actor.id, session);
    Ok(())
}

/// List open mailings as inline buttons carrying statistics payloads.
pub async fn active_mailings(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;

    let mailings = ctx.mailings.active().await?;

    if mailings.is_empty() {
        ctx.outbox
            .send(OutgoingMessage::new(
                event.chat_id,
                "📨 Active mailings\nNone at the moment.",
            ))
            .await?;
        return Ok(());
    }

    let mut rows = Vec::new();
    let mut row = Vec::new();
    for mailing in &mailings {
        let label = truncate_label(&format!("ID:{} | {}", mailing.id, mailing.cohort_name), 30);
        row.push((
            label,
            CallbackAction::StatisticWithButtonDelete {
                mailing_id: mailing.id,
            }
            .to_payload(),
        ));
        if row.len() == 3 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    ctx.outbox
        .send(
            OutgoingMessage::new(event.chat_id, "📨 Active mailings")
                .with_markup(inline_keyboard(rows)),
        )
        .await?;
    Ok(())
}

/// Ask which dataset to refresh.
pub async fn refresh_prompt(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin_silent(&ctx, &event)?;

    let keyboard = inline_keyboard(vec![vec![
        (
            "Web form data".to_string(),
            CallbackAction::Update {
                update_type: UpdateKind::WebForm,
            }
            .to_payload(),
        ),
        (
            "Admins & cohorts".to_string(),
            CallbackAction::Update {
                update_type: UpdateKind::Admins,
            }
            .to_payload(),
        ),
    ]]);

    ctx.outbox
        .send(
            OutgoingMessage::new(event.chat_id, "What should be refreshed?")
                .with_markup(keyboard),
        )
        .await?;
    Ok(())
}

/// Restart the process; the supervisor brings it back up.
pub async fn restart(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;

    ctx.outbox
        .send(OutgoingMessage::new(
            event.actor.id,
            "Restarting the bot.",
        ))
        .await?;
    tracing::warn!(actor = event.actor.id, "restart requested from the admin menu");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_label("short", 30), "short");
        let long = "ID:12 | a-very-long-cohort-name-indeed";
        let label = truncate_label(long, 30);
        assert_eq!(label.chars().count(), 30);
        assert!(label.ends_with("..."));
    }
}
