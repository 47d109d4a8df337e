//! Business handlers wired into the state registry.

pub mod callbacks;
pub mod menu;
pub mod misc;
pub mod wizard;

use std::sync::Arc;

use staffcast_core::types::IncomingEvent;
use staffcast_core::{Result, StaffcastError};
use staffcast_telegram::keyboard::remove_keyboard;
use staffcast_telegram::types::OutgoingMessage;

use crate::engine::DialogCtx;

/// Platform hard limit for one message.
pub const MESSAGE_LIMIT: usize = 4096;

/// Gate a handler on admin rights, telling the actor when the check fails.
pub async fn require_admin(ctx: &Arc<DialogCtx>, event: &IncomingEvent) -> Result<()> {
    if ctx.roster.is_admin(event.actor.id) {
        return Ok(());
    }
    let msg = OutgoingMessage::new(
        event.actor.id,
        "Check failed ❌\nYou are not an admin. Ask the operations team for access.",
    )
    .with_markup(remove_keyboard());
    let _ = ctx.outbox.send(msg).await;
    Err(StaffcastError::NotAdmin(event.actor.id))
}

/// Admin gate with no user-visible response.
pub fn require_admin_silent(ctx: &Arc<DialogCtx>, event: &IncomingEvent) -> Result<()> {
    if ctx.roster.is_admin(event.actor.id) {
        Ok(())
    } else {
        Err(StaffcastError::NotAdmin(event.actor.id))
    }
}

/// Split a long text into sendable chunks, preferring newline boundaries.
pub fn split_for_sending(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let cut = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let head = &rest[..cut];
        let mut break_at = head
            .rfind('\n')
            .or_else(|| head.rfind(' '))
            .unwrap_or(cut);
        if break_at == 0 {
            break_at = cut;
        }
        parts.push(rest[..break_at].to_string());
        rest = rest[break_at..].trim_start_matches(['\n', ' ']);
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}
