//! Callback executors — the global callback catch-all and the actions it
//! dispatches to.

use std::sync::Arc;

use staffcast_core::types::{EventKind, IncomingEvent};
use staffcast_core::{Result, StaffcastError};
use staffcast_telegram::keyboard::inline_keyboard;
use staffcast_telegram::types::OutgoingMessage;

use super::{MESSAGE_LIMIT, require_admin, split_for_sending};
use crate::callback::{CallbackAction, UpdateKind};
use crate::engine::DialogCtx;

/// Parse the payload of any otherwise-unrouted button press and run it.
pub async fn global_callback(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    let EventKind::Callback {
        callback_id,
        payload,
        ..
    } = &event.kind
    else {
        return Err(StaffcastError::Dialog(
            "callback catch-all invoked for a non-callback event".into(),
        ));
    };

    let action = match CallbackAction::parse(payload) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(actor = event.actor.id, payload = %payload, "bad callback payload: {e}");
            ctx.outbox
                .show_alert(callback_id.clone(), "Unknown command".into())
                .await?;
            return Err(e);
        }
    };

    let result = match &action {
        CallbackAction::Mailing {
            mailing_id,
            status_id,
        } => confirm_receipt(&ctx, &event, *mailing_id, *status_id).await,
        CallbackAction::Statistic { mailing_id } => {
            send_statistics(&ctx, &event, *mailing_id, false).await
        }
        CallbackAction::StatisticWithButtonDelete { mailing_id } => {
            send_statistics(&ctx, &event, *mailing_id, true).await
        }
        CallbackAction::StatisticDeleting { mailing_id } => {
            cancel_mailing(&ctx, &event, *mailing_id).await
        }
        CallbackAction::Notification { notification_uid } => {
            ctx.notifications
                .acknowledge(notification_uid, &event.actor)
                .await
        }
        CallbackAction::Update { update_type } => run_update(&ctx, &event, *update_type).await,
    };

    ctx.outbox.answer_callback(callback_id.clone()).await?;

    if let Err(e) = &result {
        tracing::error!(actor = event.actor.id, ?action, "callback action failed: {e}");
    }
    result
}

/// A recipient pressed the confirmation button under a mailing message.
async fn confirm_receipt(
    ctx: &Arc<DialogCtx>,
    event: &IncomingEvent,
    mailing_id: i64,
    status_id: i64,
) -> Result<()> {
    let status = ctx.mailings.mark_reacted(status_id).await?;
    let (mailing, _) = ctx.mailings.with_statuses(mailing_id).await?;

    let updated = format!(
        "{}\n\n✅ Confirmation recorded. Thank you!",
        mailing.text
    );
    ctx.outbox
        .edit_message(event.chat_id, status.message_id, updated)
        .await
}

/// Per-recipient delivery summary, optionally with a cancel button.
async fn send_statistics(
    ctx: &Arc<DialogCtx>,
    event: &IncomingEvent,
    mailing_id: i64,
    with_cancel: bool,
) -> Result<()> {
    require_admin(ctx, event).await?;

    let (mailing, statuses) = ctx.mailings.with_statuses(mailing_id).await?;

    let mut text = format!("Mailing\nID: {}\nKind: {}\n", mailing.id, mailing.kind);
    if !mailing.cohort_name.is_empty() {
        text.push_str(&format!("Cohort: {}\n", mailing.cohort_name));
    }
    if mailing.text.is_empty() {
        text.push_str("\nThe message text is empty.\n");
    } else {
        text.push_str(&format!("\nMessage text:\n\n{}\n", mailing.text));
    }
    text.push_str("\nPer-recipient summary:\n");
    for status in &statuses {
        text.push_str(&format!(
            "{} {}\n",
            status.display_name,
            status.summary_glyph()
        ));
    }

    for chunk in split_for_sending(&text, MESSAGE_LIMIT) {
        let mut msg = OutgoingMessage::new(event.actor.id, chunk);
        if with_cancel {
            msg = msg.with_markup(inline_keyboard(vec![vec![(
                "Cancel mailing".to_string(),
                CallbackAction::StatisticDeleting { mailing_id }.to_payload(),
            )]]));
        }
        ctx.outbox.send(msg).await?;
    }
    Ok(())
}

/// Cancel a mailing: delete delivered messages, then the record.
async fn cancel_mailing(
    ctx: &Arc<DialogCtx>,
    event: &IncomingEvent,
    mailing_id: i64,
) -> Result<()> {
    require_admin(ctx, event).await?;

    let (_, statuses) = ctx.mailings.with_statuses(mailing_id).await?;
    for status in statuses.iter().filter(|s| s.sent) {
        if let Err(e) = ctx
            .outbox
            .delete_message(status.chat_id, status.message_id)
            .await
        {
            tracing::warn!(
                mailing_id,
                chat_id = status.chat_id,
                "could not delete mailing message: {e}"
            );
        }
    }

    ctx.mailings.delete(mailing_id).await?;
    ctx.outbox
        .send(OutgoingMessage::new(
            event.chat_id,
            format!("🗑 Mailing {mailing_id} deleted."),
        ))
        .await?;
    Ok(())
}

/// Run a data refresh through the spreadsheet collaborator.
async fn run_update(
    ctx: &Arc<DialogCtx>,
    event: &IncomingEvent,
    kind: UpdateKind,
) -> Result<()> {
    let notice = match kind {
        UpdateKind::Admins => {
            "Data refresh started.\n\nThe admin menu may be unavailable for a while."
        }
        UpdateKind::WebForm => {
            "Data refresh started.\n\nThe form may be unavailable for a while."
        }
    };
    let started = ctx
        .outbox
        .send(OutgoingMessage::new(event.chat_id, notice))
        .await?;

    let outcome = match kind {
        UpdateKind::WebForm => ctx.refresh.refresh_web_forms().await,
        UpdateKind::Admins => match ctx.refresh.refresh_roster().await {
            Ok(snapshot) => {
                ctx.roster.replace(snapshot);
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    let reply = match &outcome {
        Ok(()) => OutgoingMessage::new(event.chat_id, "Data refreshed.")
            .reply_to(started.message_id),
        Err(e) => OutgoingMessage::new(event.chat_id, format!("Data refresh failed: {e}")),
    };
    ctx.outbox.send(reply).await?;
    outcome
}
