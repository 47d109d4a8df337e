//! Mailing dispatch and expiry loops.
//!
//! The dispatch loop drains pending mailings through the delivery resolver,
//! one recipient at a time; pacing comes from the message scheduler, not
//! from here. The expiry loop reports ignored mailings and cleans them up.

use std::sync::Arc;
use std::time::Duration;

use staffcast_core::config::MailingConfig;
use staffcast_core::Result;
use staffcast_telegram::keyboard::inline_keyboard;
use staffcast_telegram::types::OutgoingMessage;

use crate::callback::CallbackAction;
use crate::engine::DialogCtx;
use crate::handlers::{MESSAGE_LIMIT, split_for_sending};
use crate::model::{DeliveryStatus, MailingRecord};
use crate::services::DeliveryOutcome;

/// Spawn the dispatch loop.
pub fn spawn_dispatch(ctx: Arc<DialogCtx>, cfg: MailingConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let idle = Duration::from_secs(cfg.dispatch_idle_secs.max(1));
        tracing::info!(idle_secs = idle.as_secs(), "mailing dispatch loop started");
        loop {
            match deliver_pending(&ctx).await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(idle).await,
                Err(e) => {
                    tracing::error!("mailing dispatch failed: {e}");
                    if let Err(notify_err) = ctx
                        .outbox
                        .notify_ops(format!("Mailing dispatch failed: {e}"))
                        .await
                    {
                        tracing::error!("could not escalate dispatch failure: {notify_err}");
                    }
                    tokio::time::sleep(idle).await;
                }
            }
        }
    })
}

/// Spawn the expiry loop.
pub fn spawn_expiry(ctx: Arc<DialogCtx>, cfg: MailingConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let lifetime = Duration::from_secs(cfg.lifetime_hours * 3600);
        let mut interval =
            tokio::time::interval(Duration::from_secs(cfg.expiry_sweep_minutes.max(1) * 60));
        tracing::info!(
            lifetime_hours = cfg.lifetime_hours,
            "mailing expiry loop started"
        );
        loop {
            interval.tick().await;
            if let Err(e) = expire_once(&ctx, lifetime).await {
                tracing::error!("mailing expiry sweep failed: {e}");
            }
        }
    })
}

/// Deliver the next pending mailing, if any. Returns whether one was found.
pub async fn deliver_pending(ctx: &Arc<DialogCtx>) -> Result<bool> {
    let Some((mailing, statuses)) = ctx.mailings.next_pending().await? else {
        return Ok(false);
    };
    deliver_mailing(ctx, &mailing, &statuses).await?;
    Ok(true)
}

async fn deliver_mailing(
    ctx: &Arc<DialogCtx>,
    mailing: &MailingRecord,
    statuses: &[DeliveryStatus],
) -> Result<()> {
    tracing::info!(
        mailing_id = mailing.id,
        recipients = statuses.len(),
        "delivering mailing"
    );

    for status in statuses.iter().filter(|s| !s.sent && !s.failed) {
        let mut msg = OutgoingMessage::new(status.chat_id, mailing.text.clone());
        if mailing.with_button {
            msg.text.push_str("\n\nTap the button to confirm receipt ⬇️");
            msg = msg.with_markup(inline_keyboard(vec![vec![(
                "Got it ✔".to_string(),
                CallbackAction::Mailing {
                    mailing_id: mailing.id,
                    status_id: status.id,
                }
                .to_payload(),
            )]]));
        }

        match ctx.outbox.send_with_chat_fallback(msg).await {
            Ok((resolved_chat_id, sent)) => {
                ctx.mailings
                    .record_delivery(
                        status.id,
                        DeliveryOutcome::Delivered {
                            chat_id: resolved_chat_id,
                            message_id: sent.message_id,
                        },
                    )
                    .await?;
            }
            Err(e) => {
                tracing::error!(
                    mailing_id = mailing.id,
                    recipient = %status.display_name,
                    "delivery exhausted: {e}"
                );
                ctx.mailings
                    .record_delivery(status.id, DeliveryOutcome::Failed)
                    .await?;
                // A human has to deal with this one; attach the body so it
                // can be forwarded manually.
                if let Err(notify_err) = ctx
                    .outbox
                    .notify_ops(format!(
                        "Mailing {}: delivery to {} failed: {e}\n\nMessage body:\n{}",
                        mailing.id, status.display_name, mailing.text
                    ))
                    .await
                {
                    tracing::error!("could not escalate delivery failure: {notify_err}");
                }
            }
        }
    }

    ctx.mailings.mark_finished(mailing.id).await?;

    let mut summary = format!("Mailing sent\nID: {}\nKind: {}\n", mailing.id, mailing.kind);
    if !mailing.cohort_name.is_empty() {
        summary.push_str(&format!("Cohort: {}\n", mailing.cohort_name));
    }
    summary.push_str("\nFull statistics ⬇️");

    let buttons = inline_keyboard(vec![vec![
        (
            "Full statistics".to_string(),
            CallbackAction::Statistic {
                mailing_id: mailing.id,
            }
            .to_payload(),
        ),
        (
            "Cancel mailing".to_string(),
            CallbackAction::StatisticDeleting {
                mailing_id: mailing.id,
            }
            .to_payload(),
        ),
    ]]);
    ctx.outbox
        .send_low(OutgoingMessage::new(mailing.author_id, summary).with_markup(buttons))
        .await?;
    Ok(())
}

/// One expiry sweep: flip old mailings, report ignorers, clean up.
pub async fn expire_once(ctx: &Arc<DialogCtx>, lifetime: Duration) -> Result<()> {
    let expired = ctx.mailings.expire_older_than(lifetime).await?;
    for mailing_id in expired {
        let (mailing, statuses) = ctx.mailings.with_statuses(mailing_id).await?;
        tracing::info!(mailing_id, "mailing expired");

        if mailing.with_button {
            let ignorers: Vec<&DeliveryStatus> = statuses
                .iter()
                .filter(|s| s.sent && !s.reacted)
                .collect();

            let mut report = format!(
                "Mailing expired\nID: {}\nKind: {}\n",
                mailing.id, mailing.kind
            );
            if !mailing.cohort_name.is_empty() {
                report.push_str(&format!("Cohort: {}\n", mailing.cohort_name));
            }
            if ignorers.is_empty() {
                report.push_str("\nEvery recipient confirmed the mailing.");
            } else {
                report.push_str("\nRecipients who did not confirm:\n");
                for status in &ignorers {
                    report.push_str(&format!("{}\n", status.display_name));
                }
            }
            for chunk in split_for_sending(&report, MESSAGE_LIMIT) {
                ctx.outbox
                    .send_low(OutgoingMessage::new(mailing.author_id, chunk))
                    .await?;
            }
        }

        for status in statuses.iter().filter(|s| s.sent) {
            if let Err(e) = ctx
                .outbox
                .delete_message(status.chat_id, status.message_id)
                .await
            {
                tracing::warn!(
                    mailing_id,
                    chat_id = status.chat_id,
                    "could not delete expired mailing message: {e}"
                );
            }
        }
        ctx.mailings.delete(mailing_id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MailingDraft, MailingKind, Recipient};
    use crate::testutil::test_ctx;

    fn draft(author: i64, recipients: Vec<Recipient>) -> MailingDraft {
        MailingDraft {
            author_id: author,
            kind: MailingKind::DirectMessage,
            cohort_name: "Night".into(),
            text: "shift swap tonight".into(),
            with_button: true,
            recipients,
        }
    }

    #[tokio::test]
    async fn delivers_pending_mailing_and_notifies_author() {
        let (ctx, transport) = test_ctx(&[]).await;
        let id = ctx
            .mailings
            .create(draft(
                500,
                vec![Recipient {
                    display_name: "@a".into(),
                    chat_id: 11,
                }],
            ))
            .await
            .unwrap();

        assert!(deliver_pending(&ctx).await.unwrap());

        let (mailing, statuses) = ctx.mailings.with_statuses(id).await.unwrap();
        assert!(mailing.finished);
        assert!(statuses[0].sent);
        assert_eq!(statuses[0].chat_id, 11);
        assert_ne!(statuses[0].message_id, 0);

        // confirmation button rides along
        let delivered = transport.sent_to(11);
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].reply_markup.is_some());
        assert!(delivered[0].text.contains("confirm receipt"));

        // author got the low-priority summary
        let summary = transport.sent_to(500);
        assert_eq!(summary.len(), 1);
        assert!(summary[0].text.contains("Mailing sent"));

        // queue is drained
        assert!(!deliver_pending(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn resolver_fallback_updates_recorded_chat_id() {
        let (ctx, transport) = test_ctx(&[]).await;
        transport.fail_for(&[123, -100123]);

        let id = ctx
            .mailings
            .create(draft(
                500,
                vec![Recipient {
                    display_name: "group".into(),
                    chat_id: 123,
                }],
            ))
            .await
            .unwrap();

        assert!(deliver_pending(&ctx).await.unwrap());

        let (_, statuses) = ctx.mailings.with_statuses(id).await.unwrap();
        assert!(statuses[0].sent);
        // the sign-inverted variant is what actually worked
        assert_eq!(statuses[0].chat_id, -123);
    }

    #[tokio::test]
    async fn exhausted_delivery_is_recorded_and_escalated() {
        let (ctx, transport) = test_ctx(&[]).await;
        transport.fail_for(&[77, -10077, -77]);

        let id = ctx
            .mailings
            .create(draft(
                500,
                vec![Recipient {
                    display_name: "@gone".into(),
                    chat_id: 77,
                }],
            ))
            .await
            .unwrap();

        assert!(deliver_pending(&ctx).await.unwrap());

        let (mailing, statuses) = ctx.mailings.with_statuses(id).await.unwrap();
        assert!(mailing.finished);
        assert!(statuses[0].failed);

        // the ops chat received the escalation with the body attached
        let ops = transport.sent_to(999);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].text.contains("shift swap tonight"));
    }

    #[tokio::test]
    async fn expiry_reports_ignorers_and_cleans_up() {
        let (ctx, transport) = test_ctx(&[]).await;
        let id = ctx
            .mailings
            .create(draft(
                500,
                vec![
                    Recipient {
                        display_name: "@confirmed".into(),
                        chat_id: 11,
                    },
                    Recipient {
                        display_name: "@silent".into(),
                        chat_id: 12,
                    },
                ],
            ))
            .await
            .unwrap();

        assert!(deliver_pending(&ctx).await.unwrap());
        let (_, statuses) = ctx.mailings.with_statuses(id).await.unwrap();
        ctx.mailings.mark_reacted(statuses[0].id).await.unwrap();

        expire_once(&ctx, Duration::ZERO).await.unwrap();

        // report names only the silent recipient
        let reports: Vec<String> = transport
            .sent_to(500)
            .into_iter()
            .map(|m| m.text)
            .filter(|t| t.contains("Mailing expired"))
            .collect();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("@silent"));
        assert!(!reports[0].contains("@confirmed"));

        // delivered messages were deleted, record is gone
        assert_eq!(transport.deleted.lock().unwrap().len(), 2);
        assert!(ctx.mailings.with_statuses(id).await.is_err());
    }
}
