//! The mailing creation wizard: kind → cohort → text → send.

use std::sync::Arc;

use staffcast_core::Result;
use staffcast_core::types::{EventKind, IncomingEvent};
use staffcast_telegram::keyboard::reply_keyboard;
use staffcast_telegram::types::OutgoingMessage;

use super::{menu, require_admin};
use crate::engine::DialogCtx;
use crate::model::{MailingDraft, MailingKind, build_recipients};
use crate::session::Session;
use crate::state::{Handler, StateId};

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

async fn prompt_for_text(ctx: &Arc<DialogCtx>, actor_id: i64) -> Result<()> {
    ctx.actor_states.set(actor_id, StateId::EnterMailingText);
    ctx.outbox
        .send(
            OutgoingMessage::new(actor_id, "Enter the mailing text.")
                .with_markup(reply_keyboard(&labels(&["Back", "Close"]), 2)),
        )
        .await?;
    Ok(())
}

async fn prompt_for_cohort(ctx: &Arc<DialogCtx>, actor_id: i64) -> Result<()> {
    ctx.actor_states.set(actor_id, StateId::ChoosingCohort);
    let mut cohorts = ctx.roster.cohort_names();
    cohorts.push("Back".into());
    cohorts.push("Close".into());
    ctx.outbox
        .send(
            OutgoingMessage::new(actor_id, "Choose a cohort for the mailing.")
                .with_markup(reply_keyboard(&cohorts, 4)),
        )
        .await?;
    Ok(())
}

async fn prompt_for_kind(
    ctx: &Arc<DialogCtx>,
    actor_id: i64,
    with_back: bool,
) -> Result<()> {
    ctx.actor_states.set(actor_id, StateId::ChoosingMailingKind);
    let buttons = if with_back {
        labels(&["Direct messages", "Manager chat", "Team chat", "Back", "Close"])
    } else {
        labels(&["Direct messages", "Manager chat", "Team chat", "Close"])
    };
    ctx.outbox
        .send(
            OutgoingMessage::new(actor_id, "Choose the mailing kind.")
                .with_markup(reply_keyboard(&buttons, 2)),
        )
        .await?;
    Ok(())
}

/// "new mailing": enter the wizard.
pub async fn new_mailing(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;
    prompt_for_kind(&ctx, event.actor.id, true).await
}

/// A routing-table handler that fixes the mailing kind, then moves on to
/// the cohort prompt (or straight to text entry for team chats).
pub fn choose_kind(kind: MailingKind) -> Handler {
    Handler::new("Selects the mailing kind", move |ctx, event| async move {
        require_admin(&ctx, &event).await?;

        let actor_id = event.actor.id;
        let mut session = ctx.sessions.get(actor_id);
        session.mailing_kind = Some(kind);
        ctx.sessions.set(actor_id, session);

        if kind == MailingKind::TeamChat {
            prompt_for_text(&ctx, actor_id).await
        } else {
            prompt_for_cohort(&ctx, actor_id).await
        }
    })
}

/// Catch-all for the cohort step: the free text IS the cohort name.
pub async fn cohort_catch_all(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    let Some(text) = event.text() else {
        return Ok(());
    };
    let lowered = text.trim().to_lowercase();
    if lowered == "back" || lowered == "close" {
        return Ok(());
    }

    if ctx.roster.cohort_by_name(text).is_none() {
        ctx.outbox
            .send(OutgoingMessage::new(
                event.actor.id,
                format!("Cohort \"{}\" not found.", text.trim()),
            ))
            .await?;
        return Ok(());
    }

    let actor_id = event.actor.id;
    let mut session = ctx.sessions.get(actor_id);
    session.cohort_name = text.trim().to_string();
    ctx.sessions.set(actor_id, session);

    prompt_for_text(&ctx, actor_id).await
}

fn draft_is_ready(session: &Session) -> bool {
    if session.draft_text.is_empty() {
        return false;
    }
    match session.mailing_kind {
        Some(MailingKind::TeamChat) => true,
        Some(_) => !session.cohort_name.is_empty(),
        None => false,
    }
}

fn preview_text(session: &Session) -> String {
    let mut text = String::from("Mailing prepared\n");
    if let Some(kind) = session.mailing_kind {
        text.push_str(&format!("Kind: {kind}\n"));
        if kind != MailingKind::TeamChat {
            text.push_str(&format!("Cohort: {}\n", session.cohort_name));
        }
    }
    if session.draft_text.is_empty() {
        text.push_str("\nThe message text is empty.");
    } else {
        text.push_str(&format!("\nMessage text:\n\n{}", session.draft_text));
    }
    text.push_str("\n\nIf something is wrong, just send the text again. 😊");
    text
}

/// Catch-all for the text step: the free text becomes the draft.
pub async fn draft_catch_all(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    let EventKind::Text { text, entities } = &event.kind else {
        return Ok(());
    };
    let lowered = text.trim().to_lowercase();
    if lowered == "send" || lowered == "back" || lowered == "close" {
        return Ok(());
    }

    let actor_id = event.actor.id;
    let mut session = ctx.sessions.get(actor_id);
    session.draft_text = text.clone();
    session.entities = entities.clone();
    ctx.sessions.set(actor_id, session.clone());

    let buttons = if draft_is_ready(&session) {
        labels(&["Send", "Back", "Close"])
    } else {
        labels(&["Back", "Close"])
    };
    ctx.outbox
        .send(
            OutgoingMessage::new(actor_id, preview_text(&session))
                .with_markup(reply_keyboard(&buttons, 2)),
        )
        .await?;
    Ok(())
}

/// "send": persist the mailing and hand it to the dispatch loop.
pub async fn send_mailing(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;

    let actor_id = event.actor.id;
    let session = ctx.sessions.get(actor_id);

    let Some(kind) = session.mailing_kind else {
        ctx.outbox
            .send(OutgoingMessage::new(actor_id, "Pick a mailing kind first."))
            .await?;
        return Ok(());
    };
    if kind != MailingKind::TeamChat && session.cohort_name.is_empty() {
        ctx.outbox
            .send(OutgoingMessage::new(actor_id, "Pick a cohort first."))
            .await?;
        return Ok(());
    }
    if session.draft_text.is_empty() {
        ctx.outbox
            .send(OutgoingMessage::new(actor_id, "The mailing text is empty."))
            .await?;
        return Ok(());
    }

    let recipients = build_recipients(kind, &session.cohort_name, &ctx.roster)?;
    if recipients.is_empty() {
        ctx.outbox
            .send(OutgoingMessage::new(
                actor_id,
                "No recipients resolved for this mailing.",
            ))
            .await?;
        return Ok(());
    }

    let announcement = ctx
        .outbox
        .send(OutgoingMessage::new(
            actor_id,
            "Mailing started.\nYou will be notified when it finishes; recipients who \
             do not confirm will be reported when the mailing expires.",
        ))
        .await?;

    let draft = MailingDraft {
        author_id: actor_id,
        kind,
        cohort_name: session.cohort_name.clone(),
        text: session.draft_text.clone(),
        with_button: kind == MailingKind::DirectMessage,
        recipients,
    };

    match ctx.mailings.create(draft).await {
        Ok(mailing_id) => {
            ctx.outbox
                .send(
                    OutgoingMessage::new(actor_id, format!("Mailing ID: {mailing_id}"))
                        .reply_to(announcement.message_id),
                )
                .await?;
        }
        Err(e) => {
            ctx.outbox
                .send(OutgoingMessage::new(
                    actor_id,
                    format!("The mailing could not be created: {e}"),
                ))
                .await?;
            return Err(e);
        }
    }

    // Back to the menu; this also resets the wizard session.
    menu::open(ctx, event).await
}

/// "back" from the cohort step.
pub async fn back_to_kind(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    require_admin(&ctx, &event).await?;

    let actor_id = event.actor.id;
    let mut session = ctx.sessions.get(actor_id);
    session.reset();
    ctx.sessions.set(actor_id, session);

    prompt_for_kind(&ctx, actor_id, false).await
}

/// "back" from the text step: team-chat mailings return to the kind
/// prompt, the rest to the cohort prompt.
pub async fn back_from_text(ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
    let actor_id = event.actor.id;
    let mut session = ctx.sessions.get(actor_id);

    if session.mailing_kind == Some(MailingKind::TeamChat) {
        session.reset();
        ctx.sessions.set(actor_id, session);
        return prompt_for_kind(&ctx, actor_id, true).await;
    }

    session.draft_text.clear();
    session.cohort_name.clear();
    ctx.sessions.set(actor_id, session);
    prompt_for_cohort(&ctx, actor_id).await
}
