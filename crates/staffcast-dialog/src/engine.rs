//! Event dispatch: state resolution, routing tables, catch-alls, and the
//! per-actor worker pool.

use std::sync::{Arc, OnceLock};

use staffcast_cache::RosterCache;
use staffcast_core::config::TelegramConfig;
use staffcast_core::types::{EventKind, IncomingEvent};
use staffcast_core::{Result, StaffcastError};
use staffcast_telegram::Outbox;
use tokio::sync::mpsc;

use crate::registry::StateRegistry;
use crate::services::{ActorDirectory, DataRefresh, MailingService, NotificationService};
use crate::session::{ActorStates, SessionStore};
use crate::state::{Handler, StateDef, StateId};

/// Everything a handler can reach: the outbox, the conversation caches, the
/// roster, and the collaborator seams. Built once by the composition root.
pub struct DialogCtx {
    pub outbox: Arc<Outbox>,
    pub sessions: SessionStore,
    pub actor_states: ActorStates,
    pub roster: Arc<RosterCache>,
    pub mailings: Arc<dyn MailingService>,
    pub directory: Arc<dyn ActorDirectory>,
    pub refresh: Arc<dyn DataRefresh>,
    pub notifications: Arc<dyn NotificationService>,
    pub telegram: TelegramConfig,
    registry: OnceLock<Arc<StateRegistry>>,
}

impl DialogCtx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        outbox: Arc<Outbox>,
        sessions: SessionStore,
        actor_states: ActorStates,
        roster: Arc<RosterCache>,
        mailings: Arc<dyn MailingService>,
        directory: Arc<dyn ActorDirectory>,
        refresh: Arc<dyn DataRefresh>,
        notifications: Arc<dyn NotificationService>,
        telegram: TelegramConfig,
    ) -> Self {
        Self {
            outbox,
            sessions,
            actor_states,
            roster,
            mailings,
            directory,
            refresh,
            notifications,
            telegram,
            registry: OnceLock::new(),
        }
    }

    /// Wire the state registry in after construction (the registry's
    /// handlers and the context reference each other).
    pub fn attach_registry(&self, registry: Arc<StateRegistry>) {
        let _ = self.registry.set(registry);
    }

    pub fn registry(&self) -> Option<&Arc<StateRegistry>> {
        self.registry.get()
    }
}

/// The dialog engine: a bounded worker pool with per-actor affinity.
///
/// `actor_id mod workers` pins every actor to one worker, so two rapid
/// events from the same actor are processed in arrival order and cannot
/// race on the actor's session or state record.
pub struct DialogEngine {
    workers: Vec<mpsc::Sender<IncomingEvent>>,
}

impl DialogEngine {
    pub fn start(
        ctx: Arc<DialogCtx>,
        registry: Arc<StateRegistry>,
        workers: usize,
        queue_depth: usize,
    ) -> Self {
        let count = workers.max(1);
        let mut lanes = Vec::with_capacity(count);
        for worker in 0..count {
            let (tx, mut rx) = mpsc::channel::<IncomingEvent>(queue_depth.max(1));
            let ctx = Arc::clone(&ctx);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                tracing::debug!(worker, "dialog worker started");
                while let Some(event) = rx.recv().await {
                    process_event(&ctx, &registry, event).await;
                }
                tracing::debug!(worker, "dialog worker stopped");
            });
            lanes.push(tx);
        }
        Self { workers: lanes }
    }

    /// Queue an event on the worker owning its actor.
    pub async fn dispatch(&self, event: IncomingEvent) -> Result<()> {
        let index = event.actor.id.rem_euclid(self.workers.len() as i64) as usize;
        self.workers[index]
            .send(event)
            .await
            .map_err(|_| StaffcastError::Dialog("dialog worker is gone".into()))
    }
}

/// Process one inbound event to completion.
///
/// 1. Upsert the actor through the directory seam.
/// 2. Run the actor's local state, if any: entrance action, then routing.
/// 3. Run every `global` state against the same event, overwriting the
///    actor's stored state unless the state is `no_context`.
pub async fn process_event(ctx: &Arc<DialogCtx>, registry: &StateRegistry, event: IncomingEvent) {
    if let Err(e) = ctx.directory.upsert(&event.actor).await {
        tracing::warn!(actor = event.actor.id, "actor upsert failed: {e}");
    }

    if let Some(state_id) = ctx.actor_states.get(event.actor.id) {
        match registry.get(state_id) {
            Some(def) => {
                if !def.skip_entrance {
                    run_handler(ctx, &def.entrance, &event, "entrance").await;
                }
                route_event(ctx, state_id, def, &event).await;
            }
            None => tracing::warn!(%state_id, "actor state missing from registry"),
        }
    }

    for (id, def) in registry.iter() {
        if !def.global {
            continue;
        }
        if !def.skip_entrance {
            run_handler(ctx, &def.entrance, &event, "entrance").await;
        }
        if !def.no_context {
            ctx.actor_states.set(event.actor.id, *id);
        }
        route_event(ctx, *id, def, &event).await;
    }
}

async fn route_event(ctx: &Arc<DialogCtx>, id: StateId, def: &StateDef, event: &IncomingEvent) {
    match &event.kind {
        EventKind::Text { text, .. } => {
            let key = text.trim().to_lowercase();
            if let Some(handler) = def.text_routes.get(&key) {
                run_handler(ctx, handler, event, "command").await;
            } else if def.catch_all {
                run_handler(ctx, &def.catch_all_text, event, "catch-all").await;
            } else {
                tracing::info!(
                    actor = event.actor.id,
                    name = %event.actor.display_name(),
                    state = %id,
                    text = %text,
                    "no handler matched text command"
                );
            }
        }
        EventKind::Callback {
            callback_id,
            payload,
            ..
        } => {
            if let Some(handler) = def.callback_routes.get(payload.as_str()) {
                run_handler(ctx, handler, event, "callback").await;
            } else if def.catch_all_callback {
                run_handler(ctx, &def.catch_all_callback_handler, event, "callback catch-all")
                    .await;
            } else {
                tracing::info!(
                    actor = event.actor.id,
                    state = %id,
                    payload = %payload,
                    "no handler matched callback payload"
                );
                if let Err(e) = ctx
                    .outbox
                    .show_alert(callback_id.clone(), "Unknown command".into())
                    .await
                {
                    tracing::warn!("failed to show unknown-command alert: {e}");
                }
            }
        }
    }
}

async fn run_handler(ctx: &Arc<DialogCtx>, handler: &Handler, event: &IncomingEvent, role: &str) {
    let trigger = match &event.kind {
        EventKind::Text { text, .. } => text.clone(),
        EventKind::Callback { payload, .. } => payload.clone(),
    };
    match handler.run(Arc::clone(ctx), event.clone()).await {
        Ok(()) => tracing::debug!(
            actor = event.actor.id,
            role,
            trigger = %trigger,
            "handler completed"
        ),
        Err(e) => tracing::error!(
            actor = event.actor.id,
            name = %event.actor.display_name(),
            role,
            trigger = %trigger,
            "handler failed: {e}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::text_routes;
    use crate::testutil::{test_ctx, text_event, wait_until};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use staffcast_core::types::{ActorRef, EventKind};

    fn tracker() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Handler) {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log_for_handlers = Arc::clone(&log);
        let make = move |tag: &'static str| {
            let log = Arc::clone(&log_for_handlers);
            Handler::new("test handler", move |_ctx, event| {
                let log = Arc::clone(&log);
                async move {
                    let trigger = match &event.kind {
                        EventKind::Text { text, .. } => text.clone(),
                        EventKind::Callback { payload, .. } => payload.clone(),
                    };
                    log.lock().unwrap().push(format!("{tag}:{trigger}"));
                    Ok(())
                }
            })
        };
        (log, make)
    }

    fn registry_of(states: Vec<(StateId, StateDef)>) -> StateRegistry {
        StateRegistry::new(states.into_iter().collect::<HashMap<_, _>>())
    }

    fn callback_event(actor_id: i64, payload: &str) -> IncomingEvent {
        IncomingEvent {
            actor: ActorRef {
                id: actor_id,
                username: None,
                first_name: None,
                last_name: None,
            },
            chat_id: actor_id,
            kind: EventKind::Callback {
                callback_id: "cb".into(),
                payload: payload.into(),
                message_id: 1,
            },
        }
    }

    #[tokio::test]
    async fn global_state_routes_without_local_state() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut global = StateDef::empty();
        global.global = true;
        global.no_context = true;
        global.skip_entrance = true;
        global.text_routes = text_routes(vec![("/help", make("help"))]);

        let registry = registry_of(vec![(StateId::Global, global)]);
        process_event(&ctx, &registry, text_event(5, "/help")).await;

        assert_eq!(*log.lock().unwrap(), vec!["help:/help"]);
        // no_context: the actor picked up no stored state
        assert_eq!(ctx.actor_states.get(5), None);
    }

    #[tokio::test]
    async fn routing_is_trimmed_and_case_insensitive() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut global = StateDef::empty();
        global.global = true;
        global.no_context = true;
        global.skip_entrance = true;
        global.text_routes = text_routes(vec![("menu", make("menu"))]);

        let registry = registry_of(vec![(StateId::Global, global)]);
        process_event(&ctx, &registry, text_event(5, "  MeNu  ")).await;

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn catch_all_receives_unmatched_text() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut state = StateDef::empty();
        state.skip_entrance = true;
        state.catch_all = true;
        state.catch_all_text = make("caught");
        state.text_routes = text_routes(vec![("send", make("send"))]);

        let registry = registry_of(vec![(StateId::EnterMailingText, state)]);
        ctx.actor_states.set(9, StateId::EnterMailingText);

        process_event(&ctx, &registry, text_event(9, "hello")).await;
        assert_eq!(*log.lock().unwrap(), vec!["caught:hello"]);
    }

    #[tokio::test]
    async fn routing_miss_executes_nothing() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut state = StateDef::empty();
        state.skip_entrance = true;
        state.text_routes = text_routes(vec![("known", make("known"))]);

        let registry = registry_of(vec![(StateId::Menu, state)]);
        ctx.actor_states.set(9, StateId::Menu);

        process_event(&ctx, &registry, text_event(9, "unknown words")).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn entrance_runs_unless_skipped() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut state = StateDef::empty();
        state.entrance = make("enter");
        state.catch_all = true;
        state.catch_all_text = make("caught");

        let registry = registry_of(vec![(StateId::Menu, state)]);
        ctx.actor_states.set(9, StateId::Menu);

        process_event(&ctx, &registry, text_event(9, "anything")).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter:anything", "caught:anything"]
        );
    }

    #[tokio::test]
    async fn global_without_no_context_overwrites_actor_state() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (_log, make) = tracker();

        let mut global = StateDef::empty();
        global.global = true;
        global.no_context = false;
        global.skip_entrance = true;
        global.catch_all = true;
        global.catch_all_text = make("caught");

        let registry = registry_of(vec![(StateId::Global, global)]);
        process_event(&ctx, &registry, text_event(5, "hi")).await;

        assert_eq!(ctx.actor_states.get(5), Some(StateId::Global));
    }

    #[tokio::test]
    async fn callback_routes_match_exact_payload() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut state = StateDef::empty();
        state.skip_entrance = true;
        state.callback_routes =
            HashMap::from([("PAYLOAD".to_string(), make("cb"))]);

        let registry = registry_of(vec![(StateId::Menu, state)]);
        ctx.actor_states.set(9, StateId::Menu);

        process_event(&ctx, &registry, callback_event(9, "PAYLOAD")).await;
        assert_eq!(*log.lock().unwrap(), vec!["cb:PAYLOAD"]);
    }

    #[tokio::test]
    async fn callback_miss_shows_unknown_command_alert() {
        let (ctx, transport) = test_ctx(&[]).await;
        let (_log, _make) = tracker();

        let mut state = StateDef::empty();
        state.skip_entrance = true;

        let registry = registry_of(vec![(StateId::Menu, state)]);
        ctx.actor_states.set(9, StateId::Menu);

        process_event(&ctx, &registry, callback_event(9, "nobody-home")).await;

        let transport_clone = Arc::clone(&transport);
        wait_until(move || !transport_clone.alerts.lock().unwrap().is_empty()).await;
        assert_eq!(
            transport.alerts.lock().unwrap()[0].1,
            "Unknown command".to_string()
        );
    }

    #[tokio::test]
    async fn engine_workers_preserve_per_actor_order() {
        let (ctx, _transport) = test_ctx(&[]).await;
        let (log, make) = tracker();

        let mut global = StateDef::empty();
        global.global = true;
        global.no_context = true;
        global.skip_entrance = true;
        global.catch_all = true;
        global.catch_all_text = make("seen");

        let registry = Arc::new(registry_of(vec![(StateId::Global, global)]));
        let engine = DialogEngine::start(Arc::clone(&ctx), Arc::clone(&registry), 4, 16);

        for i in 0..10 {
            engine.dispatch(text_event(7, &format!("m{i}"))).await.unwrap();
        }

        let log_clone = Arc::clone(&log);
        wait_until(move || log_clone.lock().unwrap().len() == 10).await;
        let seen: Vec<String> = log.lock().unwrap().clone();
        let expected: Vec<String> = (0..10).map(|i| format!("seen:m{i}")).collect();
        assert_eq!(seen, expected);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
