//! State definitions — the building blocks of the dialog engine.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use staffcast_core::Result;
use staffcast_core::types::IncomingEvent;

use crate::engine::DialogCtx;

/// Identity of a dialog state. A closed enum: a transition to a state that
/// does not exist cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    /// Evaluated for every event regardless of the actor's local state.
    Global,
    /// The admin menu.
    Menu,
    /// Picking what kind of mailing to create.
    ChoosingMailingKind,
    /// Picking the target cohort.
    ChoosingCohort,
    /// Entering the mailing text.
    EnterMailingText,
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateId::Global => write!(f, "global"),
            StateId::Menu => write!(f, "menu"),
            StateId::ChoosingMailingKind => write!(f, "choosing-mailing-kind"),
            StateId::ChoosingCohort => write!(f, "choosing-cohort"),
            StateId::EnterMailingText => write!(f, "enter-mailing-text"),
        }
    }
}

type HandlerFn = Arc<dyn Fn(Arc<DialogCtx>, IncomingEvent) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// An event handler plus the description `/help` prints for it.
#[derive(Clone)]
pub struct Handler {
    func: HandlerFn,
    pub description: &'static str,
}

impl Handler {
    pub fn new<F, Fut>(description: &'static str, f: F) -> Self
    where
        F: Fn(Arc<DialogCtx>, IncomingEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx, event| -> BoxFuture<'static, Result<()>> {
                Box::pin(f(ctx, event))
            }),
            description,
        }
    }

    /// Handler that does nothing; the default entrance action.
    pub fn noop() -> Self {
        Self::new("", |_, _| async { Ok(()) })
    }

    pub async fn run(&self, ctx: Arc<DialogCtx>, event: IncomingEvent) -> Result<()> {
        (self.func)(ctx, event).await
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("description", &self.description)
            .finish()
    }
}

/// One named, immutable state of the dialog machine.
#[derive(Clone)]
pub struct StateDef {
    /// Evaluate this state for every inbound event, whatever the actor's
    /// local state is.
    pub global: bool,
    /// When entered as a global state, do not overwrite the actor's stored
    /// state.
    pub no_context: bool,
    /// Skip the entrance side effect when this state runs.
    pub skip_entrance: bool,
    /// Route unmatched text to `catch_all_text` instead of dropping it.
    pub catch_all: bool,
    /// Route unmatched callbacks to `catch_all_callback_handler`.
    pub catch_all_callback: bool,

    pub entrance: Handler,
    pub catch_all_text: Handler,
    pub catch_all_callback_handler: Handler,

    /// Trimmed, lowercased text → handler.
    pub text_routes: HashMap<String, Handler>,
    /// Exact raw callback payload → handler.
    pub callback_routes: HashMap<String, Handler>,
}

impl StateDef {
    /// A local state with no routes and every flag off.
    pub fn empty() -> Self {
        Self {
            global: false,
            no_context: false,
            skip_entrance: false,
            catch_all: false,
            catch_all_callback: false,
            entrance: Handler::noop(),
            catch_all_text: Handler::noop(),
            catch_all_callback_handler: Handler::noop(),
            text_routes: HashMap::new(),
            callback_routes: HashMap::new(),
        }
    }
}

/// Build a text routing table, normalizing keys the way lookups do.
pub fn text_routes(entries: Vec<(&str, Handler)>) -> HashMap<String, Handler> {
    entries
        .into_iter()
        .map(|(key, handler)| (key.trim().to_lowercase(), handler))
        .collect()
}
