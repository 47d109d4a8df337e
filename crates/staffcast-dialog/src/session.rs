//! Per-actor conversation scratch space and the actor-state store.

use std::sync::Arc;
use std::time::Duration;

use staffcast_cache::TtlCache;
use staffcast_core::types::{TextEntity, UserId};

use crate::model::MailingKind;
use crate::state::StateId;

/// Mutable per-actor scratch record for the mailing wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub mailing_kind: Option<MailingKind>,
    pub cohort_name: String,
    pub draft_text: String,
    pub entities: Vec<TextEntity>,
}

impl Session {
    /// Drop everything the wizard has collected so far.
    pub fn reset(&mut self) {
        *self = Session::default();
    }
}

/// TTL-backed store of wizard sessions. An absent key yields (and persists)
/// a zero-value record, so readers never deal with a miss.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<TtlCache<UserId, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            cache: Arc::new(TtlCache::new(ttl, sweep_interval)),
        }
    }

    pub fn get(&self, actor_id: UserId) -> Session {
        match self.cache.get(&actor_id) {
            Some(session) => session,
            None => {
                let session = Session::default();
                self.cache.set(actor_id, session.clone());
                session
            }
        }
    }

    pub fn set(&self, actor_id: UserId, session: Session) {
        self.cache.set(actor_id, session);
    }

    pub fn remove(&self, actor_id: UserId) {
        self.cache.remove(&actor_id);
    }

    pub fn cache(&self) -> &Arc<TtlCache<UserId, Session>> {
        &self.cache
    }
}

/// TTL-backed map from actor id to the actor's current dialog state.
/// A miss is the normal "no active state" answer, never an error.
#[derive(Clone)]
pub struct ActorStates {
    cache: Arc<TtlCache<UserId, StateId>>,
}

impl ActorStates {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            cache: Arc::new(TtlCache::new(ttl, sweep_interval)),
        }
    }

    pub fn get(&self, actor_id: UserId) -> Option<StateId> {
        self.cache.get(&actor_id)
    }

    pub fn set(&self, actor_id: UserId, state: StateId) {
        self.cache.set(actor_id, state);
    }

    pub fn clear(&self, actor_id: UserId) {
        self.cache.remove(&actor_id);
    }

    pub fn cache(&self) -> &Arc<TtlCache<UserId, StateId>> {
        &self.cache
    }
}
