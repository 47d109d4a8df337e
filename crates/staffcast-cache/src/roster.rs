//! Roster cache: admins, cohorts, and team chats.
//!
//! Populated at startup from config and replaced wholesale by the data
//! refresh flow; read on every admin-gated command.

use std::sync::RwLock;

/// One addressable member of a cohort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortMember {
    /// Display name used in delivery reports.
    pub display_name: String,
    /// Direct-message chat id, 0 when unknown.
    pub user_id: i64,
    /// The member's manager-chat id, 0 when unknown.
    pub manager_chat_id: i64,
}

/// A named group of staff members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    pub name: String,
    pub members: Vec<CohortMember>,
}

/// The full roster content, swapped atomically on refresh.
#[derive(Debug, Clone, Default)]
pub struct RosterSnapshot {
    pub admin_ids: Vec<i64>,
    pub cohorts: Vec<Cohort>,
    pub team_chats: Vec<i64>,
}

/// Internally synchronized roster lookups.
pub struct RosterCache {
    content: RwLock<RosterSnapshot>,
}

impl RosterCache {
    pub fn new(initial: RosterSnapshot) -> Self {
        Self {
            content: RwLock::new(initial),
        }
    }

    /// Seed a roster that only knows its admins.
    pub fn with_admins(admin_ids: Vec<i64>) -> Self {
        Self::new(RosterSnapshot {
            admin_ids,
            ..RosterSnapshot::default()
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        let content = self.content.read().unwrap_or_else(|e| e.into_inner());
        content.admin_ids.contains(&user_id)
    }

    pub fn cohort_names(&self) -> Vec<String> {
        let content = self.content.read().unwrap_or_else(|e| e.into_inner());
        content.cohorts.iter().map(|c| c.name.clone()).collect()
    }

    /// Case-insensitive, whitespace-trimmed lookup by cohort name.
    pub fn cohort_by_name(&self, name: &str) -> Option<Cohort> {
        let wanted = name.trim().to_lowercase();
        let content = self.content.read().unwrap_or_else(|e| e.into_inner());
        content
            .cohorts
            .iter()
            .find(|c| c.name.trim().to_lowercase() == wanted)
            .cloned()
    }

    pub fn team_chats(&self) -> Vec<i64> {
        let content = self.content.read().unwrap_or_else(|e| e.into_inner());
        content.team_chats.clone()
    }

    /// Replace the whole roster (used by the data refresh flow).
    pub fn replace(&self, snapshot: RosterSnapshot) {
        let mut content = self.content.write().unwrap_or_else(|e| e.into_inner());
        *content = snapshot;
    }
}
