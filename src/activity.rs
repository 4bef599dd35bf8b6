//! Activity (audit) log.
//!
//! Records who changed what in the tree. Recording is fire-and-forget: it
//! never blocks or fails the mutation that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            user_email: "anonymous@unknown.com".to_string(),
            user_name: "Anonymous".to_string(),
        }
    }

    /// Actor from an email address; the display name is the local part.
    pub fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email);
        Self {
            user_id: email.to_string(),
            user_email: email.to_string(),
            user_name: if name.is_empty() {
                "Unknown User".to_string()
            } else {
                name.to_string()
            },
        }
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Translation,
    Page,
    Language,
    Space,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// What happened, before it is stamped with an actor, id and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub action: ActivityAction,
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

impl ActivityEvent {
    pub fn new(action: ActivityAction, entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        Self {
            action,
            entity_type,
            entity_name: Some(entity_id.clone()),
            entity_id: Some(entity_id),
            details: None,
            changes: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn change(mut self, field: impl Into<String>, old_value: Value, new_value: Value) -> Self {
        self.changes.push(FieldChange {
            field: field.into(),
            old_value,
            new_value,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: u64,
    #[serde(flatten)]
    pub actor: Actor,
    #[serde(flatten)]
    pub event: ActivityEvent,
    pub timestamp: DateTime<Utc>,
}

/// Filters for [`ActivityLog::recent`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub user_id: Option<String>,
}

impl ActivityQuery {
    pub const DEFAULT_LIMIT: usize = 50;

    fn matches(&self, record: &ActivityRecord) -> bool {
        self.entity_type
            .map_or(true, |t| record.event.entity_type == t)
            && self
                .entity_id
                .as_ref()
                .map_or(true, |id| record.event.entity_id.as_ref() == Some(id))
            && self
                .user_id
                .as_ref()
                .map_or(true, |id| &record.actor.user_id == id)
    }
}

pub trait ActivityLog: Send + Sync {
    /// Record an event. Implementations swallow their own failures.
    fn record(&self, actor: &Actor, event: ActivityEvent);

    /// Matching records, newest first.
    fn recent(&self, query: &ActivityQuery) -> Vec<ActivityRecord>;
}

/// Bounded in-memory log; the oldest records fall off once full.
pub struct MemoryActivityLog {
    capacity: usize,
    records: Mutex<VecDeque<ActivityRecord>>,
    next_id: AtomicU64,
}

impl MemoryActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, actor: &Actor, event: ActivityEvent) {
        let record = ActivityRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            actor: actor.clone(),
            event,
            timestamp: Utc::now(),
        };
        debug!(
            "Activity {:?} {:?} {:?} by {}",
            record.event.action, record.event.entity_type, record.event.entity_id, record.actor.user_id
        );

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    fn recent(&self, query: &ActivityQuery) -> Vec<ActivityRecord> {
        let limit = query.limit.unwrap_or(ActivityQuery::DEFAULT_LIMIT);
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .take(limit)
            .cloned()
            .collect()
    }
}
