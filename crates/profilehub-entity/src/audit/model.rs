//! Audit event entity model.

use chrono::{DateTime, Utc};
use profilehub_core::types::{AuditLogId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What kind of record an audit event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTarget {
    /// A profile pool.
    Pool,
    /// A profile.
    Profile,
    /// A user account.
    User,
}

impl AuditTarget {
    /// Return the target type as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::Profile => "profile",
            Self::User => "user",
        }
    }
}

/// The action recorded by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Use,
    SessionStart,
    SessionEnd,
    RoleChange,
    Activate,
    Deactivate,
}

impl AuditAction {
    /// Return the action as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Use => "USE",
            Self::SessionStart => "SESSION_START",
            Self::SessionEnd => "SESSION_END",
            Self::RoleChange => "ROLE_CHANGE",
            Self::Activate => "ACTIVATE",
            Self::Deactivate => "DEACTIVATE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique audit entry identifier.
    pub id: AuditLogId,
    /// The type of the target record.
    pub target_type: AuditTarget,
    /// The target record's identifier.
    pub target_id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// The user who caused it, if any.
    pub actor_id: Option<UserId>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Free-form context.
    pub details: serde_json::Value,
}

impl AuditEvent {
    /// Start a new event with no actor and empty details.
    pub fn new(target_type: AuditTarget, target_id: impl Into<Uuid>, action: AuditAction) -> Self {
        Self {
            id: AuditLogId::new(),
            target_type,
            target_id: target_id.into(),
            action,
            actor_id: None,
            timestamp: Utc::now(),
            details: serde_json::Value::Null,
        }
    }

    /// Attach the acting user.
    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
