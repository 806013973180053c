//! Complaint entity and lifecycle rules: who may read which complaints, who
//! may move status, and what a well-formed submission looks like.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::identity::{Identity, RoleResolver};
use crate::storage::{ComplaintStore, StoreError};
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Roads,
    Water,
    Electricity,
    Sanitation,
    PublicServices,
    Corruption,
    Other,
}

impl Category {
    /// Strict parse: an unknown value is rejected, never defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "roads" => Some(Category::Roads),
            "water" => Some(Category::Water),
            "electricity" => Some(Category::Electricity),
            "sanitation" => Some(Category::Sanitation),
            "public_services" => Some(Category::PublicServices),
            "corruption" => Some(Category::Corruption),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Roads => "roads",
            Category::Water => "water",
            Category::Electricity => "electricity",
            Category::Sanitation => "sanitation",
            Category::PublicServices => "public_services",
            Category::Corruption => "corruption",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// Lifecycle status. The transition graph is deliberately fully connected:
/// an admin may move a complaint from any state to any other, self-loops
/// included. There is no owner-initiated transition at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            "in_progress" => Some(Status::InProgress),
            "resolved" => Some(Status::Resolved),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
        }
    }
}

/// A citizen-submitted grievance. `user_id` and `created_at` are set once at
/// submission and never change; ownership does not transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Complaint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub description: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw submission payload. Category and priority arrive as strings and are
/// validated against the closed sets before anything is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComplaint {
    pub title: String,
    pub category: String,
    pub priority: String,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Dashboard counters derived from the full complaint list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComplaintStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub rejected: usize,
}

#[derive(Clone)]
pub struct ComplaintService {
    store: Arc<dyn ComplaintStore>,
    roles: RoleResolver,
}

impl ComplaintService {
    pub fn new(store: Arc<dyn ComplaintStore>, roles: RoleResolver) -> Self {
        Self { store, roles }
    }

    /// Create a complaint owned by the submitting identity, status `pending`.
    /// Rejects with field-scoped validation errors before any write.
    pub fn submit(&self, identity: &Identity, req: &NewComplaint) -> PortalResult<Complaint> {
        let fields = validate::complaint(req);
        if !fields.is_empty() {
            return Err(PortalError::validation(fields));
        }
        // Membership was just validated; parse cannot fail past this point,
        // but stay total rather than unwrap.
        let (Some(category), Some(priority)) =
            (Category::parse(req.category.trim()), Priority::parse(req.priority.trim()))
        else {
            return Err(PortalError::internal("validate_drift", "enum parse after validation"));
        };
        let location = req
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let complaint = Complaint {
            id: Uuid::new_v4(),
            user_id: identity.user_id,
            title: req.title.trim().to_string(),
            category,
            priority,
            status: Status::Pending,
            description: req.description.trim().to_string(),
            location,
            created_at: Utc::now(),
        };
        self.store.insert(complaint.clone())?;
        info!(user = %identity.email, complaint = %complaint.id, category = category.as_str(), "complaint submitted");
        Ok(complaint)
    }

    /// The caller's own complaints, newest first. The owner filter is the
    /// whole access rule here; no further check applies.
    pub fn list_own(&self, identity: &Identity) -> PortalResult<Vec<Complaint>> {
        Ok(self.store.list_by_owner(identity.user_id)?)
    }

    /// Every complaint, newest first. Admin capability required.
    pub fn list_all(&self, identity: &Identity) -> PortalResult<Vec<Complaint>> {
        if !self.roles.is_admin(identity) {
            return Err(PortalError::access_denied());
        }
        Ok(self.store.list_all()?)
    }

    /// The only mutation path for status. Admin capability required; the new
    /// status must name one of the four values; any-to-any transitions are
    /// legal, including a no-op to the current value.
    pub fn update_status(
        &self,
        identity: &Identity,
        complaint_id: Uuid,
        new_status: &str,
    ) -> PortalResult<Complaint> {
        if !self.roles.is_admin(identity) {
            return Err(PortalError::access_denied());
        }
        let Some(status) = Status::parse(new_status) else {
            return Err(PortalError::validation(vec![crate::error::FieldError::new(
                "status",
                "unknown_value",
                "status must be one of pending, in_progress, resolved, rejected",
            )]));
        };
        let updated = match self.store.set_status(complaint_id, status) {
            Ok(c) => c,
            Err(StoreError::NotFound) => {
                return Err(PortalError::not_found("complaint_not_found", "no such complaint"));
            }
            Err(e) => return Err(e.into()),
        };
        info!(admin = %identity.email, complaint = %complaint_id, status = status.as_str(), "status updated");
        Ok(updated)
    }

    /// Dashboard counters. Derived from `list_all`, so it shares its gate.
    pub fn stats(&self, identity: &Identity) -> PortalResult<ComplaintStats> {
        let all = self.list_all(identity)?;
        let count = |s: Status| all.iter().filter(|c| c.status == s).count();
        Ok(ComplaintStats {
            total: all.len(),
            pending: count(Status::Pending),
            in_progress: count(Status::InProgress),
            resolved: count(Status::Resolved),
            rejected: count(Status::Rejected),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_names_are_snake_case() {
        assert_eq!(Category::parse("public_services"), Some(Category::PublicServices));
        assert_eq!(Category::PublicServices.as_str(), "public_services");
        assert_eq!(Status::InProgress.as_str(), "in_progress");
        assert_eq!(
            serde_json::to_string(&Status::InProgress).expect("serialize"),
            "\"in_progress\""
        );
    }

    #[test]
    fn unknown_values_do_not_default() {
        assert_eq!(Category::parse("potholes"), None);
        assert_eq!(Priority::parse("critical"), None);
        assert_eq!(Status::parse("closed"), None);
        assert_eq!(Category::parse("Roads"), None);
    }
}
