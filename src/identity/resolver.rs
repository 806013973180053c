use std::sync::Arc;

use tracing::warn;

use super::principal::Identity;
use crate::storage::RoleDirectory;

pub const ADMIN_ROLE: &str = "admin";

/// Capability lookup against the role-assignment relation. Every screen and
/// service goes through this one resolver so the fail-closed rule cannot
/// drift between call sites.
#[derive(Clone)]
pub struct RoleResolver {
    directory: Arc<dyn RoleDirectory>,
}

impl RoleResolver {
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self { directory }
    }

    /// Point lookup for `(identity, role)`. Zero rows and any directory error
    /// both resolve to `false`; ambiguity never grants a capability. Safe to
    /// call repeatedly; nothing is cached, so a revoked role is observed on
    /// the next check.
    pub fn has_role(&self, identity: &Identity, role: &str) -> bool {
        match self.directory.roles_for(identity.user_id) {
            Ok(roles) => roles.iter().any(|r| r == role),
            Err(e) => {
                warn!(user = %identity.email, error = %e, "role lookup failed, denying");
                false
            }
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.has_role(identity, ADMIN_ROLE)
    }
}
