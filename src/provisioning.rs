//! Admin provisioning: a privileged, service-credentialed path that creates
//! an admin account and grants the capability row. Provisioning is the ONLY
//! way an identity becomes admin; there is no client-side bootstrap.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::identity::{hash_password, ADMIN_ROLE};
use crate::profile::Profile;
use crate::storage::{AccountDirectory, ProfileStore, RoleDirectory, StoreError};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct AdminRegistration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub employee_id: String,
}

pub struct AdminProvisioner {
    accounts: Arc<dyn AccountDirectory>,
    profiles: Arc<dyn ProfileStore>,
    roles: Arc<dyn RoleDirectory>,
}

impl AdminProvisioner {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        profiles: Arc<dyn ProfileStore>,
        roles: Arc<dyn RoleDirectory>,
    ) -> Self {
        Self { accounts, profiles, roles }
    }

    /// Register an admin identity. Idempotent: an already-existing account
    /// and an already-granted role both count as success, so re-running a
    /// provisioning script converges instead of failing halfway.
    pub fn register(&self, req: &AdminRegistration) -> PortalResult<Uuid> {
        let fields = validate::admin_registration(req);
        if !fields.is_empty() {
            return Err(PortalError::validation(fields));
        }

        let user_id = match self.accounts.create(
            &req.email,
            &hash_password(&req.password)
                .map_err(|e| PortalError::internal("hash_failure", e.to_string()))?,
        ) {
            Ok(account) => account.user_id,
            Err(StoreError::Duplicate(_)) => {
                let existing = self
                    .accounts
                    .find_by_email(&req.email)
                    .map_err(PortalError::from)?
                    .ok_or_else(|| {
                        PortalError::unavailable("backend_unavailable", "account vanished during provisioning")
                    })?;
                info!(user = %existing.email, "admin account already exists, reusing");
                existing.user_id
            }
            Err(e) => return Err(e.into()),
        };

        // Admins get a synthetic aadhaar placeholder derived from the
        // employee id; the profile row is only written if absent.
        match self.profiles.get(user_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.profiles.insert(Profile {
                    id: user_id,
                    aadhaar_number: format!("ADMIN{}", req.employee_id.trim()),
                    full_name: req.full_name.clone(),
                    email: req.email.clone(),
                    phone: Some(req.phone.clone()),
                })?;
            }
            Err(e) => return Err(e.into()),
        }

        // Duplicate grants are success by contract.
        self.roles.grant(user_id, ADMIN_ROLE)?;
        info!(%user_id, "admin provisioned");
        Ok(user_id)
    }
}
