//! Citizen profile: created alongside the account, owned by one identity.
//! `aadhaar_number` and `email` are frozen at creation; only `full_name` and
//! `phone` ever change, and only at the owner's request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldError, PortalError, PortalResult};
use crate::identity::Identity;
use crate::storage::{ProfileStore, StoreError};
use crate::validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub aadhaar_number: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Owner-submitted update. `email`/`aadhaar_number` may be echoed back
/// unchanged by a client that round-trips the whole record; a *different*
/// value for either is rejected outright.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aadhaar_number: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// The caller's own profile.
    pub fn fetch(&self, identity: &Identity) -> PortalResult<Profile> {
        match self.profiles.get(identity.user_id) {
            Ok(Some(p)) => Ok(p),
            Ok(None) => Err(PortalError::not_found("profile_not_found", "no profile for this account")),
            Err(e) => Err(e.into()),
        }
    }

    /// Update the two mutable fields. No partial write: every check passes
    /// before the store sees anything.
    pub fn update(&self, identity: &Identity, req: &ProfileUpdate) -> PortalResult<Profile> {
        let current = self.fetch(identity)?;
        let mut fields = validate::profile_update(req);
        if let Some(email) = req.email.as_deref() {
            if !email.eq_ignore_ascii_case(&current.email) {
                fields.push(FieldError::new("email", "immutable", "email cannot be changed"));
            }
        }
        if let Some(aadhaar) = req.aadhaar_number.as_deref() {
            if aadhaar != current.aadhaar_number {
                fields.push(FieldError::new(
                    "aadhaar_number",
                    "immutable",
                    "Aadhaar number cannot be changed",
                ));
            }
        }
        if !fields.is_empty() {
            return Err(PortalError::validation(fields));
        }
        let phone = req.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match self.profiles.update_mutable(identity.user_id, req.full_name.trim(), phone) {
            Ok(p) => Ok(p),
            Err(StoreError::NotFound) => {
                Err(PortalError::not_found("profile_not_found", "no profile for this account"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
