use std::sync::Arc;

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use tracing::{info, warn};

use super::principal::Identity;
use super::session::{Session, SessionManager};
use crate::error::{PortalError, PortalResult};
use crate::profile::Profile;
use crate::storage::{AccountDirectory, ProfileStore, StoreError};
use crate::validate;

#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub aadhaar_number: String,
    pub full_name: String,
    pub phone: String,
}

/// The auth collaborator as seen by the rest of the portal. Successful
/// sign-in/out changes what [`SessionManager::current`] observes for every
/// consumer; callers re-read it per request rather than caching.
pub trait AuthProvider: Send + Sync {
    fn sign_in(&self, req: &SignInRequest) -> PortalResult<Session>;
    /// Creates the account and its profile row, then signs the new identity in.
    fn sign_up(&self, req: &SignUpRequest) -> PortalResult<Session>;
    fn sign_out(&self, token: &str) -> bool;
    fn current(&self, token: &str) -> Option<Identity>;
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Credential handling against the account directory, sessions issued by the
/// injected [`SessionManager`].
pub struct LocalAuthProvider {
    accounts: Arc<dyn AccountDirectory>,
    profiles: Arc<dyn ProfileStore>,
    sessions: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        profiles: Arc<dyn ProfileStore>,
        sessions: SessionManager,
    ) -> Self {
        Self { accounts, profiles, sessions }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn sign_in(&self, req: &SignInRequest) -> PortalResult<Session> {
        let account = self
            .accounts
            .find_by_email(&req.email)
            .map_err(|e| PortalError::unavailable("backend_unavailable", e.to_string()))?;
        // One generic failure for unknown email and wrong password alike.
        let Some(account) = account else {
            return Err(PortalError::auth("invalid_credentials", "invalid email or password"));
        };
        if !verify_password(&account.password_hash, &req.password) {
            return Err(PortalError::auth("invalid_credentials", "invalid email or password"));
        }
        let identity = Identity { user_id: account.user_id, email: account.email };
        let session = self.sessions.issue(identity);
        info!(user = %session.identity.email, "sign-in");
        Ok(session)
    }

    fn sign_up(&self, req: &SignUpRequest) -> PortalResult<Session> {
        let fields = validate::signup(req);
        if !fields.is_empty() {
            return Err(PortalError::validation(fields));
        }
        let hash = hash_password(&req.password)
            .map_err(|e| PortalError::internal("hash_failure", e.to_string()))?;
        let account = match self.accounts.create(&req.email, &hash) {
            Ok(a) => a,
            Err(StoreError::Duplicate(_)) => {
                return Err(PortalError::auth("email_taken", "an account with this email already exists"));
            }
            Err(e) => {
                return Err(PortalError::unavailable("backend_unavailable", e.to_string()));
            }
        };
        let profile = Profile {
            id: account.user_id,
            aadhaar_number: req.aadhaar_number.clone(),
            full_name: req.full_name.clone(),
            email: account.email.clone(),
            phone: Some(req.phone.clone()),
        };
        if let Err(e) = self.profiles.insert(profile) {
            // Account exists but the profile row did not land; surface as a
            // retryable failure rather than a half-signed-up session.
            warn!(user = %account.email, error = %e, "profile insert failed during sign-up");
            return Err(PortalError::unavailable("backend_unavailable", e.to_string()));
        }
        let identity = Identity { user_id: account.user_id, email: account.email };
        let session = self.sessions.issue(identity);
        info!(user = %session.identity.email, "sign-up");
        Ok(session)
    }

    fn sign_out(&self, token: &str) -> bool {
        self.sessions.sign_out(token)
    }

    fn current(&self, token: &str) -> Option<Identity> {
        self.sessions.current(token)
    }
}
