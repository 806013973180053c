//! Collaborator seams for the managed backend.
//!
//! The portal delegates persistence and the user store to an external
//! backend-as-a-service. These traits are the exact surface the core relies
//! on: equality-filtered point lookups, ordered selects and single-row
//! mutations. `memory::MemoryBackend` is the reference implementation used by
//! the server binary and the test suite; a remote backend implements the same
//! traits without the core changing.

use thiserror::Error;
use uuid::Uuid;

use crate::complaints::{Complaint, Status};
use crate::profile::Profile;

pub mod memory;
pub use memory::MemoryBackend;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A credential record in the managed user store. The hash is an argon2 PHC
/// string; plaintext passwords never reach a store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// User store of the auth collaborator. Emails are unique case-insensitively.
pub trait AccountDirectory: Send + Sync {
    /// Create an account. Fails with [`StoreError::Duplicate`] when an account
    /// already holds the email (any casing).
    fn create(&self, email: &str, password_hash: &str) -> StoreResult<AccountRecord>;
    fn find_by_email(&self, email: &str) -> StoreResult<Option<AccountRecord>>;
}

/// Role-assignment relation: rows of `(user_id, role)` with zero-or-one row
/// per pair. Callers treat lookup errors as "no capability".
pub trait RoleDirectory: Send + Sync {
    fn roles_for(&self, user_id: Uuid) -> StoreResult<Vec<String>>;
    /// Insert a role row. Granting a role the user already holds is success,
    /// not an error (provisioning is idempotent).
    fn grant(&self, user_id: Uuid, role: &str) -> StoreResult<()>;
}

/// Complaint relation: filtered and ordered selects plus update-by-id.
/// There is no delete.
pub trait ComplaintStore: Send + Sync {
    fn insert(&self, complaint: Complaint) -> StoreResult<()>;
    fn get(&self, id: Uuid) -> StoreResult<Option<Complaint>>;
    /// Complaints owned by `user_id`, newest `created_at` first.
    fn list_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Complaint>>;
    /// Every complaint, newest `created_at` first.
    fn list_all(&self) -> StoreResult<Vec<Complaint>>;
    /// Set the status of one complaint and return the updated record.
    fn set_status(&self, id: Uuid, status: Status) -> StoreResult<Complaint>;
}

/// Profile relation keyed by the owning identity's id. Only the mutable
/// fields are writable after insert.
pub trait ProfileStore: Send + Sync {
    fn insert(&self, profile: Profile) -> StoreResult<()>;
    fn get(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    fn update_mutable(
        &self,
        user_id: Uuid,
        full_name: &str,
        phone: Option<&str>,
    ) -> StoreResult<Profile>;
}
