use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated session's user reference. Created by the auth
/// collaborator on sign-in/sign-up; the portal only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}
