//! In-memory reference backend. One lock per relation; the backend serializes
//! concurrent writes to the same row, which is the consistency the portal
//! assumes of the real collaborator.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    AccountDirectory, AccountRecord, ComplaintStore, ProfileStore, RoleDirectory, StoreError,
    StoreResult,
};
use crate::complaints::{Complaint, Status};
use crate::profile::Profile;

#[derive(Default)]
pub struct MemoryBackend {
    accounts: RwLock<HashMap<Uuid, AccountRecord>>,
    roles: RwLock<HashMap<Uuid, HashSet<String>>>,
    complaints: RwLock<HashMap<Uuid, Complaint>>,
    profiles: RwLock<HashMap<Uuid, Profile>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountDirectory for MemoryBackend {
    fn create(&self, email: &str, password_hash: &str) -> StoreResult<AccountRecord> {
        let mut accounts = self.accounts.write();
        let lowered = email.to_lowercase();
        if accounts.values().any(|a| a.email.to_lowercase() == lowered) {
            return Err(StoreError::Duplicate(email.to_string()));
        }
        let rec = AccountRecord {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        accounts.insert(rec.user_id, rec.clone());
        Ok(rec)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<AccountRecord>> {
        let lowered = email.to_lowercase();
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.email.to_lowercase() == lowered)
            .cloned())
    }
}

impl RoleDirectory for MemoryBackend {
    fn roles_for(&self, user_id: Uuid) -> StoreResult<Vec<String>> {
        Ok(self
            .roles
            .read()
            .get(&user_id)
            .map(|set| {
                let mut v: Vec<String> = set.iter().cloned().collect();
                v.sort();
                v
            })
            .unwrap_or_default())
    }

    fn grant(&self, user_id: Uuid, role: &str) -> StoreResult<()> {
        // Re-granting is a no-op success.
        self.roles
            .write()
            .entry(user_id)
            .or_default()
            .insert(role.to_string());
        Ok(())
    }
}

impl ComplaintStore for MemoryBackend {
    fn insert(&self, complaint: Complaint) -> StoreResult<()> {
        self.complaints.write().insert(complaint.id, complaint);
        Ok(())
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<Complaint>> {
        Ok(self.complaints.read().get(&id).cloned())
    }

    fn list_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Complaint>> {
        let mut rows: Vec<Complaint> = self
            .complaints
            .read()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    fn list_all(&self) -> StoreResult<Vec<Complaint>> {
        let mut rows: Vec<Complaint> = self.complaints.read().values().cloned().collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    fn set_status(&self, id: Uuid, status: Status) -> StoreResult<Complaint> {
        let mut complaints = self.complaints.write();
        let Some(row) = complaints.get_mut(&id) else {
            return Err(StoreError::NotFound);
        };
        row.status = status;
        Ok(row.clone())
    }
}

fn sort_newest_first(rows: &mut [Complaint]) {
    // Secondary key keeps the order stable when timestamps collide.
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

impl ProfileStore for MemoryBackend {
    fn insert(&self, profile: Profile) -> StoreResult<()> {
        self.profiles.write().insert(profile.id, profile);
        Ok(())
    }

    fn get(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.read().get(&user_id).cloned())
    }

    fn update_mutable(
        &self,
        user_id: Uuid,
        full_name: &str,
        phone: Option<&str>,
    ) -> StoreResult<Profile> {
        let mut profiles = self.profiles.write();
        let Some(row) = profiles.get_mut(&user_id) else {
            return Err(StoreError::NotFound);
        };
        row.full_name = full_name.to_string();
        row.phone = phone.map(|p| p.to_string());
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let store = MemoryBackend::new();
        store.create("citizen@example.in", "hash-a").expect("first create");
        let dup = store.create("Citizen@Example.IN", "hash-b");
        assert!(matches!(dup, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn roles_absent_user_is_empty_not_error() {
        let store = MemoryBackend::new();
        let roles = store.roles_for(Uuid::new_v4()).expect("lookup");
        assert!(roles.is_empty());
    }

    #[test]
    fn regrant_is_idempotent() {
        let store = MemoryBackend::new();
        let uid = Uuid::new_v4();
        store.grant(uid, "admin").expect("grant");
        store.grant(uid, "admin").expect("re-grant");
        assert_eq!(store.roles_for(uid).expect("lookup"), vec!["admin".to_string()]);
    }

    #[test]
    fn set_status_on_missing_row_is_not_found() {
        let store = MemoryBackend::new();
        let res = store.set_status(Uuid::new_v4(), Status::Resolved);
        assert!(matches!(res, Err(StoreError::NotFound)));
    }
}
