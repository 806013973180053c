use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::principal::Identity;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub identity: Identity,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Default)]
struct SessionState {
    sessions: HashMap<String, Session>,
    user_index: HashMap<Uuid, HashSet<String>>,
    revoked: HashSet<String>,
}

fn gen_id() -> String {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Session store for the portal. State lives inside the manager and the
/// manager is injected wherever identity is read, so tests can run several
/// independent session worlds side by side.
#[derive(Clone)]
pub struct SessionManager {
    ttl: Duration,
    state: Arc<RwLock<SessionState>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, state: Arc::new(RwLock::new(SessionState::default())) }
    }

    pub fn issue(&self, identity: Identity) -> Session {
        let now = Instant::now();
        let sid = gen_id();
        let token = gen_id();
        let sess = Session {
            session_id: sid.clone(),
            token: token.clone(),
            identity: identity.clone(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        {
            let mut st = self.state.write();
            st.sessions.insert(token.clone(), sess.clone());
            st.user_index.entry(identity.user_id).or_default().insert(token);
        }
        debug!(user = %identity.email, sid = %sid, ttl_secs = self.ttl.as_secs(), "session issued");
        sess
    }

    /// Resolve a token to its identity. Re-reads the store on every call:
    /// callers must not cache a prior answer because sign-out and expiry can
    /// happen between two requests. Expired entries are dropped lazily here.
    pub fn current(&self, token: &str) -> Option<Identity> {
        if self.state.read().revoked.contains(token) {
            return None;
        }
        let now = Instant::now();
        let mut expired = false;
        let out = {
            let st = self.state.read();
            match st.sessions.get(token) {
                Some(sess) if sess.expires_at > now => Some(sess.identity.clone()),
                Some(_) => {
                    expired = true;
                    None
                }
                None => None,
            }
        };
        if expired {
            self.state.write().sessions.remove(token);
        }
        out
    }

    /// Clear the session. The token joins the revoked set so a request that
    /// raced the sign-out resolves to no identity instead of a stale one.
    pub fn sign_out(&self, token: &str) -> bool {
        let mut st = self.state.write();
        if let Some(sess) = st.sessions.remove(token) {
            let uid = sess.identity.user_id;
            if let Some(set) = st.user_index.get_mut(&uid) {
                set.remove(token);
            }
            st.revoked.insert(token.to_string());
            true
        } else {
            false
        }
    }

    /// Revoke every live session of one user. Returns the number revoked.
    pub fn revoke_user(&self, user_id: Uuid) -> usize {
        let mut st = self.state.write();
        let tokens: Vec<String> = st
            .user_index
            .get(&user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        let mut count = 0usize;
        for t in tokens {
            if st.sessions.remove(&t).is_some() {
                count += 1;
            }
            st.revoked.insert(t);
        }
        st.user_index.remove(&user_id);
        debug!(%user_id, count, "sessions revoked");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident() -> Identity {
        Identity { user_id: Uuid::new_v4(), email: "citizen@example.in".into() }
    }

    #[test]
    fn issue_then_current_roundtrips() {
        let sm = SessionManager::default();
        let who = ident();
        let sess = sm.issue(who.clone());
        assert_eq!(sm.current(&sess.token), Some(who));
    }

    #[test]
    fn sign_out_revokes_the_token() {
        let sm = SessionManager::default();
        let sess = sm.issue(ident());
        assert!(sm.sign_out(&sess.token));
        assert_eq!(sm.current(&sess.token), None);
        // Second sign-out is a no-op.
        assert!(!sm.sign_out(&sess.token));
    }

    #[test]
    fn expired_session_resolves_to_none() {
        let sm = SessionManager::new(Duration::from_secs(0));
        let sess = sm.issue(ident());
        assert_eq!(sm.current(&sess.token), None);
    }

    #[test]
    fn revoke_user_clears_every_session() {
        let sm = SessionManager::default();
        let who = ident();
        let a = sm.issue(who.clone());
        let b = sm.issue(who.clone());
        assert_eq!(sm.revoke_user(who.user_id), 2);
        assert_eq!(sm.current(&a.token), None);
        assert_eq!(sm.current(&b.token), None);
    }

    #[test]
    fn unknown_token_is_none() {
        let sm = SessionManager::default();
        assert_eq!(sm.current("not-a-token"), None);
    }
}
