//! Route guard: decides, per navigation, whether a screen renders, waits, or
//! redirects. Pure over its inputs so tests drive it with synthetic
//! identities; the guard must be re-evaluated whenever the session's loading
//! flag or identity changes, since session state can resolve asynchronously
//! after the first render.

use super::principal::Identity;
use super::resolver::RoleResolver;
use crate::error::{PortalError, PortalResult};

/// Capability a screen requires before it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPolicy {
    Public,
    Citizen,
    Admin,
}

/// Where an unadmitted session is sent. Screen-specific: admin screens
/// bounce to the admin login, everything else to the citizen login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    CitizenLogin,
    AdminLogin,
}

impl RedirectTarget {
    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::CitizenLogin => "/login",
            RedirectTarget::AdminLogin => "/admin/login",
        }
    }
}

/// User-visible notification attached to a denial redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessNotice {
    pub code: &'static str,
    pub message: &'static str,
}

fn access_denied_notice() -> AccessNotice {
    // Generic on purpose: the notice never says which capability was missing.
    AccessNotice { code: "access_denied", message: "Access denied" }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Session still resolving; render a placeholder, no redirect yet.
    Loading,
    /// Terminal: send the user to `target`, surfacing `notice` if present.
    /// Exactly one notice is produced per denied evaluation.
    Redirect { target: RedirectTarget, notice: Option<AccessNotice> },
    /// Terminal: the screen renders.
    Granted,
}

/// The login screen a policy bounces to when no identity is present.
pub fn login_target(policy: ScreenPolicy) -> RedirectTarget {
    match policy {
        ScreenPolicy::Admin => RedirectTarget::AdminLogin,
        _ => RedirectTarget::CitizenLogin,
    }
}

/// Evaluate one navigation. The role check runs before any admin grant, and
/// an error inside the resolver reads as "not admin".
pub fn evaluate(
    policy: ScreenPolicy,
    loading: bool,
    identity: Option<&Identity>,
    roles: &RoleResolver,
) -> Access {
    match policy {
        ScreenPolicy::Public => Access::Granted,
        ScreenPolicy::Citizen | ScreenPolicy::Admin => {
            if loading {
                return Access::Loading;
            }
            let Some(ident) = identity else {
                return Access::Redirect { target: login_target(policy), notice: None };
            };
            if policy == ScreenPolicy::Admin && !roles.is_admin(ident) {
                return Access::Redirect {
                    target: RedirectTarget::CitizenLogin,
                    notice: Some(access_denied_notice()),
                };
            }
            Access::Granted
        }
    }
}

/// Server-side admission: a request either carries a resolved identity or it
/// does not, so the loading state never applies here.
pub fn admit(
    policy: ScreenPolicy,
    identity: Option<Identity>,
    roles: &RoleResolver,
) -> PortalResult<Identity> {
    match evaluate(policy, false, identity.as_ref(), roles) {
        Access::Granted => identity
            .ok_or_else(|| PortalError::auth("auth_required", "sign in to continue")),
        Access::Redirect { notice: Some(_), .. } => Err(PortalError::access_denied()),
        Access::Redirect { .. } => {
            Err(PortalError::auth("auth_required", "sign in to continue"))
        }
        Access::Loading => Err(PortalError::internal("guard_state", "unexpected loading state")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, RoleDirectory};
    use std::sync::Arc;
    use uuid::Uuid;

    fn citizen() -> Identity {
        Identity { user_id: Uuid::new_v4(), email: "citizen@example.in".into() }
    }

    fn resolver_with(grants: &[(Uuid, &str)]) -> RoleResolver {
        let backend = Arc::new(MemoryBackend::new());
        for (uid, role) in grants {
            backend.grant(*uid, role).expect("grant");
        }
        RoleResolver::new(backend)
    }

    #[test]
    fn loading_session_holds_without_redirect() {
        let roles = resolver_with(&[]);
        let access = evaluate(ScreenPolicy::Citizen, true, None, &roles);
        assert_eq!(access, Access::Loading);
    }

    #[test]
    fn public_screen_admits_anonymous() {
        let roles = resolver_with(&[]);
        assert_eq!(evaluate(ScreenPolicy::Public, false, None, &roles), Access::Granted);
    }

    #[test]
    fn missing_identity_redirects_to_screen_specific_login() {
        let roles = resolver_with(&[]);
        let citizen_bounce = evaluate(ScreenPolicy::Citizen, false, None, &roles);
        assert_eq!(
            citizen_bounce,
            Access::Redirect { target: RedirectTarget::CitizenLogin, notice: None }
        );
        let admin_bounce = evaluate(ScreenPolicy::Admin, false, None, &roles);
        assert_eq!(
            admin_bounce,
            Access::Redirect { target: RedirectTarget::AdminLogin, notice: None }
        );
    }

    #[test]
    fn non_admin_on_admin_screen_gets_one_denial_notice() {
        let who = citizen();
        let roles = resolver_with(&[]);
        match evaluate(ScreenPolicy::Admin, false, Some(&who), &roles) {
            Access::Redirect { target, notice } => {
                assert_eq!(target, RedirectTarget::CitizenLogin);
                let notice = notice.expect("denial must carry a notice");
                assert_eq!(notice.code, "access_denied");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn admin_is_granted() {
        let who = citizen();
        let roles = resolver_with(&[(who.user_id, "admin")]);
        assert_eq!(evaluate(ScreenPolicy::Admin, false, Some(&who), &roles), Access::Granted);
    }

    #[test]
    fn admit_maps_denial_to_forbidden() {
        let who = citizen();
        let roles = resolver_with(&[]);
        let err = admit(ScreenPolicy::Admin, Some(who), &roles).unwrap_err();
        assert_eq!(err.http_status(), 403);
        let err = admit(ScreenPolicy::Citizen, None, &roles).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }
}
