//! Routing decisions derived from a session snapshot.

use models::UserRole;

use super::state::SessionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Hydration has not finished; render nothing role-gated and do not redirect.
    Wait,
    RedirectToLogin,
    /// Authenticated, but the role may not see this route.
    Forbidden,
    Allow,
    /// Authenticated user on a public-only page (login/signup); send them to their dashboard.
    RedirectToDashboard(&'static str),
}

/// Access rule for one route.
#[derive(Clone, Debug)]
pub struct RouteGuard {
    allowed: Vec<UserRole>,
    public_only: bool,
}

impl RouteGuard {
    /// Route open to the listed roles.
    pub fn for_roles(allowed: impl IntoIterator<Item = UserRole>) -> Self {
        Self { allowed: allowed.into_iter().collect(), public_only: false }
    }

    /// The dashboard: any authenticated role.
    pub fn dashboard() -> Self {
        Self::for_roles([UserRole::User, UserRole::Admin, UserRole::SuperAdmin])
    }

    /// Login and signup pages: anonymous visitors only.
    pub fn public_only() -> Self {
        Self { allowed: Vec::new(), public_only: true }
    }

    pub fn decide(&self, state: &SessionState) -> RouteDecision {
        if !state.has_hydrated() {
            return RouteDecision::Wait;
        }
        let role = match (state.is_authenticated(), state.identity()) {
            (true, Some(identity)) => identity.role,
            _ if self.public_only => return RouteDecision::Allow,
            _ => return RouteDecision::RedirectToLogin,
        };
        if self.public_only {
            return RouteDecision::RedirectToDashboard(role.dashboard());
        }
        if self.allowed.contains(&role) {
            RouteDecision::Allow
        } else {
            RouteDecision::Forbidden
        }
    }
}
