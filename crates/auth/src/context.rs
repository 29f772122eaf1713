//! Per-request execution context.
//!
//! One value per request, threaded through the pipeline and finally stored in
//! the request's extensions. There is no ambient/global identity.
//!
//! ```text
//! Unchecked ──▶ Allowed                       (bypassed, final)
//! Unchecked ──▶ Pending ──▶ Authenticated ──▶ Rejected
//!                      └──▶ Rejected           (final)
//! ```

use thiserror::Error;

use gatewarden_core::RequestId;

use crate::{AuthFailure, Identity, Permission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unchecked,
    /// Classifier bypass. No identity.
    Allowed,
    /// A stage is running.
    Pending,
    Authenticated(Identity),
    Rejected(AuthFailure),
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Allowed => "allowed",
            Self::Pending => "pending",
            Self::Authenticated(_) => "authenticated",
            Self::Rejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal auth state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    request_id: RequestId,
    state: AuthState,
}

impl ExecutionContext {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: AuthState::Unchecked,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            AuthState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<AuthFailure> {
        match self.state {
            AuthState::Rejected(f) => Some(f),
            _ => None,
        }
    }

    pub fn allow(&mut self) -> Result<(), TransitionError> {
        self.transition(AuthState::Allowed, |s| matches!(s, AuthState::Unchecked))
    }

    pub fn begin(&mut self) -> Result<(), TransitionError> {
        self.transition(AuthState::Pending, |s| matches!(s, AuthState::Unchecked))
    }

    pub fn authenticate(&mut self, identity: Identity) -> Result<(), TransitionError> {
        self.transition(AuthState::Authenticated(identity), |s| {
            matches!(s, AuthState::Pending)
        })
    }

    /// Rejects the request, dropping any identity attached so far.
    pub fn reject(&mut self, failure: AuthFailure) -> Result<(), TransitionError> {
        self.transition(AuthState::Rejected(failure), |s| {
            matches!(s, AuthState::Pending | AuthState::Authenticated(_))
        })
    }

    /// Replaces the authenticated identity with one carrying `permissions`.
    pub fn attach_permissions(
        &mut self,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<(), TransitionError> {
        match &self.state {
            AuthState::Authenticated(identity) => {
                self.state = AuthState::Authenticated(identity.with_permissions(permissions));
                Ok(())
            }
            other => Err(TransitionError {
                from: other.name(),
                to: "authenticated",
            }),
        }
    }

    fn transition(
        &mut self,
        next: AuthState,
        legal_from: impl Fn(&AuthState) -> bool,
    ) -> Result<(), TransitionError> {
        if !legal_from(&self.state) {
            return Err(TransitionError {
                from: self.state.name(),
                to: next.name(),
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatewarden_core::UserId;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(RequestId::new())
    }

    fn identity() -> Identity {
        Identity::new(UserId::new("1").unwrap())
    }

    #[test]
    fn bypass_is_final() {
        let mut c = ctx();
        c.allow().unwrap();
        assert_eq!(c.state(), &AuthState::Allowed);
        assert!(c.begin().is_err());
        assert!(c.reject(AuthFailure::Malformed).is_err());
        assert!(c.identity().is_none());
    }

    #[test]
    fn happy_path_attaches_identity() {
        let mut c = ctx();
        c.begin().unwrap();
        c.authenticate(identity()).unwrap();
        assert_eq!(c.identity().map(|i| i.id().as_str()), Some("1"));
    }

    #[test]
    fn cannot_authenticate_without_a_running_stage() {
        let mut c = ctx();
        let err = c.authenticate(identity()).unwrap_err();
        assert_eq!(err.from, "unchecked");
        assert_eq!(err.to, "authenticated");
    }

    #[test]
    fn late_denial_drops_identity() {
        let mut c = ctx();
        c.begin().unwrap();
        c.authenticate(identity()).unwrap();
        c.reject(AuthFailure::InsufficientPermission).unwrap();

        assert!(c.identity().is_none());
        assert_eq!(c.failure(), Some(AuthFailure::InsufficientPermission));
        assert!(c.reject(AuthFailure::Expired).is_err());
        assert!(c.authenticate(identity()).is_err());
    }

    #[test]
    fn attaching_permissions_replaces_identity() {
        let mut c = ctx();
        assert!(c.attach_permissions([Permission::new("p1")]).is_err());

        c.begin().unwrap();
        c.authenticate(identity()).unwrap();
        c.attach_permissions([Permission::new("p1")]).unwrap();
        assert!(c.identity().unwrap().has_permission(&Permission::new("p1")));
    }
}
