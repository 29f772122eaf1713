//! Authorization decision stage.
//!
//! Pure policy: no IO and no panics. Granted permissions are resolved by the
//! caller and arrive on the [`Identity`].

use crate::{AuthFailure, HttpMethod, Identity, Matcher, PatternError, Permission, RequestMatchRule};

/// The target of a request, as seen by the decision stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource<'a> {
    pub path: &'a str,
    pub method: &'a HttpMethod,
}

impl<'a> Resource<'a> {
    pub fn new(path: &'a str, method: &'a HttpMethod) -> Self {
        Self { path, method }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny(AuthFailure),
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Checks one requirement against an identity. `*` grants everything.
pub fn authorize(identity: &Identity, required: &Permission) -> Result<(), AuthFailure> {
    if identity.has_permission(required) {
        Ok(())
    } else {
        Err(AuthFailure::InsufficientPermission)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requirement table
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered `(rule -> permission)` table plus an optional fallback. The first
/// matching rule wins; the fallback applies when none match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionRequirements {
    routes: Vec<(RequestMatchRule, Permission)>,
    fallback: Option<Permission>,
}

impl PermissionRequirements {
    pub fn builder() -> RequirementsBuilder {
        RequirementsBuilder::default()
    }

    /// Every resource requires `permission`.
    pub fn uniform(permission: impl Into<Permission>) -> Self {
        Self {
            routes: Vec::new(),
            fallback: Some(permission.into()),
        }
    }

    pub fn lookup(&self, resource: &Resource<'_>) -> Option<&Permission> {
        self.routes
            .iter()
            .find(|(rule, _)| rule.matches(resource.path, resource.method))
            .map(|(_, permission)| permission)
            .or(self.fallback.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequirementsBuilder {
    routes: Vec<(String, Option<HttpMethod>, Permission)>,
    fallback: Option<Permission>,
}

impl RequirementsBuilder {
    pub fn route(mut self, pattern: &str, permission: impl Into<Permission>) -> Self {
        self.routes.push((pattern.to_string(), None, permission.into()));
        self
    }

    pub fn route_method(mut self, pattern: &str, method: HttpMethod, permission: impl Into<Permission>) -> Self {
        self.routes.push((pattern.to_string(), Some(method), permission.into()));
        self
    }

    pub fn fallback(mut self, permission: impl Into<Permission>) -> Self {
        self.fallback = Some(permission.into());
        self
    }

    pub fn build(self) -> Result<PermissionRequirements, PatternError> {
        let routes = self
            .routes
            .into_iter()
            .map(|(pattern, method, permission)| Ok((RequestMatchRule::new(&pattern, method)?, permission)))
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(PermissionRequirements {
            routes,
            fallback: self.fallback,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationStage {
    exemptions: Matcher,
    requirements: PermissionRequirements,
}

impl AuthorizationStage {
    /// Exempts `GET /version` only.
    pub fn new(requirements: PermissionRequirements) -> Self {
        let version = RequestMatchRule::new("/version", Some(HttpMethod::Get))
            .map(|rule| Matcher::AnyOf(vec![rule]))
            .unwrap_or(Matcher::Nothing);
        Self {
            exemptions: version,
            requirements,
        }
    }

    pub fn with_exemptions(requirements: PermissionRequirements, exemptions: Vec<RequestMatchRule>) -> Self {
        Self {
            exemptions: Matcher::from_rules(exemptions, Matcher::Nothing),
            requirements,
        }
    }

    pub fn is_exempt(&self, resource: &Resource<'_>) -> bool {
        self.exemptions.matches(resource.path, resource.method)
    }

    pub fn required_permission(&self, resource: &Resource<'_>) -> Option<&Permission> {
        self.requirements.lookup(resource)
    }

    /// Exempt, then authenticated, then the requirement check.
    pub fn decide(&self, identity: Option<&Identity>, resource: &Resource<'_>) -> Decision {
        if self.is_exempt(resource) {
            return Decision::Permit;
        }
        let Some(identity) = identity else {
            return Decision::Deny(AuthFailure::Unauthenticated);
        };
        match self.required_permission(resource) {
            None => Decision::Permit,
            Some(required) => match authorize(identity, required) {
                Ok(()) => Decision::Permit,
                Err(failure) => Decision::Deny(failure),
            },
        }
    }
}
