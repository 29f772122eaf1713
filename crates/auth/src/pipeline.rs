//! Authentication pipeline.
//!
//! The [`Gateway`] owns every immutable piece (classifier, stages, requirement
//! table, collaborators) and drives one [`ExecutionContext`] per request:
//!
//! 1. [`Gateway::route`] picks login, refresh, bypass or protected handling.
//! 2. Login runs the Credential Stage and returns a token pair.
//! 3. Protected requests run the Token Stage, resolve permissions and ask the
//!    Authorization Decision Stage.
//!
//! Any failure rejects the context and is returned to the caller, which hands
//! it to the [`FailureTranslator`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    AuthFailure, AuthorizationStage, BearerScheme, CredentialStage, CredentialVerifier, Decision,
    ExecutionContext, FailureTranslator, HttpMethod, Identity, PermissionLookup,
    PermissionRequirements, RequestClassifier, Resource, TokenEngine, TokenKind, TokenPair,
    TokenStage, TransitionError, TranslatedFailure,
};

pub const DEFAULT_LOGIN_PATH: &str = "/users/login";
pub const DEFAULT_REFRESH_PATH: &str = "/users/refresh";

/// Which authentication stage a request is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAttempt<'a> {
    CredentialLogin { method: &'a HttpMethod, body: &'a [u8] },
    TokenPresented { authorization: Option<&'a str> },
}

/// How the gateway treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Refresh,
    Bypass,
    Protected,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct Gateway {
    classifier: RequestClassifier,
    login_path: String,
    refresh_path: String,
    credentials: CredentialStage,
    tokens: TokenStage,
    engine: TokenEngine,
    authorization: AuthorizationStage,
    permissions: Arc<dyn PermissionLookup>,
    translator: FailureTranslator,
}

impl Gateway {
    pub fn builder(
        engine: TokenEngine,
        verifier: Arc<dyn CredentialVerifier>,
        permissions: Arc<dyn PermissionLookup>,
    ) -> GatewayBuilder {
        GatewayBuilder {
            engine,
            verifier,
            permissions,
            classifier: RequestClassifier::default(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            scheme: BearerScheme::default(),
            requirements: PermissionRequirements::default(),
            translator: FailureTranslator::default(),
        }
    }

    pub fn scheme(&self) -> &BearerScheme {
        self.tokens.scheme()
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    pub fn translate(&self, failure: AuthFailure) -> TranslatedFailure {
        self.translator.translate(failure)
    }

    pub fn route(&self, path: &str, method: &HttpMethod) -> Route {
        if path == self.login_path {
            Route::Login
        } else if path == self.refresh_path {
            Route::Refresh
        } else if self.classifier.requires_authentication(path, method) {
            Route::Protected
        } else {
            Route::Bypass
        }
    }

    /// Runs the stage selected by `attempt`. On success the context holds
    /// the bare identity; on failure it is rejected.
    pub async fn authenticate(
        &self,
        ctx: &mut ExecutionContext,
        attempt: AuthAttempt<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenPair>, AuthFailure> {
        fail_closed(ctx.begin())?;

        let result = match attempt {
            AuthAttempt::CredentialLogin { method, body } => self
                .credentials
                .run_at(method, body, now)
                .await
                .map(|grant| (grant.identity, Some(grant.tokens))),
            AuthAttempt::TokenPresented { authorization } => {
                self.tokens.run_at(authorization, now).map(|identity| (identity, None))
            }
        };

        match result {
            Ok((identity, tokens)) => {
                tracing::debug!(request_id = %ctx.request_id(), user_id = %identity.id(), "authenticated");
                fail_closed(ctx.authenticate(identity))?;
                Ok(tokens)
            }
            Err(failure) => Err(self.reject(ctx, failure)),
        }
    }

    /// Credential login. Returns the token pair to hand back to the client.
    pub async fn login(
        &self,
        ctx: &mut ExecutionContext,
        method: &HttpMethod,
        body: &[u8],
    ) -> Result<TokenPair, AuthFailure> {
        let tokens = self
            .authenticate(ctx, AuthAttempt::CredentialLogin { method, body }, Utc::now())
            .await?;
        let tokens = tokens.ok_or(AuthFailure::TokenIssue)?;
        if let Some(identity) = ctx.identity() {
            tracing::info!(request_id = %ctx.request_id(), user_id = %identity.id(), "login succeeded");
        }
        Ok(tokens)
    }

    /// Admits a non-login request. Bypassed requests leave the context
    /// `Allowed`; protected ones end `Authenticated` with resolved permissions.
    pub async fn admit(
        &self,
        ctx: &mut ExecutionContext,
        resource: &Resource<'_>,
        authorization: Option<&str>,
    ) -> Result<(), AuthFailure> {
        self.admit_at(ctx, resource, authorization, Utc::now()).await
    }

    pub async fn admit_at(
        &self,
        ctx: &mut ExecutionContext,
        resource: &Resource<'_>,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthFailure> {
        if !self.classifier.requires_authentication(resource.path, resource.method) {
            tracing::trace!(path = resource.path, "bypassing authentication");
            return fail_closed(ctx.allow());
        }

        self.authenticate(ctx, AuthAttempt::TokenPresented { authorization }, now)
            .await?;

        if let Some(identity) = ctx.identity().cloned() {
            match self.permissions.by_user_id(identity.id()).await {
                Ok(granted) => fail_closed(ctx.attach_permissions(granted))?,
                Err(e) => {
                    tracing::error!(error = %e, user_id = %identity.id(), "permission lookup failed");
                    return Err(self.reject(ctx, AuthFailure::InsufficientPermission));
                }
            }
        }

        match self.authorization.decide(ctx.identity(), resource) {
            Decision::Permit => Ok(()),
            Decision::Deny(failure) => Err(self.reject(ctx, failure)),
        }
    }

    /// Exchanges a refresh token (`{"refresh_token": ..}`) for a new pair.
    pub fn refresh(&self, method: &HttpMethod, body: &[u8]) -> Result<TokenPair, AuthFailure> {
        self.refresh_at(method, body, Utc::now())
    }

    pub fn refresh_at(&self, method: &HttpMethod, body: &[u8], now: DateTime<Utc>) -> Result<TokenPair, AuthFailure> {
        if *method != HttpMethod::Post {
            return Err(AuthFailure::MethodNotSupported);
        }
        let token = serde_json::from_slice::<RefreshRequest>(body)
            .ok()
            .and_then(|r| r.refresh_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthFailure::BadRequest)?;

        let claims = self.tokens.verify_kind(token.trim(), TokenKind::Refresh, now)?;
        let identity = Identity::new(claims.user_id);
        let pair = self.engine.issue_pair_at(&identity, now).map_err(|e| {
            tracing::error!(error = %e, "token issuance failed");
            AuthFailure::TokenIssue
        })?;

        tracing::info!(user_id = %identity.id(), "tokens refreshed");
        Ok(pair)
    }

    fn reject(&self, ctx: &mut ExecutionContext, failure: AuthFailure) -> AuthFailure {
        tracing::info!(request_id = %ctx.request_id(), failure = failure.kind(), "request rejected");
        if let Err(e) = ctx.reject(failure) {
            tracing::error!(error = %e, "could not record rejection");
        }
        failure
    }
}

impl core::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gateway")
            .field("login_path", &self.login_path)
            .field("refresh_path", &self.refresh_path)
            .field("classifier", &self.classifier)
            .field("authorization", &self.authorization)
            .finish_non_exhaustive()
    }
}

/// A context in the wrong state never lets a request through.
fn fail_closed(step: Result<(), TransitionError>) -> Result<(), AuthFailure> {
    step.map_err(|e| {
        tracing::error!(error = %e, "execution context out of sequence");
        AuthFailure::Unauthenticated
    })
}

pub struct GatewayBuilder {
    engine: TokenEngine,
    verifier: Arc<dyn CredentialVerifier>,
    permissions: Arc<dyn PermissionLookup>,
    classifier: RequestClassifier,
    login_path: String,
    refresh_path: String,
    scheme: BearerScheme,
    requirements: PermissionRequirements,
    translator: FailureTranslator,
}

impl GatewayBuilder {
    pub fn classifier(mut self, classifier: RequestClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn scheme(mut self, scheme: BearerScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn requirements(mut self, requirements: PermissionRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn translator(mut self, translator: FailureTranslator) -> Self {
        self.translator = translator;
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            classifier: self.classifier,
            login_path: self.login_path,
            refresh_path: self.refresh_path,
            credentials: CredentialStage::new(self.verifier, self.engine.clone()),
            tokens: TokenStage::new(Arc::new(self.engine.clone()), self.scheme),
            engine: self.engine,
            authorization: AuthorizationStage::new(self.requirements),
            permissions: self.permissions,
            translator: self.translator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{BTreeSet, HashMap};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use gatewarden_core::{RequestId, UserId};

    use crate::{
        AuthState, DirectoryError, Permission, Secret, TokenConfig, TokenVerifier, UserRecord, Verification,
    };

    /// zhangsan/123 holds p1, lisi/456 holds p2, ghost/000 has a broken grant.
    struct Directory {
        users: HashMap<&'static str, (&'static str, &'static str)>,
    }

    impl Directory {
        fn new() -> Self {
            Self {
                users: HashMap::from([
                    ("zhangsan", ("1", "123")),
                    ("lisi", ("2", "456")),
                    ("ghost", ("3", "000")),
                ]),
            }
        }
    }

    #[async_trait]
    impl CredentialVerifier for Directory {
        async fn verify(&self, username: &str, secret: &Secret) -> Result<Verification, DirectoryError> {
            Ok(match self.users.get(username) {
                None => Verification::NotFound,
                Some((id, s)) if *s == secret.expose() => Verification::Verified(UserRecord {
                    id: UserId::new(*id).unwrap(),
                    username: username.to_string(),
                }),
                Some(_) => Verification::Mismatch,
            })
        }
    }

    #[async_trait]
    impl PermissionLookup for Directory {
        async fn by_user_id(&self, id: &UserId) -> Result<BTreeSet<Permission>, DirectoryError> {
            match id.as_str() {
                "1" => Ok(BTreeSet::from([Permission::new("p1")])),
                "2" => Ok(BTreeSet::from([Permission::new("p2")])),
                _ => Err(DirectoryError::Corrupt("grant table".into())),
            }
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn engine() -> TokenEngine {
        TokenEngine::new(TokenConfig::new("0123456789abcdef0123456789abcdef")).unwrap()
    }

    fn gateway() -> Gateway {
        let dir = Arc::new(Directory::new());
        let classifier = RequestClassifier::builder()
            .allow_method("/version", HttpMethod::Get)
            .allow("/health")
            .require("/**")
            .build()
            .unwrap();
        let requirements = PermissionRequirements::builder()
            .route("/r/r1", "p1")
            .route("/r/r2", "p2")
            .build()
            .unwrap();
        Gateway::builder(engine(), dir.clone(), dir)
            .classifier(classifier)
            .requirements(requirements)
            .build()
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(RequestId::new())
    }

    async fn access_token(gw: &Gateway, user: &str, secret: &str) -> String {
        let body = format!(r#"{{"username":"{user}","secret":"{secret}"}}"#);
        gw.login(&mut ctx(), &HttpMethod::Post, body.as_bytes())
            .await
            .unwrap()
            .access_token
    }

    #[test]
    fn routing() {
        let gw = gateway();
        assert_eq!(gw.route("/users/login", &HttpMethod::Post), Route::Login);
        assert_eq!(gw.route("/users/refresh", &HttpMethod::Post), Route::Refresh);
        assert_eq!(gw.route("/version", &HttpMethod::Get), Route::Bypass);
        assert_eq!(gw.route("/version", &HttpMethod::Delete), Route::Protected);
        assert_eq!(gw.route("/r/r1", &HttpMethod::Get), Route::Protected);
    }

    #[tokio::test]
    async fn login_authenticates_the_context() {
        let gw = gateway();
        let mut c = ctx();
        let pair = gw
            .login(&mut c, &HttpMethod::Post, br#"{"username":"zhangsan","secret":"123"}"#)
            .await
            .unwrap();
        assert!(!pair.access_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(c.identity().unwrap().id().as_str(), "1");
    }

    #[tokio::test]
    async fn failed_login_rejects_the_context() {
        let gw = gateway();
        let mut c = ctx();
        let err = gw
            .login(&mut c, &HttpMethod::Post, br#"{"username":"zhangsan","secret":"bad"}"#)
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::BadCredentials);
        assert_eq!(c.state(), &AuthState::Rejected(AuthFailure::BadCredentials));
    }

    #[tokio::test]
    async fn bypass_leaves_context_allowed() {
        let gw = gateway();
        let mut c = ctx();
        gw.admit(&mut c, &Resource::new("/health", &HttpMethod::Get), None)
            .await
            .unwrap();
        assert_eq!(c.state(), &AuthState::Allowed);
    }

    #[tokio::test]
    async fn permission_gates_protected_resources() {
        let gw = gateway();
        let header = format!("Bearer {}", access_token(&gw, "zhangsan", "123").await);
        let get = HttpMethod::Get;

        let mut allowed = ctx();
        gw.admit(&mut allowed, &Resource::new("/r/r1", &get), Some(&header))
            .await
            .unwrap();
        assert!(allowed.identity().unwrap().has_permission(&Permission::new("p1")));

        let mut denied = ctx();
        let err = gw
            .admit(&mut denied, &Resource::new("/r/r2", &get), Some(&header))
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::InsufficientPermission);
        assert!(denied.identity().is_none());
    }

    #[tokio::test]
    async fn missing_header_is_rejected_before_lookup() {
        let gw = gateway();
        let mut c = ctx();
        let err = gw
            .admit(&mut c, &Resource::new("/r/r1", &HttpMethod::Get), None)
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::MissingHeader);
        assert_eq!(gw.translate(err).subcode.as_str(), "token-format");
    }

    #[tokio::test]
    async fn expired_token_is_a_lifecycle_failure() {
        let gw = gateway();
        let identity = Identity::new(UserId::new("1").unwrap());
        let pair = engine().issue_pair_at(&identity, t(1_000)).unwrap();
        let header = format!("Bearer {}", pair.access_token);

        let err = gw
            .admit_at(&mut ctx(), &Resource::new("/r/r1", &HttpMethod::Get), Some(&header), t(4_600))
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::Expired);
        assert_eq!(gw.translate(err).subcode.as_str(), "token-lifecycle");
    }

    #[tokio::test]
    async fn lookup_failure_fails_closed() {
        let gw = gateway();
        let header = format!("Bearer {}", access_token(&gw, "ghost", "000").await);
        let err = gw
            .admit(&mut ctx(), &Resource::new("/whoami", &HttpMethod::Get), Some(&header))
            .await
            .unwrap_err();
        assert_eq!(err, AuthFailure::InsufficientPermission);
    }

    #[tokio::test]
    async fn refresh_exchanges_only_refresh_tokens() {
        let gw = gateway();
        let identity = Identity::new(UserId::new("2").unwrap());
        let pair = engine().issue_pair_at(&identity, t(1_000)).unwrap();

        let body = format!(r#"{{"refresh_token":"{}"}}"#, pair.refresh_token);
        let fresh = gw.refresh_at(&HttpMethod::Post, body.as_bytes(), t(5_000)).unwrap();
        let claims = engine().verify_at(&fresh.access_token, t(5_001)).unwrap();
        assert_eq!(claims.user_id.as_str(), "2");

        let wrong = format!(r#"{{"refresh_token":"{}"}}"#, pair.access_token);
        assert_eq!(
            gw.refresh_at(&HttpMethod::Post, wrong.as_bytes(), t(1_001)),
            Err(AuthFailure::WrongTokenKind)
        );
        assert_eq!(
            gw.refresh_at(&HttpMethod::Post, body.as_bytes(), t(8_200)),
            Err(AuthFailure::Expired)
        );
        assert_eq!(gw.refresh_at(&HttpMethod::Post, b"{}", t(1_001)), Err(AuthFailure::BadRequest));
        assert_eq!(gw.refresh_at(&HttpMethod::Get, body.as_bytes(), t(1_001)), Err(AuthFailure::MethodNotSupported));
    }
}
