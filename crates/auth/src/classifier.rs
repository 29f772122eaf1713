//! Request classifier: decides whether a request must be authenticated.
//!
//! Two ordered rule lists are consulted. The allow-list is tested first and
//! wins; the require-list is tested second. Empty lists are replaced by
//! explicit sentinels: an empty allow-list matches nothing, an empty
//! require-list matches everything. A classifier built with zero allow rules
//! therefore never bypasses authentication.

use core::str::FromStr;

use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP method
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, parsed case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl HttpMethod {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Other(m) => m,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns and rules
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("pattern '{0}' may only use '**' as its final segment")]
    MisplacedWildcard(String),
}

/// A path pattern: an exact literal, or a prefix followed by `/**`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// Matches the prefix itself and every sub-path. An empty prefix (the
    /// pattern `/**`) matches every path.
    Prefix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute(pattern.to_string()));
        }

        let (literal, wildcard) = match pattern.strip_suffix("/**") {
            Some(prefix) => (prefix, true),
            None => (pattern, false),
        };
        if literal.contains('*') {
            return Err(PatternError::MisplacedWildcard(pattern.to_string()));
        }

        Ok(if wildcard {
            Self::Prefix(literal.to_string())
        } else {
            Self::Exact(literal.to_string())
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(literal) => path == literal,
            Self::Prefix(prefix) if prefix.is_empty() => true,
            Self::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

/// `(pathPattern, method | any)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatchRule {
    pattern: PathPattern,
    method: Option<HttpMethod>,
}

impl RequestMatchRule {
    pub fn new(pattern: &str, method: Option<HttpMethod>) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            method,
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self) -> Option<&HttpMethod> {
        self.method.as_ref()
    }

    pub fn matches(&self, path: &str, method: &HttpMethod) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }
}

/// Disjunction of rules with first-class sentinels for the empty cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Any,
    Nothing,
    AnyOf(Vec<RequestMatchRule>),
}

impl Matcher {
    /// Builds a matcher from `rules`, substituting `when_empty` for an empty list.
    pub fn from_rules(rules: Vec<RequestMatchRule>, when_empty: Matcher) -> Self {
        if rules.is_empty() {
            when_empty
        } else {
            Self::AnyOf(rules)
        }
    }

    pub fn matches(&self, path: &str, method: &HttpMethod) -> bool {
        match self {
            Self::Any => true,
            Self::Nothing => false,
            Self::AnyOf(rules) => rules.iter().any(|r| r.matches(path, method)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classifier
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable allow/require classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestClassifier {
    allow: Matcher,
    require: Matcher,
}

impl Default for RequestClassifier {
    /// Never bypasses, always requires.
    fn default() -> Self {
        Self {
            allow: Matcher::Nothing,
            require: Matcher::Any,
        }
    }
}

impl RequestClassifier {
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::with_base("")
    }

    pub fn builder_with_base(base: &str) -> ClassifierBuilder {
        ClassifierBuilder::with_base(base)
    }

    pub fn requires_authentication(&self, path: &str, method: &HttpMethod) -> bool {
        if self.allow.matches(path, method) {
            return false;
        }
        self.require.matches(path, method)
    }

    pub fn allow_matcher(&self) -> &Matcher {
        &self.allow
    }

    pub fn require_matcher(&self) -> &Matcher {
        &self.require
    }
}

/// Collects rules and prepends an optional common base to every pattern, so
/// one rule set can be mounted under different prefixes.
#[derive(Debug, Clone, Default)]
pub struct ClassifierBuilder {
    base: String,
    allow: Vec<(String, Option<HttpMethod>)>,
    require: Vec<(String, Option<HttpMethod>)>,
}

impl ClassifierBuilder {
    pub fn with_base(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn allow(self, pattern: &str) -> Self {
        self.allow_method(pattern, None)
    }

    pub fn allow_method(mut self, pattern: &str, method: impl Into<Option<HttpMethod>>) -> Self {
        self.allow.push((pattern.to_string(), method.into()));
        self
    }

    pub fn allow_all<'a>(mut self, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        for p in patterns {
            self = self.allow(p);
        }
        self
    }

    pub fn require(self, pattern: &str) -> Self {
        self.require_method(pattern, None)
    }

    pub fn require_method(mut self, pattern: &str, method: impl Into<Option<HttpMethod>>) -> Self {
        self.require.push((pattern.to_string(), method.into()));
        self
    }

    pub fn require_all<'a>(mut self, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        for p in patterns {
            self = self.require(p);
        }
        self
    }

    pub fn build(self) -> Result<RequestClassifier, PatternError> {
        let allow = self.compile(&self.allow)?;
        let require = self.compile(&self.require)?;
        Ok(RequestClassifier {
            allow: Matcher::from_rules(allow, Matcher::Nothing),
            require: Matcher::from_rules(require, Matcher::Any),
        })
    }

    fn compile(&self, entries: &[(String, Option<HttpMethod>)]) -> Result<Vec<RequestMatchRule>, PatternError> {
        entries
            .iter()
            .map(|(pattern, method)| RequestMatchRule::new(&format!("{}{}", self.base, pattern), method.clone()))
            .collect()
    }
}

/// Endpoints that are public in a stock deployment, apart from the login
/// and refresh routes and `GET /version` which callers add themselves.
pub const PUBLIC_ENDPOINTS: &[&str] = &[
    "/users/register",
    "/health",
    "/swagger-ui/**",
    "/error",
    "/static/**",
    "/public/**",
    "/favicon.ico",
    "/actuator/**",
];
