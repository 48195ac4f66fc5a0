//! Route access policy.
//!
//! An ordered rule table maps `(method, path)` to an [`Access`] class.
//! The first matching rule wins; anything unmatched is [`Access::Protected`].

use std::fmt;

use http::Method;
use serde::Serialize;

/// Access class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// No credential required, ever.
    Public,
    /// Credential optional; if present it must be valid.
    ConditionallyPublic,
    /// Credential required and must be valid.
    Protected,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::ConditionallyPublic => "conditionally_public",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which HTTP methods a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    Only(Method),
}

impl MethodMatcher {
    fn matches(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(expected) => expected == method,
        }
    }
}

/// One segment of a structural path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Exactly this text.
    Literal(&'static str),
    /// One or more ASCII digits.
    Numeric,
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(text) => segment == *text,
            Self::Numeric => !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

/// How a rule matches the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// Path starts with this prefix (e.g. `/uploads/`).
    Prefix(&'static str),
    /// Path equals this string exactly.
    Exact(&'static str),
    /// Path is exactly this sequence of segments; no extra or missing ones.
    Shape(&'static [Segment]),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(*prefix),
            Self::Exact(exact) => path == *exact,
            Self::Shape(pattern) => {
                let Some(rest) = path.strip_prefix('/') else {
                    return false;
                };
                let mut segments = rest.split('/');
                for expected in pattern.iter() {
                    match segments.next() {
                        Some(segment) if expected.matches(segment) => {}
                        _ => return false,
                    }
                }
                segments.next().is_none()
            }
        }
    }
}

/// A single ordered policy rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub method: MethodMatcher,
    pub path: PathMatcher,
    pub access: Access,
}

impl PolicyRule {
    pub fn new(method: MethodMatcher, path: PathMatcher, access: Access) -> Self {
        Self {
            method,
            path,
            access,
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && self.path.matches(path)
    }
}

const POST_DETAIL: &[Segment] = &[Segment::Literal("posts"), Segment::Numeric];
const POST_COMMENTS: &[Segment] = &[
    Segment::Literal("posts"),
    Segment::Numeric,
    Segment::Literal("comments"),
];

/// Ordered, read-only rule table.
///
/// Built once at startup and shared between requests without locking.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
}

impl PolicyTable {
    /// Create a table from explicit rules. Unmatched requests are protected.
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// The community backend's route policy.
    pub fn community() -> Self {
        Self::new(vec![
            // Uploaded images
            PolicyRule::new(
                MethodMatcher::Any,
                PathMatcher::Prefix("/uploads/"),
                Access::Public,
            ),
            // Login and registration
            PolicyRule::new(
                MethodMatcher::Any,
                PathMatcher::Exact("/auth/login"),
                Access::Public,
            ),
            PolicyRule::new(
                MethodMatcher::Any,
                PathMatcher::Exact("/auth/register"),
                Access::Public,
            ),
            // Post listing
            PolicyRule::new(
                MethodMatcher::Only(Method::GET),
                PathMatcher::Exact("/posts"),
                Access::Public,
            ),
            // Post detail and its comments; a token, if sent, identifies the viewer
            PolicyRule::new(
                MethodMatcher::Only(Method::GET),
                PathMatcher::Shape(POST_DETAIL),
                Access::ConditionallyPublic,
            ),
            PolicyRule::new(
                MethodMatcher::Only(Method::GET),
                PathMatcher::Shape(POST_COMMENTS),
                Access::ConditionallyPublic,
            ),
        ])
    }

    /// Classify a request. First match wins.
    pub fn classify(&self, method: &Method, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.access)
            .unwrap_or(Access::Protected)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::community()
    }
}
