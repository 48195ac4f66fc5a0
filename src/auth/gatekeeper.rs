//! Per-request authentication gate.
//!
//! Every request is classified by the [`PolicyTable`] before any handler
//! runs. Public routes pass untouched. Otherwise a `Bearer` credential is
//! looked up and, whenever one is present, verified. A bad credential is
//! rejected even on routes that would have been fine without one.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::auth::context::Identity;
use crate::auth::error::AuthError;
use crate::auth::policy::{Access, PolicyTable};
use crate::auth::token::TokenCodec;
use crate::types::UserId;

const BEARER_PREFIX: &[u8] = b"Bearer ";

/// What an `Authorization` header value carries, as far as the gate cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    /// No header, or a scheme other than `Bearer`.
    Absent,
    Bearer(&'a str),
    /// `Bearer ` followed by bytes that cannot be a token.
    Malformed,
}

/// Classify a raw `Authorization` header value.
///
/// The scheme is matched on bytes, so a `Bearer` value with non-UTF-8
/// content is still a presented credential.
pub fn bearer_credential(authorization: Option<&[u8]>) -> Credential<'_> {
    let Some(rest) = authorization.and_then(|value| value.strip_prefix(BEARER_PREFIX)) else {
        return Credential::Absent;
    };
    match std::str::from_utf8(rest) {
        Ok(token) => Credential::Bearer(token),
        Err(_) => Credential::Malformed,
    }
}

/// Decides, per request, whether it may reach the handlers and as whom.
///
/// Holds shared read-only references to the codec and policy table, so
/// clones are cheap and concurrent requests need no locking.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    codec: Arc<TokenCodec>,
    policy: Arc<PolicyTable>,
}

impl Gatekeeper {
    pub fn new(codec: Arc<TokenCodec>, policy: Arc<PolicyTable>) -> Self {
        Self { codec, policy }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Evaluate one request.
    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        authorization: Option<&[u8]>,
    ) -> Result<Identity, AuthError> {
        self.evaluate_at(method, path, authorization, Utc::now())
    }

    /// Evaluate one request against an explicit clock.
    pub fn evaluate_at(
        &self,
        method: &Method,
        path: &str,
        authorization: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let access = self.policy.classify(method, path);
        if access == Access::Public {
            return Ok(Identity::anonymous());
        }

        let token = match bearer_credential(authorization) {
            Credential::Bearer(token) => token,
            Credential::Malformed => {
                warn!(
                    "Rejected unreadable bearer credential for {} {} ({})",
                    method, path, access
                );
                return Err(AuthError::InvalidCredential);
            }
            Credential::Absent if access == Access::ConditionallyPublic => {
                return Ok(Identity::anonymous());
            }
            Credential::Absent => {
                debug!("Missing bearer credential for {} {}", method, path);
                return Err(AuthError::MissingCredential);
            }
        };

        let subject = self.codec.verify_at(token, now).map_err(|e| {
            warn!(
                "Rejected bearer token for {} {} ({}): {}",
                method,
                path,
                access,
                e.reason()
            );
            AuthError::InvalidCredential
        })?;

        let user_id = subject.parse::<UserId>().map_err(|e| {
            warn!(
                "Token subject for {} {} is not an account id: {}",
                method, path, e
            );
            AuthError::InvalidCredential
        })?;

        debug!("Authenticated user {} for {} {}", user_id, method, path);
        Ok(Identity::authenticated(user_id))
    }
}

/// axum middleware running the [`Gatekeeper`] ahead of every handler.
///
/// Install with `axum::middleware::from_fn_with_state(gatekeeper, gate)` on
/// the outermost router so paths are seen in full.
pub async fn gate(State(gatekeeper): State<Gatekeeper>, mut req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.as_bytes());

    let identity = match gatekeeper.evaluate(req.method(), req.uri().path(), authorization) {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}
