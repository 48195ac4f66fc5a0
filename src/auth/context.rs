//! Request-scoped caller identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::error;

use crate::auth::error::AuthError;
use crate::types::UserId;

/// Identity attached to one request by the gate.
///
/// The gate inserts a fresh value into the request extensions for every
/// request it lets through; it is dropped with the request. There are no
/// setters, so handlers can only read it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    user_id: Option<UserId>,
}

impl Identity {
    /// No verified caller (public route, or no token on an optional route).
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub(crate) fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// The authenticated caller for this request, if any.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().copied().ok_or_else(|| {
            error!(
                "No identity on request to {}; is the auth gate installed?",
                parts.uri.path()
            );
            AuthError::IdentityUnavailable
        })
    }
}

/// Extractor for handlers that need a caller.
///
/// Rejects with [`AuthError::MissingCredential`] when the request carries
/// no verified identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequireUser(pub UserId);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        identity
            .user_id()
            .map(RequireUser)
            .ok_or(AuthError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_with(identity: Option<Identity>) -> Parts {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/posts/1")
            .body(())
            .unwrap()
            .into_parts();
        if let Some(identity) = identity {
            parts.extensions.insert(identity);
        }
        parts
    }

    #[test]
    fn test_identity_constructors() {
        assert_eq!(Identity::anonymous().user_id(), None);
        assert_eq!(Identity::default(), Identity::anonymous());
        assert_eq!(
            Identity::authenticated(UserId::new(7)).user_id(),
            Some(UserId::new(7))
        );
    }

    #[tokio::test]
    async fn test_identity_extracted_from_extensions() {
        let mut parts = parts_with(Some(Identity::authenticated(UserId::new(7))));
        let identity = Identity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(identity.user_id(), Some(UserId::new(7)));
    }

    #[tokio::test]
    async fn test_identity_missing_fails_closed() {
        let mut parts = parts_with(None);
        let err = Identity::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::IdentityUnavailable);
    }

    #[tokio::test]
    async fn test_require_user() {
        let mut parts = parts_with(Some(Identity::authenticated(UserId::new(3))));
        let RequireUser(id) = RequireUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(id, UserId::new(3));

        let mut parts = parts_with(Some(Identity::anonymous()));
        let err = RequireUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::MissingCredential);
    }
}
