//! Authentication and request gating.
//!
//! Every inbound request passes through the [`Gatekeeper`] before any
//! handler runs:
//!
//! - **Policy**: the [`PolicyTable`] classifies `(method, path)` as public,
//!   conditionally public, or protected
//! - **Token**: the [`TokenCodec`] verifies `Authorization: Bearer` tokens
//! - **Identity**: on success an [`Identity`] is attached to the request
//!
//! ## Security Model
//!
//! - Tokens are stateless HS256 JWTs signed with one process-wide key
//! - A token that is presented is always verified, even where none is needed
//! - Missing and invalid credentials end the request with a 401
//!
//! ## Usage
//!
//! ```ignore
//! let gatekeeper = Gatekeeper::new(codec, Arc::new(PolicyTable::community()));
//! let app = router.layer(axum::middleware::from_fn_with_state(gatekeeper, gate));
//!
//! async fn show_post(identity: Identity) -> impl IntoResponse {
//!     let viewer = identity.user_id();
//!     // ...
//! }
//! ```

mod context;
mod error;
mod gatekeeper;
mod login;
mod policy;
mod token;

pub use context::{Identity, RequireUser};
pub use error::AuthError;
pub use gatekeeper::{Credential, Gatekeeper, bearer_credential, gate};
pub use login::{Authenticator, DevAccount, DevAccounts, LoginError, hash_password};
pub use policy::{Access, MethodMatcher, PathMatcher, PolicyRule, PolicyTable, Segment};
pub use token::{MIN_SECRET_BYTES, TOKEN_VALIDITY_SECONDS, TokenClaims, TokenCodec, TokenError};
