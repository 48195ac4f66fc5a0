// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod server;
mod types;

// Re-export key types and functions
pub use auth::{
    Access, AuthError, Authenticator, DevAccount, DevAccounts, Gatekeeper, Identity, LoginError,
    PolicyTable, RequireUser, TokenCodec, TokenError,
};
pub use config::{Overrides, ServerConfig, load_server_config};
pub use server::{create_app, create_gatekeeper, start_http};
pub use types::UserId;
