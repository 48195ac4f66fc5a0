//! HTTP server startup.
//!
//! The signing key and policy table are built once here, before the listener
//! opens, and shared read-only with every request afterwards.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use crate::api::create_router;
use crate::auth::{Authenticator, DevAccounts, Gatekeeper, PolicyTable, TokenCodec};
use crate::config::ServerConfig;

/// Build the gatekeeper from configuration.
///
/// A bad signing secret is a fatal error: the server never starts serving.
pub fn create_gatekeeper(config: &ServerConfig) -> Result<Gatekeeper> {
    let codec = TokenCodec::from_base64_secret(&config.jwt_secret)
        .context("Invalid signing key configuration")?;
    Ok(Gatekeeper::new(
        Arc::new(codec),
        Arc::new(PolicyTable::community()),
    ))
}

/// Assemble the full application router.
pub fn create_app(
    config: &ServerConfig,
    authenticator: Arc<dyn Authenticator>,
    business: Router,
) -> Result<Router> {
    let gatekeeper = create_gatekeeper(config)?;
    Ok(create_router(
        gatekeeper,
        authenticator,
        &config.uploads_dir,
        business,
    ))
}

/// Start the HTTP server with the dev-account login backend.
///
/// # Arguments
///
/// * `config` - Resolved server settings
/// * `business` - Application routes to serve behind the auth gate
pub async fn start_http(config: ServerConfig, business: Router) -> Result<()> {
    let accounts = DevAccounts::new(config.dev_accounts.clone());
    if accounts.is_empty() {
        tracing::warn!("No dev accounts configured - every login will fail");
    } else {
        tracing::info!("Loaded {} dev account(s)", accounts.len());
    }

    let app = create_app(&config, Arc::new(accounts), business)?;
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Could not bind {}", config.bind))?;

    tracing::info!(
        "Community gate listening on http://{} (uploads from {})",
        config.bind,
        config.uploads_dir.display()
    );

    axum::serve(listener, app).await?;

    Ok(())
}
