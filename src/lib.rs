//! Dispatch Gateway
//!
//! An HTTP gateway that fans a text message, optionally with one file, out to
//! a list of recipients over an external messaging session:
//! - API keys are RS256-signed tokens backed by a SQL credential store
//! - Dispatches run recipient by recipient with pacing and collect per-recipient failures
//! - Operator key management over an admin API and the CLI

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use api::state::{ApiKeyServiceTrait, AppState};
use config::{PacingMode, TransportKind};
use domain::dispatch::{Pacer, TransportSession};
use infrastructure::{
    api_key::{ApiKeyService, InMemoryApiKeyRepository, SigningKeypair, SqliteApiKeyRepository, TokenSigner},
    dispatch::{DispatchEngine, JitterPacer, NoopPacer, TokenBucketPacer},
    storage::{connect, run_storage_migrations, SqliteConfig},
    transport::{BridgeConfig, BridgeTransport, DryRunTransport, SessionRegistry},
};
use tracing::{info, warn};

/// Create the application state with custom configuration
///
/// Fails when the signing key cannot be read or generated, or the credential
/// store cannot be opened; the server must not start in either case.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let api_key_service = create_api_key_service(config).await?;

    let sessions = Arc::new(create_session_registry(config)?);
    let engine = DispatchEngine::new(sessions, create_pacer(config))
        .with_recipient_server(config.transport.recipient_server.clone());

    Ok(AppState::new(api_key_service, Arc::new(engine))
        .with_limits(config.dispatch.limits())
        .with_request_timeout(Duration::from_secs(config.dispatch.request_timeout_secs))
        .with_admin_token(config.admin.token.clone())
        .with_docs_path(&config.server.docs_path))
}

/// Load the signing keypair and open the credential store
pub async fn create_api_key_service(
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn ApiKeyServiceTrait>> {
    let keypair = SigningKeypair::load_or_generate(
        Path::new(&config.signing.private_key_path),
        config.signing.public_key_path.as_deref().map(Path::new),
        config.signing.key_bits,
    )?;
    info!(fingerprint = %keypair.fingerprint(), "Signing key ready");

    let signer = TokenSigner::new(&keypair)?;

    if config.storage.is_in_memory() {
        warn!("Using in-memory credential store; keys are lost on restart");
        let repository = Arc::new(InMemoryApiKeyRepository::new());
        return Ok(Arc::new(ApiKeyService::new(repository, signer)));
    }

    let sqlite = SqliteConfig::new(config.storage.database_url.clone())
        .with_max_connections(config.storage.max_connections);
    let pool = connect(&sqlite).await?;
    run_storage_migrations(&pool).await?;
    info!(url = %config.storage.database_url, "Credential store ready");

    let repository = Arc::new(SqliteApiKeyRepository::new(pool));
    Ok(Arc::new(ApiKeyService::new(repository, signer)))
}

fn create_session_registry(config: &AppConfig) -> anyhow::Result<SessionRegistry> {
    let transport = &config.transport;

    let session: Option<Arc<dyn TransportSession>> = match transport.kind {
        TransportKind::Bridge => {
            let mut bridge = BridgeConfig::new(transport.bridge_url.clone())
                .with_timeout(Duration::from_secs(transport.timeout_secs));
            if let Some(token) = &transport.bridge_token {
                bridge = bridge.with_token(token.clone());
            }
            info!(url = %bridge.base_url, "Using messaging bridge transport");
            Some(Arc::new(BridgeTransport::new(bridge)?))
        }
        TransportKind::DryRun => {
            warn!("Using dry-run transport; messages are logged, not sent");
            Some(Arc::new(DryRunTransport::new()))
        }
        TransportKind::None => {
            warn!("No transport configured; every dispatch will be rejected as not connected");
            None
        }
    };

    Ok(match session {
        Some(session) => SessionRegistry::with_session(session),
        None => SessionRegistry::new(),
    })
}

fn create_pacer(config: &AppConfig) -> Arc<dyn Pacer> {
    let pacing = &config.dispatch.pacing;

    match pacing.mode {
        PacingMode::Jitter => Arc::new(JitterPacer::from_millis(
            pacing.min_delay_ms,
            pacing.max_delay_ms,
        )),
        PacingMode::TokenBucket => {
            Arc::new(TokenBucketPacer::new(pacing.rate_per_second, pacing.burst))
        }
        PacingMode::None => Arc::new(NoopPacer),
    }
}
