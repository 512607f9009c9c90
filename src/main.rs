// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use identity_gateway::{
    api::router,
    audit::AuditLogger,
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    identity::IdentityService,
    providers::{
        google::{SCOPE_CLOUD_PLATFORM, SCOPE_DATASTORE, SCOPE_IDENTITY_TOOLKIT},
        AccessTokenSource, FirebaseVerifier, FirestoreSink, ServiceAccountKey,
    },
    state::AppState,
};

/// Timeout for every outbound HTTP request to Google.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let key = ServiceAccountKey::from_file(&config.credentials_path)?;
    tracing::info!(
        project_id = %key.project_id,
        client_email = %key.client_email,
        "Loaded service account credentials"
    );

    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let tokens = Arc::new(AccessTokenSource::new(
        key,
        &[SCOPE_CLOUD_PLATFORM, SCOPE_IDENTITY_TOOLKIT, SCOPE_DATASTORE],
        http.clone(),
    )?);

    let endpoints = &config.endpoints;
    let verifier = Arc::new(FirebaseVerifier::new(
        tokens.clone(),
        endpoints.identity_toolkit_url.clone(),
        endpoints.jwks_url.clone(),
        http.clone(),
    ));
    let sink = Arc::new(FirestoreSink::new(
        tokens,
        config.log_collection.clone(),
        endpoints.firestore_url.clone(),
        http,
    ));
    tracing::info!(
        collection = %sink.collection(),
        firestore_url = %endpoints.firestore_url,
        "Access logs go to Firestore"
    );

    let audit = AuditLogger::new(sink);
    let identity =
        IdentityService::new(verifier, audit.clone()).with_call_timeout(config.auth_timeout);
    let app = router(AppState::new(identity, audit))
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr = config.bind_addr()?;

    let server = async {
        match &config.tls {
            Some(tls) => {
                rustls::crypto::ring::default_provider()
                    .install_default()
                    .map_err(|_| "failed to install rustls crypto provider")?;
                let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
                tracing::info!("Identity gateway listening on https://{addr} (docs at /docs)");
                axum_server::bind_rustls(addr, tls_config).serve(app).await?;
            }
            None => {
                tracing::info!("Identity gateway listening on http://{addr} (docs at /docs)");
                axum_server::bind(addr).serve(app).await?;
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    };

    tokio::select! {
        result = server => result?,
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping server");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Identity gateway failed");
            ExitCode::FAILURE
        }
    }
}
