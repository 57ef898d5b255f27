// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

use std::env;
use std::net::SocketAddr;
use std::process;

use axum::http::{header, HeaderValue};
use tokio_util::sync::CancellationToken;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sneakynote::api;
use sneakynote::config::{CERTS_ENV, DEFAULT_PORT, PORT_ENV, PRIVATE_KEY_ENV};
use sneakynote::state::AppState;
use sneakynote::store::{Store, Sweeper};
use sneakynote::tls;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        None => start_server().await,
        Some("setup") => {
            setup_store();
        }
        Some("teardown") => teardown_store(),
        Some(other) => {
            eprintln!("Invalid argument {other}");
            eprintln!();
            eprintln!("No arguments starts the server.");
            eprintln!();
            eprintln!("    sneakynote setup");
            eprintln!("will set up the datastore.");
            eprintln!();
            eprintln!("    sneakynote teardown");
            eprintln!("will tear down the datastore.");
            process::exit(1);
        }
    }
}

fn setup_store() -> Store {
    info!("Setting up datastore...");
    let store = Store::with_default_paths();
    if let Err(e) = store.setup() {
        error!(error = %e, "failed to set up datastore");
        process::exit(1);
    }
    store
}

/// Reuse an already-mounted substrate; mount a fresh one otherwise.
fn maybe_setup_store() -> Store {
    let store = Store::with_default_paths();
    if store.paths().expired_dir().exists() {
        store
    } else {
        setup_store()
    }
}

fn teardown_store() {
    info!("Tearing down datastore...");
    let store = Store::with_default_paths();
    if let Err(e) = store.teardown() {
        error!(error = %e, "failed to tear down datastore");
        process::exit(1);
    }
}

async fn start_server() {
    let state = AppState::new(maybe_setup_store());

    info!("Starting sweeper...");
    let shutdown = CancellationToken::new();
    tokio::spawn(Sweeper::new(state.store.clone()).run(shutdown.clone()));

    let port: u16 = env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = api::router(state);

    let certs = env::var(CERTS_ENV).unwrap_or_default();
    let private_key = env::var(PRIVATE_KEY_ENV).unwrap_or_default();

    if certs.is_empty() || private_key.is_empty() {
        info!(port, "Starting SneakyNote server");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind TCP listener");
        axum::serve(listener, app.into_make_service())
            .await
            .expect("Server failed");
    } else {
        info!(port, "Starting SneakyNote server with TLS");
        tokio::spawn(tls::serve_redirector());

        let config = tls::rustls_config(&certs, &private_key)
            .await
            .expect("Failed to load TLS certificate/key");
        let app = app.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(tls::HSTS_VALUE),
        ));
        axum_server::bind_rustls(addr, config)
            .serve(app.into_make_service())
            .await
            .expect("Server failed");
    }
}
