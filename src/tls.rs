// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! TLS listener configuration and the HTTP-to-HTTPS redirector.
//!
//! When `SNEAKYNOTE_CERTS` and `SNEAKYNOTE_PRIVATE_KEY` are both set, the
//! main listener serves HTTPS via rustls and a plain-HTTP listener on port
//! 80 permanently redirects every request to the `https://` origin.

use std::io;

use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;

/// Two years, per the HSTS preload list requirements.
pub const HSTS_VALUE: &str = "max-age=63072000; includeSubDomains; preload";

/// Load the certificate chain and private key from PEM files.
pub async fn rustls_config(certs: &str, private_key: &str) -> io::Result<RustlsConfig> {
    RustlsConfig::from_pem_file(certs, private_key).await
}

/// Serve the port-80 redirector until it fails. Binding port 80 needs
/// privileges; failure is logged and the HTTPS listener carries on.
pub async fn serve_redirector() {
    match tokio::net::TcpListener::bind(("0.0.0.0", 80)).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, redirector().into_make_service()).await {
                tracing::warn!(error = %e, "HTTP redirector stopped");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to bind HTTP redirector on port 80");
        }
    }
}

/// Router that 301-redirects every request to its HTTPS counterpart.
pub fn redirector() -> Router {
    Router::new().fallback(redirect_to_https)
}

async fn redirect_to_https(headers: HeaderMap, uri: Uri) -> Response {
    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let host = host.split(':').next().unwrap_or(host);
    let location = format!("https://{host}{uri}");
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, location)],
    )
        .into_response()
}
