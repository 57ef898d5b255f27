// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SNEAKYNOTE_PORT` | Server bind port | `8080` |
//! | `SNEAKYNOTE_CERTS` | Path to TLS certificate chain (PEM) | HTTP only |
//! | `SNEAKYNOTE_PRIVATE_KEY` | Path to TLS private key (PEM) | HTTP only |
//! | `RUST_LOG` | Log level filter | `info` |
//!
//! When both TLS variables are set the server listens with HTTPS and an
//! HTTP-to-HTTPS redirector runs on port 80.

/// Environment variable name for the server port.
pub const PORT_ENV: &str = "SNEAKYNOTE_PORT";

/// Environment variable name for the TLS certificate chain path.
pub const CERTS_ENV: &str = "SNEAKYNOTE_CERTS";

/// Environment variable name for the TLS private key path.
pub const PRIVATE_KEY_ENV: &str = "SNEAKYNOTE_PRIVATE_KEY";

/// Port used when `SNEAKYNOTE_PORT` is not set.
pub const DEFAULT_PORT: u16 = 8080;
