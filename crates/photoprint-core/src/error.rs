// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Photoprint.

use thiserror::Error;

/// Top-level error type for all Photoprint operations.
#[derive(Debug, Error)]
pub enum PhotoprintError {
    // -- Inventory --
    #[error("printer inventory query failed: {0}")]
    Inventory(String),

    // -- External commands --
    #[error("command `{program}` failed: {detail}")]
    Command { program: String, detail: String },

    #[error("command `{program}` timed out after {secs}s")]
    CommandTimeout { program: String, secs: u64 },

    // -- Dispatch --
    #[error("all print methods failed")]
    AllMethodsFailed,

    // -- Request / document --
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("page rendering failed: {0}")]
    Render(String),

    // -- Network surface --
    #[error("service advertisement failed: {0}")]
    Discovery(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PhotoprintError>;
