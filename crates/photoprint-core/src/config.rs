// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Relay configuration, read from `PHOTOPRINT_*` environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PhotoprintError, Result};

/// Runtime settings for the relay process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Interface to bind the HTTP server to.
    pub bind_addr: String,
    /// HTTP port, also published in the mDNS record.
    pub port: u16,
    /// Overrides the OS default printer when set.
    pub printer_override: Option<String>,
    /// mDNS instance name.
    pub service_name: String,
    /// Image printed instead of the payload for restricted jobs.
    pub placeholder_path: PathBuf,
    /// Where transient print artifacts are written.
    pub scratch_dir: PathBuf,
    /// Request body limit for `/print`, in MiB.
    pub max_body_mb: usize,
    /// Whether to publish the mDNS record at all.
    pub advertise: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 3000,
            printer_override: None,
            service_name: "Photoprint Relay".into(),
            placeholder_path: PathBuf::from("assets/placeholder.png"),
            scratch_dir: std::env::temp_dir(),
            max_body_mb: 50,
            advertise: true,
        }
    }
}

impl RelayConfig {
    /// Build the config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Unset or blank keys
    /// keep their default; malformed numbers and booleans are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(bind) = get("PHOTOPRINT_BIND") {
            config.bind_addr = bind;
        }
        if let Some(port) = get("PHOTOPRINT_PORT") {
            config.port = port
                .parse()
                .map_err(|e| PhotoprintError::Config(format!("PHOTOPRINT_PORT={port}: {e}")))?;
        }
        config.printer_override = get("PHOTOPRINT_PRINTER");
        if let Some(name) = get("PHOTOPRINT_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(path) = get("PHOTOPRINT_PLACEHOLDER") {
            config.placeholder_path = PathBuf::from(path);
        }
        if let Some(dir) = get("PHOTOPRINT_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(mb) = get("PHOTOPRINT_MAX_BODY_MB") {
            config.max_body_mb = mb.parse().map_err(|e| {
                PhotoprintError::Config(format!("PHOTOPRINT_MAX_BODY_MB={mb}: {e}"))
            })?;
        }
        if let Some(flag) = get("PHOTOPRINT_ADVERTISE") {
            config.advertise = parse_flag(&flag).ok_or_else(|| {
                PhotoprintError::Config(format!("PHOTOPRINT_ADVERTISE={flag}: expected a boolean"))
            })?;
        }

        Ok(config)
    }

    /// `bind_addr:port`, suitable for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
