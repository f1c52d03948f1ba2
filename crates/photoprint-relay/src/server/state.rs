// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared state handed to every HTTP handler.

use photoprint_print::{HostPlatform, JobOrchestrator};

/// Application state shared across handlers.
pub struct AppState {
    pub orchestrator: JobOrchestrator,
    /// mDNS instance name, echoed by `/info`.
    pub service_name: String,
    pub platform: HostPlatform,
}

impl AppState {
    pub fn new(orchestrator: JobOrchestrator, service_name: String, platform: HostPlatform) -> Self {
        Self {
            orchestrator,
            service_name,
            platform,
        }
    }
}
