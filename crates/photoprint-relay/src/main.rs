// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photoprint: LAN photo print relay
//
// Entry point. Initialises logging and configuration, loads the printer
// inventory, advertises the relay over mDNS and serves HTTP until Ctrl-C.

mod server;

use std::sync::Arc;

use photoprint_core::RelayConfig;
use photoprint_core::error::Result;
use photoprint_core::types::AdvertiseStatus;
use photoprint_print::{
    HostPlatform, JobOrchestrator, PrintDispatcher, PrinterInventory, ServiceAdvertiser,
    SystemCommandRunner, txt_properties,
};

use server::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Photoprint starting");

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Photoprint stopped with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = RelayConfig::from_env()?;
    let platform = HostPlatform::current();
    tracing::info!(
        platform = platform.name(),
        listen = %config.listen_addr(),
        scratch_dir = %config.scratch_dir.display(),
        "configuration loaded"
    );
    if !config.placeholder_path.exists() {
        tracing::warn!(
            path = %config.placeholder_path.display(),
            "placeholder image not found; restricted jobs will fail to print"
        );
    }

    let runner = Arc::new(SystemCommandRunner);
    let orchestrator = JobOrchestrator::new(
        PrinterInventory::new(runner.clone(), platform),
        PrintDispatcher::new(
            runner,
            platform,
            config.placeholder_path.clone(),
            config.scratch_dir.clone(),
        ),
        config.scratch_dir.clone(),
        config.printer_override.clone(),
    );

    let snapshot = orchestrator.initialise().await;
    tracing::info!(
        default = %orchestrator.default_printer_label(),
        printers = ?snapshot.known_printers,
        "printer inventory loaded"
    );

    // Bind before advertising so clients never resolve a dead port.
    let listener = server::bind(&config.listen_addr()).await?;

    let mut advertiser = ServiceAdvertiser::new(config.service_name.clone(), config.port);
    if config.advertise {
        let properties = txt_properties(
            &snapshot,
            config.printer_override.as_deref(),
            env!("CARGO_PKG_VERSION"),
        );
        let status = advertiser.register(&properties);
        tracing::info!(?status, "mDNS advertisement");
    } else {
        tracing::info!("mDNS advertisement disabled");
    }

    let state = Arc::new(AppState::new(orchestrator, config.service_name.clone(), platform));
    let app = server::router(state, config.max_body_mb.saturating_mul(1024 * 1024));

    let served = server::serve(listener, app, shutdown_signal()).await;

    if advertiser.status() == AdvertiseStatus::Registered {
        tracing::info!("withdrawing mDNS advertisement");
    }
    advertiser.unregister();
    tracing::info!("Photoprint stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
