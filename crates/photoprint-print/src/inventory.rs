// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Installed-printer inventory.
//
// Asks the host which printers are installed and which one is the default:
//   - Unix:    `lpstat -d` / `lpstat -p` (CUPS)
//   - Windows: `Get-CimInstance Win32_Printer` through PowerShell, as JSON
//
// Enumeration is best-effort.  The public queries collapse every failure
// (missing tool, timeout, unparseable output) into "no default" / "no
// printers"; the `try_` variants keep the error for callers that must not
// overwrite a good snapshot with an empty one.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use photoprint_core::error::{PhotoprintError, Result};
use photoprint_core::types::PrinterInventorySnapshot;

use crate::command::{CommandRunner, CommandSpec, HostPlatform};

/// Upper bound for a single inventory query.
pub const INVENTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// PowerShell pipeline listing printers with their default flag as JSON.
const WIN32_PRINTER_QUERY: &str =
    "Get-CimInstance -ClassName Win32_Printer | Select-Object Name,Default | ConvertTo-Json -Compress";

/// Queries the host for installed printers.
#[derive(Clone)]
pub struct PrinterInventory {
    runner: Arc<dyn CommandRunner>,
    platform: HostPlatform,
}

impl PrinterInventory {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: HostPlatform) -> Self {
        Self { runner, platform }
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// Name of the system default printer, or `None` if it cannot be
    /// determined for any reason.
    pub async fn detect_default_printer(&self) -> Option<String> {
        match self.try_detect_default_printer().await {
            Ok(name) => name,
            Err(e) => {
                debug!(error = %e, "default printer unknown");
                None
            }
        }
    }

    /// Every installed printer in OS order, or an empty list on any failure.
    pub async fn list_available_printers(&self) -> Vec<String> {
        match self.try_list_available_printers().await {
            Ok(printers) => printers,
            Err(e) => {
                debug!(error = %e, "printer enumeration failed");
                Vec::new()
            }
        }
    }

    /// Default printer query that reports why it failed.
    #[instrument(skip(self), fields(platform = self.platform.name()))]
    pub async fn try_detect_default_printer(&self) -> Result<Option<String>> {
        match self.platform {
            HostPlatform::Unix => {
                let spec = lpstat("-d");
                let output = self.runner.run(&spec, INVENTORY_TIMEOUT).await?;
                // lpstat exits non-zero when no default is set on some CUPS builds.
                if !output.success && !output.stdout.contains("default destination") {
                    return output.into_checked(&spec).map(|_| None);
                }
                Ok(parse_lpstat_default(&output.stdout))
            }
            HostPlatform::Windows => Ok(self
                .query_win32_printers()
                .await?
                .into_iter()
                .find(|p| p.default)
                .map(|p| p.name)),
        }
    }

    /// Printer enumeration that reports why it failed.
    #[instrument(skip(self), fields(platform = self.platform.name()))]
    pub async fn try_list_available_printers(&self) -> Result<Vec<String>> {
        let printers = match self.platform {
            HostPlatform::Unix => {
                let spec = lpstat("-p");
                let output = self.runner.run(&spec, INVENTORY_TIMEOUT).await?;
                if !output.success && output.stderr.contains("No destinations added") {
                    Vec::new()
                } else {
                    parse_lpstat_printers(&output.into_checked(&spec)?.stdout)
                }
            }
            HostPlatform::Windows => self
                .query_win32_printers()
                .await?
                .into_iter()
                .map(|p| p.name)
                .collect(),
        };
        debug!(count = printers.len(), "printers enumerated");
        Ok(printers)
    }

    /// Query both facts, collapsing failures.
    pub async fn snapshot(&self) -> PrinterInventorySnapshot {
        let known = self.list_available_printers().await;
        let default = self.detect_default_printer().await;
        PrinterInventorySnapshot::new(default, known)
    }

    async fn query_win32_printers(&self) -> Result<Vec<Win32Printer>> {
        let spec = CommandSpec::new("powershell").args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            WIN32_PRINTER_QUERY,
        ]);
        let output = self
            .runner
            .run(&spec, INVENTORY_TIMEOUT)
            .await?
            .into_checked(&spec)?;
        parse_win32_printers(&output.stdout)
    }
}

/// One row of the `Win32_Printer` query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32Printer {
    name: String,
    #[serde(default)]
    default: bool,
}

/// `ConvertTo-Json` emits a bare object for one row and an array otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum Win32PrinterRows {
    Many(Vec<Win32Printer>),
    One(Win32Printer),
}

fn parse_win32_printers(stdout: &str) -> Result<Vec<Win32Printer>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Win32PrinterRows = serde_json::from_str(trimmed)
        .map_err(|e| PhotoprintError::Inventory(format!("Win32_Printer output: {e}")))?;
    Ok(match rows {
        Win32PrinterRows::Many(rows) => rows,
        Win32PrinterRows::One(row) => vec![row],
    })
}

/// `lpstat` with the C locale, so the English output format can be parsed.
fn lpstat(flag: &str) -> CommandSpec {
    CommandSpec::new("lpstat").arg(flag).env("LC_ALL", "C")
}

/// Parse `lpstat -d`: `system default destination: NAME`.
fn parse_lpstat_default(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|line| line.contains("default destination:"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, name)| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Parse `lpstat -p`: one `printer NAME is idle. ...` line per queue.
fn parse_lpstat_printers(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("printer "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(String::from)
        .collect()
}

/// Holds the current [`PrinterInventorySnapshot`].
///
/// Readers get an `Arc` to an immutable snapshot; a refresh swaps the whole
/// `Arc`, so a reader sees either the old or the new snapshot, never a mix.
pub struct InventoryStore {
    current: RwLock<Arc<PrinterInventorySnapshot>>,
}

impl InventoryStore {
    pub fn new(initial: PrinterInventorySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<PrinterInventorySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new snapshot and return it.
    pub fn replace(&self, next: PrinterInventorySnapshot) -> Arc<PrinterInventorySnapshot> {
        let next = Arc::new(next);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        info!(
            default = next.default_printer.as_deref().unwrap_or("<none>"),
            count = next.known_printers.len(),
            "printer inventory replaced"
        );
        next
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new(PrinterInventorySnapshot::empty())
    }
}

/// Log a warning when a printer name is not part of the snapshot.
pub(crate) fn warn_if_unknown(snapshot: &PrinterInventorySnapshot, printer: &str) {
    if !snapshot.contains(printer) {
        warn!(
            printer,
            known = ?snapshot.known_printers,
            "printer not in last known inventory; dispatching anyway"
        );
    }
}
