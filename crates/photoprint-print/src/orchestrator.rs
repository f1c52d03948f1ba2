// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job orchestration: printer resolution, artifact lifetime and dispatch for a
// single print job, plus ownership of the printer inventory snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use photoprint_core::error::{PhotoprintError, Result};
use photoprint_core::types::{JobId, MAX_COPIES, PrintJob, PrinterInventorySnapshot};

use crate::artifact::with_printable_artifact;
use crate::dispatch::{DispatchMethod, DispatchRequest, PrintDispatcher};
use crate::inventory::{InventoryStore, PrinterInventory, warn_if_unknown};

/// Label reported to clients when no printer name is known.
pub const DEFAULT_PRINTER_LABEL: &str = "default";

/// A job that reached a printer.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: JobId,
    /// Copies as requested, even when restricted mode printed one.
    pub copies: u32,
    /// Resolved printer name, or [`DEFAULT_PRINTER_LABEL`].
    pub printer: String,
    pub method: DispatchMethod,
}

/// A job that did not print.
#[derive(Debug)]
pub struct JobFailure {
    pub job_id: JobId,
    pub printer: String,
    pub error: PhotoprintError,
}

/// Pick the printer for a job: the requested one when non-empty, otherwise
/// the default.
pub fn resolve_printer(requested: Option<&str>, default: Option<&str>) -> Option<String> {
    requested
        .filter(|p| !p.trim().is_empty())
        .or(default)
        .map(String::from)
}

/// Runs print jobs and owns the inventory snapshot they resolve against.
pub struct JobOrchestrator {
    inventory: PrinterInventory,
    store: InventoryStore,
    dispatcher: PrintDispatcher,
    scratch_dir: PathBuf,
    printer_override: Option<String>,
}

impl JobOrchestrator {
    pub fn new(
        inventory: PrinterInventory,
        dispatcher: PrintDispatcher,
        scratch_dir: PathBuf,
        printer_override: Option<String>,
    ) -> Self {
        Self {
            inventory,
            store: InventoryStore::default(),
            dispatcher,
            scratch_dir,
            printer_override: printer_override.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Load the first snapshot. Failures leave an empty inventory.
    #[instrument(skip(self))]
    pub async fn initialise(&self) -> Arc<PrinterInventorySnapshot> {
        let snapshot = self.store.replace(self.inventory.snapshot().await);
        if let Some(printer) = &self.printer_override {
            info!(printer, "using configured printer instead of OS default");
            warn_if_unknown(&snapshot, printer);
        }
        snapshot
    }

    /// Re-query the host. On enumeration failure the previous snapshot stays.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<PrinterInventorySnapshot>> {
        let known = match self.inventory.try_list_available_printers().await {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %e, "printer refresh failed, keeping previous inventory");
                return Err(e);
            }
        };
        let default = self.inventory.detect_default_printer().await;
        Ok(self
            .store
            .replace(PrinterInventorySnapshot::new(default, known)))
    }

    pub fn snapshot(&self) -> Arc<PrinterInventorySnapshot> {
        self.store.load()
    }

    /// The printer used when a job names none.
    pub fn default_printer(&self) -> Option<String> {
        self.printer_override
            .clone()
            .or_else(|| self.snapshot().default_printer.clone())
    }

    /// [`Self::default_printer`] or [`DEFAULT_PRINTER_LABEL`].
    pub fn default_printer_label(&self) -> String {
        self.default_printer()
            .unwrap_or_else(|| DEFAULT_PRINTER_LABEL.to_string())
    }

    /// Print one job.
    #[instrument(skip(self, job), fields(job_id = %job.id, copies = job.copies, restricted = job.restricted))]
    pub async fn submit(&self, job: PrintJob) -> std::result::Result<JobReport, JobFailure> {
        let snapshot = self.snapshot();
        let default = self
            .printer_override
            .as_deref()
            .or(snapshot.default_printer.as_deref());
        let printer = resolve_printer(job.requested_printer.as_deref(), default);
        if let Some(name) = &printer {
            warn_if_unknown(&snapshot, name);
        }
        let label = printer
            .clone()
            .unwrap_or_else(|| DEFAULT_PRINTER_LABEL.to_string());
        let copies = job.copies.clamp(1, MAX_COPIES);

        let dispatcher = &self.dispatcher;
        let outcome = with_printable_artifact(
            &self.scratch_dir,
            job.id,
            &job.payload,
            job.media_kind,
            |artifact| {
                dispatcher.dispatch(DispatchRequest {
                    job_id: job.id,
                    artifact,
                    copies,
                    printer,
                    restricted: job.restricted,
                    page_size: job.target_page_size,
                })
            },
        )
        .await;

        match outcome {
            Ok(dispatched) => {
                info!(printer = %label, method = dispatched.method.name(), "job printed");
                Ok(JobReport {
                    job_id: job.id,
                    copies,
                    printer: label,
                    method: dispatched.method,
                })
            }
            Err(e) => {
                error!(printer = %label, error = %e, "job failed");
                Err(JobFailure {
                    job_id: job.id,
                    printer: label,
                    error: e,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::HostPlatform;
    use crate::testing::{RecordingRunner, failed, missing, ok};
    use photoprint_core::types::MediaKind;

    const LPSTAT_P: &str = "printer DNP_DS620 is idle.  enabled since today\n\
                            printer Office is idle.  enabled since today\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        scratch: PathBuf,
        runner: Arc<RecordingRunner>,
        orchestrator: JobOrchestrator,
    }

    fn fixture(runner: RecordingRunner, printer_override: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let scratch = dir.path().join("scratch");
        let placeholder = dir.path().join("placeholder.png");
        std::fs::write(&placeholder, b"placeholder").unwrap();
        let runner = Arc::new(runner);
        let orchestrator = JobOrchestrator::new(
            PrinterInventory::new(runner.clone(), HostPlatform::Unix),
            PrintDispatcher::new(runner.clone(), HostPlatform::Unix, placeholder, scratch.clone()),
            scratch.clone(),
            printer_override.map(String::from),
        );
        Fixture {
            _dir: dir,
            scratch,
            runner,
            orchestrator,
        }
    }

    fn cups(spec: &crate::command::CommandSpec) -> Result<crate::command::CommandOutput> {
        Ok(match (spec.program.as_str(), spec.args.first().map(String::as_str)) {
            ("lpstat", Some("-d")) => ok("system default destination: DNP_DS620\n"),
            ("lpstat", _) => ok(LPSTAT_P),
            _ => ok("request id is DNP_DS620-1 (1 file(s))"),
        })
    }

    fn lp_calls(runner: &RecordingRunner) -> Vec<crate::command::CommandSpec> {
        runner.calls().into_iter().filter(|c| c.program == "lp").collect()
    }

    #[test]
    fn requested_printer_wins_over_default() {
        assert_eq!(
            resolve_printer(Some("Office"), Some("DNP")).as_deref(),
            Some("Office")
        );
        assert_eq!(resolve_printer(Some(""), Some("DNP")).as_deref(), Some("DNP"));
        assert_eq!(resolve_printer(None, Some("DNP")).as_deref(), Some("DNP"));
        assert_eq!(resolve_printer(None, None), None);
    }

    #[tokio::test]
    async fn job_without_printer_uses_snapshot_default() {
        let fx = fixture(RecordingRunner::new(cups), None);
        fx.orchestrator.initialise().await;

        let mut job = PrintJob::new(b"png".to_vec(), MediaKind::Png);
        job.copies = 2;
        let report = fx.orchestrator.submit(job).await.expect("printed");

        assert_eq!(report.printer, "DNP_DS620");
        assert_eq!(report.copies, 2);
        let lp = lp_calls(&fx.runner);
        assert_eq!(lp.len(), 1);
        assert_eq!(&lp[0].args[..4], ["-d", "DNP_DS620", "-n", "2"]);
    }

    #[tokio::test]
    async fn copy_count_is_bounded() {
        let fx = fixture(RecordingRunner::new(cups), None);
        fx.orchestrator.initialise().await;

        let mut job = PrintJob::new(b"png".to_vec(), MediaKind::Png);
        job.copies = u32::MAX;
        let report = fx.orchestrator.submit(job).await.expect("printed");
        assert_eq!(report.copies, MAX_COPIES);

        let mut job = PrintJob::new(b"png".to_vec(), MediaKind::Png);
        job.copies = 0;
        let report = fx.orchestrator.submit(job).await.expect("printed");
        assert_eq!(report.copies, 1);

        let lp = lp_calls(&fx.runner);
        assert_eq!(lp[0].args[3], MAX_COPIES.to_string());
        assert_eq!(lp[1].args[3], "1");
    }

    #[tokio::test]
    async fn unknown_printer_is_still_dispatched() {
        let fx = fixture(RecordingRunner::new(cups), None);
        fx.orchestrator.initialise().await;

        let mut job = PrintJob::new(b"png".to_vec(), MediaKind::Png);
        job.requested_printer = Some("Ghost".into());
        let report = fx.orchestrator.submit(job).await.expect("printed");

        assert_eq!(report.printer, "Ghost");
        assert_eq!(lp_calls(&fx.runner)[0].args[1], "Ghost");
    }

    #[tokio::test]
    async fn no_default_reports_default_label() {
        let fx = fixture(RecordingRunner::new(|spec| {
            if spec.program == "lpstat" {
                Err(missing("lpstat"))
            } else {
                Ok(ok(""))
            }
        }), None);
        fx.orchestrator.initialise().await;

        let report = fx
            .orchestrator
            .submit(PrintJob::new(b"png".to_vec(), MediaKind::Png))
            .await
            .expect("printed");
        assert_eq!(report.printer, DEFAULT_PRINTER_LABEL);
        assert!(!lp_calls(&fx.runner)[0].args.contains(&"-d".to_string()));
    }

    #[tokio::test]
    async fn override_replaces_os_default() {
        let fx = fixture(RecordingRunner::new(cups), Some("Office"));
        fx.orchestrator.initialise().await;

        assert_eq!(fx.orchestrator.default_printer_label(), "Office");
        let report = fx
            .orchestrator
            .submit(PrintJob::new(b"png".to_vec(), MediaKind::Png))
            .await
            .expect("printed");
        assert_eq!(report.printer, "Office");
    }

    #[tokio::test]
    async fn artifact_is_gone_after_success_and_failure() {
        let fx = fixture(RecordingRunner::new(cups), None);
        let job = PrintJob::new(b"png".to_vec(), MediaKind::Png);
        let id = job.id;
        fx.orchestrator.submit(job).await.expect("printed");
        assert!(!fx.scratch.join(format!("{id}.png")).exists());

        let fx = fixture(RecordingRunner::new(|_| Ok(failed("lp: error"))), None);
        let job = PrintJob::new(b"jpeg".to_vec(), MediaKind::Jpeg);
        let id = job.id;
        let failure = fx.orchestrator.submit(job).await.unwrap_err();
        assert_eq!(failure.job_id, id);
        assert!(matches!(failure.error, PhotoprintError::AllMethodsFailed));
        assert!(!fx.scratch.join(format!("{id}.jpg")).exists());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let broken = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = broken.clone();
        let fx = fixture(
            RecordingRunner::new(move |spec| {
                if flag.load(std::sync::atomic::Ordering::SeqCst) {
                    Err(missing("lpstat"))
                } else {
                    cups(spec)
                }
            }),
            None,
        );

        let first = fx.orchestrator.refresh().await.expect("refresh");
        assert_eq!(first.known_printers.len(), 2);

        broken.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(fx.orchestrator.refresh().await.is_err());
        assert_eq!(fx.orchestrator.snapshot().known_printers, first.known_printers);
        assert_eq!(fx.orchestrator.default_printer_label(), "DNP_DS620");
    }
}
