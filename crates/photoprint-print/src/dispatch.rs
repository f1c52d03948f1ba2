// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatch: hand a file to the host's native print path.
//
// Each platform has an ordered chain of `DispatchMethod`s.  The dispatcher
// walks the chain, skipping methods that cannot handle the file, and stops at
// the first one whose commands all exit successfully.
//
//   Unix     lp (copies passed natively, one invocation)
//   Windows  structured PrintDocument -> shell print verb -> shimgvw PrintTo
//            (each repeated once per copy, sequentially)
//
// A failing method is logged and never propagates; only an exhausted chain
// is reported, as `AllMethodsFailed`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use photoprint_core::error::{PhotoprintError, Result};
use photoprint_core::types::{JobId, PageSize, is_raster_image};

use crate::artifact::ScratchArtifact;
use crate::command::{CommandRunner, CommandSpec, HostPlatform};
use crate::layout::{TEMPLATE_DPI, render_page};

/// Upper bound for a single print command.
pub const PRINT_TIMEOUT: Duration = Duration::from_secs(30);

/// Windows system utility whose `ImageView_PrintTo` entry point accepts a
/// printer name.
const SHIMGVW_PRINT_TO: &str = r"C:\Windows\System32\shimgvw.dll,ImageView_PrintTo";

/// What to print, where, and how many times.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub job_id: JobId,
    pub artifact: PathBuf,
    pub copies: u32,
    /// Target queue; `None` or empty prints on the OS default.
    pub printer: Option<String>,
    /// Replace the artifact with the placeholder and print a single copy.
    pub restricted: bool,
    /// Template page, only honoured by [`DispatchMethod::StructuredPrint`].
    pub page_size: Option<PageSize>,
}

/// The method that printed a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub method: DispatchMethod,
    /// Number of external commands the method issued.
    pub invocations: u32,
}

/// How a method produces more than one copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyMode {
    /// The command takes a copy count.
    Native,
    /// The command prints once; repeat it per copy.
    Repeat,
}

/// One OS-level way of submitting a file to a printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMethod {
    /// `lp` on CUPS hosts.
    LinePrinter,
    /// `System.Drawing.Printing.PrintDocument` through PowerShell; honours the
    /// driver's paper, orientation and cut preferences.
    StructuredPrint,
    /// `Start-Process -Verb Print`; always the OS default queue.
    ShellPrintVerb,
    /// `rundll32 shimgvw.dll,ImageView_PrintTo`; raster images only.
    LegacyImageViewer,
}

impl DispatchMethod {
    /// Methods to try on `platform`, in order.
    pub fn chain(platform: HostPlatform) -> &'static [DispatchMethod] {
        match platform {
            HostPlatform::Unix => &[Self::LinePrinter],
            HostPlatform::Windows => &[
                Self::StructuredPrint,
                Self::ShellPrintVerb,
                Self::LegacyImageViewer,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LinePrinter => "lp",
            Self::StructuredPrint => "structured-print",
            Self::ShellPrintVerb => "shell-print-verb",
            Self::LegacyImageViewer => "legacy-image-viewer",
        }
    }

    fn copy_mode(&self) -> CopyMode {
        match self {
            Self::LinePrinter => CopyMode::Native,
            Self::StructuredPrint | Self::ShellPrintVerb | Self::LegacyImageViewer => {
                CopyMode::Repeat
            }
        }
    }

    /// Whether this method can print the file at `path`.
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            Self::LegacyImageViewer => is_raster_image(path),
            _ => true,
        }
    }

    /// The command for one invocation. `copies` only reaches methods that
    /// take a copy count.
    pub fn command(&self, path: &Path, printer: Option<&str>, copies: u32) -> CommandSpec {
        let file = path.to_string_lossy().into_owned();
        match self {
            Self::LinePrinter => {
                let mut spec = CommandSpec::new("lp");
                if let Some(printer) = printer {
                    spec = spec.args(["-d", printer]);
                }
                spec.args(["-n".to_string(), copies.to_string(), file])
            }
            Self::StructuredPrint => powershell(&structured_print_script(&file, printer)),
            Self::ShellPrintVerb => powershell(&format!(
                "Start-Process -FilePath {} -Verb Print -WindowStyle Hidden",
                ps_quote(&file)
            )),
            Self::LegacyImageViewer => {
                let spec = CommandSpec::new("rundll32.exe").args([SHIMGVW_PRINT_TO, "/pt"]).arg(file);
                match printer {
                    Some(printer) => spec.arg(printer),
                    None => spec,
                }
            }
        }
    }
}

fn powershell(script: &str) -> CommandSpec {
    CommandSpec::new("powershell").args([
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-Command",
        script,
    ])
}

/// Single-quoted PowerShell literal.
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// PowerShell that prints one page through `PrintDocument`, using the
/// rotate / cover-scale / centre-crop rule from [`crate::layout`].
fn structured_print_script(file: &str, printer: Option<&str>) -> String {
    let select_printer = printer
        .map(|p| format!("$doc.PrinterSettings.PrinterName = {}\n", ps_quote(p)))
        .unwrap_or_default();
    format!(
        r#"$ErrorActionPreference = 'Stop'
Add-Type -AssemblyName System.Drawing
$img = [System.Drawing.Image]::FromFile({file})
try {{
$doc = New-Object System.Drawing.Printing.PrintDocument
{select_printer}if (-not $doc.PrinterSettings.IsValid) {{ throw 'printer not available' }}
$doc.DocumentName = 'Photoprint'
$doc.add_PrintPage({{
param($sender, $e)
$page = $e.PageBounds
if (($img.Width -gt $img.Height) -ne ($page.Width -gt $page.Height)) {{
$img.RotateFlip([System.Drawing.RotateFlipType]::Rotate90FlipNone)
}}
$scale = [Math]::Max($page.Width / $img.Width, $page.Height / $img.Height)
$srcW = $page.Width / $scale
$srcH = $page.Height / $scale
$src = New-Object System.Drawing.RectangleF((($img.Width - $srcW) / 2), (($img.Height - $srcH) / 2), $srcW, $srcH)
$dst = New-Object System.Drawing.RectangleF(0, 0, $page.Width, $page.Height)
$e.Graphics.DrawImage($img, $dst, $src, [System.Drawing.GraphicsUnit]::Pixel)
$e.HasMorePages = $false
}})
$doc.Print()
}} finally {{
$img.Dispose()
}}"#,
        file = ps_quote(file),
    )
}

/// Drives the platform's method chain for one job at a time.
#[derive(Clone)]
pub struct PrintDispatcher {
    runner: Arc<dyn CommandRunner>,
    platform: HostPlatform,
    placeholder: PathBuf,
    scratch_dir: PathBuf,
}

impl PrintDispatcher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        platform: HostPlatform,
        placeholder: PathBuf,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            platform,
            placeholder,
            scratch_dir,
        }
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// Print `request`, falling back through the platform's methods.
    #[instrument(skip(self, request), fields(job_id = %request.job_id, platform = self.platform.name()))]
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        let request = self.apply_restrictions(request);
        let printer = request.printer.as_deref().filter(|p| !p.is_empty());

        let mut page_image: Option<ScratchArtifact> = None;
        let mut outcome = Err(PhotoprintError::AllMethodsFailed);

        for &method in DispatchMethod::chain(self.platform) {
            if !method.accepts(&request.artifact) {
                info!(method = method.name(), path = %request.artifact.display(), "file type not supported by method, skipping");
                continue;
            }

            // Only the structured method controls the page, so the template
            // changes nothing but its input file.
            let path = match (method, request.page_size) {
                (DispatchMethod::StructuredPrint, Some(page)) => {
                    if page_image.is_none() {
                        page_image = self.prepare_page_image(&request, page).await;
                    }
                    page_image
                        .as_ref()
                        .map(|p| p.path().to_path_buf())
                        .unwrap_or_else(|| request.artifact.clone())
                }
                _ => request.artifact.clone(),
            };

            match self.run_method(method, &path, printer, request.copies).await {
                Ok(invocations) => {
                    info!(method = method.name(), invocations, printer = printer.unwrap_or("<default>"), "print dispatched");
                    outcome = Ok(DispatchOutcome {
                        method,
                        invocations,
                    });
                    break;
                }
                Err(e) => {
                    warn!(method = method.name(), error = %e, "print method failed, trying next");
                }
            }
        }

        if let Some(page_image) = page_image {
            page_image.remove().await;
        }
        if outcome.is_err() {
            error!(copies = request.copies, "all print methods failed");
        }
        outcome
    }

    /// Restricted jobs print the placeholder exactly once.
    fn apply_restrictions(&self, mut request: DispatchRequest) -> DispatchRequest {
        if request.restricted {
            debug!(placeholder = %self.placeholder.display(), "restricted job, printing placeholder");
            if !self.placeholder.exists() {
                warn!(placeholder = %self.placeholder.display(), "placeholder image is missing");
            }
            request.artifact = self.placeholder.clone();
            request.copies = 1;
        }
        request
    }

    /// Render the artifact onto the template page. `None` falls back to the
    /// original artifact.
    async fn prepare_page_image(
        &self,
        request: &DispatchRequest,
        page: PageSize,
    ) -> Option<ScratchArtifact> {
        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_dir).await {
            warn!(error = %e, "cannot create scratch dir for template page");
            return None;
        }
        let page_file =
            ScratchArtifact::adopt(self.scratch_dir.join(format!("{}-page.png", request.job_id)));
        let source = request.artifact.clone();
        let dest = page_file.path().to_path_buf();

        let rendered =
            tokio::task::spawn_blocking(move || render_page(&source, page, TEMPLATE_DPI, &dest))
                .await;
        match rendered {
            Ok(Ok(())) => Some(page_file),
            Ok(Err(e)) => {
                warn!(error = %e, "template rendering failed, printing original artifact");
                None
            }
            Err(e) => {
                warn!(error = %e, "template rendering task failed, printing original artifact");
                None
            }
        }
    }

    /// Run every invocation of one method, stopping at the first failure.
    async fn run_method(
        &self,
        method: DispatchMethod,
        path: &Path,
        printer: Option<&str>,
        copies: u32,
    ) -> Result<u32> {
        let copies = copies.max(1);
        let (invocations, per_call) = match method.copy_mode() {
            CopyMode::Native => (1, copies),
            CopyMode::Repeat => (copies, 1),
        };
        let spec = method.command(path, printer, per_call);

        for n in 1..=invocations {
            debug!(method = method.name(), copy = n, of = invocations, "invoking");
            self.runner
                .run(&spec, PRINT_TIMEOUT)
                .await?
                .into_checked(&spec)?;
        }
        Ok(invocations)
    }
}
