// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Photoprint relay.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Image encodings accepted by the relay.
///
/// Only decides the extension of the scratch artifact; the bytes are handed
/// to the OS print path untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaKind {
    #[default]
    Png,
    Jpeg,
}

impl MediaKind {
    /// Parse a request `mimeType`. Anything that is not JPEG is treated as PNG.
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            _ => Self::Png,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// File extension used for the scratch artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Extensions the legacy Windows image viewer can print.
pub const RASTER_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Whether `path` has one of the [`RASTER_EXTENSIONS`] (case-insensitive).
pub fn is_raster_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            RASTER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Largest number of copies a single job may request.
pub const MAX_COPIES: u32 = 99;

/// Largest template side accepted, in inches.
pub const MAX_PAGE_INCH: f64 = 24.0;

/// Physical page size hint for templated prints, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    pub width_inch: f64,
    pub height_inch: f64,
}

impl PageSize {
    /// Both dimensions in `(0, MAX_PAGE_INCH]`.
    pub fn is_valid(&self) -> bool {
        let side = |v: f64| v.is_finite() && v > 0.0 && v <= MAX_PAGE_INCH;
        side(self.width_inch) && side(self.height_inch)
    }

    /// Pixel dimensions at the given resolution, never below 1x1.
    pub fn pixels_at(&self, dpi: u32) -> (u32, u32) {
        let w = (self.width_inch * f64::from(dpi)).round().max(1.0) as u32;
        let h = (self.height_inch * f64::from(dpi)).round().max(1.0) as u32;
        (w, h)
    }
}

/// A print request after transport decoding. Lives for one request only.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: JobId,
    /// Physical copies requested (at least 1).
    pub copies: u32,
    /// Raw image bytes.
    pub payload: Vec<u8>,
    pub media_kind: MediaKind,
    /// Explicit target; `None` uses the process default printer.
    pub requested_printer: Option<String>,
    /// Print the bundled placeholder once instead of the payload.
    pub restricted: bool,
    pub target_page_size: Option<PageSize>,
}

impl PrintJob {
    pub fn new(payload: Vec<u8>, media_kind: MediaKind) -> Self {
        Self {
            id: JobId::new(),
            copies: 1,
            payload,
            media_kind,
            requested_printer: None,
            restricted: false,
            target_page_size: None,
        }
    }
}

/// The most recently fetched view of the host's printers.
///
/// Never mutated in place; a refresh builds a new value and swaps it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterInventorySnapshot {
    pub default_printer: Option<String>,
    /// In the order the OS reported them.
    pub known_printers: Vec<String>,
    pub refreshed_at: DateTime<Utc>,
}

impl PrinterInventorySnapshot {
    pub fn new(default_printer: Option<String>, known_printers: Vec<String>) -> Self {
        Self {
            default_printer,
            known_printers,
            refreshed_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(None, Vec::new())
    }

    pub fn contains(&self, printer: &str) -> bool {
        self.known_printers.iter().any(|p| p == printer)
    }
}

impl Default for PrinterInventorySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Status of the mDNS advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvertiseStatus {
    Stopped,
    Registered,
    Error,
}
