// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language troubleshooting attached to failed print responses.
//
// The text is advisory only. Nothing in the relay branches on it, and it never
// carries raw OS command output.

use serde::Serialize;

use crate::error::PhotoprintError;

/// Who has to act to get past the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Retrying the same request may work.
    Transient,
    /// Someone has to check the printer or the host.
    ActionRequired,
    /// The request itself is wrong.
    Permanent,
}

/// Guidance returned in the `troubleshooting` field of a failed `/print`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Troubleshooting {
    pub summary: String,
    pub printer_online: String,
    pub driver: String,
    pub spooler: String,
    pub try_default: String,
    pub severity: Severity,
    pub retriable: bool,
}

impl Troubleshooting {
    fn with_checks(summary: &str, severity: Severity, retriable: bool) -> Self {
        Self {
            summary: summary.into(),
            printer_online: "Make sure the printer is switched on, has paper and ribbon, and is not showing an error light.".into(),
            driver: "Check that the printer driver is installed on the relay host and that a test page prints from the OS.".into(),
            spooler: "Restart the print spooler (Windows: `Restart-Service Spooler`, Linux/macOS: restart CUPS) and clear stuck jobs.".into(),
            try_default: "Leave `targetPrinter` empty to print on the host's default printer.".into(),
            severity,
            retriable,
        }
    }
}

/// Map a failure to the guidance sent back to the client.
pub fn guidance_for(err: &PhotoprintError) -> Troubleshooting {
    match err {
        PhotoprintError::AllMethodsFailed => Troubleshooting::with_checks(
            "None of the host's print methods accepted the job.",
            Severity::ActionRequired,
            true,
        ),
        PhotoprintError::CommandTimeout { .. } => Troubleshooting::with_checks(
            "The printer did not answer in time.",
            Severity::Transient,
            true,
        ),
        PhotoprintError::Command { .. } | PhotoprintError::Inventory(_) => {
            Troubleshooting::with_checks(
                "The host's print tooling reported an error.",
                Severity::ActionRequired,
                true,
            )
        }
        PhotoprintError::InvalidPayload(_) | PhotoprintError::Render(_) => {
            Troubleshooting::with_checks(
                "The image could not be prepared for printing. Send a PNG or JPEG.",
                Severity::Permanent,
                false,
            )
        }
        PhotoprintError::Io(io_err) if io_err.kind() == std::io::ErrorKind::PermissionDenied => {
            Troubleshooting::with_checks(
                "The relay could not write its temporary print file.",
                Severity::ActionRequired,
                false,
            )
        }
        PhotoprintError::Io(_) => Troubleshooting::with_checks(
            "The relay had a problem with its temporary print file.",
            Severity::Transient,
            true,
        ),
        PhotoprintError::Discovery(_)
        | PhotoprintError::Server(_)
        | PhotoprintError::Config(_) => Troubleshooting::with_checks(
            "The relay had an internal problem.",
            Severity::Transient,
            true,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_methods_failed_needs_action() {
        let guide = guidance_for(&PhotoprintError::AllMethodsFailed);
        assert_eq!(guide.severity, Severity::ActionRequired);
        assert!(guide.retriable);
        assert!(guide.spooler.contains("spooler"));
    }

    #[test]
    fn timeout_is_transient() {
        let guide = guidance_for(&PhotoprintError::CommandTimeout {
            program: "lp".into(),
            secs: 30,
        });
        assert_eq!(guide.severity, Severity::Transient);
    }

    #[test]
    fn bad_payload_is_permanent() {
        let guide = guidance_for(&PhotoprintError::InvalidPayload("empty".into()));
        assert_eq!(guide.severity, Severity::Permanent);
        assert!(!guide.retriable);
    }

    #[test]
    fn serializes_camel_case_keys() {
        let json = serde_json::to_value(guidance_for(&PhotoprintError::AllMethodsFailed)).unwrap();
        assert!(json.get("printerOnline").is_some());
        assert!(json.get("tryDefault").is_some());
        assert_eq!(json["severity"], "actionRequired");
    }
}
