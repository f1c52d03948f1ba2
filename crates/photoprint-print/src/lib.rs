// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photoprint Print: printer inventory, native print dispatch and mDNS
// advertisement.  This crate turns the core job types defined in
// `photoprint-core` into commands for the host's own print tooling.

pub mod advertise;
pub mod artifact;
pub mod command;
pub mod dispatch;
pub mod inventory;
pub mod layout;
pub mod orchestrator;

#[cfg(test)]
mod testing;

pub use advertise::{ServiceAdvertiser, txt_properties};
pub use command::{CommandOutput, CommandRunner, CommandSpec, HostPlatform, SystemCommandRunner};
pub use dispatch::{DispatchMethod, PrintDispatcher};
pub use inventory::PrinterInventory;
pub use orchestrator::{JobFailure, JobOrchestrator, JobReport};
