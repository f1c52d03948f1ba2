// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted command runner shared by the unit tests in this crate.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use photoprint_core::error::{PhotoprintError, Result};

use crate::command::{CommandOutput, CommandRunner, CommandSpec};

type Responder = Box<dyn Fn(&CommandSpec) -> Result<CommandOutput> + Send + Sync>;

/// Records every invocation and answers from a closure.
pub struct RecordingRunner {
    calls: Mutex<Vec<(CommandSpec, Duration)>>,
    responder: Responder,
}

impl RecordingRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Every command succeeds with empty output.
    pub fn always_ok() -> Self {
        Self::new(|_| Ok(ok("")))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(spec, _)| spec.clone())
            .collect()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push((spec.clone(), timeout));
        (self.responder)(spec)
    }
}

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

pub fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        success: false,
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

pub fn missing(program: &str) -> PhotoprintError {
    PhotoprintError::Command {
        program: program.into(),
        detail: "spawn: No such file or directory (os error 2)".into(),
    }
}
