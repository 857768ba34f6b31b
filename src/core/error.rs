// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics and reporting for the translator.
//!
//! Compilation failures and link failures are distinct because they map to
//! distinct process exit codes (1 and 2). Warnings never abort a run; they
//! are collected and printed to standard error at the end.

use std::fmt;

/// A fatal error found while parsing, tagged with the 1-based source
/// position of the cursor at the point of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compilation error:{}:{}: {}",
            self.line, self.col, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// A fatal error found during layout or resolution. Carries the offending
/// symbol and instruction context in the message; there is no meaningful
/// source position by this stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkError {
    pub message: String,
}

impl LinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link time error: {}", self.message)
    }
}

impl std::error::Error for LinkError {}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Pipeline stage a diagnostic originated from; decides its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Link,
}

/// A non-fatal message with optional source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub pos: Option<(u32, u32)>,
    pub message: String,
}

impl Diagnostic {
    pub fn parse_warning(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage: Stage::Parse,
            pos: Some((line, col)),
            message: message.into(),
        }
    }

    pub fn link_warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage: Stage::Link,
            pos: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match (self.stage, self.severity) {
            (Stage::Parse, Severity::Warning) => "warning",
            (Stage::Parse, Severity::Error) => "compilation error",
            (Stage::Link, Severity::Warning) => "link time warning",
            (Stage::Link, Severity::Error) => "link time error",
        };
        match self.pos {
            Some((line, col)) => write!(f, "{kind}:{line}:{col}: {}", self.message),
            None => write!(f, "{kind}: {}", self.message),
        }
    }
}

/// Categories of fatal errors, mapped to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Cli,
    Io,
    Parse,
    Link,
}

/// A fatal error with its category. The message already carries the
/// position/context prefix appropriate to its kind.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Process exit code: link failures are 2, everything else 1.
    pub fn exit_code(&self) -> u8 {
        match self.kind {
            AsmErrorKind::Link => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AsmError {}

impl From<ParseError> for AsmError {
    fn from(err: ParseError) -> Self {
        AsmError::new(AsmErrorKind::Parse, err.to_string())
    }
}

impl From<LinkError> for AsmError {
    fn from(err: LinkError) -> Self {
        AsmError::new(AsmErrorKind::Link, err.to_string())
    }
}

/// Report from a successful run: the warnings to print.
#[derive(Debug, Default)]
pub struct RunReport {
    diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// A failed run: the fatal error plus the warnings collected before it.
#[derive(Debug)]
pub struct RunError {
    error: AsmError,
    diagnostics: Vec<Diagnostic>,
}

impl RunError {
    pub fn new(error: AsmError, diagnostics: Vec<Diagnostic>) -> Self {
        Self { error, diagnostics }
    }

    pub fn error(&self) -> &AsmError {
        &self.error
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RunError {}

impl From<AsmError> for RunError {
    fn from(err: AsmError) -> Self {
        RunError::new(err, Vec::new())
    }
}

impl From<ParseError> for RunError {
    fn from(err: ParseError) -> Self {
        RunError::new(err.into(), Vec::new())
    }
}

impl From<LinkError> for RunError {
    fn from(err: LinkError) -> Self {
        RunError::new(err.into(), Vec::new())
    }
}
