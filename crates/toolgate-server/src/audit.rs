// crates/toolgate-server/src/audit.rs
// ============================================================================
// Module: Audit Sinks
// Description: JSON-line audit sinks for dispatch and auth events.
// Purpose: Emit structured audit logs without hard logging dependencies.
// Dependencies: toolgate-core, toolgate-config, serde
// ============================================================================

//! ## Overview
//! Sinks serialize audit events as one JSON object per line. The stderr sink
//! suits foreground deployments, the file sink appends to a configured log,
//! and the no-op sink discards events. Each sink implements both the
//! dispatch sink from the core crate and the auth sink from this crate so
//! one configured destination receives everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use toolgate_config::AuditConfig;
use toolgate_config::AuditSinkKind;
use toolgate_core::CallAuditSink;
use toolgate_core::ToolCallAuditEvent;

use crate::auth::AuthAuditEvent;
use crate::auth::AuthAuditSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl CallAuditSink for StderrAuditSink {
    fn record(&self, event: &ToolCallAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl AuthAuditSink for StderrAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event line.
    fn append<T: serde::Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl CallAuditSink for FileAuditSink {
    fn record(&self, event: &ToolCallAuditEvent) {
        self.append(event);
    }
}

impl AuthAuditSink for FileAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl CallAuditSink for NoopAuditSink {
    fn record(&self, _event: &ToolCallAuditEvent) {}
}

impl AuthAuditSink for NoopAuditSink {
    fn record_auth(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the configured sink as both a dispatch and an auth sink.
///
/// # Errors
///
/// Returns an error when the file sink cannot be opened.
pub fn build_sinks(
    config: &AuditConfig,
) -> io::Result<(Arc<dyn CallAuditSink>, Arc<dyn AuthAuditSink>)> {
    match config.sink {
        AuditSinkKind::Stderr => {
            let sink = Arc::new(StderrAuditSink);
            Ok((sink.clone(), sink))
        }
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "file audit sink requires path")
            })?;
            let sink = Arc::new(FileAuditSink::new(path)?);
            Ok((sink.clone(), sink))
        }
        AuditSinkKind::None => {
            let sink = Arc::new(NoopAuditSink);
            Ok((sink.clone(), sink))
        }
    }
}
