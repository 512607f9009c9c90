// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fire-and-forget submission of access log entries.

use std::sync::Arc;
use std::time::Duration;

use super::{AccessLogEntry, AuditSink};

/// Upper bound for a single sink write.
pub const AUDIT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Hands access log entries to an [`AuditSink`] without making the caller
/// wait.
///
/// `submit` spawns a detached task per entry. The write is bounded by
/// [`AUDIT_WRITE_TIMEOUT`]; failures and timeouts are logged and dropped.
/// A request's outcome never depends on whether its entry was stored.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Submit an entry and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, entry: AccessLogEntry) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            write_entry(sink.as_ref(), &entry, AUDIT_WRITE_TIMEOUT).await;
        });
    }
}

async fn write_entry(sink: &dyn AuditSink, entry: &AccessLogEntry, timeout: Duration) {
    match tokio::time::timeout(timeout, sink.append(entry)).await {
        Ok(Ok(())) => {
            tracing::debug!(action = %entry.action(), "Access log written");
        }
        Ok(Err(e)) => {
            tracing::warn!(
                error = %e,
                action = %entry.action(),
                ip_address = %entry.ip_address(),
                "Failed to write access log"
            );
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                action = %entry.action(),
                ip_address = %entry.ip_address(),
                "Access log write timed out"
            );
        }
    }
}
