// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Logging
//!
//! Every authentication outcome (registration, login, Google sign-in, token
//! rejection at the auth gate) produces exactly one [`AccessLogEntry`].
//! Entries are write-only: nothing in this service reads them back.
//!
//! Writes go through [`AuditLogger::submit`], which never blocks the request
//! and never fails it. Availability of authentication takes priority over
//! durability of the log.

pub mod entry;
pub mod logger;
pub mod memory;

use async_trait::async_trait;

pub use entry::{AccessAction, AccessLogEntry};
pub use logger::{AuditLogger, AUDIT_WRITE_TIMEOUT};
pub use memory::{MemorySink, RecordedEntry};

/// Errors reported by an audit sink.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink request failed: {0}")]
    Request(String),

    #[error("audit sink rejected entry: {0}")]
    Rejected(String),

    #[error("audit sink credentials unavailable: {0}")]
    Credentials(String),
}

/// Append-only destination for access log entries.
///
/// Implementations are shared by all in-flight requests and must tolerate
/// concurrent appends. Per-entry atomicity is the sink's responsibility.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one entry. The sink assigns the timestamp.
    async fn append(&self, entry: &AccessLogEntry) -> Result<(), AuditError>;
}
