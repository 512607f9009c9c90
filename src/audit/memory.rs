// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process audit sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AccessLogEntry, AuditError, AuditSink};

/// An entry as stored by [`MemorySink`], stamped on arrival.
#[derive(Debug, Clone)]
pub struct RecordedEntry {
    pub timestamp: DateTime<Utc>,
    pub entry: AccessLogEntry,
}

/// Keeps entries in memory. Useful for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<RwLock<Vec<RecordedEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<RecordedEntry> {
        self.entries.read().await.clone()
    }

    /// Wait until at least `count` entries arrived or `timeout` elapsed, and
    /// return whatever is stored by then.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<RecordedEntry> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let entries = self.entries.read().await;
                if entries.len() >= count || tokio::time::Instant::now() >= deadline {
                    return entries.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn append(&self, entry: &AccessLogEntry) -> Result<(), AuditError> {
        self.entries.write().await.push(RecordedEntry {
            timestamp: Utc::now(),
            entry: entry.clone(),
        });
        Ok(())
    }
}
