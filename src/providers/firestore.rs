// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Firestore as the access log sink.
//!
//! Each entry becomes a new document with a random id in the configured
//! collection. The `timestamp` field is filled by Firestore itself through a
//! `REQUEST_TIME` field transform in the same commit, so the stored time is
//! the server's, not ours.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::google::AccessTokenSource;
use crate::audit::{AccessLogEntry, AuditError, AuditSink};

pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";

pub struct FirestoreSink {
    project_id: String,
    collection: String,
    tokens: Arc<AccessTokenSource>,
    http: Client,
    base_url: String,
}

impl FirestoreSink {
    pub fn new(
        tokens: Arc<AccessTokenSource>,
        collection: impl Into<String>,
        base_url: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            project_id: tokens.project_id().to_string(),
            collection: collection.into(),
            tokens,
            http,
            base_url: base_url.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{DEFAULT_DATABASE}/documents:commit",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

#[async_trait]
impl AuditSink for FirestoreSink {
    async fn append(&self, entry: &AccessLogEntry) -> Result<(), AuditError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| AuditError::Credentials(e.to_string()))?;

        let document_id = Uuid::new_v4().simple().to_string();
        let body = commit_body(&self.project_id, &self.collection, &document_id, entry);

        let response = self
            .http
            .post(self.commit_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuditError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.map_err(|e| {
                AuditError::Request(format!("failed to read HTTP {status} response: {e}"))
            })?;
            return Err(AuditError::Rejected(format!("HTTP {status}: {text}")));
        }

        tracing::debug!(
            collection = %self.collection,
            document_id = %document_id,
            "Stored access log document"
        );
        Ok(())
    }
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

/// Firestore field map for an entry, without the server-set timestamp.
///
/// `userId` and `email` are left out when unknown; `errorDetails` only
/// appears on failures.
fn document_fields(entry: &AccessLogEntry) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(user_id) = entry.user_id() {
        fields.insert("userId".to_string(), string_value(user_id));
    }
    if let Some(email) = entry.email() {
        fields.insert("email".to_string(), string_value(email));
    }
    fields.insert("action".to_string(), string_value(entry.action().as_str()));
    fields.insert("ipAddress".to_string(), string_value(entry.ip_address()));
    if let Some(detail) = entry.error_details().filter(|d| !d.is_empty()) {
        fields.insert("errorDetails".to_string(), string_value(detail));
    }
    fields
}

/// Request body for a `documents:commit` call creating one document.
fn commit_body(project_id: &str, collection: &str, document_id: &str, entry: &AccessLogEntry) -> Value {
    let name = format!(
        "projects/{project_id}/databases/{DEFAULT_DATABASE}/documents/{collection}/{document_id}"
    );

    json!({
        "writes": [{
            "update": {
                "name": name,
                "fields": document_fields(entry),
            },
            "currentDocument": { "exists": false },
            "updateTransforms": [{
                "fieldPath": "timestamp",
                "setToServerValue": "REQUEST_TIME",
            }],
        }]
    })
}
