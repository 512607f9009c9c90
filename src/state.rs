// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::identity::IdentityService;

/// Shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(identity: IdentityService, audit: AuditLogger) -> Self {
        Self {
            identity: Arc::new(identity),
            audit,
        }
    }
}
