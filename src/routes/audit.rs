// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin audit-log listing.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{AuditEntry, Role};
use crate::services::Caller;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/audit-logs", get(get_audit_logs))
}

async fn get_audit_logs(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<AuditEntry>>> {
    Caller::load(&state.db, &auth)
        .await?
        .require_role(&[Role::Admin])?;
    Ok(Json(state.db.list_audit_entries().await?))
}
