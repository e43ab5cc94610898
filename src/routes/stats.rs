// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Collection counts for the dashboard.

use crate::error::Result;
use crate::models::Stats;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stats", get(get_stats))
}

/// Document counts per collection at call time.
async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Stats>> {
    let stats = state.db.stats().await?;
    tracing::debug!(
        users = stats.total_users,
        patients = stats.patients,
        doctors = stats.doctors,
        "Stats computed"
    );
    Ok(Json(stats))
}
