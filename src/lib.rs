/*
 * This file is part of wce.
 *
 * Copyright (C) 2026 the wce authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

#![forbid(unsafe_code)]

pub mod app;
pub mod audit;
pub mod auth;
pub mod authz;
pub mod cenv;
pub mod common;
pub mod documents;
pub mod identity;
pub mod query;
pub mod scripts;
pub mod sql;

use crate::app::state::AppState;
use axum::Router;
use axum::routing::get;

/// `GET /health` — liveness, no auth, no CENV resolution (§6).
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok", "service": "wce"}))
}

/// Assembles the full router: every module contributes absolute paths, merged
/// flatly (§6) — see the note on [`documents::routes`] for why nesting isn't
/// used for the CENV path segment.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes::routes())
        .merge(authz::routes::routes())
        .merge(documents::routes::routes())
        .merge(query::routes::routes())
        .merge(scripts::routes::routes())
        .with_state(state)
}
