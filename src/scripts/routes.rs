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

use crate::app::state::AppState;
use crate::scripts::handler;
use axum::Router;
use axum::routing::{any, delete, get, post};

/// Absolute paths under `/{tenant}/admin/endpoints` and `/{tenant}/star`
/// (§6) — see the note on [`crate::documents::routes`] for why these
/// aren't nested.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{tenant}/admin/endpoints", post(handler::create_endpoint))
        .route("/{tenant}/admin/endpoints", get(handler::list_endpoints))
        .route("/{tenant}/admin/endpoints/{id}", delete(handler::delete_endpoint))
        .route("/{tenant}/star", any(handler::dispatch))
        .route("/{tenant}/star/{*subpath}", any(handler::dispatch))
}
