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
use crate::documents::handler;
use axum::Router;
use axum::routing::{delete, get, post, put};

/// Absolute paths under `/{tenant}/documents`, merged flatly into the top-level
/// router like every other module's routes (§6) — the request authenticator
/// derives the tenant from the raw URI, so nesting (which rewrites it) is
/// never used here.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{tenant}/documents", post(handler::create_document))
        .route("/{tenant}/documents", get(handler::list_documents))
        .route("/{tenant}/documents/search", get(handler::search_documents))
        .route("/{tenant}/documents/{*id}", get(handler::get_document))
        .route("/{tenant}/documents/{*id}", put(handler::update_document))
        .route("/{tenant}/documents/{*id}", delete(handler::delete_document))
}
