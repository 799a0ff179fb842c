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
use crate::auth::handler;
use axum::Router;
use axum::routing::post;

/// Routes that sit outside any CENV path prefix (`/new`) plus the per-tenant
/// `/{tenant}/login` route, merged into the top-level router (§6).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/new", post(handler::create_cenv))
        .route("/{tenant}/login", post(handler::login))
        .route("/{tenant}/logout", post(handler::logout))
}
