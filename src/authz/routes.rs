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
use crate::authz::handler;
use axum::Router;
use axum::routing::{delete, get, post};

/// Absolute paths under `/{tenant}/admin/...`, merged flatly into the
/// top-level router (§6) — see the note on [`crate::documents::routes`] for
/// why these aren't nested.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{tenant}/admin/permissions",
            get(handler::list_permissions)
                .post(handler::grant_permission)
                .delete(handler::revoke_permission_query),
        )
        .route(
            "/{tenant}/admin/permissions/{table_name}",
            get(handler::list_table_permissions),
        )
        .route(
            "/{tenant}/admin/permissions/{table_name}/{user_id}",
            delete(handler::revoke_permission),
        )
        .route(
            "/{tenant}/admin/policies",
            get(handler::list_policies).post(handler::create_row_policy),
        )
        .route(
            "/{tenant}/admin/policies/{policy_id}",
            delete(handler::delete_row_policy),
        )
}
