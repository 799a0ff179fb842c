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

//! `POST /{tenant}/query` — the one HTTP caller of `sql::service` (§4.H).
//!
//! `validate_and_rewrite` handles classification, the §4.G permission check,
//! and (for non-bypass roles) row-policy injection; this handler's only job
//! is to run the resulting statement and shape the result the way the
//! statement's own verb implies — rows back for a `SELECT`, an affected-row
//! count for everything else.

use crate::audit;
use crate::auth::AuthenticatedUser;
use crate::authz::repository::{SqliteRowPoliciesRepository, SqliteTablePermissionsRepository};
use crate::common::error::{ApiError, ApiResult};
use crate::common::extractors::ValidJson;
use crate::query::dto::{QueryRequest, QueryResponse};
use crate::sql::{self, Statement};
use axum::Json;

pub async fn execute_query(
    user: AuthenticatedUser,
    ValidJson(body): ValidJson<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let perms = SqliteTablePermissionsRepository;
    let policies = SqliteRowPoliciesRepository;

    let rewritten = sql::service::validate_and_rewrite(
        &user.pool,
        &perms,
        &policies,
        user.claims.user_id,
        user.claims.role,
        &body.sql,
    )
    .await?;

    let statement = sql::classifier::classify(&body.sql);
    let table_name = sql::classifier::extract_table_name(&body.sql, statement)
        .unwrap_or_else(|| "unknown".to_string());

    let mut query = sqlx::query(&rewritten);
    for param in body.params {
        query = sql::bind_json(query, param);
    }

    let response = match statement {
        Statement::Select => {
            let rows = query.fetch_all(&user.pool).await?;
            QueryResponse {
                rows: Some(rows.iter().map(sql::row_to_json).collect()),
                rows_affected: None,
                last_insert_id: None,
            }
        }
        Statement::Insert | Statement::Update | Statement::Delete => {
            let result = query.execute(&user.pool).await?;
            audit::record(
                &user.pool,
                Some(user.claims.user_id),
                "query_executed",
                Some(&table_name),
                None,
            )
            .await
            .ok();
            QueryResponse {
                rows: None,
                rows_affected: Some(result.rows_affected() as i64),
                last_insert_id: Some(result.last_insert_rowid()),
            }
        }
        Statement::Unknown => return Err(ApiError::Validation("unmediated SQL statement".to_string())),
    };

    Ok(Json(response))
}
