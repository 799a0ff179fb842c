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

//! Admin endpoint CRUD (§4.J, §6) and the `/{tenant}/star/<path>` dispatcher.

use crate::app::state::AppState;
use crate::audit;
use crate::auth::{session, token, AuthenticatedUser};
use crate::cenv::CenvManager;
use crate::common::error::{ApiError, ApiResult};
use crate::common::extractors::ValidJson;
use crate::scripts::dto::{CreateEndpointRequest, EndpointResponse, EndpointSummaryResponse};
use crate::scripts::repository::{EndpointsRepository, SqliteEndpointsRepository};
use crate::scripts::runtime::{self, ScriptError, ScriptRequest};
use axum::Json;
use axum::body::{to_bytes, Body};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;

fn require_admin(user: &AuthenticatedUser) -> ApiResult<()> {
    if user.claims.role.is_privileged() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "only owner/admin may manage scripted endpoints".to_string(),
        ))
    }
}

fn to_response(row: crate::scripts::repository::EndpointRow) -> EndpointResponse {
    EndpointResponse {
        id: row.id,
        path: row.path,
        method: row.method,
        script: row.script,
        description: row.description,
        enabled: row.enabled,
        created_at: row.created_at,
        modified_at: row.modified_at,
    }
}

pub async fn create_endpoint(
    user: AuthenticatedUser,
    ValidJson(body): ValidJson<CreateEndpointRequest>,
) -> ApiResult<Json<EndpointResponse>> {
    require_admin(&user)?;
    if !body.path.starts_with('/') {
        return Err(ApiError::Validation("path must start with /".to_string()));
    }

    let repo = SqliteEndpointsRepository;
    let row = repo
        .upsert(
            &user.pool,
            &body.path,
            &body.method,
            &body.script,
            body.description.as_deref(),
            body.enabled,
        )
        .await?;

    audit::record(
        &user.pool,
        Some(user.claims.user_id),
        "endpoint_created",
        Some(crate::scripts::TABLE_NAME),
        Some(&row.id.to_string()),
    )
    .await
    .ok();

    Ok(Json(to_response(row)))
}

pub async fn list_endpoints(user: AuthenticatedUser) -> ApiResult<Json<Vec<EndpointSummaryResponse>>> {
    require_admin(&user)?;
    let repo = SqliteEndpointsRepository;
    let rows = repo.list(&user.pool).await?;
    Ok(Json(
        rows.into_iter()
            .map(|r| EndpointSummaryResponse {
                id: r.id,
                path: r.path,
                method: r.method,
                description: r.description,
                enabled: r.enabled,
                created_at: r.created_at,
                modified_at: r.modified_at,
            })
            .collect(),
    ))
}

pub async fn delete_endpoint(user: AuthenticatedUser, Path(id): Path<i64>) -> ApiResult<()> {
    require_admin(&user)?;
    let repo = SqliteEndpointsRepository;
    repo.delete(&user.pool, id).await?;
    audit::record(
        &user.pool,
        Some(user.claims.user_id),
        "endpoint_deleted",
        Some(crate::scripts::TABLE_NAME),
        Some(&id.to_string()),
    )
    .await
    .ok();
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Anonymous is permitted: a missing, malformed, expired, cross-tenant, or
/// revoked token all fall back to `user.id = ""` rather than rejecting the
/// request (§4.J) — unlike [`AuthenticatedUser`], which treats every one of
/// those as a hard 401.
async fn resolve_user_id(
    state: &AppState,
    pool: &sqlx::SqlitePool,
    tenant_id: uuid::Uuid,
    headers: &HeaderMap,
) -> String {
    let Some(raw_token) = bearer_token(headers) else {
        return String::new();
    };
    let Ok(claims) = token::validate(raw_token, state.jwt_secret()) else {
        return String::new();
    };
    if claims.cenv_id != tenant_id {
        return String::new();
    }
    let hash = session::hash_token(raw_token);
    match session::is_session_valid(pool, &hash).await {
        Ok(true) => claims.user_id.to_string(),
        _ => String::new(),
    }
}

/// `* /{tenant}/star/<path>` (§4.J). Not an Axum extractor-based handler like
/// its siblings: the whole point of scripted endpoints is that *any* method
/// and *any* subpath dispatch here, so it's wired with `axum::routing::any`
/// against a wildcard and does its own request teardown.
pub async fn dispatch(State(state): State<AppState>, request: axum::extract::Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let Some((tenant_id, rest)) = CenvManager::parse_path(&path) else {
        return ApiError::NotFound("no such cenv".to_string()).into_response();
    };
    let Some(subpath) = rest.strip_prefix("star") else {
        return ApiError::NotFound("not found".to_string()).into_response();
    };
    let star_path = if subpath.is_empty() {
        "/".to_string()
    } else {
        subpath.to_string()
    };

    let pool = match state.cenv_manager.get_connection(tenant_id).await {
        Ok(pool) => pool,
        Err(_) => return ApiError::NotFound("no such cenv".to_string()).into_response(),
    };

    let method = request.method().to_string();
    let headers_in = request.headers().clone();
    let query: HashMap<String, String> = request
        .uri()
        .query()
        .map(parse_query)
        .unwrap_or_default();

    let repo = SqliteEndpointsRepository;
    let endpoint = match repo.find_for_dispatch(&pool, &star_path, &method).await {
        Ok(Some(row)) => row,
        Ok(None) => return ApiError::NotFound("no scripted endpoint for this path".to_string()).into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let user_id = resolve_user_id(&state, &pool, tenant_id, &headers_in).await;

    let headers: HashMap<String, String> = headers_in
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();

    let body_bytes = match to_bytes(request.into_body(), 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => return ApiError::Validation("request body too large".to_string()).into_response(),
    };
    let _ = body_bytes; // the script surface has no request-body accessor (§4.I closed capability set).

    let script_request = ScriptRequest {
        method,
        path: star_path,
        query,
        headers,
        user_id,
    };

    match runtime::execute(pool.clone(), endpoint.script, script_request, state.script_timeout_ms()).await {
        Ok(response) => {
            let mut builder = Response::builder().status(
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK),
            );
            let mut has_content_type = false;
            for (key, value) in &response.headers {
                if key.eq_ignore_ascii_case("content-type") {
                    has_content_type = true;
                }
                builder = builder.header(key, value);
            }
            if !has_content_type {
                builder = builder.header("content-type", "application/json");
            }
            let body = match response.body.as_str() {
                Some(s) => s.to_string(),
                None => response.body.to_string(),
            };
            builder.body(Body::from(body)).unwrap_or_else(|_| {
                ApiError::Internal("failed to build script response".to_string()).into_response()
            })
        }
        Err(ScriptError::MissingHandler) => {
            ApiError::Internal("endpoint script has no handle_request function".to_string()).into_response()
        }
        Err(ScriptError::Timeout) => {
            ApiError::Internal("endpoint script exceeded its deadline".to_string()).into_response()
        }
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            Some((percent_decode(k), percent_decode(v)))
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
