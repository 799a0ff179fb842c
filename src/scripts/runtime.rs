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

//! §4.I Script runtime.
//!
//! Each invocation gets its own `rhai::Engine` and `Scope` — no state leaks
//! between requests; scripts are not expected to hold module-level mutable
//! state across requests. Execution runs on a blocking
//! thread (`spawn_blocking`) so a pathological script cannot stall the async
//! reactor, wrapped in an outer `tokio::time::timeout` — the design note in
//! §9 that timeouts can only abandon the response, not preempt computation.
//!
//! The runtime does **not** consult the authorization oracle (§4.I, §9):
//! `db.query`/`db.execute` run with the full authority of the tenant's pool.

use rhai::{Array, Dynamic, Engine, Map as RhaiMap, Scope};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script does not define handle_request")]
    MissingHandler,
    #[error("script compile error: {0}")]
    Compile(String),
    #[error("script runtime error: {0}")]
    Runtime(String),
    #[error("handle_request must return a dict with body/status/headers")]
    InvalidReturn,
    #[error("script timed out")]
    Timeout,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// Empty string for an unauthenticated caller — anonymous access is
    /// permitted for scripted endpoints (§4.J dispatch).
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct ScriptResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

/// Host handle injected into scripts as `db` — `query`/`execute` bridge to
/// the tenant's `SqlitePool` by driving the async call to completion on this
/// blocking thread (`Handle::block_on`), honoring a per-invocation deadline.
#[derive(Clone)]
struct Db {
    pool: SqlitePool,
    rt: tokio::runtime::Handle,
    deadline: Instant,
}

impl Db {
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn query(&mut self, sql: &str, params: Array) -> Result<Array, Box<rhai::EvalAltResult>> {
        let values = params_to_json(params)?;
        let pool = self.pool.clone();
        let sql = sql.to_string();
        let remaining = self.remaining();
        let rows = self
            .rt
            .block_on(async move {
                tokio::time::timeout(remaining, run_query(&pool, &sql, values)).await
            })
            .map_err(|_| runtime_err("database call exceeded the script deadline"))?
            .map_err(|e| runtime_err(&e.to_string()))?;

        let mut out = Array::new();
        for row in rows {
            out.push(json_to_dynamic(row)?);
        }
        Ok(out)
    }

    fn execute(&mut self, sql: &str, params: Array) -> Result<RhaiMap, Box<rhai::EvalAltResult>> {
        let values = params_to_json(params)?;
        let pool = self.pool.clone();
        let sql = sql.to_string();
        let remaining = self.remaining();
        let (rows_affected, last_insert_id) = self
            .rt
            .block_on(async move {
                tokio::time::timeout(remaining, run_execute(&pool, &sql, values)).await
            })
            .map_err(|_| runtime_err("database call exceeded the script deadline"))?
            .map_err(|e| runtime_err(&e.to_string()))?;

        let mut map = RhaiMap::new();
        map.insert("rows_affected".into(), Dynamic::from(rows_affected));
        map.insert("last_insert_id".into(), Dynamic::from(last_insert_id));
        Ok(map)
    }
}

async fn run_query(pool: &SqlitePool, sql: &str, params: Vec<Value>) -> Result<Vec<Value>, sqlx::Error> {
    let mut query = sqlx::query(sql);
    for value in params {
        query = crate::sql::bind_json(query, value);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(crate::sql::row_to_json).collect())
}

async fn run_execute(pool: &SqlitePool, sql: &str, params: Vec<Value>) -> Result<(i64, i64), sqlx::Error> {
    let mut query = sqlx::query(sql);
    for value in params {
        query = crate::sql::bind_json(query, value);
    }
    let result = query.execute(pool).await?;
    Ok((result.rows_affected() as i64, result.last_insert_rowid()))
}

fn params_to_json(params: Array) -> Result<Vec<Value>, Box<rhai::EvalAltResult>> {
    params
        .into_iter()
        .map(|d| dynamic_to_json(d))
        .collect::<Result<Vec<_>, _>>()
}

/// Script→Go type bridge (§4.I): `None→null, Bool→bool, Int→int64,
/// Float→float64, String→string, List→list, Dict→map` (non-string keys
/// dropped — rhai maps are already string-keyed, so nothing to drop here).
fn dynamic_to_json(value: Dynamic) -> Result<Value, Box<rhai::EvalAltResult>> {
    rhai::serde::from_dynamic(&value).map_err(|e| runtime_err(&e.to_string()))
}

/// Go→script type bridge (§4.I): SQL NULL→None, integers→Int, floats→Float,
/// strings→String, BLOBs→String (already decoded to text by `row_to_json`).
fn json_to_dynamic(value: Value) -> Result<Dynamic, Box<rhai::EvalAltResult>> {
    rhai::serde::to_dynamic(&value).map_err(|e| runtime_err(&e.to_string()))
}

fn runtime_err(msg: &str) -> Box<rhai::EvalAltResult> {
    Box::new(rhai::EvalAltResult::ErrorRuntime(msg.into(), rhai::Position::NONE))
}

/// The `json` namespace object (`json.encode(value)` / `json.decode(string)`)
/// — a unit struct whose registered methods are the only surface it exposes.
#[derive(Clone)]
struct Json;

impl Json {
    fn encode(&mut self, value: Dynamic) -> Result<String, Box<rhai::EvalAltResult>> {
        let json: Value = rhai::serde::from_dynamic(&value).map_err(|e| runtime_err(&e.to_string()))?;
        serde_json::to_string(&json).map_err(|e| runtime_err(&e.to_string()))
    }

    fn decode(&mut self, s: &str) -> Result<Dynamic, Box<rhai::EvalAltResult>> {
        let json: Value = serde_json::from_str(s).map_err(|e| runtime_err(&e.to_string()))?;
        rhai::serde::to_dynamic(&json).map_err(|e| runtime_err(&e.to_string()))
    }
}

fn register_json(engine: &mut Engine) {
    engine.register_type_with_name::<Json>("Json");
    engine.register_fn("encode", Json::encode);
    engine.register_fn("decode", Json::decode);
}

fn register_response(engine: &mut Engine) {
    engine.register_fn("response", |body: Dynamic| build_response(body, 200, RhaiMap::new()));
    engine.register_fn("response", |body: Dynamic, status: i64| {
        build_response(body, status, RhaiMap::new())
    });
    engine.register_fn("response", |body: Dynamic, status: i64, headers: RhaiMap| {
        build_response(body, status, headers)
    });
}

fn build_response(body: Dynamic, status: i64, headers: RhaiMap) -> RhaiMap {
    let mut map = RhaiMap::new();
    map.insert("body".into(), body);
    map.insert("status".into(), Dynamic::from(status));
    map.insert("headers".into(), Dynamic::from(headers));
    map
}

fn build_req_dynamic(request: &ScriptRequest) -> Dynamic {
    let mut map = RhaiMap::new();
    map.insert("method".into(), request.method.clone().into());
    map.insert("path".into(), request.path.clone().into());

    let mut query = RhaiMap::new();
    for (k, v) in &request.query {
        query.insert(k.as_str().into(), v.clone().into());
    }
    map.insert("query".into(), Dynamic::from(query));

    let mut headers = RhaiMap::new();
    for (k, v) in &request.headers {
        headers.insert(k.as_str().into(), v.clone().into());
    }
    map.insert("headers".into(), Dynamic::from(headers));

    let mut user = RhaiMap::new();
    user.insert("id".into(), request.user_id.clone().into());
    map.insert("user".into(), Dynamic::from(user));

    Dynamic::from(map)
}

fn parse_result(result: Dynamic) -> Result<ScriptResponse, ScriptError> {
    let map = result.try_cast::<RhaiMap>().ok_or(ScriptError::InvalidReturn)?;

    let body_dynamic = map.get("body").cloned().ok_or(ScriptError::InvalidReturn)?;
    let body: Value = rhai::serde::from_dynamic(&body_dynamic)
        .map_err(|e| ScriptError::Runtime(e.to_string()))?;

    let status = map
        .get("status")
        .and_then(|d| d.as_int().ok())
        .unwrap_or(200);
    let status = u16::try_from(status).map_err(|_| ScriptError::InvalidReturn)?;

    let headers = match map.get("headers") {
        Some(d) => {
            let headers_map = d.clone().try_cast::<RhaiMap>().ok_or(ScriptError::InvalidReturn)?;
            headers_map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }
        None => HashMap::new(),
    };

    Ok(ScriptResponse { status, headers, body })
}

fn run_sync(
    pool: SqlitePool,
    rt: tokio::runtime::Handle,
    script: &str,
    request: ScriptRequest,
    deadline: Instant,
) -> Result<ScriptResponse, ScriptError> {
    let mut engine = Engine::new();
    register_json(&mut engine);
    register_response(&mut engine);
    engine.register_type_with_name::<Db>("Db");
    engine.register_fn("query", Db::query);
    engine.register_fn("query", |db: &mut Db, sql: &str| db.query(sql, Array::new()));
    engine.register_fn("execute", Db::execute);
    engine.register_fn("execute", |db: &mut Db, sql: &str| db.execute(sql, Array::new()));

    let ast = engine
        .compile(script)
        .map_err(|e| ScriptError::Compile(e.to_string()))?;

    let mut scope = Scope::new();
    let db = Db { pool, rt, deadline };
    let req_arg = build_req_dynamic(&request);
    scope.push("db", db);
    scope.push("json", Json);
    scope.push("req", req_arg.clone());

    // Execute the module's top level so any script-level setup runs before
    // `handle_request` is looked up (§4.I execution contract).
    engine
        .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
        .map_err(|e| ScriptError::Runtime(e.to_string()))?;

    let result = engine
        .call_fn::<Dynamic>(&mut scope, &ast, "handle_request", (req_arg,))
        .map_err(|e| match *e {
            rhai::EvalAltResult::ErrorFunctionNotFound(ref name, _) if name.starts_with("handle_request") => {
                ScriptError::MissingHandler
            }
            other => ScriptError::Runtime(other.to_string()),
        })?;

    parse_result(result)
}

/// Runs `script` against `pool` with `request` bound to `req`, bounded by
/// `timeout_ms` (§4.I Lifetime/Timeout).
pub async fn execute(
    pool: SqlitePool,
    script: String,
    request: ScriptRequest,
    timeout_ms: u64,
) -> Result<ScriptResponse, ScriptError> {
    let rt = tokio::runtime::Handle::current();
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    let join = tokio::task::spawn_blocking(move || run_sync(pool, rt, &script, request, deadline));

    match tokio::time::timeout(Duration::from_millis(timeout_ms), join).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ScriptError::Runtime(format!("script task panicked: {e}"))),
        Err(_elapsed) => Err(ScriptError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cenv::schema::bootstrap;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bootstrapped_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn missing_handler_is_a_hard_error() {
        let pool = bootstrapped_pool().await;
        let result = execute(
            pool,
            "let x = 1;".to_string(),
            ScriptRequest::default(),
            5_000,
        )
        .await;
        assert!(matches!(result, Err(ScriptError::MissingHandler)));
    }

    #[tokio::test]
    async fn simple_script_returns_the_response_body() {
        let pool = bootstrapped_pool().await;
        let script = r#"
            fn handle_request(req) {
                response(#{ "message": "hi" })
            }
        "#;
        let result = execute(pool, script.to_string(), ScriptRequest::default(), 5_000)
            .await
            .unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(result.body["message"], "hi");
    }

    #[tokio::test]
    async fn script_can_read_req_fields() {
        let pool = bootstrapped_pool().await;
        let script = r#"
            fn handle_request(req) {
                response(#{ "method": req.method, "path": req.path, "user_id": req.user.id })
            }
        "#;
        let mut request = ScriptRequest::default();
        request.method = "GET".to_string();
        request.path = "/hello".to_string();
        request.user_id = "u1".to_string();

        let result = execute(pool, script.to_string(), request, 5_000).await.unwrap();
        assert_eq!(result.body["method"], "GET");
        assert_eq!(result.body["path"], "/hello");
        assert_eq!(result.body["user_id"], "u1");
    }

    #[tokio::test]
    async fn script_can_query_the_database() {
        let pool = bootstrapped_pool().await;
        let script = r#"
            fn handle_request(req) {
                let rows = db.query("SELECT value FROM _wce_config WHERE key = 'max_users'");
                response(#{ "rows": rows })
            }
        "#;
        let result = execute(pool, script.to_string(), ScriptRequest::default(), 5_000)
            .await
            .unwrap();
        assert_eq!(result.body["rows"][0]["value"], "10");
    }

    #[tokio::test]
    async fn script_can_execute_a_write_and_see_rows_affected() {
        let pool = bootstrapped_pool().await;
        let script = r#"
            fn handle_request(req) {
                let result = db.execute("UPDATE _wce_config SET value = 'updated' WHERE key = 'max_users'");
                response(#{ "rows_affected": result.rows_affected })
            }
        "#;
        let result = execute(pool.clone(), script.to_string(), ScriptRequest::default(), 5_000)
            .await
            .unwrap();
        assert_eq!(result.body["rows_affected"], 1);

        let value: String = sqlx::query_scalar("SELECT value FROM _wce_config WHERE key = 'max_users'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(value, "updated");
    }

    #[tokio::test]
    async fn non_dict_return_is_a_hard_error() {
        let pool = bootstrapped_pool().await;
        let script = r#"
            fn handle_request(req) {
                42
            }
        "#;
        let result = execute(pool, script.to_string(), ScriptRequest::default(), 5_000).await;
        assert!(matches!(result, Err(ScriptError::InvalidReturn)));
    }

    #[tokio::test]
    async fn a_slow_script_is_abandoned_at_the_deadline() {
        // Finite but slow — long enough to blow past the 50ms deadline, short
        // enough not to leave a runaway thread spinning after the test exits.
        let pool = bootstrapped_pool().await;
        let script = r#"
            fn handle_request(req) {
                let total = 0;
                for i in range(0, 200_000_000) {
                    total += i;
                }
                response(#{ "total": total })
            }
        "#;
        let result = execute(pool, script.to_string(), ScriptRequest::default(), 50).await;
        assert!(matches!(result, Err(ScriptError::Timeout)));
    }
}
