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

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateEndpointRequest {
    pub path: String,
    /// One of the four HTTP verbs, or `*` to match any method (§4.J).
    pub method: String,
    pub script: String,
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct EndpointResponse {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub script: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Listing omits the script body (§4.J).
#[derive(Debug, Serialize)]
pub struct EndpointSummaryResponse {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub modified_at: i64,
}
