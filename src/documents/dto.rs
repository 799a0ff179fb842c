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
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub id: String,
    pub content: String,
    pub content_type: String,
    #[serde(default)]
    pub is_binary: bool,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub is_binary: Option<bool>,
    pub searchable: Option<bool>,
    pub tags: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub content: String,
    pub content_type: String,
    pub is_binary: bool,
    pub searchable: bool,
    pub created_at: i64,
    pub modified_at: i64,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub version: i64,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}
