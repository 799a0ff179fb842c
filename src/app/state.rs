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

//! Shared process state handed to every handler (teacher's `AppState<P, T>`
//! pattern, simplified: no manager-plane database connection, since a CENV's
//! existence is a filesystem predicate, not a registry row — §4.B).

use crate::app::config::AppConfig;
use crate::cenv::CenvManager;
use crate::identity::{Argon2Hasher, PasswordHasher};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub cenv_manager: Arc<CenvManager>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    jwt_secret: Arc<Vec<u8>>,
    script_timeout_ms: u64,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let jwt_secret = match config.auth().jwt_secret() {
            Some(s) => s.as_bytes().to_vec(),
            None => {
                tracing::warn!(
                    "no WCE_AUTH__JWT_SECRET configured; generating an ephemeral signing key \
                     — every outstanding session token will be rejected on the next restart"
                );
                random_secret()
            }
        };

        Self {
            cenv_manager: Arc::new(CenvManager::new(config.storage().dir())),
            password_hasher: Arc::new(Argon2Hasher),
            jwt_secret: Arc::new(jwt_secret),
            script_timeout_ms: config.script().default_timeout_ms_value(),
        }
    }

    pub fn jwt_secret(&self) -> &[u8] {
        &self.jwt_secret
    }

    pub fn script_timeout_ms(&self) -> u64 {
        self.script_timeout_ms
    }

    #[cfg(test)]
    pub fn for_tests(storage_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            cenv_manager: Arc::new(CenvManager::new(storage_dir)),
            password_hasher: Arc::new(Argon2Hasher),
            jwt_secret: Arc::new(vec![7u8; 32]),
            script_timeout_ms: 5_000,
        }
    }
}

fn random_secret() -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}
