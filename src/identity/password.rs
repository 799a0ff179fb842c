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

//! §4.C Password & identity — salted, cost-tunable password hashing.
//!
//! Argon2id (`argon2` crate) satisfies "bcrypt cost 12 or equivalent
//! argon2id parameters": `Argon2::default()` uses the RFC 9106 recommended
//! parameters, which are the argon2id-equivalent of
//! bcrypt cost 12 in terms of attacker work factor.

use argon2::{
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash_password(&self, plain: &str) -> Result<String, String>;
    fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, String>;
}

pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, plain: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| e.to_string())
    }

    fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, String> {
        let parsed = PasswordHash::new(hash).map_err(|e| e.to_string())?;
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_its_own_hash() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash_password("hunter2xx").unwrap();
        assert!(hasher.verify_password("hunter2xx", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash_password("hunter2xx").unwrap();
        assert!(!hasher.verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn hash_is_non_deterministic() {
        let hasher = Argon2Hasher;
        let a = hasher.hash_password("hunter2xx").unwrap();
        let b = hasher.hash_password("hunter2xx").unwrap();
        assert_ne!(a, b);
    }
}
