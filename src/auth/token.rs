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

//! §4.D Session token.
//!
//! A standard three-segment, dot-joined, base64url HS256 JWT *is* the session
//! token wire format byte for byte, so generation/validation is a thin
//! wrapper over `jsonwebtoken` rather than a hand-rolled HMAC implementation
//! — constant-time signature comparison
//! comes for free from `jsonwebtoken`'s `ring`/`aws-lc-rs` backend.

use crate::auth::dto::Claims;
use crate::authz::role::Role;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

#[allow(clippy::too_many_arguments)]
pub fn generate(
    user_id: Uuid,
    username: &str,
    cenv_id: Uuid,
    role: Role,
    lifetime_seconds: i64,
    secret: &[u8],
) -> Result<(String, i64), TokenError> {
    let now = Utc::now().timestamp();
    let exp = now + lifetime_seconds;
    let claims = Claims {
        user_id,
        username: username.to_string(),
        cenv_id,
        role,
        iat: now,
        exp,
        jti: Uuid::new_v4(),
    };
    let header = Header::new(Algorithm::HS256);
    let token = encode(&header, &claims, &EncodingKey::from_secret(secret))
        .map_err(|_| TokenError::Malformed)?;
    Ok((token, exp))
}

/// Splits on `.`, recomputes and constant-time-compares the HMAC, decodes the
/// claims, and rejects if `now > exp`. Does **not** consult the session store —
/// that is a separate step performed by the request authenticator (§4.F).
pub fn validate(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    if token.split('.').count() != 3 {
        return Err(TokenError::Malformed);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // §4.D/§8 require an exact `now > exp` boundary; the crate default of 60s
    // would still validate a token seconds past its claimed expiry.
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    // This token shape carries no `iss`/`aud`/`sub`; don't require them.
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        },
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> [u8; 32] {
        [7u8; 32]
    }

    #[test]
    fn generated_token_validates_and_roundtrips_claims() {
        let user_id = Uuid::new_v4();
        let cenv_id = Uuid::new_v4();
        let (token, exp) = generate(user_id, "alice", cenv_id, Role::Editor, 3600, &secret())
            .unwrap();
        let claims = validate(&token, &secret()).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.cenv_id, cenv_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Editor);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let (token, _) = generate(
            Uuid::new_v4(),
            "alice",
            Uuid::new_v4(),
            Role::Viewer,
            3600,
            &secret(),
        )
        .unwrap();
        let mut bytes = token.into_bytes();
        let flip_at = bytes.len() - 1;
        bytes[flip_at] ^= 0x01;
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(validate(&tampered, &secret()).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_never_validates() {
        let (token, _) = generate(
            Uuid::new_v4(),
            "alice",
            Uuid::new_v4(),
            Role::Viewer,
            3600,
            &secret(),
        )
        .unwrap();
        assert!(validate(&token, &[9u8; 32]).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) = generate(
            Uuid::new_v4(),
            "alice",
            Uuid::new_v4(),
            Role::Viewer,
            -10,
            &secret(),
        )
        .unwrap();
        assert!(matches!(validate(&token, &secret()), Err(TokenError::Expired)));
    }
}
