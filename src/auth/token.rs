// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API token codec.
//!
//! Tokens are HS256 JWTs signed with the process-wide `JWT_SECRET`. The
//! payload binds a request to a registered client and, optionally, a user:
//!
//! ```json
//! { "client_id": 5, "user_id": 42, "keypair_secret": "..." }
//! ```
//!
//! Tokens carry no `exp` claim. A verified token only proves the server
//! issued it; the resolver still loads the client and user and checks
//! revocation.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Signing algorithm for every token issued by this server.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub client_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// One-time secret used by keypair logins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypair_secret: Option<String>,
}

impl TokenClaims {
    /// Claims for a client-only token.
    pub fn client(client_id: i64) -> Self {
        Self {
            client_id,
            user_id: None,
            keypair_secret: None,
        }
    }

    /// Claims binding a client and a user.
    pub fn user(client_id: i64, user_id: i64) -> Self {
        Self {
            client_id,
            user_id: Some(user_id),
            keypair_secret: None,
        }
    }
}

/// Decoded payload before the client id is checked.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    client_id: Option<i64>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    keypair_secret: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing secret is empty")]
    EmptySecret,

    #[error("claims must carry a positive client_id")]
    MissingClientId,

    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Encodes and verifies API tokens.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        if claims.client_id <= 0 {
            return Err(TokenError::MissingClientId);
        }
        Ok(encode(&Header::new(TOKEN_ALGORITHM), claims, &self.encoding_key)?)
    }

    /// Verify signature and algorithm, then require a positive `client_id`.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let raw = decode::<RawClaims>(token, &self.decoding_key, &self.validation)?.claims;
        match raw.client_id {
            Some(client_id) if client_id > 0 => Ok(TokenClaims {
                client_id,
                user_id: raw.user_id,
                keypair_secret: raw.keypair_secret,
            }),
            _ => Err(TokenError::MissingClientId),
        }
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &TOKEN_ALGORITHM)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret").unwrap()
    }

    fn sign_raw(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(TOKEN_ALGORITHM),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn round_trip_preserves_claims() {
        let codec = codec();
        for claims in [
            TokenClaims::client(5),
            TokenClaims::user(5, 42),
            TokenClaims {
                client_id: 1,
                user_id: Some(2),
                keypair_secret: Some("abc".into()),
            },
        ] {
            let token = codec.encode(&claims).unwrap();
            assert_eq!(codec.decode(&token).unwrap(), claims);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = codec();
        let claims = TokenClaims::user(5, 42);
        assert_eq!(codec.encode(&claims).unwrap(), codec.encode(&claims).unwrap());
    }

    #[test]
    fn client_only_token_omits_optional_fields() {
        use base64::Engine;

        let token = codec().encode(&TokenClaims::client(5)).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({ "client_id": 5 }));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let other = TokenCodec::new("another-secret").unwrap();
        let token = other.encode(&TokenClaims::client(5)).unwrap();
        assert!(matches!(codec().decode(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(codec().decode("not-a-jwt"), Err(TokenError::Invalid(_))));
        assert!(matches!(codec().decode(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({ "client_id": 5 }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(codec().decode(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn missing_or_non_positive_client_id_is_rejected() {
        for payload in [json!({ "user_id": 42 }), json!({ "client_id": 0 }), json!({ "client_id": -3 })] {
            let token = sign_raw(payload, "test-secret");
            assert!(matches!(codec().decode(&token), Err(TokenError::MissingClientId)));
        }
    }

    #[test]
    fn encode_requires_positive_client_id() {
        assert!(matches!(
            codec().encode(&TokenClaims::client(0)),
            Err(TokenError::MissingClientId)
        ));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(TokenCodec::new(""), Err(TokenError::EmptySecret)));
    }
}
