// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client credential generation and comparison.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;

/// Length of a client's public identifier.
pub const PUBLIC_UID_LEN: usize = 8;
/// Length of a client secret.
pub const CLIENT_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("system random number generator failed")]
pub struct RandomError;

/// Random url-safe string of exactly `len` characters.
pub fn random_token(rng: &SystemRandom, len: usize) -> Result<String, RandomError> {
    // 3 bytes encode to 4 characters
    let mut bytes = vec![0u8; len.div_ceil(4) * 3];
    rng.fill(&mut bytes).map_err(|_| RandomError)?;
    let mut encoded = Base64UrlUnpadded::encode_string(&bytes);
    encoded.truncate(len);
    Ok(encoded)
}

/// Fresh `(public_uid, secret)` pair for a new client.
pub fn client_credentials(rng: &SystemRandom) -> Result<(String, String), RandomError> {
    Ok((
        random_token(rng, PUBLIC_UID_LEN)?,
        random_token(rng, CLIENT_SECRET_LEN)?,
    ))
}

/// Constant-time secret comparison. Only the length may leak.
pub fn secrets_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_requested_length_and_alphabet() {
        let rng = SystemRandom::new();
        for len in [1, 8, 31, 32, 43] {
            let token = random_token(&rng, len).unwrap();
            assert_eq!(token.len(), len);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn credentials_differ() {
        let rng = SystemRandom::new();
        let (uid_a, secret_a) = client_credentials(&rng).unwrap();
        let (uid_b, secret_b) = client_credentials(&rng).unwrap();
        assert_eq!(uid_a.len(), PUBLIC_UID_LEN);
        assert_eq!(secret_a.len(), CLIENT_SECRET_LEN);
        assert_ne!(uid_a, uid_b);
        assert_ne!(secret_a, secret_b);
    }

    #[test]
    fn comparison() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abd"));
        assert!(!secrets_match("abc", "xbc"));
    }

    #[test]
    fn length_mismatch_never_matches() {
        let rng = SystemRandom::new();
        let secret = random_token(&rng, CLIENT_SECRET_LEN).unwrap();
        assert!(secrets_match(&secret, &secret.clone()));
        assert!(!secrets_match(&secret, &secret[..CLIENT_SECRET_LEN - 1]));
        assert!(!secrets_match(&secret, &format!("{secret}x")));
        assert!(!secrets_match(&secret, ""));
        assert!(!secrets_match("", &secret));
    }
}
