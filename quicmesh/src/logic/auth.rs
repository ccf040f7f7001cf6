//! REGISTER token verification (§6).
//!
//! Source carried two REGISTER paths (a JWT-style token and a raw
//! `accountId`); per SPEC_FULL.md §9 (Open Question) we implement the JWT
//! path only, matching `MsquicLogicSystem.cpp`'s use of `jwt-cpp` with
//! HS256 and a shared secret, claim `accountId`.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "accountId")]
    account_id: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid or expired token")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Verify an HS256-signed token against `secret` and return the
/// `accountId` claim.
pub fn verify(token: &str, secret: &str) -> Result<String, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims.account_id)
}

#[cfg(test)]
mod test {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        #[serde(rename = "accountId")]
        account_id: String,
    }

    #[test]
    fn test_verify_round_trip() {
        let secret = "shh";
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                account_id: "alice".into(),
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(verify(&token, secret).unwrap(), "alice");
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                account_id: "alice".into(),
            },
            &EncodingKey::from_secret(b"right"),
        )
        .unwrap();

        assert!(verify(&token, "wrong").is_err());
    }
}
