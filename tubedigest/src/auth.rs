//! Bearer-token verification. Tokens are issued by the identity provider as
//! HS256 JWTs whose `sub` claim is the numeric user id.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use common::AuthConfig;

/// Secret used when the configured env var is unset. Development only.
pub const DEV_SECRET: &str = "dev-secret";

/// JWT claims we read (subject = user id)
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication credentials were not provided")]
    MissingToken,

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token subject is not a user id")]
    InvalidSubject,

    #[error("token verification is not configured")]
    NotConfigured,
}

/// Verifies tokens against the shared secret loaded once at startup.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Accepts `Bearer <token>` (and DRF-style `Token <token>`), returns the user id.
    pub fn verify_header(&self, header: Option<&str>) -> Result<i64, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("Token "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;
        self.verify(token)
    }

    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        data.claims.sub.parse().map_err(|_| AuthError::InvalidSubject)
    }
}

/// Secret named by `[auth] jwt_secret_env`, or [`DEV_SECRET`] with a warning when
/// that variable is unset. The server and the token helper both sign through this.
pub fn signing_secret(config: &AuthConfig) -> String {
    config.secret().unwrap_or_else(|| {
        warn!(
            env = %config.jwt_secret_env,
            "token secret not set, falling back to the development secret"
        );
        DEV_SECRET.to_string()
    })
}

/// Create a signed token for a user id, valid for `ttl_secs`.
pub fn issue_token(secret: &str, user_id: i64, ttl_secs: u64) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_to_user_id() {
        let token = issue_token("s3cret", 42, 3600).expect("token");
        let verifier = TokenVerifier::new("s3cret");
        assert_eq!(verifier.verify_header(Some(&format!("Bearer {}", token))).unwrap(), 42);
        assert_eq!(verifier.verify_header(Some(&format!("Token {}", token))).unwrap(), 42);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("s3cret", 42, 3600).expect("token");
        let verifier = TokenVerifier::new("other");
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "7".to_string(),
            exp: 1_000,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(TokenVerifier::new("k").verify(&token).is_err());
    }

    #[test]
    fn header_shapes() {
        let verifier = TokenVerifier::new("k");
        assert!(matches!(verifier.verify_header(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            verifier.verify_header(Some("Basic abc")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            verifier.verify_header(Some("Bearer   ")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn signing_secret_follows_configured_variable() {
        std::env::set_var("TUBEDIGEST_TEST_CUSTOM_SECRET", "from-custom-var");
        let config = AuthConfig {
            jwt_secret_env: "TUBEDIGEST_TEST_CUSTOM_SECRET".to_string(),
        };
        let secret = signing_secret(&config);
        assert_eq!(secret, "from-custom-var");

        // A token minted with it verifies against the same config
        let token = issue_token(&secret, 5, 60).unwrap();
        assert_eq!(TokenVerifier::new(&signing_secret(&config)).verify(&token).unwrap(), 5);
    }

    #[test]
    fn signing_secret_falls_back_to_dev_secret() {
        let config = AuthConfig {
            jwt_secret_env: "TUBEDIGEST_TEST_UNSET_SECRET".to_string(),
        };
        assert_eq!(signing_secret(&config), DEV_SECRET);
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let claims = Claims {
            sub: "alice".to_string(),
            exp: 32_503_680_000, // year 3000
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(matches!(
            TokenVerifier::new("k").verify(&token),
            Err(AuthError::InvalidSubject)
        ));
    }
}
