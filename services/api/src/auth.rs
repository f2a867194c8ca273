//! Bearer token verification
//!
//! Tokens are issued by the external identity provider and signed with
//! HS256 using a secret shared with this service. Only verification happens
//! here; the `sub` claim becomes the acting user id.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthSettings;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Expiration time
    pub exp: u64,
    /// Issued at time
    #[serde(default)]
    pub iat: Option<u64>,
    /// Audience the token was issued for
    #[serde(default)]
    pub aud: Option<String>,
    /// Email recorded at the identity provider
    #[serde(default)]
    pub email: Option<String>,
    /// Provider role, e.g. `authenticated`
    #[serde(default)]
    pub role: Option<String>,
}

/// Verifies bearer tokens against the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Initialize a new verifier from the auth settings
    pub fn new(settings: &AuthSettings) -> Self {
        let decoding_key = DecodingKey::from_secret(settings.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = settings.leeway_secs;
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            decoding_key,
            validation,
        }
    }

    /// Validate a token and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub const SECRET: &str = "test-secret-with-enough-entropy";
    pub const AUDIENCE: &str = "authenticated";

    pub fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: SECRET.to_string(),
            audience: AUDIENCE.to_string(),
            leeway_secs: 0,
        }
    }

    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_secs()
    }

    /// Sign a token the way the identity provider does
    pub fn sign(sub: Uuid, secret: &str, audience: &str, exp: u64) -> String {
        let claims = Claims {
            sub,
            exp,
            iat: Some(now()),
            aud: Some(audience.to_string()),
            email: Some("driver@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token should encode")
    }

    pub fn token_for(sub: Uuid) -> String {
        sign(sub, SECRET, AUDIENCE, now() + 3600)
    }
}
