use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use thiserror::Error;

use crate::models::user::Role;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid JWT secret: {0}")]
    Secret(String),
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("invalid claims: {0}")]
    Claims(String),
}

/// Key material as published for the GraphQL engine.
#[derive(Debug, Deserialize)]
struct JwtSecret {
    #[serde(rename = "type")]
    algorithm: String,
    key: String,
}

/// Identity of the caller, extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub is_registered: bool,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(rename = "https://hasura.io/jwt/claims")]
    hasura: HasuraClaims,
    #[serde(rename = "https://eseuri.com")]
    platform: PlatformClaims,
}

#[derive(Debug, Deserialize)]
struct HasuraClaims {
    #[serde(rename = "X-Hasura-Default-Role")]
    default_role: Role,
    #[serde(rename = "X-Hasura-User-Id")]
    user_id: String,
    #[serde(rename = "X-Hasura-Allowed-Roles", default)]
    allowed_roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlatformClaims {
    #[serde(rename = "hasCompletedRegistration")]
    has_completed_registration: bool,
}

impl TryFrom<TokenPayload> for Claims {
    type Error = JwtError;

    fn try_from(payload: TokenPayload) -> Result<Self, Self::Error> {
        let user_id = payload
            .hasura
            .user_id
            .parse::<i32>()
            .map_err(|_| JwtError::Claims(format!("user id '{}'", payload.hasura.user_id)))?;

        let role = payload.hasura.default_role;
        if !payload.hasura.allowed_roles.is_empty()
            && !payload.hasura.allowed_roles.iter().any(|r| r == role.as_str())
        {
            return Err(JwtError::Claims(format!("role '{role}' is not allowed")));
        }

        Ok(Claims {
            user_id,
            role,
            is_registered: payload.platform.has_completed_registration,
        })
    }
}

/// Verifies bearer tokens with a key fixed at startup.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier from the JSON secret, e.g. `{"type":"RS256","key":"<PEM>"}`.
    pub fn from_secret_json(raw: &str) -> Result<Self, JwtError> {
        let secret: JwtSecret =
            serde_json::from_str(raw).map_err(|e| JwtError::Secret(e.to_string()))?;
        let algorithm = Algorithm::from_str(&secret.algorithm)
            .map_err(|_| JwtError::Secret(format!("unsupported algorithm '{}'", secret.algorithm)))?;

        let pem = secret.key.as_bytes();
        let key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                DecodingKey::from_secret(pem)
            }
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem)?,
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem)?,
            _ => DecodingKey::from_rsa_pem(pem)?,
        };

        let mut validation = Validation::new(algorithm);
        // Audience is checked by the GraphQL engine itself.
        validation.validate_aud = false;

        Ok(Self { key, validation })
    }

    /// Verify a token's signature and expiry and parse its custom claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<TokenPayload>(token, &self.key, &self.validation)?;
        Claims::try_from(data.claims)
    }
}
