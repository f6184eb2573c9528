use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::AppError;

/// Caller resolved from a verified bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Verifies HS256 bearer tokens signed with the shared secret
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

#[derive(Debug, Deserialize)]
struct SyncClaims {
    sub: Option<String>,
    oid: Option<String>,
    preferred_username: Option<String>,
}

impl JwtVerifier {
    pub fn new(config: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = config.auth_clock_skew.as_secs();

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let decoded = decode::<SyncClaims>(token, &self.key, &self.validation).map_err(|error| {
            AppError::unauthorized(format!("Token validation failed: {}", sanitize(&error)))
        })?;

        let user_id = resolve_user_id(decoded.claims)
            .ok_or_else(|| AppError::unauthorized("Token carries no user identity"))?;
        Ok(AuthenticatedUser { user_id })
    }
}

/// First non-empty of `sub`, `oid`, `preferred_username`
fn resolve_user_id(claims: SyncClaims) -> Option<String> {
    [claims.sub, claims.oid, claims.preferred_username]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn verifier() -> JwtVerifier {
        let config = AppConfig::from_lookup(|key| {
            (key == "SCRIBE_API_JWT_SECRET").then(|| SECRET.to_string())
        })
        .unwrap();
        JwtVerifier::new(&config)
    }

    fn token(secret: &str, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn expires() -> i64 {
        chrono::Utc::now().timestamp() + 600
    }

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn verifies_subject_claim() {
        let token = token(SECRET, &json!({ "sub": "user-1", "exp": expires() }));
        let user = verifier().verify_access_token(&token).unwrap();
        assert_eq!(user.user_id, "user-1");
    }

    #[test]
    fn falls_back_to_object_id_then_username() {
        let token_with_oid = token(
            SECRET,
            &json!({ "sub": " ", "oid": "object-9", "exp": expires() }),
        );
        assert_eq!(
            verifier().verify_access_token(&token_with_oid).unwrap().user_id,
            "object-9"
        );

        let token_with_username = token(
            SECRET,
            &json!({ "preferred_username": "ada@example.com", "exp": expires() }),
        );
        assert_eq!(
            verifier()
                .verify_access_token(&token_with_username)
                .unwrap()
                .user_id,
            "ada@example.com"
        );
    }

    #[test]
    fn rejects_token_without_identity() {
        let token = token(SECRET, &json!({ "exp": expires() }));
        let err = verifier().verify_access_token(&token).unwrap_err();
        assert!(err.to_string().contains("no user identity"));
    }

    #[test]
    fn rejects_foreign_signature_and_expired_tokens() {
        let forged = token(
            "another-secret-of-enough-length",
            &json!({ "sub": "user-1", "exp": expires() }),
        );
        assert!(verifier().verify_access_token(&forged).is_err());

        let expired = token(
            SECRET,
            &json!({ "sub": "user-1", "exp": chrono::Utc::now().timestamp() - 3_600 }),
        );
        assert!(verifier().verify_access_token(&expired).is_err());
    }
}
