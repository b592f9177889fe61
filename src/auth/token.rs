// JWT token validation service

use crate::auth::{error::AuthError, models::Role};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub email: String,
    pub role: Role,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

/// Validates access tokens issued by the campus identity service
pub struct TokenService {
    secret: String,
}

impl TokenService {
    /// Create a new TokenService with the shared HS256 secret
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Validate an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Issuing side, used by tests to stand in for the identity service
#[cfg(test)]
impl TokenService {
    /// Access tokens expire in 15 minutes (900 seconds)
    const ACCESS_TOKEN_SECONDS: i64 = 900;

    pub(crate) fn generate_access_token(
        &self,
        user_id: i32,
        email: &str,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_token(user_id, email, role, Self::ACCESS_TOKEN_SECONDS)
    }

    pub(crate) fn issue_token(
        &self,
        user_id: i32,
        email: &str,
        role: Role,
        lifetime_seconds: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        use chrono::Utc;
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + lifetime_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Helper to create a test token service
    fn test_token_service() -> TokenService {
        TokenService::new("test_secret_key_for_testing_purposes".to_string())
    }

    #[test]
    fn test_generated_token_validates() {
        let service = test_token_service();
        let token = service
            .generate_access_token(42, "student@campus.edu", Role::User)
            .unwrap();

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "student@campus.edu");
        assert_eq!(claims.role, Role::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = TokenService::new("some_other_secret".to_string());
        let token = issuer.generate_access_token(1, "admin@campus.edu", Role::Admin).unwrap();

        let result = test_token_service().validate_access_token(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let service = test_token_service();
        let token = service
            .issue_token(7, "late@campus.edu", Role::User, -3600)
            .unwrap();

        let result = service.validate_access_token(&token);
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let result = test_token_service().validate_access_token("not.a.jwt");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    proptest! {
        // Claims survive an encode/decode cycle for any user id and role
        #[test]
        fn prop_claims_preserved(user_id in 1i32..1_000_000, admin in any::<bool>()) {
            let service = test_token_service();
            let role = if admin { Role::Admin } else { Role::User };
            let token = service.generate_access_token(user_id, "someone@campus.edu", role).unwrap();
            let claims = service.validate_access_token(&token).unwrap();
            prop_assert_eq!(claims.sub, user_id);
            prop_assert_eq!(claims.role, role);
        }
    }
}
