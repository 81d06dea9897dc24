//! Token service for issuing and verifying signed tokens.
//!
//! Three token kinds share one HMAC secret: short-lived `access` tokens and
//! longer-lived `refresh` tokens for the JSON API, and `session` tokens
//! carried by the web cookie. A token of one kind never verifies as another.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use kotoba_common::config::AuthConfig;
use kotoba_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Kind of token, embedded in the claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived API token sent as a bearer header.
    Access,
    /// Long-lived API token exchanged for new access tokens.
    Refresh,
    /// Web session token carried by the session cookie.
    Session,
}

/// Claims carried inside a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user ID.
    pub sub: String,
    /// Token kind.
    pub kind: TokenKind,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Access and refresh token pair returned on login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access: String,
    /// Long-lived refresh token.
    pub refresh: String,
}

/// Service for issuing and verifying tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    session_ttl_secs: i64,
}

impl TokenService {
    /// Create a new token service from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::default(),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            session_ttl_secs: config.session_ttl_secs,
        }
    }

    /// Issue a signed token of the given kind for a user.
    pub fn issue(&self, user_id: &str, kind: TokenKind) -> AppResult<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
            TokenKind::Session => self.session_ttl_secs,
        };
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            kind,
            iat: now,
            exp: now + ttl,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to encode token: {e}")))
    }

    /// Issue an access and refresh token pair for a user.
    pub fn issue_pair(&self, user_id: &str) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    /// Issue a web session token for a user.
    pub fn issue_session(&self, user_id: &str) -> AppResult<String> {
        self.issue(user_id, TokenKind::Session)
    }

    /// Exchange a valid refresh token for a new access token.
    pub fn refresh_access(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue(&claims.sub, TokenKind::Access)
    }

    /// Verify a token and check that it carries the expected kind.
    ///
    /// Expired, tampered and wrong-kind tokens all come back as
    /// [`AppError::Unauthorized`] so callers answer with a single 401 shape.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)?;

        if claims.kind != expected {
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_test_config() -> AuthConfig {
        AuthConfig {
            secret: "test-secret-key".to_string(),
            access_ttl_secs: 300,
            refresh_ttl_secs: 86400,
            session_ttl_secs: 1_209_600,
        }
    }

    #[test]
    fn test_issue_pair_and_verify() {
        let service = TokenService::new(&create_test_config());

        let pair = service.issue_pair("user1").unwrap();
        let access = service.verify(&pair.access, TokenKind::Access).unwrap();
        let refresh = service.verify(&pair.refresh, TokenKind::Refresh).unwrap();

        assert_eq!(access.sub, "user1");
        assert_eq!(refresh.sub, "user1");
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_verify_rejects_wrong_kind() {
        let service = TokenService::new(&create_test_config());

        let pair = service.issue_pair("user1").unwrap();
        let result = service.verify(&pair.access, TokenKind::Session);

        match result {
            Err(AppError::Unauthorized) => {}
            _ => panic!("Expected Unauthorized error"),
        }
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let service = TokenService::new(&create_test_config());

        let result = service.verify("not.a.token", TokenKind::Access);

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let issuer = TokenService::new(&create_test_config());
        let other = AuthConfig {
            secret: "another-secret".to_string(),
            ..create_test_config()
        };
        let verifier = TokenService::new(&other);

        let token = issuer.issue_session("user1").unwrap();
        let result = verifier.verify(&token, TokenKind::Session);

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        // Expired two minutes ago, past the default leeway.
        let config = AuthConfig {
            access_ttl_secs: -120,
            ..create_test_config()
        };
        let service = TokenService::new(&config);

        let token = service.issue("user1", TokenKind::Access).unwrap();
        let result = service.verify(&token, TokenKind::Access);

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_refresh_access_issues_new_access_token() {
        let service = TokenService::new(&create_test_config());

        let pair = service.issue_pair("user1").unwrap();
        let access = service.refresh_access(&pair.refresh).unwrap();
        let claims = service.verify(&access, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "user1");
    }

    #[test]
    fn test_refresh_access_rejects_access_token() {
        let service = TokenService::new(&create_test_config());

        let pair = service.issue_pair("user1").unwrap();
        let result = service.refresh_access(&pair.access);

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
