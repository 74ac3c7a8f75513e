use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;

use super::Claims;

/// Issues and validates bearer tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::days(config.expiry_days),
        }
    }

    /// Issue a token for `user_id`
    pub fn issue(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Auth(format!("Not authorized, token failed: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            issuer: None,
            audience: None,
            expiry_days: 30,
        }
    }

    fn create_test_token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_then_validate() {
        let service = TokenService::new(&create_test_config());

        let token = service.issue("user-123").unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.user_id(), "user-123");
        assert!(!claims.is_expired());
        let days = (claims.exp - claims.iat) / 86_400;
        assert_eq!(days, 30);
    }

    #[test]
    fn test_invalid_token() {
        let service = TokenService::new(&create_test_config());

        let result = service.validate("invalid-token");
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_expired_token() {
        let config = create_test_config();
        let service = TokenService::new(&config);

        let claims = Claims {
            sub: "user-123".to_string(),
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
            iss: None,
            aud: None,
        };

        let token = create_test_token(&claims, &config.secret);
        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service = TokenService::new(&create_test_config());
        let claims = Claims {
            sub: "user-123".to_string(),
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
            iss: None,
            aud: None,
        };

        let token = create_test_token(&claims, "another-secret");
        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_issuer_and_audience_round_trip() {
        let config = JwtConfig {
            issuer: Some("ward-connect".to_string()),
            audience: Some("mobile".to_string()),
            ..create_test_config()
        };
        let service = TokenService::new(&config);

        let token = service.issue("u1").unwrap();
        assert!(service.validate(&token).is_ok());

        let other = TokenService::new(&JwtConfig {
            audience: Some("web".to_string()),
            ..config
        });
        assert!(other.validate(&token).is_err());
    }
}
