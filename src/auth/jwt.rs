use crate::config::JwtConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, username: String, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now();
        Claims {
            sub: user_id.to_string(),
            username,
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn create_token(claims: &Claims, secret: &str) -> Result<String, anyhow::Error> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

pub fn verify_token(
    token: &str,
    secret: &str,
    expected: TokenType,
) -> Result<Claims, anyhow::Error> {
    let validation = Validation::default();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;
    if token_data.claims.token_type != expected {
        anyhow::bail!("expected a {:?} token", expected);
    }
    Ok(token_data.claims)
}

pub fn issue_access_token(
    user_id: i64,
    username: &str,
    config: &JwtConfig,
) -> Result<String, anyhow::Error> {
    let claims = Claims::new(
        user_id,
        username.to_string(),
        TokenType::Access,
        Duration::hours(config.expiration_hours),
    );
    create_token(&claims, &config.secret)
}

pub fn issue_token_pair(
    user_id: i64,
    username: &str,
    config: &JwtConfig,
) -> Result<TokenPair, anyhow::Error> {
    let refresh = Claims::new(
        user_id,
        username.to_string(),
        TokenType::Refresh,
        Duration::days(config.refresh_expiration_days),
    );
    Ok(TokenPair {
        access: issue_access_token(user_id, username, config)?,
        refresh: create_token(&refresh, &config.secret)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            refresh_expiration_days: 1,
        }
    }

    #[test]
    fn access_token_carries_user() {
        let pair = issue_token_pair(42, "reader", &config()).unwrap();
        let claims = verify_token(&pair.access, "test-secret", TokenType::Access).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.username, "reader");
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let pair = issue_token_pair(1, "reader", &config()).unwrap();
        assert!(verify_token(&pair.refresh, "test-secret", TokenType::Access).is_err());
        assert!(verify_token(&pair.access, "test-secret", TokenType::Refresh).is_err());
        assert!(verify_token(&pair.refresh, "test-secret", TokenType::Refresh).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let pair = issue_token_pair(1, "reader", &config()).unwrap();
        assert!(verify_token(&pair.access, "other-secret", TokenType::Access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims::new(1, "reader".into(), TokenType::Access, Duration::hours(-2));
        let token = create_token(&claims, "test-secret").unwrap();
        assert!(verify_token(&token, "test-secret", TokenType::Access).is_err());
    }
}
