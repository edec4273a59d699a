use crate::auth::{active_user, verify_token, TokenType};
use crate::config::Config;
use crate::db::DbPool;
use crate::error::ApiError;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

/// Bearer-token caller whose account row still exists and is active.
///
/// Every extraction re-reads the user row, so deactivating an account
/// invalidates its outstanding access tokens on the next request.
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);
        let config = req.app_data::<web::Data<Config>>().cloned();
        let pool = req.app_data::<web::Data<DbPool>>().cloned();

        Box::pin(async move {
            let Some(token) = token else {
                return Err(ApiError::Unauthorized(
                    "Authentication credentials were not provided.".to_string(),
                ));
            };
            let (Some(config), Some(pool)) = (config, pool) else {
                return Err(ApiError::Internal(anyhow::anyhow!(
                    "Config or database pool missing from app data"
                )));
            };

            let claims = verify_token(&token, &config.jwt.secret, TokenType::Access).map_err(|e| {
                log::warn!("Rejected bearer token: {}", e);
                ApiError::Unauthorized("Given token not valid for any token type".to_string())
            })?;
            let user_id = claims
                .user_id()
                .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;

            let user = active_user(pool.get_ref(), user_id).await?;
            Ok(AuthenticatedUser {
                user_id: user.id,
                username: user.username,
            })
        })
    }
}
