use serde_json::json;
use sqlx::AnyPool;
use tracing::{info, warn};

use super::{ServiceError, ServiceResult};
use crate::auth::{generate_jwt, verify_password, Claims};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::database::{QuerySpec, UnitOfWork};
use crate::dto::users::{LoginRequest, TokenResponse, UserView};
use crate::dto::Validate;

pub struct AuthService {
    pool: AnyPool,
    security: SecurityConfig,
    tenant: String,
}

impl AuthService {
    pub fn new(pool: AnyPool, security: SecurityConfig, tenant: impl Into<String>) -> Self {
        Self {
            pool,
            security,
            tenant: tenant.into(),
        }
    }

    /// Exchange username and password for a signed token
    pub async fn login(&self, dto: LoginRequest) -> ServiceResult<TokenResponse> {
        dto.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let spec = QuerySpec::new()
            .predicate(json!({ "username": dto.username }))
            .include("image")
            .no_tracking();
        let loaded = uow.repository::<User>().query(Some(spec)).fetch_optional().await?;

        let Some(loaded) = loaded.filter(|u| verify_password(&dto.password, &u.password)) else {
            warn!("Failed login for '{}' in tenant '{}'", dto.username, self.tenant);
            return Err(ServiceError::Unauthorized("Invalid username or password".to_string()));
        };

        let claims = Claims::new(loaded.entity(), &self.tenant, &self.security);
        let token = generate_jwt(&claims, &self.security)?;
        let image = loaded.related("image")?;
        info!("User '{}' logged in to tenant '{}'", claims.sub, self.tenant);

        Ok(TokenResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: claims.exp - claims.iat,
            user: UserView::new(loaded.into_inner(), image),
        })
    }
}
