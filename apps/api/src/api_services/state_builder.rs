use std::sync::Arc;
use std::time::Duration;

use discepto_application::{Discepto, DisceptoPorts};
use discepto_core::AppResult;
use discepto_infrastructure::{
    Argon2PasswordHasher, PostgresEssayRepository, PostgresNotificationService,
    PostgresRoleRepository, PostgresSubdisceptoRepository, PostgresUserRepository,
};
use sqlx::PgPool;

use crate::state::AppState;

pub async fn build_app_state(pool: PgPool, request_timeout: Duration) -> AppResult<AppState> {
    let discepto = Discepto::new(DisceptoPorts {
        roles: Arc::new(PostgresRoleRepository::new(pool.clone())),
        subdisceptos: Arc::new(PostgresSubdisceptoRepository::new(pool.clone())),
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        essays: Arc::new(PostgresEssayRepository::new(pool.clone())),
        notifications: Arc::new(PostgresNotificationService::new(pool)),
        password_hasher: Arc::new(Argon2PasswordHasher::new()),
    });
    discepto.bootstrap().await?;

    Ok(AppState {
        discepto,
        request_timeout,
    })
}
