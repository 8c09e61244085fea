//! PostgreSQL-backed role repository.

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use discepto_application::{NewRole, PresetRoleSeed, RoleRepository};
use discepto_core::{AppError, AppResult};
use discepto_domain::{PermissionSet, Role, RoleDomainId, RoleId, UserId};

use crate::role_store::{self, RoleRow};
use crate::transaction::{Executor, exec_tx};

/// PostgreSQL implementation of the role repository port.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn acquire(&self) -> AppResult<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!("failed to acquire connection: {error}"))
        })
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list_roles(&self, domain: RoleDomainId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, domain, name, preset
            FROM roles
            WHERE domain = $1
            ORDER BY id
            "#,
        )
        .bind(domain.as_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list roles of domain {domain}: {error}"))
        })?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn list_user_roles(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.domain, roles.name, roles.preset
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1 AND roles.domain = $2
            ORDER BY roles.id
            "#,
        )
        .bind(user_id.as_i32())
        .bind(domain.as_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list roles of user {user_id} in domain {domain}: {error}"
            ))
        })?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn find_role(&self, domain: RoleDomainId, name: &str) -> AppResult<Role> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, domain, name, preset
            FROM roles
            WHERE domain = $1 AND name = $2
            "#,
        )
        .bind(domain.as_i32())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role '{name}': {error}")))?
        .map(Role::from)
        .ok_or_else(|| AppError::NotFound(format!("role '{name}' in domain {domain}")))
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<PermissionSet> {
        let mut connection = self.acquire().await?;
        role_store::role_permissions(&mut connection, role_id).await
    }

    async fn create_role(&self, role: NewRole, permissions: &PermissionSet) -> AppResult<RoleId> {
        let permissions = permissions.clone();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                role_store::insert_role(
                    connection,
                    role.domain,
                    &role.name,
                    role.preset,
                    &permissions,
                )
                .await
            }
            .boxed()
        })
        .await
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &PermissionSet,
    ) -> AppResult<()> {
        let permissions = permissions.clone();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                role_store::lock_role(connection, role_id).await?;
                role_store::replace_role_permissions(connection, role_id, &permissions).await
            }
            .boxed()
        })
        .await
    }

    async fn delete_role(&self, role_id: RoleId, ceiling: &PermissionSet) -> AppResult<()> {
        let ceiling = ceiling.clone();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                role_store::lock_role_within(connection, role_id, &ceiling).await?;
                sqlx::query("DELETE FROM roles WHERE id = $1")
                    .bind(role_id.as_i32())
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!("failed to delete role {role_id}: {error}"))
                    })?;

                Ok(())
            }
            .boxed()
        })
        .await
    }

    async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()> {
        let ceiling = ceiling.clone();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                role_store::lock_role_within(connection, role_id, &ceiling).await?;
                role_store::assign_role(connection, user_id, role_id).await
            }
            .boxed()
        })
        .await
    }

    async fn unassign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()> {
        let ceiling = ceiling.clone();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                role_store::lock_role_within(connection, role_id, &ceiling).await?;
                sqlx::query(
                    r#"
                    DELETE FROM user_roles
                    WHERE user_id = $1 AND role_id = $2
                    "#,
                )
                .bind(user_id.as_i32())
                .bind(role_id.as_i32())
                .execute(&mut *connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!(
                        "failed to unassign role {role_id} from user {user_id}: {error}"
                    ))
                })?;

                Ok(())
            }
            .boxed()
        })
        .await
    }

    async fn unassign_all_roles(&self, user_id: UserId, domain: RoleDomainId) -> AppResult<()> {
        let mut connection = self.acquire().await?;
        role_store::unassign_all_roles(&mut connection, user_id, domain).await
    }

    async fn list_user_permissions(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<PermissionSet> {
        let mut connection = self.acquire().await?;
        role_store::list_user_permissions(&mut connection, user_id, domain).await
    }

    async fn ensure_preset_roles(
        &self,
        domain: RoleDomainId,
        seeds: &[PresetRoleSeed],
    ) -> AppResult<()> {
        let seeds = seeds.to_vec();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move { role_store::ensure_preset_roles(connection, domain, &seeds).await }
                .boxed()
        })
        .await
    }
}
