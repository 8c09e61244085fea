//! PostgreSQL-backed user repository.

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::{FromRow, PgPool};

use discepto_application::{NewUser, RegistrationGrants, UserRepository};
use discepto_core::{AppError, AppResult};
use discepto_domain::{PresetRole, PublicUser, RoleDomainId, User, UserId};

use crate::role_store;
use crate::transaction::{Executor, conflict_or_internal, exec_tx};

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, user: NewUser, grants: &RegistrationGrants) -> AppResult<User> {
        let grants = grants.clone();
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                // Serializes registrations so exactly one user is ever first.
                sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!("failed to lock users table: {error}"))
                    })?;

                let first_user =
                    sqlx::query_scalar::<_, bool>("SELECT NOT EXISTS (SELECT 1 FROM users)")
                        .fetch_one(&mut *connection)
                        .await
                        .map_err(|error| {
                            AppError::Internal(format!("failed to count users: {error}"))
                        })?;

                let row = sqlx::query_as::<_, UserRow>(
                    r#"
                    INSERT INTO users (name, email, passwd_hash)
                    VALUES ($1, LOWER($2), $3)
                    RETURNING id, name, email
                    "#,
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .fetch_one(&mut *connection)
                .await
                .map_err(|error| {
                    conflict_or_internal(error, "an account with this email", "create user")
                })?;
                let created = User::from(row);

                let first_grants: &[PresetRole] = if first_user {
                    grants.first_user.as_slice()
                } else {
                    &[]
                };
                for preset in first_grants.iter().chain(grants.every_user.iter()) {
                    role_store::assign_preset_role(
                        connection,
                        created.id,
                        RoleDomainId::GLOBAL,
                        *preset,
                    )
                    .await?;
                }

                Ok(created)
            }
            .boxed()
        })
        .await
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user {user_id}: {error}")))?;

        Ok(row.map(User::from))
    }

    async fn find_public_user(&self, user_id: UserId) -> AppResult<Option<PublicUser>> {
        let row = sqlx::query_as::<_, (i32, String, i64)>(
            r#"
            SELECT
                users.id,
                users.name,
                (
                    SELECT COUNT(*)
                    FROM votes
                    INNER JOIN essays ON essays.id = votes.essay_id
                    WHERE essays.attributed_to_id = users.id AND votes.vote_type = 1
                ) AS karma
            FROM users
            WHERE users.id = $1
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find profile of user {user_id}: {error}"))
        })?;

        Ok(row.map(|(id, name, karma)| PublicUser {
            id: UserId::new(id),
            name,
            karma,
        }))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn delete_user(&self, user_id: UserId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete user {user_id}: {error}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
