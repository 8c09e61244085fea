//! Role rows, permission rows and assignments as connection-level
//! primitives, shared by every adapter that writes roles inside its own
//! transaction.

use sqlx::{FromRow, PgConnection};

use discepto_application::PresetRoleSeed;
use discepto_core::{AppError, AppResult};
use discepto_domain::{
    PermissionSet, PresetRole, Role, RoleDomainId, RoleDomainKind, RoleId, UserId,
};

use crate::transaction::conflict_or_internal;

#[derive(Debug, FromRow)]
pub(crate) struct RoleRow {
    pub(crate) id: i32,
    pub(crate) domain: i32,
    pub(crate) name: String,
    pub(crate) preset: bool,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::new(row.id),
            domain: RoleDomainId::new(row.domain),
            name: row.name,
            preset: row.preset,
        }
    }
}

fn permission_set(names: Vec<String>) -> AppResult<PermissionSet> {
    PermissionSet::from_names(names)
        .map_err(|error| AppError::Internal(format!("corrupted permission row: {error}")))
}

/// Allocates a fresh role domain.
pub(crate) async fn insert_role_domain(
    connection: &mut PgConnection,
    kind: RoleDomainKind,
) -> AppResult<RoleDomainId> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO roledomains (domain_type)
        VALUES ($1)
        RETURNING id
        "#,
    )
    .bind(kind.as_str())
    .fetch_one(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to allocate role domain: {error}")))?;

    Ok(RoleDomainId::new(id))
}

/// Inserts a role and its permission rows.
pub(crate) async fn insert_role(
    connection: &mut PgConnection,
    domain: RoleDomainId,
    name: &str,
    preset: bool,
    permissions: &PermissionSet,
) -> AppResult<RoleId> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO roles (domain, name, preset)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(domain.as_i32())
    .bind(name)
    .bind(preset)
    .fetch_one(&mut *connection)
    .await
    .map_err(|error| conflict_or_internal(error, &format!("role '{name}'"), "create role"))?;

    let role_id = RoleId::new(id);
    insert_role_permissions(connection, role_id, permissions).await?;
    Ok(role_id)
}

async fn insert_role_permissions(
    connection: &mut PgConnection,
    role_id: RoleId,
    permissions: &PermissionSet,
) -> AppResult<()> {
    let names: Vec<String> = permissions
        .list()
        .iter()
        .map(|permission| permission.as_str().to_owned())
        .collect();

    sqlx::query(
        r#"
        INSERT INTO role_perms (role_id, permission)
        SELECT $1, permission
        FROM UNNEST($2::TEXT[]) AS permission
        "#,
    )
    .bind(role_id.as_i32())
    .bind(&names)
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to insert permissions of role {role_id}: {error}"
        ))
    })?;

    Ok(())
}

/// Loads the permission rows of a role.
pub(crate) async fn role_permissions(
    connection: &mut PgConnection,
    role_id: RoleId,
) -> AppResult<PermissionSet> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT permission
        FROM role_perms
        WHERE role_id = $1
        "#,
    )
    .bind(role_id.as_i32())
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to list permissions of role {role_id}: {error}"
        ))
    })?;

    permission_set(names)
}

/// Locks the role row until the surrounding transaction ends.
pub(crate) async fn lock_role(connection: &mut PgConnection, role_id: RoleId) -> AppResult<()> {
    sqlx::query_scalar::<_, i32>(
        r#"
        SELECT id
        FROM roles
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(role_id.as_i32())
    .fetch_optional(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to lock role {role_id}: {error}")))?
    .ok_or_else(|| AppError::NotFound(format!("role {role_id}")))?;

    Ok(())
}

/// Locks the role and fails with `PermissionDenied` when it grants anything
/// outside `ceiling`. Must run inside the transaction of the guarded write.
pub(crate) async fn lock_role_within(
    connection: &mut PgConnection,
    role_id: RoleId,
    ceiling: &PermissionSet,
) -> AppResult<()> {
    lock_role(connection, role_id).await?;
    let permissions = role_permissions(connection, role_id).await?;
    ceiling.require_all(&permissions)
}

/// Replaces the permission rows of a role.
pub(crate) async fn replace_role_permissions(
    connection: &mut PgConnection,
    role_id: RoleId,
    permissions: &PermissionSet,
) -> AppResult<()> {
    sqlx::query("DELETE FROM role_perms WHERE role_id = $1")
        .bind(role_id.as_i32())
        .execute(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to clear permissions of role {role_id}: {error}"
            ))
        })?;

    insert_role_permissions(connection, role_id, permissions).await
}

/// Ensures the domain row and its preset roles exist with the seeded
/// permissions. Presets are created in seed order.
pub(crate) async fn ensure_preset_roles(
    connection: &mut PgConnection,
    domain: RoleDomainId,
    seeds: &[PresetRoleSeed],
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO roledomains (id, domain_type)
        VALUES ($1, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(domain.as_i32())
    .bind(domain.kind().as_str())
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!("failed to ensure role domain {domain}: {error}"))
    })?;

    for seed in seeds {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO roles (domain, name, preset)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (domain, name) DO UPDATE SET preset = TRUE
            RETURNING id
            "#,
        )
        .bind(domain.as_i32())
        .bind(seed.role.name())
        .fetch_one(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to ensure preset role '{}': {error}",
                seed.role.name()
            ))
        })?;

        replace_role_permissions(connection, RoleId::new(id), &seed.permissions).await?;
    }

    Ok(())
}

/// Assigns a preset role of a domain. Assigning twice is a no-op.
pub(crate) async fn assign_preset_role(
    connection: &mut PgConnection,
    user_id: UserId,
    domain: RoleDomainId,
    preset: PresetRole,
) -> AppResult<()> {
    let role_id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT id
        FROM roles
        WHERE domain = $1 AND name = $2
        "#,
    )
    .bind(domain.as_i32())
    .bind(preset.name())
    .fetch_optional(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to find preset role '{}': {error}",
            preset.name()
        ))
    })?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "preset role '{}' in domain {domain}",
            preset.name()
        ))
    })?;

    assign_role(connection, user_id, RoleId::new(role_id)).await
}

/// Assigns a role. Assigning twice is a no-op.
pub(crate) async fn assign_role(
    connection: &mut PgConnection,
    user_id: UserId,
    role_id: RoleId,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, role_id) DO NOTHING
        "#,
    )
    .bind(user_id.as_i32())
    .bind(role_id.as_i32())
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to assign role {role_id} to user {user_id}: {error}"
        ))
    })?;

    Ok(())
}

/// Removes a preset role of a domain from a user, if held.
pub(crate) async fn unassign_preset_role(
    connection: &mut PgConnection,
    user_id: UserId,
    domain: RoleDomainId,
    preset: PresetRole,
) -> AppResult<()> {
    sqlx::query(
        r#"
        DELETE FROM user_roles
        USING roles
        WHERE user_roles.role_id = roles.id
          AND user_roles.user_id = $1
          AND roles.domain = $2
          AND roles.name = $3
        "#,
    )
    .bind(user_id.as_i32())
    .bind(domain.as_i32())
    .bind(preset.name())
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to remove preset role '{}' from user {user_id}: {error}",
            preset.name()
        ))
    })?;

    Ok(())
}

/// Removes every assignment the user holds within a domain.
pub(crate) async fn unassign_all_roles(
    connection: &mut PgConnection,
    user_id: UserId,
    domain: RoleDomainId,
) -> AppResult<()> {
    sqlx::query(
        r#"
        DELETE FROM user_roles
        USING roles
        WHERE user_roles.role_id = roles.id
          AND user_roles.user_id = $1
          AND roles.domain = $2
        "#,
    )
    .bind(user_id.as_i32())
    .bind(domain.as_i32())
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to remove roles of user {user_id} in domain {domain}: {error}"
        ))
    })?;

    Ok(())
}

/// Loads the distinct permission names granted to a user in a domain.
pub(crate) async fn list_user_permissions(
    connection: &mut PgConnection,
    user_id: UserId,
    domain: RoleDomainId,
) -> AppResult<PermissionSet> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT role_perms.permission
        FROM user_roles
        INNER JOIN roles ON roles.id = user_roles.role_id
        INNER JOIN role_perms ON role_perms.role_id = roles.id
        WHERE user_roles.user_id = $1 AND roles.domain = $2
        "#,
    )
    .bind(user_id.as_i32())
    .bind(domain.as_i32())
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to load permissions of user {user_id} in domain {domain}: {error}"
        ))
    })?;

    permission_set(names)
}

/// Returns whether the user holds a preset role of a domain.
pub(crate) async fn holds_preset_role(
    connection: &mut PgConnection,
    user_id: UserId,
    domain: RoleDomainId,
    preset: PresetRole,
) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1 AND roles.domain = $2 AND roles.name = $3
        )
        "#,
    )
    .bind(user_id.as_i32())
    .bind(domain.as_i32())
    .bind(preset.name())
    .fetch_one(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to check preset role '{}' of user {user_id}: {error}",
            preset.name()
        ))
    })
}
