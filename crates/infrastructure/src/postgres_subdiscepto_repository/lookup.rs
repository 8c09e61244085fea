use std::collections::BTreeMap;

use super::*;

impl PostgresSubdisceptoRepository {
    pub(super) async fn find_subdiscepto_impl(
        &self,
        name: &SubdisceptoName,
    ) -> AppResult<Subdiscepto> {
        let row = sqlx::query_as::<_, SubdisceptoRow>(
            r#"
            SELECT name, description, min_length, questions_required, nsfw, public, roledomain_id
            FROM subdisceptos
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find subdiscepto '{name}': {error}"))
        })?
        .ok_or_else(|| AppError::NotFound(format!("subdiscepto '{name}'")))?;

        Subdiscepto::try_from(row)
    }

    pub(super) async fn find_membership_impl(
        &self,
        name: &SubdisceptoName,
        user_id: UserId,
    ) -> AppResult<Option<Membership>> {
        sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT subdiscepto, user_id, joined_at, left_at
            FROM subdiscepto_users
            WHERE subdiscepto = $1 AND user_id = $2
            "#,
        )
        .bind(name.as_str())
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find membership of user {user_id} in '{name}': {error}"
            ))
        })?
        .map(Membership::try_from)
        .transpose()
    }

    pub(super) async fn list_members_impl(
        &self,
        subdiscepto: &Subdiscepto,
    ) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT subdiscepto_users.user_id, users.name, subdiscepto_users.left_at
            FROM subdiscepto_users
            INNER JOIN users ON users.id = subdiscepto_users.user_id
            WHERE subdiscepto_users.subdiscepto = $1
            ORDER BY subdiscepto_users.joined_at, subdiscepto_users.user_id
            "#,
        )
        .bind(subdiscepto.name.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list members of '{}': {error}",
                subdiscepto.name
            ))
        })?;

        let role_rows = sqlx::query_as::<_, MemberRoleRow>(
            r#"
            SELECT user_roles.user_id, roles.id, roles.domain, roles.name, roles.preset
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE roles.domain = $1
            ORDER BY roles.id
            "#,
        )
        .bind(subdiscepto.role_domain.as_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list member roles of '{}': {error}",
                subdiscepto.name
            ))
        })?;

        let mut roles_by_user: BTreeMap<i32, Vec<Role>> = BTreeMap::new();
        for row in role_rows {
            roles_by_user
                .entry(row.user_id)
                .or_default()
                .push(Role::from(row.role));
        }

        Ok(members
            .into_iter()
            .map(|member| Member {
                user_id: UserId::new(member.user_id),
                name: member.name,
                left_at: member.left_at,
                roles: roles_by_user.remove(&member.user_id).unwrap_or_default(),
            })
            .collect())
    }

    pub(super) async fn list_subdisceptos_impl(
        &self,
        viewer: Option<UserId>,
    ) -> AppResult<Vec<SubdisceptoSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                subdisceptos.name,
                subdisceptos.description,
                subdisceptos.public,
                (
                    SELECT COUNT(*)
                    FROM subdiscepto_users
                    WHERE subdiscepto_users.subdiscepto = subdisceptos.name
                      AND subdiscepto_users.left_at IS NULL
                ) AS members_count,
                EXISTS (
                    SELECT 1
                    FROM subdiscepto_users
                    WHERE subdiscepto_users.subdiscepto = subdisceptos.name
                      AND subdiscepto_users.user_id = $1
                      AND subdiscepto_users.left_at IS NULL
                ) AS is_member
            FROM subdisceptos
            WHERE subdisceptos.public
               OR EXISTS (
                    SELECT 1
                    FROM subdiscepto_users
                    WHERE subdiscepto_users.subdiscepto = subdisceptos.name
                      AND subdiscepto_users.user_id = $1
                      AND subdiscepto_users.left_at IS NULL
               )
            ORDER BY subdisceptos.name
            "#,
        )
        .bind(viewer.map(|user_id| user_id.as_i32()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list subdisceptos: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(SubdisceptoSummary {
                    name: stored_name(row.name)?,
                    description: row.description,
                    public: row.public,
                    members_count: row.members_count,
                    is_member: row.is_member,
                })
            })
            .collect()
    }

    pub(super) async fn list_user_subdisceptos_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<SubdisceptoName>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT subdiscepto
            FROM subdiscepto_users
            WHERE user_id = $1 AND left_at IS NULL
            ORDER BY subdiscepto
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list subdisceptos of user {user_id}: {error}"
            ))
        })?;

        names.into_iter().map(stored_name).collect()
    }
}
