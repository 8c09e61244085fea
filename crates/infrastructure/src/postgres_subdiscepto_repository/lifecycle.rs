use super::*;

impl PostgresSubdisceptoRepository {
    pub(super) async fn create_subdiscepto_impl(
        &self,
        creator: UserId,
        subdiscepto: NewSubdiscepto,
        seeds: &[PresetRoleSeed],
        creator_roles: &[PresetRole],
    ) -> AppResult<Subdiscepto> {
        let seeds = seeds.to_vec();
        let creator_roles = creator_roles.to_vec();

        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                let role_domain =
                    role_store::insert_role_domain(connection, RoleDomainKind::Subdiscepto)
                        .await?;

                let NewSubdiscepto { name, settings } = subdiscepto;
                sqlx::query(
                    r#"
                    INSERT INTO subdisceptos (
                        name,
                        description,
                        min_length,
                        questions_required,
                        nsfw,
                        public,
                        roledomain_id
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(name.as_str())
                .bind(&settings.description)
                .bind(settings.min_length)
                .bind(settings.questions_required)
                .bind(settings.nsfw)
                .bind(settings.public)
                .bind(role_domain.as_i32())
                .execute(&mut *connection)
                .await
                .map_err(|error| {
                    conflict_or_internal(
                        error,
                        &format!("subdiscepto '{name}'"),
                        "create subdiscepto",
                    )
                })?;

                insert_membership(connection, &name, creator).await?;
                role_store::ensure_preset_roles(connection, role_domain, &seeds).await?;
                for preset in creator_roles {
                    role_store::assign_preset_role(connection, creator, role_domain, preset)
                        .await?;
                }

                Ok(Subdiscepto {
                    name,
                    description: settings.description,
                    min_length: settings.min_length,
                    questions_required: settings.questions_required,
                    nsfw: settings.nsfw,
                    public: settings.public,
                    role_domain,
                })
            }
            .boxed()
        })
        .await
    }

    pub(super) async fn update_subdiscepto_impl(
        &self,
        name: &SubdisceptoName,
        settings: &SubdisceptoSettings,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subdisceptos
            SET description = $2,
                min_length = $3,
                questions_required = $4,
                nsfw = $5,
                public = $6
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .bind(&settings.description)
        .bind(settings.min_length)
        .bind(settings.questions_required)
        .bind(settings.nsfw)
        .bind(settings.public)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update subdiscepto '{name}': {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("subdiscepto '{name}'")));
        }

        Ok(())
    }

    pub(super) async fn delete_subdiscepto_impl(&self, subdiscepto: &Subdiscepto) -> AppResult<()> {
        let name = subdiscepto.name.clone();
        let role_domain = subdiscepto.role_domain;

        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                sqlx::query("DELETE FROM subdisceptos WHERE name = $1")
                    .bind(name.as_str())
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!(
                            "failed to delete subdiscepto '{name}': {error}"
                        ))
                    })?;

                // Roles, permission rows and assignments cascade from the domain.
                sqlx::query("DELETE FROM roledomains WHERE id = $1")
                    .bind(role_domain.as_i32())
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!(
                            "failed to delete role domain {role_domain}: {error}"
                        ))
                    })?;

                Ok(())
            }
            .boxed()
        })
        .await
    }

    pub(super) async fn join_subdiscepto_impl(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
    ) -> AppResult<MembershipChange> {
        let name = subdiscepto.name.clone();
        let role_domain = subdiscepto.role_domain;

        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                let inserted = sqlx::query_scalar::<_, i32>(
                    r#"
                    INSERT INTO subdiscepto_users (subdiscepto, user_id)
                    VALUES ($1, $2)
                    ON CONFLICT (subdiscepto, user_id) DO NOTHING
                    RETURNING user_id
                    "#,
                )
                .bind(name.as_str())
                .bind(user_id.as_i32())
                .fetch_optional(&mut *connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!(
                        "failed to add user {user_id} to '{name}': {error}"
                    ))
                })?;

                if inserted.is_none() {
                    rejoin(connection, &name, role_domain, user_id).await?;
                    return Ok(MembershipChange::Rejoined);
                }

                role_store::assign_preset_role(
                    connection,
                    user_id,
                    role_domain,
                    PresetRole::Common,
                )
                .await?;
                Ok(MembershipChange::Joined)
            }
            .boxed()
        })
        .await
    }

    pub(super) async fn leave_subdiscepto_impl(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
        keep_rejoin_marker: bool,
    ) -> AppResult<()> {
        let name = subdiscepto.name.clone();
        let role_domain = subdiscepto.role_domain;

        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                let result = sqlx::query(
                    r#"
                    UPDATE subdiscepto_users
                    SET left_at = now()
                    WHERE subdiscepto = $1 AND user_id = $2 AND left_at IS NULL
                    "#,
                )
                .bind(name.as_str())
                .bind(user_id.as_i32())
                .execute(&mut *connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!(
                        "failed to close membership of user {user_id} in '{name}': {error}"
                    ))
                })?;

                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound(format!(
                        "membership of user {user_id} in subdiscepto '{name}'"
                    )));
                }

                role_store::unassign_all_roles(connection, user_id, role_domain).await?;
                if keep_rejoin_marker {
                    role_store::assign_preset_role(
                        connection,
                        user_id,
                        role_domain,
                        PresetRole::CommonAfterRejoin,
                    )
                    .await?;
                }

                Ok(())
            }
            .boxed()
        })
        .await
    }
}

/// Reopens an existing membership row and swaps a rejoin marker for `common`.
async fn rejoin(
    connection: &mut PgConnection,
    name: &SubdisceptoName,
    role_domain: RoleDomainId,
    user_id: UserId,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE subdiscepto_users
        SET left_at = NULL
        WHERE subdiscepto = $1 AND user_id = $2
        "#,
    )
    .bind(name.as_str())
    .bind(user_id.as_i32())
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to reopen membership of user {user_id} in '{name}': {error}"
        ))
    })?;

    let marked = role_store::holds_preset_role(
        connection,
        user_id,
        role_domain,
        PresetRole::CommonAfterRejoin,
    )
    .await?;
    if marked {
        role_store::unassign_preset_role(
            connection,
            user_id,
            role_domain,
            PresetRole::CommonAfterRejoin,
        )
        .await?;
        role_store::assign_preset_role(connection, user_id, role_domain, PresetRole::Common)
            .await?;
    }

    Ok(())
}
