//! PostgreSQL-backed community repository.
//!
//! Lifecycle writes (creation, join, leave, rejoin) run in one transaction
//! each together with the role assignments they imply. Joining an existing
//! membership falls through to rejoin inside the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use sqlx::{FromRow, PgConnection, PgPool};

use discepto_application::{PresetRoleSeed, SubdisceptoRepository};
use discepto_core::{AppError, AppResult};
use discepto_domain::{
    Member, Membership, MembershipChange, NewSubdiscepto, PresetRole, Role, RoleDomainId,
    RoleDomainKind, Subdiscepto, SubdisceptoName, SubdisceptoSettings, SubdisceptoSummary, UserId,
};

use crate::role_store::{self, RoleRow};
use crate::transaction::{Executor, conflict_or_internal, exec_tx};

mod lifecycle;
mod lookup;

/// PostgreSQL implementation of the community repository port.
#[derive(Clone)]
pub struct PostgresSubdisceptoRepository {
    pool: PgPool,
}

impl PostgresSubdisceptoRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubdisceptoRow {
    name: String,
    description: String,
    min_length: i32,
    questions_required: bool,
    nsfw: bool,
    public: bool,
    roledomain_id: i32,
}

impl TryFrom<SubdisceptoRow> for Subdiscepto {
    type Error = AppError;

    fn try_from(row: SubdisceptoRow) -> Result<Self, Self::Error> {
        Ok(Self {
            name: stored_name(row.name)?,
            description: row.description,
            min_length: row.min_length,
            questions_required: row.questions_required,
            nsfw: row.nsfw,
            public: row.public,
            role_domain: RoleDomainId::new(row.roledomain_id),
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    subdiscepto: String,
    user_id: i32,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            subdiscepto: stored_name(row.subdiscepto)?,
            user_id: UserId::new(row.user_id),
            joined_at: row.joined_at,
            left_at: row.left_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MemberRow {
    user_id: i32,
    name: String,
    left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct MemberRoleRow {
    user_id: i32,
    #[sqlx(flatten)]
    role: RoleRow,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    name: String,
    description: String,
    public: bool,
    members_count: i64,
    is_member: bool,
}

fn stored_name(name: String) -> AppResult<SubdisceptoName> {
    SubdisceptoName::new(name)
        .map_err(|error| AppError::Internal(format!("corrupted subdiscepto name: {error}")))
}

#[async_trait]
impl SubdisceptoRepository for PostgresSubdisceptoRepository {
    async fn find_subdiscepto(&self, name: &SubdisceptoName) -> AppResult<Subdiscepto> {
        self.find_subdiscepto_impl(name).await
    }

    async fn create_subdiscepto(
        &self,
        creator: UserId,
        subdiscepto: NewSubdiscepto,
        seeds: &[PresetRoleSeed],
        creator_roles: &[PresetRole],
    ) -> AppResult<Subdiscepto> {
        self.create_subdiscepto_impl(creator, subdiscepto, seeds, creator_roles)
            .await
    }

    async fn update_subdiscepto(
        &self,
        name: &SubdisceptoName,
        settings: &SubdisceptoSettings,
    ) -> AppResult<()> {
        self.update_subdiscepto_impl(name, settings).await
    }

    async fn delete_subdiscepto(&self, subdiscepto: &Subdiscepto) -> AppResult<()> {
        self.delete_subdiscepto_impl(subdiscepto).await
    }

    async fn find_membership(
        &self,
        name: &SubdisceptoName,
        user_id: UserId,
    ) -> AppResult<Option<Membership>> {
        self.find_membership_impl(name, user_id).await
    }

    async fn list_members(&self, subdiscepto: &Subdiscepto) -> AppResult<Vec<Member>> {
        self.list_members_impl(subdiscepto).await
    }

    async fn list_subdisceptos(
        &self,
        viewer: Option<UserId>,
    ) -> AppResult<Vec<SubdisceptoSummary>> {
        self.list_subdisceptos_impl(viewer).await
    }

    async fn list_user_subdisceptos(&self, user_id: UserId) -> AppResult<Vec<SubdisceptoName>> {
        self.list_user_subdisceptos_impl(user_id).await
    }

    async fn join_subdiscepto(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
    ) -> AppResult<MembershipChange> {
        self.join_subdiscepto_impl(subdiscepto, user_id).await
    }

    async fn leave_subdiscepto(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
        keep_rejoin_marker: bool,
    ) -> AppResult<()> {
        self.leave_subdiscepto_impl(subdiscepto, user_id, keep_rejoin_marker)
            .await
    }
}

#[cfg(test)]
mod tests;
