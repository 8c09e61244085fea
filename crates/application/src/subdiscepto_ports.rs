use async_trait::async_trait;

use discepto_core::AppResult;
use discepto_domain::{
    Member, Membership, MembershipChange, NewSubdiscepto, PresetRole, Subdiscepto,
    SubdisceptoName, SubdisceptoSettings, SubdisceptoSummary, UserId,
};

use crate::PresetRoleSeed;

/// Repository port for communities and their membership lifecycle.
///
/// Lifecycle writes run in one transaction each, including the role
/// assignments they imply.
#[async_trait]
pub trait SubdisceptoRepository: Send + Sync {
    /// Loads a community row. Fails with `NotFound` when absent.
    async fn find_subdiscepto(&self, name: &SubdisceptoName) -> AppResult<Subdiscepto>;

    /// Allocates a role domain, inserts the community and the creator's
    /// membership, installs the preset roles and assigns `creator_roles`.
    async fn create_subdiscepto(
        &self,
        creator: UserId,
        subdiscepto: NewSubdiscepto,
        seeds: &[PresetRoleSeed],
        creator_roles: &[PresetRole],
    ) -> AppResult<Subdiscepto>;

    /// Updates mutable community settings.
    async fn update_subdiscepto(
        &self,
        name: &SubdisceptoName,
        settings: &SubdisceptoSettings,
    ) -> AppResult<()>;

    /// Deletes a community, its role domain and everything owned by them.
    async fn delete_subdiscepto(&self, subdiscepto: &Subdiscepto) -> AppResult<()>;

    /// Loads the membership row of a user, if any.
    async fn find_membership(
        &self,
        name: &SubdisceptoName,
        user_id: UserId,
    ) -> AppResult<Option<Membership>>;

    /// Lists members, current and former, with their community roles.
    async fn list_members(&self, subdiscepto: &Subdiscepto) -> AppResult<Vec<Member>>;

    /// Lists public communities plus those the viewer is a member of.
    async fn list_subdisceptos(&self, viewer: Option<UserId>)
    -> AppResult<Vec<SubdisceptoSummary>>;

    /// Lists the communities the user currently belongs to.
    async fn list_user_subdisceptos(&self, user_id: UserId) -> AppResult<Vec<SubdisceptoName>>;

    /// Inserts a membership and assigns `common`. An existing row is
    /// reopened instead, swapping a `common-after-rejoin` marker for
    /// `common`.
    async fn join_subdiscepto(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
    ) -> AppResult<MembershipChange>;

    /// Closes a membership, removes every community role of the user and,
    /// when `keep_rejoin_marker` is set, assigns `common-after-rejoin`.
    async fn leave_subdiscepto(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
        keep_rejoin_marker: bool,
    ) -> AppResult<()>;
}
