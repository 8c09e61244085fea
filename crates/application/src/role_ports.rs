use async_trait::async_trait;

use discepto_core::AppResult;
use discepto_domain::{
    PermissionSet, PresetRole, Role, RoleDomainId, RoleDomainKind, RoleId, UserId,
};

/// Input for role creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    /// Owning role domain.
    pub domain: RoleDomainId,
    /// Unique name within the domain.
    pub name: String,
    /// Whether the role is immutable through the public API.
    pub preset: bool,
}

/// A preset role together with the permission set it is installed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetRoleSeed {
    /// Preset being installed.
    pub role: PresetRole,
    /// Permissions granted by the preset.
    pub permissions: PermissionSet,
}

impl PresetRoleSeed {
    /// Seeds for every preset of a domain kind, in creation order.
    #[must_use]
    pub fn for_kind(kind: RoleDomainKind) -> Vec<Self> {
        let presets = match kind {
            RoleDomainKind::Global => PresetRole::global(),
            RoleDomainKind::Subdiscepto => PresetRole::subdiscepto(),
        };

        presets
            .iter()
            .map(|role| Self {
                role: *role,
                permissions: role.permissions(kind),
            })
            .collect()
    }
}

/// Repository port for roles, their permission rows and user assignments.
///
/// Every write is atomic. Composite callers that need several writes in one
/// transaction use the dedicated lifecycle ports instead.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists all roles of a domain ordered by id.
    async fn list_roles(&self, domain: RoleDomainId) -> AppResult<Vec<Role>>;

    /// Lists the roles assigned to a user within a domain ordered by id.
    async fn list_user_roles(&self, user_id: UserId, domain: RoleDomainId)
    -> AppResult<Vec<Role>>;

    /// Finds a role by name. Fails with `NotFound` when absent.
    async fn find_role(&self, domain: RoleDomainId, name: &str) -> AppResult<Role>;

    /// Lists the permission set of a role.
    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<PermissionSet>;

    /// Inserts a role and its permission rows. Fails with `AlreadyExists` on a
    /// duplicate (domain, name).
    async fn create_role(&self, role: NewRole, permissions: &PermissionSet) -> AppResult<RoleId>;

    /// Replaces the permission rows of a role.
    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &PermissionSet,
    ) -> AppResult<()>;

    /// Deletes a role together with its permission rows and assignments.
    ///
    /// Fails with `PermissionDenied` when the role grants anything outside
    /// `ceiling`. The check reads the permissions the delete acts on.
    async fn delete_role(&self, role_id: RoleId, ceiling: &PermissionSet) -> AppResult<()>;

    /// Assigns a role. Assigning twice is a no-op.
    ///
    /// Fails with `PermissionDenied` when the role grants anything outside
    /// `ceiling`, checked against the permissions held at the moment of the
    /// write.
    async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()>;

    /// Removes an assignment. Removing a missing assignment is a no-op.
    /// Bounded by `ceiling` the same way as [`RoleRepository::assign_role`].
    async fn unassign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()>;

    /// Removes every assignment the user holds within a domain.
    async fn unassign_all_roles(&self, user_id: UserId, domain: RoleDomainId) -> AppResult<()>;

    /// Returns the union of the permission sets of the user's roles in a domain.
    async fn list_user_permissions(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<PermissionSet>;

    /// Ensures the domain row and its preset roles exist, resetting preset
    /// permissions to the given seeds.
    async fn ensure_preset_roles(
        &self,
        domain: RoleDomainId,
        seeds: &[PresetRoleSeed],
    ) -> AppResult<()>;
}
