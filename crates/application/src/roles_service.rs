//! Role management within one role domain on behalf of one caller.
//!
//! The caller's effective permissions in the domain are fixed at construction.
//! Every grant is checked against them so a caller can never hand out a
//! permission it does not hold itself. Checks on a stored role's permissions
//! are delegated to the repository so they run in the same transaction as the
//! write they guard.

use std::sync::Arc;

use tracing::{debug, info};

use discepto_core::{AppError, AppResult};
use discepto_domain::{Permission, PermissionSet, Role, RoleDomainId, RoleName, UserId};

use crate::{Cancellation, NewRole, RoleRepository};

/// Role management service bound to a domain and a caller's permission context.
#[derive(Clone)]
pub struct RolesService {
    role_repository: Arc<dyn RoleRepository>,
    cancellation: Cancellation,
    domain: RoleDomainId,
    context_permissions: PermissionSet,
    can_manage: bool,
}

impl RolesService {
    /// Creates the service. Management rights come from `manage_global_role`
    /// in the global domain and `manage_role` everywhere else.
    #[must_use]
    pub fn new(
        role_repository: Arc<dyn RoleRepository>,
        cancellation: Cancellation,
        domain: RoleDomainId,
        context_permissions: PermissionSet,
    ) -> Self {
        let can_manage = context_permissions.has(manage_permission(domain));
        Self {
            role_repository,
            cancellation,
            domain,
            context_permissions,
            can_manage,
        }
    }

    /// Returns the managed role domain.
    #[must_use]
    pub fn domain(&self) -> RoleDomainId {
        self.domain
    }

    /// Returns the caller's permissions in the domain.
    #[must_use]
    pub fn context_permissions(&self) -> &PermissionSet {
        &self.context_permissions
    }

    /// Returns whether the caller may manage roles in the domain.
    #[must_use]
    pub fn can_manage(&self) -> bool {
        self.can_manage
    }

    /// Lists every role of the domain.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.role_repository.list_roles(self.domain).await
            })
            .await
    }

    /// Lists the roles a user holds in the domain.
    pub async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.role_repository
                    .list_user_roles(user_id, self.domain)
                    .await
            })
            .await
    }

    /// Finds a role of the domain by name.
    pub async fn find_role(&self, name: &str) -> AppResult<Role> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.role_repository.find_role(self.domain, name).await
            })
            .await
    }

    /// Lists the permissions granted by a role of the domain.
    pub async fn list_role_permissions(&self, role: &Role) -> AppResult<PermissionSet> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.require_domain(role)?;
                self.role_repository.list_role_permissions(role.id).await
            })
            .await
    }

    /// Creates a custom role with no permissions.
    pub async fn create_role(&self, name: &str) -> AppResult<Role> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                let name = RoleName::new(name)?;
                let role_id = self
                    .role_repository
                    .create_role(
                        NewRole {
                            domain: self.domain,
                            name: name.as_str().to_owned(),
                            preset: false,
                        },
                        &PermissionSet::empty(),
                    )
                    .await?;

                info!(domain = %self.domain, role = name.as_str(), "role created");
                Ok(Role {
                    id: role_id,
                    domain: self.domain,
                    name: name.as_str().to_owned(),
                    preset: false,
                })
            })
            .await
    }

    /// Replaces the permissions of a custom role.
    pub async fn set_permissions(&self, role: &Role, permissions: &PermissionSet) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.require_domain(role)?;
                self.require_mutable(role)?;
                self.require_grantable(permissions)?;

                self.role_repository
                    .set_role_permissions(role.id, permissions)
                    .await?;
                info!(
                    domain = %self.domain,
                    role = %role.name,
                    permissions = ?permissions.names(),
                    "role permissions replaced"
                );
                Ok(())
            })
            .await
    }

    /// Deletes a custom role and its assignments.
    pub async fn delete_role(&self, role: &Role) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.require_domain(role)?;
                self.require_mutable(role)?;

                self.role_repository
                    .delete_role(role.id, &self.context_permissions)
                    .await
                    .inspect_err(|error| self.log_denial(error))?;
                info!(domain = %self.domain, role = %role.name, "role deleted");
                Ok(())
            })
            .await
    }

    /// Assigns a role of the domain to a user.
    pub async fn assign(&self, user_id: UserId, role: &Role) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.require_assignable(role)?;
                self.role_repository
                    .assign_role(user_id, role.id, &self.context_permissions)
                    .await
                    .inspect_err(|error| self.log_denial(error))?;
                info!(domain = %self.domain, role = %role.name, %user_id, "role assigned");
                Ok(())
            })
            .await
    }

    /// Removes a role of the domain from a user.
    pub async fn unassign(&self, user_id: UserId, role: &Role) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.require_assignable(role)?;
                self.role_repository
                    .unassign_role(user_id, role.id, &self.context_permissions)
                    .await
                    .inspect_err(|error| self.log_denial(error))?;
                info!(domain = %self.domain, role = %role.name, %user_id, "role unassigned");
                Ok(())
            })
            .await
    }

    /// Removes every role a user holds in the domain.
    pub async fn unassign_all(&self, user_id: UserId) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.require_manage()?;
                self.role_repository
                    .unassign_all_roles(user_id, self.domain)
                    .await?;
                info!(domain = %self.domain, %user_id, "all roles unassigned");
                Ok(())
            })
            .await
    }

    fn require_assignable(&self, role: &Role) -> AppResult<()> {
        self.require_manage()?;
        self.require_domain(role)
    }

    fn require_manage(&self) -> AppResult<()> {
        if self.can_manage {
            return Ok(());
        }

        let permission = manage_permission(self.domain);
        debug!(domain = %self.domain, missing = permission.as_str(), "role management denied");
        Err(AppError::permission_denied([permission.as_str()]))
    }

    fn require_domain(&self, role: &Role) -> AppResult<()> {
        if role.domain == self.domain {
            return Ok(());
        }

        debug!(domain = %self.domain, role_domain = %role.domain, "role outside managed domain");
        Err(AppError::permission_denied(Vec::<String>::new()))
    }

    fn require_mutable(&self, role: &Role) -> AppResult<()> {
        if !role.preset {
            return Ok(());
        }

        debug!(domain = %self.domain, role = %role.name, "preset role is immutable");
        Err(AppError::permission_denied(Vec::<String>::new()))
    }

    fn require_grantable(&self, permissions: &PermissionSet) -> AppResult<()> {
        self.context_permissions
            .require_all(permissions)
            .inspect_err(|error| self.log_denial(error))
    }

    fn log_denial(&self, error: &AppError) {
        if let Some(missing) = error.missing_permissions() {
            debug!(
                domain = %self.domain,
                ?missing,
                "role grant exceeds caller permissions"
            );
        }
    }
}

fn manage_permission(domain: RoleDomainId) -> Permission {
    if domain.is_global() {
        Permission::ManageGlobalRole
    } else {
        Permission::ManageRole
    }
}

#[cfg(test)]
mod tests;
