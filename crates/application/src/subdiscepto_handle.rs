//! Community scope handle.
//!
//! Resolution loads the community, computes the caller's effective
//! permissions in it (local roles, inheritance from the global scope and the
//! public-read fallback) and binds a role-management service to the
//! community's role domain. Every operation checks the pre-computed set
//! before touching storage.

mod essays;
mod membership;
mod reports;

use tracing::{debug, info};

use discepto_core::{AppError, AppResult};
use discepto_domain::{
    Member, Membership, Permission, PermissionSet, Subdiscepto, SubdisceptoName,
    SubdisceptoSettings, User, UserId, subdiscepto_owner_permissions,
};

use crate::{Cancellation, DisceptoPorts, PermissionResolver, RolesService};

/// What a caller sees when reading a community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdisceptoView {
    /// Community row.
    pub subdiscepto: Subdiscepto,
    /// Whether the caller is a current member.
    pub is_member: bool,
    /// The caller's effective permissions in the community.
    pub permissions: PermissionSet,
}

/// A caller's permission context over one community.
#[derive(Clone)]
pub struct SubdisceptoHandle {
    ports: DisceptoPorts,
    cancellation: Cancellation,
    subdiscepto: Subdiscepto,
    user: Option<User>,
    membership: Option<Membership>,
    global_permissions: PermissionSet,
    permissions: PermissionSet,
    roles: RolesService,
}

impl SubdisceptoHandle {
    pub(crate) async fn resolve(
        ports: DisceptoPorts,
        cancellation: Cancellation,
        user: Option<User>,
        global_permissions: PermissionSet,
        name: &SubdisceptoName,
    ) -> AppResult<Self> {
        let signal = cancellation.clone();
        signal
            .run(async move {
                let subdiscepto = ports.subdisceptos.find_subdiscepto(name).await?;
                let membership = match &user {
                    Some(user) => ports.subdisceptos.find_membership(name, user.id).await?,
                    None => None,
                };

                let permissions = PermissionResolver::new(ports.roles.clone())
                    .subdiscepto_permissions(
                        user.as_ref().map(|user| user.id),
                        &global_permissions,
                        &subdiscepto,
                        membership.as_ref(),
                    )
                    .await?;

                if !permissions.has(Permission::ReadSubdiscepto) {
                    debug!(subdiscepto = %name, "private subdiscepto is not readable");
                    return Err(AppError::permission_denied([
                        Permission::ReadSubdiscepto.as_str()
                    ]));
                }

                let roles = RolesService::new(
                    ports.roles.clone(),
                    cancellation.clone(),
                    subdiscepto.role_domain,
                    permissions.clone(),
                );

                Ok(Self {
                    ports,
                    cancellation,
                    subdiscepto,
                    user,
                    membership,
                    global_permissions,
                    permissions,
                    roles,
                })
            })
            .await
    }

    /// Returns the community row.
    #[must_use]
    pub fn subdiscepto(&self) -> &Subdiscepto {
        &self.subdiscepto
    }

    /// Returns the community name.
    #[must_use]
    pub fn name(&self) -> &SubdisceptoName {
        &self.subdiscepto.name
    }

    /// Returns the caller's effective permissions in the community.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Role management over the community's role domain.
    #[must_use]
    pub fn roles(&self) -> &RolesService {
        &self.roles
    }

    /// Reads the community.
    pub fn read_view(&self) -> AppResult<SubdisceptoView> {
        self.permissions.require(&[Permission::ReadSubdiscepto])?;
        Ok(SubdisceptoView {
            subdiscepto: self.subdiscepto.clone(),
            is_member: self.membership.as_ref().is_some_and(Membership::is_active),
            permissions: self.permissions.clone(),
        })
    }

    /// Updates the community settings.
    pub async fn update(&self, settings: SubdisceptoSettings) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::UpdateSubdiscepto])?;
                settings.validate()?;
                self.ports
                    .subdisceptos
                    .update_subdiscepto(&self.subdiscepto.name, &settings)
                    .await?;

                info!(subdiscepto = %self.subdiscepto.name, "subdiscepto updated");
                Ok(())
            })
            .await
    }

    /// Deletes the community. Only callers whose effective set equals the
    /// owner set exactly may do this.
    pub async fn delete(&self) -> AppResult<()> {
        self.cancellation
            .run(async {
                let owner = subdiscepto_owner_permissions();
                if self.permissions != owner {
                    return Err(AppError::permission_denied(
                        owner.difference(&self.permissions).names(),
                    ));
                }

                self.ports
                    .subdisceptos
                    .delete_subdiscepto(&self.subdiscepto)
                    .await?;
                info!(subdiscepto = %self.subdiscepto.name, "subdiscepto deleted");
                Ok(())
            })
            .await
    }

    /// Lists current and former members with their community roles.
    pub async fn list_members(&self) -> AppResult<Vec<Member>> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::ReadSubdiscepto])?;
                self.ports.subdisceptos.list_members(&self.subdiscepto).await
            })
            .await
    }

    fn acting_user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.id)
    }
}
