//! Effective permission resolution for the global and community scopes.

use std::sync::Arc;

use discepto_core::AppResult;
use discepto_domain::{
    Membership, Permission, PermissionSet, RoleDomainId, Subdiscepto, UserId,
    inherited_permissions,
};

use crate::RoleRepository;

/// Read-only resolver over the role store.
#[derive(Clone)]
pub struct PermissionResolver {
    role_repository: Arc<dyn RoleRepository>,
}

impl PermissionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(role_repository: Arc<dyn RoleRepository>) -> Self {
        Self { role_repository }
    }

    /// Union of the permissions of every role the user holds in `domain`.
    /// Anonymous callers hold nothing.
    pub async fn effective_permissions(
        &self,
        user_id: Option<UserId>,
        domain: RoleDomainId,
    ) -> AppResult<PermissionSet> {
        match user_id {
            Some(user_id) => {
                self.role_repository
                    .list_user_permissions(user_id, domain)
                    .await
            }
            None => Ok(PermissionSet::empty()),
        }
    }

    /// Effective permissions inside a community.
    ///
    /// Local roles count only with the global `use_local_permissions` grant
    /// and while the membership (if any) is open. Inherited names are OR-ed in
    /// from the global set and public communities are always readable.
    pub async fn subdiscepto_permissions(
        &self,
        user_id: Option<UserId>,
        global: &PermissionSet,
        subdiscepto: &Subdiscepto,
        membership: Option<&Membership>,
    ) -> AppResult<PermissionSet> {
        let has_left = membership.is_some_and(|membership| !membership.is_active());
        let local = match user_id {
            Some(user_id) if global.has(Permission::UseLocalPermissions) && !has_left => {
                self.role_repository
                    .list_user_permissions(user_id, subdiscepto.role_domain)
                    .await?
            }
            _ => PermissionSet::empty(),
        };

        let mut effective = local.union(&global.intersect(&inherited_permissions()));
        if subdiscepto.public {
            effective.insert(Permission::ReadSubdiscepto);
        }

        Ok(effective)
    }
}
