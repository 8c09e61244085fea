//! In-memory implementation of every storage port.
//!
//! All state lives behind one lock. Writes run against a copy of the state
//! that replaces the original only when the whole operation succeeds, so a
//! failing composite write leaves nothing behind. Password hashes are not
//! retained.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use discepto_application::{
    NewRole, NewUser, PresetRoleSeed, RegistrationGrants, RoleRepository, UserRepository,
};
use discepto_core::{AppError, AppResult};
use discepto_domain::{
    Essay, EssayId, Membership, Notification, NotificationId, PermissionSet, PresetRole,
    PublicUser, Report, ReportId, Role, RoleDomainId, RoleId, Subdiscepto, SubdisceptoName, User,
    UserId, VoteType,
};

mod communities;
mod essays;

/// In-memory store backing roles, users, communities, essays and
/// notifications.
#[derive(Debug, Default)]
pub struct InMemoryDisceptoStore {
    state: RwLock<StoreState>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    sequence: i32,
    users: BTreeMap<UserId, User>,
    role_domains: BTreeSet<RoleDomainId>,
    roles: BTreeMap<RoleId, Role>,
    role_permissions: BTreeMap<RoleId, PermissionSet>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    subdisceptos: BTreeMap<SubdisceptoName, Subdiscepto>,
    memberships: BTreeMap<(SubdisceptoName, UserId), Membership>,
    essays: BTreeMap<EssayId, Essay>,
    votes: BTreeMap<(UserId, EssayId), VoteType>,
    reports: BTreeMap<ReportId, Report>,
    notifications: BTreeMap<NotificationId, (UserId, Notification)>,
}

impl InMemoryDisceptoStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn read<T>(&self, body: impl FnOnce(&StoreState) -> AppResult<T>) -> AppResult<T> {
        let state = self.state.read().await;
        body(&state)
    }

    async fn write<T>(&self, body: impl FnOnce(&mut StoreState) -> AppResult<T>) -> AppResult<T> {
        let mut state = self.state.write().await;
        let mut draft = state.clone();
        let value = body(&mut draft)?;
        *state = draft;
        Ok(value)
    }
}

impl StoreState {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn role(&self, role_id: RoleId) -> AppResult<&Role> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role {role_id}")))
    }

    fn require_within(&self, role_id: RoleId, ceiling: &PermissionSet) -> AppResult<()> {
        self.role(role_id)?;
        match self.role_permissions.get(&role_id) {
            Some(permissions) => ceiling.require_all(permissions),
            None => Ok(()),
        }
    }

    fn find_role(&self, domain: RoleDomainId, name: &str) -> Option<&Role> {
        self.roles
            .values()
            .find(|role| role.domain == domain && role.name == name)
    }

    fn insert_role(
        &mut self,
        domain: RoleDomainId,
        name: &str,
        preset: bool,
        permissions: &PermissionSet,
    ) -> AppResult<RoleId> {
        if !self.role_domains.contains(&domain) {
            return Err(AppError::NotFound(format!("role domain {domain}")));
        }
        if self.find_role(domain, name).is_some() {
            return Err(AppError::AlreadyExists(format!("role '{name}' already exists")));
        }

        let role_id = RoleId::new(self.next_id());
        self.roles.insert(
            role_id,
            Role {
                id: role_id,
                domain,
                name: name.to_owned(),
                preset,
            },
        );
        self.role_permissions.insert(role_id, permissions.clone());
        Ok(role_id)
    }

    fn ensure_preset_roles(
        &mut self,
        domain: RoleDomainId,
        seeds: &[PresetRoleSeed],
    ) -> AppResult<()> {
        self.role_domains.insert(domain);
        for seed in seeds {
            match self.find_role(domain, seed.role.name()).map(|role| role.id) {
                Some(role_id) => {
                    if let Some(role) = self.roles.get_mut(&role_id) {
                        role.preset = true;
                    }
                    self.role_permissions.insert(role_id, seed.permissions.clone());
                }
                None => {
                    self.insert_role(domain, seed.role.name(), true, &seed.permissions)?;
                }
            }
        }

        Ok(())
    }

    fn assign_preset_role(
        &mut self,
        user_id: UserId,
        domain: RoleDomainId,
        preset: PresetRole,
    ) -> AppResult<()> {
        let role_id = self
            .find_role(domain, preset.name())
            .map(|role| role.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "preset role '{}' in domain {domain}",
                    preset.name()
                ))
            })?;
        self.user_roles.insert((user_id, role_id));
        Ok(())
    }

    fn holds_preset_role(&self, user_id: UserId, domain: RoleDomainId, preset: PresetRole) -> bool {
        self.find_role(domain, preset.name())
            .is_some_and(|role| self.user_roles.contains(&(user_id, role.id)))
    }

    fn unassign_preset_role(&mut self, user_id: UserId, domain: RoleDomainId, preset: PresetRole) {
        if let Some(role_id) = self.find_role(domain, preset.name()).map(|role| role.id) {
            self.user_roles.remove(&(user_id, role_id));
        }
    }

    fn user_roles(&self, user_id: UserId, domain: RoleDomainId) -> Vec<Role> {
        self.user_roles
            .iter()
            .filter(|(holder, _)| *holder == user_id)
            .filter_map(|(_, role_id)| self.roles.get(role_id))
            .filter(|role| role.domain == domain)
            .cloned()
            .collect()
    }

    fn unassign_all_roles(&mut self, user_id: UserId, domain: RoleDomainId) {
        let roles = &self.roles;
        self.user_roles.retain(|(holder, role_id)| {
            *holder != user_id
                || roles
                    .get(role_id)
                    .is_none_or(|role| role.domain != domain)
        });
    }

    fn user_permissions(&self, user_id: UserId, domain: RoleDomainId) -> PermissionSet {
        self.user_roles(user_id, domain)
            .iter()
            .filter_map(|role| self.role_permissions.get(&role.id))
            .fold(PermissionSet::empty(), |granted, permissions| {
                granted.union(permissions)
            })
    }

    fn delete_role(&mut self, role_id: RoleId) {
        self.roles.remove(&role_id);
        self.role_permissions.remove(&role_id);
        self.user_roles.retain(|(_, held)| *held != role_id);
    }

    fn delete_role_domain(&mut self, domain: RoleDomainId) {
        let role_ids: Vec<RoleId> = self
            .roles
            .values()
            .filter(|role| role.domain == domain)
            .map(|role| role.id)
            .collect();
        for role_id in role_ids {
            self.delete_role(role_id);
        }
        self.role_domains.remove(&domain);
    }
}

#[async_trait]
impl RoleRepository for InMemoryDisceptoStore {
    async fn list_roles(&self, domain: RoleDomainId) -> AppResult<Vec<Role>> {
        self.read(|state| {
            Ok(state
                .roles
                .values()
                .filter(|role| role.domain == domain)
                .cloned()
                .collect())
        })
        .await
    }

    async fn list_user_roles(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<Vec<Role>> {
        self.read(|state| Ok(state.user_roles(user_id, domain))).await
    }

    async fn find_role(&self, domain: RoleDomainId, name: &str) -> AppResult<Role> {
        self.read(|state| {
            state
                .find_role(domain, name)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("role '{name}' in domain {domain}")))
        })
        .await
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<PermissionSet> {
        self.read(|state| {
            state.role(role_id)?;
            Ok(state
                .role_permissions
                .get(&role_id)
                .cloned()
                .unwrap_or_default())
        })
        .await
    }

    async fn create_role(&self, role: NewRole, permissions: &PermissionSet) -> AppResult<RoleId> {
        self.write(|state| state.insert_role(role.domain, &role.name, role.preset, permissions))
            .await
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &PermissionSet,
    ) -> AppResult<()> {
        self.write(|state| {
            state.role(role_id)?;
            state.role_permissions.insert(role_id, permissions.clone());
            Ok(())
        })
        .await
    }

    async fn delete_role(&self, role_id: RoleId, ceiling: &PermissionSet) -> AppResult<()> {
        self.write(|state| {
            state.require_within(role_id, ceiling)?;
            state.delete_role(role_id);
            Ok(())
        })
        .await
    }

    async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()> {
        self.write(|state| {
            state.require_within(role_id, ceiling)?;
            state.user_roles.insert((user_id, role_id));
            Ok(())
        })
        .await
    }

    async fn unassign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()> {
        self.write(|state| {
            state.require_within(role_id, ceiling)?;
            state.user_roles.remove(&(user_id, role_id));
            Ok(())
        })
        .await
    }

    async fn unassign_all_roles(&self, user_id: UserId, domain: RoleDomainId) -> AppResult<()> {
        self.write(|state| {
            state.unassign_all_roles(user_id, domain);
            Ok(())
        })
        .await
    }

    async fn list_user_permissions(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<PermissionSet> {
        self.read(|state| Ok(state.user_permissions(user_id, domain)))
            .await
    }

    async fn ensure_preset_roles(
        &self,
        domain: RoleDomainId,
        seeds: &[PresetRoleSeed],
    ) -> AppResult<()> {
        self.write(|state| state.ensure_preset_roles(domain, seeds))
            .await
    }
}

#[async_trait]
impl UserRepository for InMemoryDisceptoStore {
    async fn create_user(&self, user: NewUser, grants: &RegistrationGrants) -> AppResult<User> {
        self.write(|state| {
            let email = user.email.to_lowercase();
            if state
                .users
                .values()
                .any(|existing| existing.email == email)
            {
                return Err(AppError::AlreadyExists(
                    "an account with this email already exists".to_owned(),
                ));
            }

            let first_user = state.users.is_empty();
            let created = User {
                id: UserId::new(state.next_id()),
                name: user.name,
                email,
            };
            state.users.insert(created.id, created.clone());

            let first_grants: &[PresetRole] = if first_user {
                grants.first_user.as_slice()
            } else {
                &[]
            };
            for preset in first_grants.iter().chain(grants.every_user.iter()) {
                state.assign_preset_role(created.id, RoleDomainId::GLOBAL, *preset)?;
            }

            Ok(created)
        })
        .await
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.read(|state| Ok(state.users.get(&user_id).cloned()))
            .await
    }

    async fn find_public_user(&self, user_id: UserId) -> AppResult<Option<PublicUser>> {
        self.read(|state| {
            Ok(state.users.get(&user_id).map(|user| {
                let karma = state
                    .votes
                    .iter()
                    .filter(|((_, essay_id), vote)| {
                        **vote == VoteType::Upvote
                            && state
                                .essays
                                .get(essay_id)
                                .is_some_and(|essay| essay.attributed_to == user_id)
                    })
                    .count();
                PublicUser {
                    id: user.id,
                    name: user.name.clone(),
                    karma: i64::try_from(karma).unwrap_or(i64::MAX),
                }
            }))
        })
        .await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.read(|state| Ok(state.users.values().cloned().collect()))
            .await
    }

    async fn delete_user(&self, user_id: UserId) -> AppResult<()> {
        self.write(|state| {
            if state.users.remove(&user_id).is_none() {
                return Err(AppError::NotFound(format!("user {user_id}")));
            }

            state.user_roles.retain(|(holder, _)| *holder != user_id);
            state.memberships.retain(|(_, member), _| *member != user_id);
            let authored: Vec<EssayId> = state
                .essays
                .values()
                .filter(|essay| essay.attributed_to == user_id)
                .map(|essay| essay.id)
                .collect();
            for essay_id in authored {
                state.delete_essay(essay_id);
            }
            state.votes.retain(|(voter, _), _| *voter != user_id);
            state
                .reports
                .retain(|_, report| report.from_user_id != user_id);
            state
                .notifications
                .retain(|_, (recipient, _)| *recipient != user_id);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests;
