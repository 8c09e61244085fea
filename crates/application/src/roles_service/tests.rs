use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use discepto_core::{AppError, AppResult};
use discepto_domain::{Permission, PermissionSet, Role, RoleDomainId, RoleId, UserId};
use tokio::sync::Mutex;

use crate::{Cancellation, NewRole, PresetRoleSeed, RoleRepository};

use super::RolesService;

#[derive(Default)]
struct FakeRoleState {
    next_id: i32,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<RoleId, PermissionSet>,
    assignments: BTreeSet<(UserId, RoleId)>,
    raise_after_read: Option<(RoleId, PermissionSet)>,
}

impl FakeRoleState {
    fn require_within(&self, role_id: RoleId, ceiling: &PermissionSet) -> AppResult<()> {
        if !self.roles.contains_key(&role_id) {
            return Err(AppError::NotFound(format!("role {role_id}")));
        }
        let permissions = self.permissions.get(&role_id).cloned().unwrap_or_default();
        ceiling.require_all(&permissions)
    }
}

#[derive(Default)]
struct FakeRoleRepository {
    state: Mutex<FakeRoleState>,
}

impl FakeRoleRepository {
    async fn insert(
        &self,
        domain: RoleDomainId,
        name: &str,
        preset: bool,
        permissions: PermissionSet,
    ) -> Role {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let role = Role {
            id: RoleId::new(state.next_id),
            domain,
            name: name.to_owned(),
            preset,
        };
        state.roles.insert(role.id, role.clone());
        state.permissions.insert(role.id, permissions);
        role
    }

    async fn assignments(&self) -> BTreeSet<(UserId, RoleId)> {
        self.state.lock().await.assignments.clone()
    }

    /// Commits `permissions` on `role_id` right after the next permission
    /// read, as a concurrent request would.
    async fn raise_after_read(&self, role_id: RoleId, permissions: PermissionSet) {
        self.state.lock().await.raise_after_read = Some((role_id, permissions));
    }

    async fn permissions_of(&self, role_id: RoleId) -> PermissionSet {
        self.state
            .lock()
            .await
            .permissions
            .get(&role_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn list_roles(&self, domain: RoleDomainId) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .values()
            .filter(|role| role.domain == domain)
            .cloned()
            .collect())
    }

    async fn list_user_roles(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, role_id)| state.roles.get(role_id))
            .filter(|role| role.domain == domain)
            .cloned()
            .collect())
    }

    async fn find_role(&self, domain: RoleDomainId, name: &str) -> AppResult<Role> {
        let state = self.state.lock().await;
        state
            .roles
            .values()
            .find(|role| role.domain == domain && role.name == name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{name}'")))
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<PermissionSet> {
        let mut state = self.state.lock().await;
        let current = state.permissions.get(&role_id).cloned().unwrap_or_default();
        if let Some((raised_id, raised)) = state.raise_after_read.take() {
            state.permissions.insert(raised_id, raised);
        }
        Ok(current)
    }

    async fn create_role(&self, role: NewRole, permissions: &PermissionSet) -> AppResult<RoleId> {
        let exists = self.find_role(role.domain, &role.name).await.is_ok();
        if exists {
            return Err(AppError::AlreadyExists(format!("role '{}'", role.name)));
        }

        Ok(self
            .insert(role.domain, &role.name, role.preset, permissions.clone())
            .await
            .id)
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &PermissionSet,
    ) -> AppResult<()> {
        self.state
            .lock()
            .await
            .permissions
            .insert(role_id, permissions.clone());
        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId, ceiling: &PermissionSet) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.require_within(role_id, ceiling)?;
        state.roles.remove(&role_id);
        state.permissions.remove(&role_id);
        state.assignments.retain(|(_, role)| *role != role_id);
        Ok(())
    }

    async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.require_within(role_id, ceiling)?;
        state.assignments.insert((user_id, role_id));
        Ok(())
    }

    async fn unassign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        ceiling: &PermissionSet,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.require_within(role_id, ceiling)?;
        state.assignments.remove(&(user_id, role_id));
        Ok(())
    }

    async fn unassign_all_roles(&self, user_id: UserId, domain: RoleDomainId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let roles = state.roles.clone();
        state.assignments.retain(|(user, role_id)| {
            *user != user_id || roles.get(role_id).is_some_and(|role| role.domain != domain)
        });
        Ok(())
    }

    async fn list_user_permissions(
        &self,
        user_id: UserId,
        domain: RoleDomainId,
    ) -> AppResult<PermissionSet> {
        let roles = self.list_user_roles(user_id, domain).await?;
        let mut permissions = PermissionSet::empty();
        for role in roles {
            permissions = permissions.union(&self.permissions_of(role.id).await);
        }
        Ok(permissions)
    }

    async fn ensure_preset_roles(
        &self,
        domain: RoleDomainId,
        seeds: &[PresetRoleSeed],
    ) -> AppResult<()> {
        for seed in seeds {
            self.insert(domain, seed.role.name(), true, seed.permissions.clone())
                .await;
        }
        Ok(())
    }
}

fn community() -> RoleDomainId {
    RoleDomainId::new(1)
}

fn moderator_permissions() -> PermissionSet {
    PermissionSet::from([
        Permission::ReadSubdiscepto,
        Permission::ManageRole,
        Permission::BanUser,
    ])
}

fn service(repository: &Arc<FakeRoleRepository>, context: PermissionSet) -> RolesService {
    RolesService::new(repository.clone(), Cancellation::never(), community(), context)
}

fn missing(result: AppResult<()>) -> Vec<String> {
    match result {
        Err(AppError::PermissionDenied { missing }) => missing,
        other => panic!("expected permission error, got {other:?}"),
    }
}

#[tokio::test]
async fn caller_without_manage_role_cannot_assign() {
    let repository = Arc::new(FakeRoleRepository::default());
    let admin = repository
        .insert(community(), "admin", true, moderator_permissions())
        .await;
    let roles = service(&repository, PermissionSet::from([Permission::ReadSubdiscepto]));

    let result = roles.assign(UserId::new(3), &admin).await;

    assert_eq!(missing(result), vec!["manage_role".to_owned()]);
    assert!(repository.assignments().await.is_empty());
}

#[tokio::test]
async fn caller_cannot_assign_role_with_more_permissions() {
    let repository = Arc::new(FakeRoleRepository::default());
    let admin = repository
        .insert(community(), "admin", true, moderator_permissions())
        .await;
    let roles = service(
        &repository,
        PermissionSet::from([Permission::ReadSubdiscepto, Permission::ManageRole]),
    );

    let result = roles.assign(UserId::new(3), &admin).await;

    assert_eq!(missing(result), vec!["ban_user".to_owned()]);
    assert!(repository.assignments().await.is_empty());
}

#[tokio::test]
async fn caller_can_assign_and_unassign_subset_role() {
    let repository = Arc::new(FakeRoleRepository::default());
    let helper = repository
        .insert(
            community(),
            "helper",
            false,
            PermissionSet::from([Permission::ReadSubdiscepto]),
        )
        .await;
    let roles = service(&repository, moderator_permissions());
    let user_id = UserId::new(3);

    assert!(roles.assign(user_id, &helper).await.is_ok());
    assert!(repository.assignments().await.contains(&(user_id, helper.id)));

    assert!(roles.unassign(user_id, &helper).await.is_ok());
    assert!(repository.assignments().await.is_empty());
}

#[tokio::test]
async fn roles_of_another_domain_are_rejected() {
    let repository = Arc::new(FakeRoleRepository::default());
    let foreign = repository
        .insert(RoleDomainId::new(99), "helper", false, PermissionSet::empty())
        .await;
    let roles = service(&repository, moderator_permissions());

    let result = roles.assign(UserId::new(3), &foreign).await;

    assert!(missing(result).is_empty());
    assert!(repository.assignments().await.is_empty());
}

#[tokio::test]
async fn preset_roles_are_immutable() {
    let repository = Arc::new(FakeRoleRepository::default());
    let common = repository
        .insert(
            community(),
            "common",
            true,
            PermissionSet::from([Permission::ReadSubdiscepto]),
        )
        .await;
    let roles = service(&repository, moderator_permissions());

    let update = roles
        .set_permissions(&common, &PermissionSet::from([Permission::BanUser]))
        .await;
    assert!(matches!(update, Err(AppError::PermissionDenied { .. })));

    let delete = roles.delete_role(&common).await;
    assert!(matches!(delete, Err(AppError::PermissionDenied { .. })));

    assert_eq!(
        repository.permissions_of(common.id).await,
        PermissionSet::from([Permission::ReadSubdiscepto])
    );
}

#[tokio::test]
async fn custom_role_cannot_receive_permissions_the_caller_lacks() {
    let repository = Arc::new(FakeRoleRepository::default());
    let roles = service(&repository, moderator_permissions());
    let moderator = roles.create_role("mod").await.unwrap_or_else(|_| unreachable!());

    let result = roles
        .set_permissions(&moderator, &PermissionSet::from([Permission::BanUserGlobally]))
        .await;

    assert_eq!(missing(result), vec!["ban_user_globally".to_owned()]);
    assert!(repository.permissions_of(moderator.id).await.is_empty());
}

#[tokio::test]
async fn custom_role_permissions_can_be_replaced_within_context() {
    let repository = Arc::new(FakeRoleRepository::default());
    let roles = service(&repository, moderator_permissions());
    let moderator = roles.create_role("mod").await.unwrap_or_else(|_| unreachable!());
    let granted = PermissionSet::from([Permission::BanUser]);

    assert!(roles.set_permissions(&moderator, &granted).await.is_ok());
    assert_eq!(repository.permissions_of(moderator.id).await, granted);

    assert!(roles.delete_role(&moderator).await.is_ok());
    assert!(roles.find_role("mod").await.is_err());
}

#[tokio::test]
async fn reserved_names_cannot_be_created() {
    let repository = Arc::new(FakeRoleRepository::default());
    let roles = service(&repository, moderator_permissions());

    let result = roles.create_role("common-after-rejoin").await;

    assert!(matches!(result, Err(AppError::InvalidFormat(_))));
}

#[tokio::test]
async fn duplicate_custom_role_reports_already_exists() {
    let repository = Arc::new(FakeRoleRepository::default());
    let roles = service(&repository, moderator_permissions());

    assert!(roles.create_role("mod").await.is_ok());
    let duplicate = roles.create_role("mod").await;

    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));
}

#[tokio::test]
async fn global_domain_requires_manage_global_role() {
    let repository = Arc::new(FakeRoleRepository::default());
    let local_manager = RolesService::new(
        repository.clone(),
        Cancellation::never(),
        RoleDomainId::GLOBAL,
        PermissionSet::from([Permission::ManageRole]),
    );
    assert!(!local_manager.can_manage());

    let global_manager = RolesService::new(
        repository,
        Cancellation::never(),
        RoleDomainId::GLOBAL,
        PermissionSet::from([Permission::ManageGlobalRole]),
    );
    assert!(global_manager.can_manage());
    assert!(global_manager.list_roles().await.is_ok());
}

#[tokio::test]
async fn unassign_all_only_touches_the_managed_domain() {
    let repository = Arc::new(FakeRoleRepository::default());
    let local = repository
        .insert(community(), "helper", false, PermissionSet::empty())
        .await;
    let global = repository
        .insert(RoleDomainId::GLOBAL, "common", true, PermissionSet::empty())
        .await;
    let user_id = UserId::new(3);
    let everything = PermissionSet::everything();
    for role in [&local, &global] {
        let assigned = repository.assign_role(user_id, role.id, &everything).await;
        assert!(assigned.is_ok());
    }

    let roles = service(&repository, moderator_permissions());
    assert!(roles.unassign_all(user_id).await.is_ok());

    let remaining = repository.assignments().await;
    assert_eq!(remaining.len(), 1);
    assert!(remaining.contains(&(user_id, global.id)));
}

#[tokio::test]
async fn cancelled_signal_prevents_writes() {
    let repository = Arc::new(FakeRoleRepository::default());
    let helper = repository
        .insert(community(), "helper", false, PermissionSet::empty())
        .await;
    let (trigger, cancellation) = Cancellation::new();
    trigger.cancel();
    let roles = RolesService::new(
        repository.clone(),
        cancellation,
        community(),
        moderator_permissions(),
    );

    let result = roles.assign(UserId::new(3), &helper).await;

    assert!(matches!(result, Err(AppError::Cancelled)));
    assert!(repository.assignments().await.is_empty());
}

#[tokio::test]
async fn assignment_is_checked_against_permissions_held_at_write_time() {
    let repository = Arc::new(FakeRoleRepository::default());
    let helper = repository
        .insert(
            community(),
            "helper",
            false,
            PermissionSet::from([Permission::ReadSubdiscepto]),
        )
        .await;
    let context = PermissionSet::from([Permission::ReadSubdiscepto, Permission::ManageRole]);
    let roles = service(&repository, context.clone());
    repository
        .raise_after_read(
            helper.id,
            PermissionSet::from([Permission::ReadSubdiscepto, Permission::DeleteSubdiscepto]),
        )
        .await;

    let assigned = roles.assign(UserId::new(3), &helper).await;
    let granted = repository.permissions_of(helper.id).await;

    match assigned {
        Ok(()) => assert!(granted.subset_of(&context)),
        Err(error) => {
            assert_eq!(
                error.missing_permissions(),
                Some(["delete_subdiscepto".to_owned()].as_slice())
            );
            assert!(repository.assignments().await.is_empty());
        }
    }
}

#[tokio::test]
async fn raised_role_cannot_be_assigned_by_a_stale_caller() {
    let repository = Arc::new(FakeRoleRepository::default());
    let helper = repository
        .insert(community(), "helper", false, PermissionSet::empty())
        .await;
    let roles = service(&repository, moderator_permissions());
    let Ok(()) = repository
        .set_role_permissions(helper.id, &PermissionSet::from([Permission::DeleteEssay]))
        .await
    else {
        panic!("raising helper permissions should succeed");
    };

    let assigned = roles.assign(UserId::new(3), &helper).await;
    let deleted = roles.delete_role(&helper).await;

    assert_eq!(missing(assigned), vec!["delete_essay".to_owned()]);
    assert_eq!(missing(deleted), vec!["delete_essay".to_owned()]);
    assert!(repository.assignments().await.is_empty());
    assert!(roles.find_role("helper").await.is_ok());
}
