//! Global scope handle.

use std::collections::BTreeSet;

use tracing::info;

use discepto_core::{AppError, AppResult};
use discepto_domain::{
    Essay, EssaySearch, NewSubdiscepto, NotificationId, NotificationView, Permission,
    PermissionSet, PresetRole, PublicUser, RoleDomainId, RoleDomainKind, SubdisceptoName,
    SubdisceptoSettings, SubdisceptoSummary, User, UserId,
};

use crate::{
    Cancellation, DisceptoPorts, PermissionResolver, PresetRoleSeed, RolesService,
    SubdisceptoHandle, UserHandle,
};

/// A caller's permission context over the whole site.
#[derive(Clone)]
pub struct DisceptoHandle {
    ports: DisceptoPorts,
    cancellation: Cancellation,
    user: Option<User>,
    permissions: PermissionSet,
    roles: RolesService,
}

impl DisceptoHandle {
    pub(crate) async fn resolve(
        ports: DisceptoPorts,
        cancellation: Cancellation,
        user: Option<User>,
    ) -> AppResult<Self> {
        let permissions = cancellation
            .run(
                PermissionResolver::new(ports.roles.clone())
                    .effective_permissions(user.as_ref().map(|user| user.id), RoleDomainId::GLOBAL),
            )
            .await?;

        let roles = RolesService::new(
            ports.roles.clone(),
            cancellation.clone(),
            RoleDomainId::GLOBAL,
            permissions.clone(),
        );

        Ok(Self {
            ports,
            cancellation,
            user,
            permissions,
            roles,
        })
    }

    /// Returns the caller's global effective permissions.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns the caller, `None` when anonymous.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Role management over the global domain.
    #[must_use]
    pub fn roles(&self) -> &RolesService {
        &self.roles
    }

    /// The whole permission vocabulary, for role editors.
    #[must_use]
    pub fn list_available_permissions(&self) -> PermissionSet {
        PermissionSet::everything()
    }

    /// Creates a community owned by `creator`.
    pub async fn create_subdiscepto(
        &self,
        creator: &UserHandle,
        name: &str,
        settings: SubdisceptoSettings,
    ) -> AppResult<SubdisceptoHandle> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::CreateSubdiscepto])?;
                creator.require_acting()?;
                let subdiscepto = NewSubdiscepto::new(name, settings)?;

                let seeds = PresetRoleSeed::for_kind(RoleDomainKind::Subdiscepto);
                let created = self
                    .ports
                    .subdisceptos
                    .create_subdiscepto(
                        creator.id(),
                        subdiscepto,
                        &seeds,
                        &[PresetRole::Common, PresetRole::Admin],
                    )
                    .await?;

                info!(
                    subdiscepto = %created.name,
                    role_domain = %created.role_domain,
                    creator = %creator.id(),
                    "subdiscepto created"
                );
                self.subdiscepto_handle(created.name.as_str()).await
            })
            .await
    }

    /// Resolves the community handle for the caller.
    pub async fn subdiscepto_handle(&self, name: &str) -> AppResult<SubdisceptoHandle> {
        SubdisceptoHandle::resolve(
            self.ports.clone(),
            self.cancellation.clone(),
            self.user.clone(),
            self.permissions.clone(),
            &SubdisceptoName::new(name)?,
        )
        .await
    }

    /// Lists public communities plus the caller's.
    pub async fn list_subdisceptos(&self) -> AppResult<Vec<SubdisceptoSummary>> {
        self.cancellation
            .run(
                self.ports
                    .subdisceptos
                    .list_subdisceptos(self.user.as_ref().map(|user| user.id)),
            )
            .await
    }

    /// Lists the communities the caller currently belongs to.
    pub async fn list_user_subdisceptos(&self) -> AppResult<Vec<SubdisceptoName>> {
        self.cancellation
            .run(async {
                let user = self.require_user()?;
                self.ports.subdisceptos.list_user_subdisceptos(user.id).await
            })
            .await
    }

    /// Lists every registered user.
    pub async fn list_members(&self) -> AppResult<Vec<User>> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::Login])?;
                self.ports.users.list_users().await
            })
            .await
    }

    /// Loads the public profile of any user.
    pub async fn read_public_user(&self, user_id: UserId) -> AppResult<PublicUser> {
        self.cancellation
            .run(async {
                self.ports
                    .users
                    .find_public_user(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
            })
            .await
    }

    /// Searches essays of public communities.
    pub async fn search_essays(&self, search: &EssaySearch) -> AppResult<Vec<Essay>> {
        self.cancellation
            .run(self.ports.essays.search_public_essays(search))
            .await
    }

    /// Lists the newest essays of the communities the caller belongs to and
    /// can still read.
    pub async fn list_recent_essays(&self) -> AppResult<Vec<Essay>> {
        self.cancellation
            .run(async {
                let user = self.require_user()?;
                let joined = self
                    .ports
                    .subdisceptos
                    .list_user_subdisceptos(user.id)
                    .await?;
                let readable: Vec<SubdisceptoName> =
                    self.readable_subdisceptos(joined).await?.into_iter().collect();
                self.ports.essays.list_recent_essays(&readable).await
            })
            .await
    }

    /// Lists a user's essays. Essays in communities the caller cannot read
    /// are left out unless the caller wrote them.
    pub async fn list_user_essays(&self, author: UserId) -> AppResult<Vec<Essay>> {
        self.cancellation
            .run(async {
                let essays = self.ports.essays.list_user_essays(author).await?;
                if self.user.as_ref().is_some_and(|user| user.id == author) {
                    return Ok(essays);
                }

                let communities: BTreeSet<SubdisceptoName> =
                    essays.iter().map(|essay| essay.posted_in.clone()).collect();
                let readable = self.readable_subdisceptos(communities).await?;
                Ok(essays
                    .into_iter()
                    .filter(|essay| readable.contains(&essay.posted_in))
                    .collect())
            })
            .await
    }

    /// Returns a handle able to delete another user's account.
    pub async fn user_handle_for(&self, user_id: UserId) -> AppResult<UserHandle> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::DeleteUser])?;
                let user = self
                    .ports
                    .users
                    .find_user(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

                Ok(UserHandle::for_administrator(
                    user,
                    self.ports.users.clone(),
                    self.cancellation.clone(),
                ))
            })
            .await
    }

    /// Lists the caller's notifications.
    pub async fn list_notifications(&self) -> AppResult<Vec<NotificationView>> {
        self.cancellation
            .run(async {
                let user = self.require_user()?;
                self.ports.notifications.list(user.id).await
            })
            .await
    }

    /// Deletes one of the caller's notifications.
    pub async fn delete_notification(&self, notification_id: NotificationId) -> AppResult<()> {
        self.cancellation
            .run(async {
                let user = self.require_user()?;
                self.ports
                    .notifications
                    .delete(user.id, notification_id)
                    .await
            })
            .await
    }

    async fn readable_subdisceptos(
        &self,
        names: impl IntoIterator<Item = SubdisceptoName>,
    ) -> AppResult<BTreeSet<SubdisceptoName>> {
        let mut readable = BTreeSet::new();
        for name in names {
            match self.subdiscepto_handle(name.as_str()).await {
                Ok(_) => {
                    readable.insert(name);
                }
                Err(AppError::PermissionDenied { .. } | AppError::NotFound(_)) => {}
                Err(error) => return Err(error),
            }
        }

        Ok(readable)
    }

    fn require_user(&self) -> AppResult<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::permission_denied(Vec::<String>::new()))
    }
}
