//! Entry point of the core: bootstrap, registration and handle construction.

use std::sync::Arc;

use tracing::info;

use discepto_core::{AppError, AppResult};
use discepto_domain::{Registration, RoleDomainId, RoleDomainKind, User, UserId};

use crate::{
    Cancellation, DisceptoHandle, EssayRepository, NewUser, NotificationService, PasswordHasher,
    PresetRoleSeed, RegistrationGrants, RoleRepository, SubdisceptoRepository, UserHandle,
    UserRepository,
};

/// Adapters the core runs against.
#[derive(Clone)]
pub struct DisceptoPorts {
    /// Role store and resolver.
    pub roles: Arc<dyn RoleRepository>,
    /// Communities and membership lifecycle.
    pub subdisceptos: Arc<dyn SubdisceptoRepository>,
    /// User persistence.
    pub users: Arc<dyn UserRepository>,
    /// Essays, votes and reports.
    pub essays: Arc<dyn EssayRepository>,
    /// Notification sink.
    pub notifications: Arc<dyn NotificationService>,
    /// Password hashing.
    pub password_hasher: Arc<dyn PasswordHasher>,
}

/// Shared, stateless entry point. Cheap to clone into request handlers.
#[derive(Clone)]
pub struct Discepto {
    ports: DisceptoPorts,
}

impl Discepto {
    /// Creates the entry point over a set of adapters.
    #[must_use]
    pub fn new(ports: DisceptoPorts) -> Self {
        Self { ports }
    }

    /// Ensures the global role domain and its preset roles exist. Idempotent.
    pub async fn bootstrap(&self) -> AppResult<()> {
        let seeds = PresetRoleSeed::for_kind(RoleDomainKind::Global);
        self.ports
            .roles
            .ensure_preset_roles(RoleDomainId::GLOBAL, &seeds)
            .await?;

        info!(presets = seeds.len(), "global preset roles ensured");
        Ok(())
    }

    /// Registers a user. The first user becomes global admin; every user
    /// receives the global `common` role.
    pub async fn register_user(
        &self,
        cancellation: &Cancellation,
        name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<User> {
        cancellation
            .run(async {
                let registration = Registration::new(name, email, password)?;
                let password_hash = self.ports.password_hasher.hash_password(password)?;

                let user = self
                    .ports
                    .users
                    .create_user(
                        NewUser {
                            name: registration.name.into(),
                            email: registration.email.into(),
                            password_hash,
                        },
                        &RegistrationGrants::default(),
                    )
                    .await?;

                info!(user_id = %user.id, "user registered");
                Ok(user)
            })
            .await
    }

    /// Builds the handle of an authenticated caller, acting for itself.
    pub async fn user_handle(
        &self,
        cancellation: &Cancellation,
        user_id: UserId,
    ) -> AppResult<UserHandle> {
        cancellation
            .run(async {
                let user = self
                    .ports
                    .users
                    .find_user(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

                Ok(UserHandle::for_self(
                    user,
                    self.ports.users.clone(),
                    cancellation.clone(),
                ))
            })
            .await
    }

    /// Builds the global scope handle for a caller, anonymous when `None`.
    pub async fn discepto_handle(
        &self,
        cancellation: &Cancellation,
        user: Option<&UserHandle>,
    ) -> AppResult<DisceptoHandle> {
        DisceptoHandle::resolve(
            self.ports.clone(),
            cancellation.clone(),
            user.map(|handle| handle.user().clone()),
        )
        .await
    }
}
