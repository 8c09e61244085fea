use std::sync::Arc;

use tracing::info;

use discepto_core::{AppError, AppResult};
use discepto_domain::{Permission, User, UserId};

use crate::{Cancellation, UserRepository};

/// What the holder of a user handle may do with that user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserCapabilities {
    /// May act on behalf of the user (join, leave, post).
    pub read: bool,
    /// May delete the account.
    pub delete: bool,
}

/// Capability handle over one user account.
#[derive(Clone)]
pub struct UserHandle {
    user: User,
    capabilities: UserCapabilities,
    users: Arc<dyn UserRepository>,
    cancellation: Cancellation,
}

impl UserHandle {
    pub(crate) fn for_self(
        user: User,
        users: Arc<dyn UserRepository>,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            user,
            capabilities: UserCapabilities {
                read: true,
                delete: true,
            },
            users,
            cancellation,
        }
    }

    pub(crate) fn for_administrator(
        user: User,
        users: Arc<dyn UserRepository>,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            user,
            capabilities: UserCapabilities {
                read: false,
                delete: true,
            },
            users,
            cancellation,
        }
    }

    /// Returns the user id.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.user.id
    }

    /// Returns the user record.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the handle's capabilities.
    #[must_use]
    pub fn capabilities(&self) -> UserCapabilities {
        self.capabilities
    }

    /// Fails unless the holder may act on behalf of the user.
    pub(crate) fn require_acting(&self) -> AppResult<()> {
        if self.capabilities.read {
            return Ok(());
        }

        Err(AppError::permission_denied(Vec::<String>::new()))
    }

    /// Deletes the account.
    pub async fn delete(&self) -> AppResult<()> {
        self.cancellation
            .run(async {
                if !self.capabilities.delete {
                    return Err(AppError::permission_denied([Permission::DeleteUser.as_str()]));
                }

                self.users.delete_user(self.user.id).await?;
                info!(user_id = %self.user.id, "user deleted");
                Ok(())
            })
            .await
    }
}
