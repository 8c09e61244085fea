use async_trait::async_trait;

use discepto_core::AppResult;
use discepto_domain::{PresetRole, PublicUser, User, UserId};

/// Validated user row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Canonical email address.
    pub email: String,
    /// Opaque password hash.
    pub password_hash: String,
}

/// Global preset roles granted at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationGrants {
    /// Roles assigned to the very first user, in assignment order.
    pub first_user: Vec<PresetRole>,
    /// Roles assigned to every user.
    pub every_user: Vec<PresetRole>,
}

impl Default for RegistrationGrants {
    fn default() -> Self {
        Self {
            first_user: vec![PresetRole::Admin],
            every_user: vec![PresetRole::Common],
        }
    }
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and assigns the global grants in one transaction.
    /// Fails with `AlreadyExists` when the email is taken.
    async fn create_user(&self, user: NewUser, grants: &RegistrationGrants) -> AppResult<User>;

    /// Finds a user by id.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Loads the public profile of a user, with karma.
    async fn find_public_user(&self, user_id: UserId) -> AppResult<Option<PublicUser>>;

    /// Lists every user, oldest account first.
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Deletes a user and everything that references it.
    async fn delete_user(&self, user_id: UserId) -> AppResult<()>;
}

/// Port for password hashing. Keeps application code free of direct
/// cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;
}
