//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_discepto_store;
mod postgres_essay_repository;
mod postgres_notification_service;
mod postgres_role_repository;
mod postgres_subdiscepto_repository;
mod postgres_user_repository;
mod role_store;
mod transaction;

#[cfg(test)]
mod test_database;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_discepto_store::InMemoryDisceptoStore;
pub use postgres_essay_repository::PostgresEssayRepository;
pub use postgres_notification_service::PostgresNotificationService;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_subdiscepto_repository::PostgresSubdisceptoRepository;
pub use postgres_user_repository::PostgresUserRepository;
pub use transaction::{Executor, exec_tx};
