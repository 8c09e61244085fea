//! Shared helpers for tests that need a live PostgreSQL database.
//!
//! Tests return early when `DATABASE_URL` is not set.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use discepto_domain::UserId;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres tests: {error}");
    }

    Some(pool)
}

/// Inserts a bare user row with a unique email and returns its id.
pub(crate) async fn insert_user(pool: &PgPool, name: &str) -> UserId {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO users (name, email, passwd_hash)
        VALUES ($1, $1 || '-' || nextval('users_id_seq') || '@example.com', 'hash')
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await;

    match id {
        Ok(id) => UserId::new(id),
        Err(error) => panic!("failed to insert test user: {error}"),
    }
}

/// Unique community name for tests sharing one database.
pub(crate) async fn unique_name(pool: &PgPool, prefix: &str) -> String {
    let suffix = sqlx::query_scalar::<_, i32>("SELECT nextval('roledomains_id_seq')::INT")
        .fetch_one(pool)
        .await;

    match suffix {
        Ok(suffix) => format!("{prefix}_{suffix}"),
        Err(error) => panic!("failed to generate test name: {error}"),
    }
}
