use discepto_application::{PresetRoleSeed, RoleRepository, SubdisceptoRepository};
use discepto_core::AppError;
use discepto_domain::{
    MembershipChange, NewSubdiscepto, PresetRole, RoleDomainId, RoleDomainKind, Subdiscepto,
    SubdisceptoSettings, UserId,
};
use sqlx::PgPool;

use super::PostgresSubdisceptoRepository;
use crate::PostgresRoleRepository;
use crate::test_database::{insert_user, test_pool, unique_name};

async fn create_community(pool: &PgPool, owner: UserId) -> Subdiscepto {
    let name = unique_name(pool, "cats").await;
    let subdiscepto = NewSubdiscepto::new(
        &name,
        SubdisceptoSettings {
            public: true,
            ..SubdisceptoSettings::default()
        },
    );
    let Ok(subdiscepto) = subdiscepto else {
        panic!("test community name should be valid");
    };

    let created = PostgresSubdisceptoRepository::new(pool.clone())
        .create_subdiscepto(
            owner,
            subdiscepto,
            &PresetRoleSeed::for_kind(RoleDomainKind::Subdiscepto),
            &[PresetRole::Common, PresetRole::Admin],
        )
        .await;
    match created {
        Ok(created) => created,
        Err(error) => panic!("community creation should succeed: {error}"),
    }
}

async fn role_names(pool: &PgPool, user_id: UserId, domain: RoleDomainId) -> Vec<String> {
    PostgresRoleRepository::new(pool.clone())
        .list_user_roles(user_id, domain)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|role| role.name)
        .collect()
}

#[tokio::test]
async fn creation_installs_presets_and_assigns_the_creator() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let owner = insert_user(&pool, "owner").await;
    let cats = create_community(&pool, owner).await;
    assert!(!cats.role_domain.is_global());

    assert_eq!(
        role_names(&pool, owner, cats.role_domain).await,
        vec!["common".to_owned(), "admin".to_owned()]
    );

    let roles = PostgresRoleRepository::new(pool.clone())
        .list_roles(cats.role_domain)
        .await
        .unwrap_or_default();
    let names: Vec<&str> = roles.iter().map(|role| role.name.as_str()).collect();
    assert_eq!(names, vec!["common", "common-after-rejoin", "admin"]);
    assert!(roles.iter().all(|role| role.preset));
}

#[tokio::test]
async fn duplicate_community_rolls_back_the_role_domain() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let owner = insert_user(&pool, "duplicate").await;
    let cats = create_community(&pool, owner).await;
    let again = PostgresSubdisceptoRepository::new(pool.clone())
        .create_subdiscepto(
            owner,
            NewSubdiscepto {
                name: cats.name.clone(),
                settings: SubdisceptoSettings::default(),
            },
            &PresetRoleSeed::for_kind(RoleDomainKind::Subdiscepto),
            &[PresetRole::Common, PresetRole::Admin],
        )
        .await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));

    let orphaned = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM roledomains
        WHERE domain_type = 'subdiscepto'
          AND NOT EXISTS (
              SELECT 1 FROM subdisceptos WHERE subdisceptos.roledomain_id = roledomains.id
          )
        "#,
    )
    .fetch_one(&pool)
    .await;
    assert_eq!(orphaned.ok(), Some(0));
}

#[tokio::test]
async fn leave_then_rejoin_restores_common() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSubdisceptoRepository::new(pool.clone());
    let owner = insert_user(&pool, "alice").await;
    let member = insert_user(&pool, "bob").await;
    let cats = create_community(&pool, owner).await;

    let joined = repository.join_subdiscepto(&cats, member).await;
    assert!(matches!(joined, Ok(MembershipChange::Joined)));
    assert_eq!(
        role_names(&pool, member, cats.role_domain).await,
        vec!["common".to_owned()]
    );

    assert!(repository.leave_subdiscepto(&cats, member, true).await.is_ok());
    assert_eq!(
        role_names(&pool, member, cats.role_domain).await,
        vec!["common-after-rejoin".to_owned()]
    );
    let membership = repository.find_membership(&cats.name, member).await;
    assert!(matches!(membership, Ok(Some(ref row)) if row.left_at.is_some()));

    let rejoined = repository.join_subdiscepto(&cats, member).await;
    assert!(matches!(rejoined, Ok(MembershipChange::Rejoined)));

    assert_eq!(
        role_names(&pool, member, cats.role_domain).await,
        vec!["common".to_owned()]
    );
    let membership = repository.find_membership(&cats.name, member).await;
    assert!(matches!(membership, Ok(Some(ref row)) if row.left_at.is_none()));
}

#[tokio::test]
async fn joining_an_active_membership_keeps_a_single_common_role() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSubdisceptoRepository::new(pool.clone());
    let owner = insert_user(&pool, "owner").await;
    let member = insert_user(&pool, "member").await;
    let cats = create_community(&pool, owner).await;

    let joined = repository.join_subdiscepto(&cats, member).await;
    assert!(matches!(joined, Ok(MembershipChange::Joined)));
    let again = repository.join_subdiscepto(&cats, member).await;
    assert!(matches!(again, Ok(MembershipChange::Rejoined)));

    assert_eq!(
        role_names(&pool, member, cats.role_domain).await,
        vec!["common".to_owned()]
    );
    let membership = repository.find_membership(&cats.name, member).await;
    assert!(matches!(membership, Ok(Some(ref row)) if row.left_at.is_none()));
}

#[tokio::test]
async fn deleting_a_community_removes_its_roles() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSubdisceptoRepository::new(pool.clone());
    let owner = insert_user(&pool, "owner").await;
    let cats = create_community(&pool, owner).await;

    assert!(repository.delete_subdiscepto(&cats).await.is_ok());
    assert!(role_names(&pool, owner, cats.role_domain).await.is_empty());

    let found = repository.find_subdiscepto(&cats.name).await;
    assert!(matches!(found, Err(AppError::NotFound(_))));
}
