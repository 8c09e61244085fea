use discepto_application::{
    EssayRepository, NewEssay, NewUser, PresetRoleSeed, RegistrationGrants, SubdisceptoRepository,
    UserRepository,
};
use discepto_core::AppError;
use discepto_domain::{
    EssayDraft, NewSubdiscepto, PresetRole, RoleDomainKind, SubdisceptoSettings, UserId, VoteType,
};

use super::PostgresUserRepository;
use crate::test_database::{insert_user, test_pool, unique_name};
use crate::{PostgresEssayRepository, PostgresSubdisceptoRepository};

fn new_user(email: String) -> NewUser {
    NewUser {
        name: "Alice".to_owned(),
        email,
        password_hash: "hash".to_owned(),
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresUserRepository::new(pool);
    let email = format!("alice-{}@example.com", std::process::id());
    // Grants are empty so the test does not depend on bootstrap order.
    let grants = RegistrationGrants {
        first_user: Vec::new(),
        every_user: Vec::new(),
    };

    let created = repository
        .create_user(new_user(email.clone()), &grants)
        .await;
    let Ok(created) = created else {
        panic!("first registration should succeed");
    };
    assert_eq!(created.email, email);

    let duplicate = repository
        .create_user(new_user(email.to_uppercase()), &grants)
        .await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    assert!(repository.delete_user(created.id).await.is_ok());
    let found = repository.find_user(created.id).await;
    assert!(matches!(found, Ok(None)));
}

#[tokio::test]
async fn public_profiles_count_upvotes_on_authored_essays() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresUserRepository::new(pool.clone());
    let essays = PostgresEssayRepository::new(pool.clone());
    let author = insert_user(&pool, "karma").await;
    let voter = insert_user(&pool, "voter").await;

    let name = unique_name(&pool, "karma").await;
    let Ok(subdiscepto) = NewSubdiscepto::new(&name, SubdisceptoSettings::default()) else {
        panic!("test community name should be valid");
    };
    let created = PostgresSubdisceptoRepository::new(pool.clone())
        .create_subdiscepto(
            author,
            subdiscepto,
            &PresetRoleSeed::for_kind(RoleDomainKind::Subdiscepto),
            &[PresetRole::Admin],
        )
        .await;
    let Ok(created) = created else {
        panic!("community creation should succeed");
    };

    let draft = EssayDraft {
        thesis: "Cats are liquid".to_owned(),
        content: String::new(),
        tags: Vec::new(),
    };
    let Ok(essay) = draft.validate(0) else {
        panic!("test essay should be valid");
    };
    let posted = essays
        .create_essay(NewEssay {
            author,
            posted_in: created.name,
            essay,
            reply_to: None,
        })
        .await;
    let Ok(posted) = posted else {
        panic!("essay creation should succeed");
    };
    assert!(essays.upsert_vote(voter, posted.id, VoteType::Upvote).await.is_ok());
    assert!(essays.upsert_vote(author, posted.id, VoteType::Downvote).await.is_ok());

    let profile = repository.find_public_user(author).await;
    let Ok(Some(profile)) = profile else {
        panic!("the author's profile should load");
    };
    assert_eq!(profile.name, "karma");
    assert_eq!(profile.karma, 1);

    let missing = repository.find_public_user(UserId::new(i32::MAX)).await;
    assert!(matches!(missing, Ok(None)));
}
