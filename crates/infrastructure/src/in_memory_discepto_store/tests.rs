use std::sync::Arc;

use discepto_application::{
    Cancellation, Discepto, DisceptoHandle, DisceptoPorts, PasswordHasher, RoleRepository,
    SubdisceptoHandle, SubdisceptoRepository, UserHandle,
};
use discepto_core::{AppError, AppResult};
use discepto_domain::{
    EssayDraft, EssaySearch, FlagType, MembershipChange, NotificationKind, Permission,
    PermissionSet, PresetRole, ReplyType, RoleDomainId, SubdisceptoName, SubdisceptoSettings,
    UserId, VoteType,
};

use super::InMemoryDisceptoStore;


const PASSWORD: &str = "Strong1!pass";

struct Site {
    store: Arc<InMemoryDisceptoStore>,
    discepto: Discepto,
    cancellation: Cancellation,
}

impl Site {
    async fn new() -> Self {
        let store = Arc::new(InMemoryDisceptoStore::new());
        let discepto = Discepto::new(ports(&store));
        assert!(discepto.bootstrap().await.is_ok());

        Self {
            store,
            discepto,
            cancellation: Cancellation::never(),
        }
    }

    async fn register(&self, name: &str, email: &str) -> UserHandle {
        let registered = self
            .discepto
            .register_user(&self.cancellation, name, email, PASSWORD)
            .await;
        let Ok(user) = registered else {
            panic!("registration of {name} should succeed");
        };

        match self.discepto.user_handle(&self.cancellation, user.id).await {
            Ok(handle) => handle,
            Err(error) => panic!("user handle of {name} should resolve: {error}"),
        }
    }

    async fn community(&self, user: Option<&UserHandle>, name: &str) -> SubdisceptoHandle {
        let resolved = match self
            .discepto
            .discepto_handle(&self.cancellation, user)
            .await
        {
            Ok(handle) => handle.subdiscepto_handle(name).await,
            Err(error) => Err(error),
        };

        match resolved {
            Ok(handle) => handle,
            Err(error) => panic!("community handle for '{name}' should resolve: {error}"),
        }
    }

    async fn create_cats(&self, owner: &UserHandle, public: bool) -> SubdisceptoHandle {
        let Ok(global) = self
            .discepto
            .discepto_handle(&self.cancellation, Some(owner))
            .await
        else {
            panic!("global handle should resolve");
        };

        let created = global
            .create_subdiscepto(
                owner,
                "cats",
                SubdisceptoSettings {
                    public,
                    ..SubdisceptoSettings::default()
                },
            )
            .await;
        match created {
            Ok(handle) => handle,
            Err(error) => panic!("community creation should succeed: {error}"),
        }
    }

    async fn global(&self, user: Option<&UserHandle>) -> DisceptoHandle {
        match self.discepto.discepto_handle(&self.cancellation, user).await {
            Ok(handle) => handle,
            Err(error) => panic!("global handle should resolve: {error}"),
        }
    }

    async fn role_names(&self, user_id: UserId, domain: RoleDomainId) -> Vec<String> {
        self.store
            .list_user_roles(user_id, domain)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|role| role.name)
            .collect()
    }
}

fn ports(store: &Arc<InMemoryDisceptoStore>) -> DisceptoPorts {
    DisceptoPorts {
        roles: store.clone(),
        subdisceptos: store.clone(),
        users: store.clone(),
        essays: store.clone(),
        notifications: store.clone(),
        password_hasher: Arc::new(PlainHasher),
    }
}

// Argon2 is exercised on its own; scenario tests only need a stored string.
struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(format!("plain${}", password.len()))
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn missing(error: &AppError) -> Vec<String> {
    error.missing_permissions().unwrap_or_default().to_vec()
}

#[tokio::test]
async fn first_user_becomes_global_admin() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;

    assert_eq!(
        site.role_names(alice.id(), RoleDomainId::GLOBAL).await,
        names(&["admin", "common"])
    );
}

#[tokio::test]
async fn second_user_is_not_admin() {
    let site = Site::new().await;
    site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;

    assert_eq!(
        site.role_names(bob.id(), RoleDomainId::GLOBAL).await,
        names(&["common"])
    );
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let site = Site::new().await;
    site.register("Alice", "a@x.com").await;

    let again = site
        .discepto
        .register_user(&site.cancellation, "Alice2", "A@X.com", PASSWORD)
        .await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));
}

#[tokio::test]
async fn community_creation_assigns_owner_presets() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let cats = site.create_cats(&alice, true).await;
    let domain = cats.subdiscepto().role_domain;

    assert!(!domain.is_global());
    assert_eq!(
        site.role_names(alice.id(), domain).await,
        names(&["common", "admin"])
    );

    let marker = site
        .store
        .find_role(domain, PresetRole::CommonAfterRejoin.name())
        .await;
    assert!(matches!(marker, Ok(ref role) if role.preset));

    let Ok(view) = cats.read_view() else {
        panic!("owner should read the community");
    };
    assert!(view.is_member);
    assert_eq!(view.permissions, discepto_domain::subdiscepto_owner_permissions());
}

#[tokio::test]
async fn member_cannot_grant_admin() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    let charlie = site.register("Charlie", "c@x.com").await;
    let cats = site.create_cats(&alice, true).await;
    let domain = cats.subdiscepto().role_domain;

    let joined = site.community(Some(&bob), "cats").await.add_member(&bob).await;
    assert!(matches!(joined, Ok(MembershipChange::Joined)));

    let Ok(admin) = site.store.find_role(domain, "admin").await else {
        panic!("community admin role should exist");
    };
    let as_bob = site.community(Some(&bob), "cats").await;
    let assigned = as_bob.roles().assign(charlie.id(), &admin).await;

    let Err(error) = assigned else {
        panic!("a plain member must not grant admin");
    };
    assert!(missing(&error).contains(&"manage_role".to_owned()));
    assert!(site.role_names(charlie.id(), domain).await.is_empty());
}

#[tokio::test]
async fn leave_then_rejoin_restores_common() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    let cats = site.create_cats(&alice, true).await;
    let domain = cats.subdiscepto().role_domain;
    let name = cats.name().clone();

    assert!(site.community(Some(&bob), "cats").await.add_member(&bob).await.is_ok());
    assert!(site.community(Some(&bob), "cats").await.remove_member(&bob).await.is_ok());
    assert_eq!(
        site.role_names(bob.id(), domain).await,
        names(&["common-after-rejoin"])
    );

    let rejoined = site.community(Some(&bob), "cats").await.add_member(&bob).await;
    assert!(matches!(rejoined, Ok(MembershipChange::Rejoined)));

    let membership = site.store.find_membership(&name, bob.id()).await;
    assert!(matches!(membership, Ok(Some(ref row)) if row.left_at.is_none()));
    assert_eq!(site.role_names(bob.id(), domain).await, names(&["common"]));
}

#[tokio::test]
async fn community_role_cannot_hold_a_global_only_permission() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let cats = site.create_cats(&alice, true).await;

    let Ok(moderator) = cats.roles().create_role("mod").await else {
        panic!("owner should create a custom role");
    };
    let denied = cats
        .roles()
        .set_permissions(
            &moderator,
            &PermissionSet::from([Permission::BanUserGlobally]),
        )
        .await;

    let Err(error) = denied else {
        panic!("a community context must not grant ban_user_globally");
    };
    assert_eq!(missing(&error), names(&["ban_user_globally"]));

    let stored = site.store.list_role_permissions(moderator.id).await;
    assert_eq!(stored.ok(), Some(PermissionSet::empty()));
}

#[tokio::test]
async fn preset_roles_are_immutable() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let cats = site.create_cats(&alice, true).await;

    let presets = site
        .store
        .list_roles(cats.subdiscepto().role_domain)
        .await
        .unwrap_or_default();
    assert_eq!(presets.len(), 3);

    for preset in &presets {
        let updated = cats
            .roles()
            .set_permissions(preset, &PermissionSet::empty())
            .await;
        assert!(matches!(updated, Err(AppError::PermissionDenied { .. })));

        let deleted = cats.roles().delete_role(preset).await;
        assert!(matches!(deleted, Err(AppError::PermissionDenied { .. })));
    }

    let after = site
        .store
        .list_roles(cats.subdiscepto().role_domain)
        .await
        .unwrap_or_default();
    assert_eq!(after, presets);
}

#[tokio::test]
async fn public_communities_are_readable_by_anyone() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    site.create_cats(&alice, true).await;

    let anonymous = site.community(None, "cats").await;
    assert!(anonymous.permissions().has(Permission::ReadSubdiscepto));
    assert!(!anonymous.permissions().has(Permission::CreateEssay));
}

#[tokio::test]
async fn private_communities_reject_outsiders() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    site.create_cats(&alice, false).await;

    let Ok(global) = site
        .discepto
        .discepto_handle(&site.cancellation, Some(&bob))
        .await
    else {
        panic!("global handle should resolve");
    };
    let denied = global.subdiscepto_handle("cats").await;

    let Err(error) = denied else {
        panic!("outsiders must not resolve a private community");
    };
    assert_eq!(missing(&error), names(&["read_subdiscepto"]));

    let listed = global.list_subdisceptos().await.unwrap_or_default();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn only_the_owner_archetype_deletes_a_community() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    let cats = site.create_cats(&alice, true).await;
    assert!(site.community(Some(&bob), "cats").await.add_member(&bob).await.is_ok());

    let as_bob = site.community(Some(&bob), "cats").await;
    let denied = as_bob.delete().await;
    let Err(error) = denied else {
        panic!("a plain member must not delete the community");
    };
    assert!(missing(&error).contains(&"delete_subdiscepto".to_owned()));

    let domain = cats.subdiscepto().role_domain;
    assert!(cats.delete().await.is_ok());
    assert!(site.store.list_roles(domain).await.unwrap_or_default().is_empty());
    let Ok(name) = SubdisceptoName::new("cats") else {
        panic!("static name should be valid");
    };
    let found = site.store.find_subdiscepto(&name).await;
    assert!(matches!(found, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn cancelled_requests_do_not_touch_storage() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let (trigger, cancellation) = Cancellation::new();

    let Ok(global) = site
        .discepto
        .discepto_handle(&cancellation, Some(&alice))
        .await
    else {
        panic!("global handle should resolve before cancellation");
    };
    trigger.cancel();

    let created = global
        .create_subdiscepto(&alice, "cats", SubdisceptoSettings::default())
        .await;
    assert!(matches!(created, Err(AppError::Cancelled)));
    assert!(site.store.list_subdisceptos(None).await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn essays_replies_votes_and_reports_flow_through_handles() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    site.create_cats(&alice, true).await;
    assert!(site.community(Some(&bob), "cats").await.add_member(&bob).await.is_ok());

    let as_alice = site.community(Some(&alice), "cats").await;
    let as_bob = site.community(Some(&bob), "cats").await;

    let draft = EssayDraft {
        thesis: "Cats are liquid".to_owned(),
        content: "They take the shape of any container.".to_owned(),
        tags: vec!["physics".to_owned()],
    };
    let Ok(essay) = as_alice.create_essay(&alice, draft.clone()).await else {
        panic!("owner should post an essay");
    };

    let Ok(reply) = as_bob
        .create_essay_reply(&bob, draft.clone(), &essay, ReplyType::Refutes)
        .await
    else {
        panic!("member should reply");
    };
    assert!(as_bob.create_vote(&essay, &bob, VoteType::Upvote).await.is_ok());
    assert!(as_alice.create_vote(&essay, &alice, VoteType::Upvote).await.is_ok());

    let Ok(global) = site
        .discepto
        .discepto_handle(&site.cancellation, Some(&alice))
        .await
    else {
        panic!("global handle should resolve");
    };
    let inbox = global.list_notifications().await.unwrap_or_default();
    let kinds: Vec<NotificationKind> = inbox
        .iter()
        .map(|view| view.notification.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationKind::Upvote, NotificationKind::Reply]);

    let replies = as_alice
        .list_replies(&essay, Some(ReplyType::Refutes))
        .await
        .unwrap_or_default();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, reply.id());

    let Ok(reloaded) = as_bob.essay_handle(essay.id()).await else {
        panic!("member should read the essay");
    };
    assert_eq!(reloaded.essay().score, 2);
    assert!(!reloaded.capabilities().delete);

    let Ok(report) = as_bob
        .create_report(&reloaded, &bob, FlagType::Inaccurate, "cats are solid")
        .await
    else {
        panic!("member should report");
    };
    let hidden = as_bob.list_reports().await;
    assert!(matches!(hidden, Err(AppError::PermissionDenied { .. })));
    assert_eq!(as_alice.list_reports().await.unwrap_or_default(), vec![report.clone()]);
    assert!(as_alice.delete_report(report.id).await.is_ok());

    assert!(matches!(
        reloaded.delete().await,
        Err(AppError::PermissionDenied { .. })
    ));
    assert!(reply.delete().await.is_ok());
    assert!(essay.delete().await.is_ok());
    assert!(as_alice.list_essays().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn short_essays_are_rejected_by_community_minimum() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let cats = site.create_cats(&alice, true).await;
    let settings = SubdisceptoSettings {
        public: true,
        min_length: 100,
        ..SubdisceptoSettings::default()
    };
    assert!(cats.update(settings).await.is_ok());

    let as_alice = site.community(Some(&alice), "cats").await;
    let posted = as_alice
        .create_essay(
            &alice,
            EssayDraft {
                thesis: "Too short".to_owned(),
                content: "Meow.".to_owned(),
                tags: Vec::new(),
            },
        )
        .await;
    assert!(matches!(
        posted,
        Err(AppError::BadContentLength { min: 100, .. })
    ));
}

#[tokio::test]
async fn administrators_delete_other_accounts() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;

    let Ok(as_bob) = site
        .discepto
        .discepto_handle(&site.cancellation, Some(&bob))
        .await
    else {
        panic!("global handle should resolve");
    };
    let denied = as_bob.user_handle_for(alice.id()).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied { .. })));

    let Ok(as_alice) = site
        .discepto
        .discepto_handle(&site.cancellation, Some(&alice))
        .await
    else {
        panic!("global handle should resolve");
    };
    let Ok(target) = as_alice.user_handle_for(bob.id()).await else {
        panic!("admin should obtain a deletion handle");
    };
    assert!(!target.capabilities().read);
    assert!(target.delete().await.is_ok());
    assert!(site.role_names(bob.id(), RoleDomainId::GLOBAL).await.is_empty());
}

#[tokio::test]
async fn site_member_list_requires_login() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;

    let Ok(as_alice) = site
        .discepto
        .discepto_handle(&site.cancellation, Some(&alice))
        .await
    else {
        panic!("global handle should resolve");
    };
    let members = as_alice.list_members().await.unwrap_or_default();
    let listed: Vec<UserId> = members.iter().map(|user| user.id).collect();
    assert_eq!(listed, vec![alice.id(), bob.id()]);

    let Ok(as_bob) = site
        .discepto
        .discepto_handle(&site.cancellation, Some(&bob))
        .await
    else {
        panic!("global handle should resolve");
    };
    let denied = as_bob.list_members().await;
    let Err(error) = denied else {
        panic!("plain users must not list site members");
    };
    assert_eq!(missing(&error), names(&["login"]));
}

fn tagged(thesis: &str, tag: &str) -> EssayDraft {
    EssayDraft {
        thesis: thesis.to_owned(),
        content: "Observed on the kitchen counter.".to_owned(),
        tags: vec![tag.to_owned()],
    }
}

#[tokio::test]
async fn replying_to_your_own_essay_sends_no_notification() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let cats = site.create_cats(&alice, true).await;

    let Ok(essay) = cats.create_essay(&alice, tagged("Cats are liquid", "physics")).await else {
        panic!("owner should post an essay");
    };
    let replied = cats
        .create_essay_reply(&alice, tagged("Mostly", "physics"), &essay, ReplyType::Supports)
        .await;
    assert!(replied.is_ok());

    let inbox = site.global(Some(&alice)).await.list_notifications().await;
    let Ok(inbox) = inbox else {
        panic!("alice should read her notifications");
    };
    assert!(inbox.is_empty());
}

#[tokio::test]
async fn private_essays_stay_out_of_search_feeds_and_profiles() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    let cats = site.create_cats(&alice, true).await;
    let created = site
        .global(Some(&alice))
        .await
        .create_subdiscepto(&alice, "dogs", SubdisceptoSettings::default())
        .await;
    let Ok(dogs) = created else {
        panic!("private community creation should succeed");
    };
    assert!(site.community(Some(&bob), "cats").await.add_member(&bob).await.is_ok());

    let Ok(liquid) = cats.create_essay(&alice, tagged("Cats are liquid", "physics")).await else {
        panic!("public essay should be posted");
    };
    let Ok(loyal) = dogs.create_essay(&alice, tagged("Dogs are loyal", "physics")).await else {
        panic!("private essay should be posted");
    };

    let Ok(search) = EssaySearch::by_tags(["physics"]) else {
        panic!("tag search should be valid");
    };
    let found = site.global(None).await.search_essays(&search).await;
    let Ok(found) = found else {
        panic!("anonymous search should succeed");
    };
    let found: Vec<_> = found.iter().map(|essay| essay.id).collect();
    assert_eq!(found, vec![liquid.id()]);

    let as_bob = site.global(Some(&bob)).await;
    let feed = as_bob.list_recent_essays().await.unwrap_or_default();
    let feed: Vec<_> = feed.iter().map(|essay| essay.id).collect();
    assert_eq!(feed, vec![liquid.id()]);

    let seen_by_bob = as_bob.list_user_essays(alice.id()).await.unwrap_or_default();
    assert_eq!(seen_by_bob.len(), 1);

    let as_alice = site.global(Some(&alice)).await;
    let own = as_alice.list_user_essays(alice.id()).await.unwrap_or_default();
    let own: Vec<_> = own.iter().map(|essay| essay.id).collect();
    assert_eq!(own, vec![loyal.id(), liquid.id()]);

    let alice_feed = as_alice.list_recent_essays().await.unwrap_or_default();
    assert_eq!(alice_feed.len(), 2);
}

#[tokio::test]
async fn votes_are_readable_only_by_their_voter() {
    let site = Site::new().await;
    let alice = site.register("Alice", "a@x.com").await;
    let bob = site.register("Bob", "b@x.com").await;
    site.create_cats(&alice, true).await;
    assert!(site.community(Some(&bob), "cats").await.add_member(&bob).await.is_ok());

    let as_bob = site.community(Some(&bob), "cats").await;
    let as_alice = site.community(Some(&alice), "cats").await;
    let Ok(essay) = as_alice.create_essay(&alice, tagged("Cats are liquid", "physics")).await
    else {
        panic!("owner should post an essay");
    };
    assert!(as_bob.create_vote(&essay, &bob, VoteType::Downvote).await.is_ok());

    let Ok(seen) = as_bob.essay_handle(essay.id()).await else {
        panic!("member should read the essay");
    };
    assert!(matches!(seen.user_vote(&bob).await, Ok(Some(VoteType::Downvote))));
    assert!(matches!(essay.user_vote(&alice).await, Ok(None)));

    let Ok(profile) = site.global(None).await.read_public_user(alice.id()).await else {
        panic!("profiles are public");
    };
    assert_eq!(profile.karma, 0);

    let unknown = site.global(None).await.read_public_user(UserId::new(999)).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}
