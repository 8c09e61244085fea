use std::str::FromStr;

use discepto_core::AppError;
use proptest::prelude::*;

use super::{Permission, PermissionSet};

fn permission_set() -> impl Strategy<Value = PermissionSet> {
    proptest::sample::subsequence(Permission::all().to_vec(), 0..=Permission::all().len())
        .prop_map(PermissionSet::new)
}

fn any_permission() -> impl Strategy<Value = Permission> {
    proptest::sample::select(Permission::all().to_vec())
}

#[test]
fn permission_roundtrip_storage_value() {
    for permission in Permission::all() {
        let restored = Permission::from_str(permission.as_str());
        assert_eq!(restored.ok(), Some(*permission));
    }
}

#[test]
fn unknown_permission_is_rejected() {
    let parsed = Permission::from_str("ban_everyone");
    assert!(matches!(parsed, Err(AppError::InvalidFormat(_))));
}

#[test]
fn vocabulary_has_twenty_one_distinct_names() {
    assert_eq!(PermissionSet::everything().len(), 21);
}

#[test]
fn serde_uses_storage_names() {
    let set = PermissionSet::from([Permission::ManageRole, Permission::BanUser]);
    let encoded = serde_json::to_string(&set).unwrap_or_default();
    assert_eq!(encoded, r#"["ban_user","manage_role"]"#);
}

#[test]
fn list_is_lexical() {
    let set = PermissionSet::from([
        Permission::UseLocalPermissions,
        Permission::CreateVote,
        Permission::DeleteVote,
    ]);
    assert_eq!(
        set.names(),
        vec!["create_vote", "delete_vote", "use_local_permissions"]
    );
}

#[test]
fn require_reports_every_missing_name() {
    let set = PermissionSet::from([Permission::ReadSubdiscepto]);
    let result = set.require(&[
        Permission::ReadSubdiscepto,
        Permission::ManageRole,
        Permission::BanUser,
    ]);
    let missing = result
        .err()
        .and_then(|error| error.missing_permissions().map(<[String]>::to_vec))
        .unwrap_or_default();
    assert_eq!(missing, vec!["ban_user".to_owned(), "manage_role".to_owned()]);
}

#[test]
fn from_names_rejects_unknown_entries() {
    assert!(PermissionSet::from_names(["login", "fly"]).is_err());
    let parsed = PermissionSet::from_names(["login", "create_vote"]);
    assert_eq!(
        parsed.ok(),
        Some(PermissionSet::from([Permission::Login, Permission::CreateVote]))
    );
}

proptest! {
    #[test]
    fn union_contains_both_operands(a in permission_set(), b in permission_set()) {
        let union = a.union(&b);
        prop_assert!(a.subset_of(&union));
        prop_assert!(b.subset_of(&union));
    }

    #[test]
    fn intersection_is_contained_in_both(a in permission_set(), b in permission_set()) {
        let intersection = a.intersect(&b);
        prop_assert!(intersection.subset_of(&a));
        prop_assert!(intersection.subset_of(&b));
    }

    #[test]
    fn require_all_matches_subset(a in permission_set(), b in permission_set()) {
        prop_assert_eq!(a.require_all(&b).is_ok(), b.subset_of(&a));
    }

    #[test]
    fn require_on_singleton_succeeds(permission in any_permission()) {
        prop_assert!(PermissionSet::new([permission]).require(&[permission]).is_ok());
    }

    #[test]
    fn require_on_empty_reports_the_permission(permission in any_permission()) {
        let error = PermissionSet::empty().require(&[permission]).err();
        let missing = error
            .as_ref()
            .and_then(AppError::missing_permissions)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        prop_assert_eq!(missing, vec![permission.as_str().to_owned()]);
    }
}
