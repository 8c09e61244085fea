//! Closed permission vocabulary and the set algebra used by every policy check.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use discepto_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Permissions enforced by scope handles and the role-management service.
///
/// The storage strings are persisted in `role_perms.permission` and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows signing in and listing global members.
    Login,
    /// Allows creating communities.
    CreateSubdiscepto,
    /// Allows reading a community and its essays.
    ReadSubdiscepto,
    /// Allows editing community settings.
    UpdateSubdiscepto,
    /// Allows deleting a community.
    DeleteSubdiscepto,
    /// Allows deleting any user account.
    DeleteUser,
    /// Allows reading essays outside any community check.
    ReadEssay,
    /// Allows posting essays and replies.
    CreateEssay,
    /// Allows deleting essays of other users.
    DeleteEssay,
    /// Allows changing essay ranking.
    ChangeRanking,
    /// Marks users allowed to regain `common` after leaving and rejoining.
    CommonAfterRejoin,
    /// Allows reporting essays.
    CreateReport,
    /// Allows reading reports.
    ViewReport,
    /// Allows deleting reports.
    DeleteReport,
    /// Enables loading community-local roles for the user.
    UseLocalPermissions,
    /// Allows managing roles in the global role domain.
    ManageGlobalRole,
    /// Allows managing roles in a community role domain.
    ManageRole,
    /// Allows banning users from the whole site.
    BanUserGlobally,
    /// Allows banning users from a community.
    BanUser,
    /// Allows casting votes.
    CreateVote,
    /// Allows withdrawing votes.
    DeleteVote,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::CreateSubdiscepto => "create_subdiscepto",
            Self::ReadSubdiscepto => "read_subdiscepto",
            Self::UpdateSubdiscepto => "update_subdiscepto",
            Self::DeleteSubdiscepto => "delete_subdiscepto",
            Self::DeleteUser => "delete_user",
            Self::ReadEssay => "read_essay",
            Self::CreateEssay => "create_essay",
            Self::DeleteEssay => "delete_essay",
            Self::ChangeRanking => "change_ranking",
            Self::CommonAfterRejoin => "common_after_rejoin",
            Self::CreateReport => "create_report",
            Self::ViewReport => "view_report",
            Self::DeleteReport => "delete_report",
            Self::UseLocalPermissions => "use_local_permissions",
            Self::ManageGlobalRole => "manage_global_role",
            Self::ManageRole => "manage_role",
            Self::BanUserGlobally => "ban_user_globally",
            Self::BanUser => "ban_user",
            Self::CreateVote => "create_vote",
            Self::DeleteVote => "delete_vote",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::Login,
            Permission::CreateSubdiscepto,
            Permission::ReadSubdiscepto,
            Permission::UpdateSubdiscepto,
            Permission::DeleteSubdiscepto,
            Permission::DeleteUser,
            Permission::ReadEssay,
            Permission::CreateEssay,
            Permission::DeleteEssay,
            Permission::ChangeRanking,
            Permission::CommonAfterRejoin,
            Permission::CreateReport,
            Permission::ViewReport,
            Permission::DeleteReport,
            Permission::UseLocalPermissions,
            Permission::ManageGlobalRole,
            Permission::ManageRole,
            Permission::BanUserGlobally,
            Permission::BanUser,
            Permission::CreateVote,
            Permission::DeleteVote,
        ];

        ALL
    }
}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Sets enumerate lexically by storage name.
impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::InvalidFormat(format!("unknown permission value '{value}'")))
    }
}

/// A subset of the permission vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates a set holding exactly the given permissions.
    #[must_use]
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self(permissions.into_iter().collect())
    }

    /// Creates the empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a set holding the whole vocabulary.
    #[must_use]
    pub fn everything() -> Self {
        Self::new(Permission::all().iter().copied())
    }

    /// Parses persisted permission names.
    pub fn from_names<I, S>(names: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| Permission::from_str(name.as_ref()))
            .collect::<AppResult<BTreeSet<_>>>()
            .map(Self)
    }

    /// Returns whether the permission is present.
    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Adds a permission in place.
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Succeeds iff every listed permission is present; otherwise reports the
    /// missing ones.
    pub fn require(&self, permissions: &[Permission]) -> AppResult<()> {
        self.require_all(&Self::new(permissions.iter().copied()))
    }

    /// Succeeds iff `other` is a subset of this set.
    pub fn require_all(&self, other: &Self) -> AppResult<()> {
        let missing = other.difference(self);
        if missing.is_empty() {
            return Ok(());
        }

        Err(AppError::permission_denied(missing.names()))
    }

    /// Returns whether every permission of this set is in `other`.
    #[must_use]
    pub fn subset_of(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// Returns the intersection of both sets.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// Returns the permissions of this set that are absent from `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).copied().collect())
    }

    /// Lists the permissions in lexical order of their storage names.
    #[must_use]
    pub fn list(&self) -> Vec<Permission> {
        self.0.iter().copied().collect()
    }

    /// Lists storage names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Permission::as_str).collect()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of permissions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(value: [Permission; N]) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests;
