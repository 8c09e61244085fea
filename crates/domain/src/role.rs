//! Role domains, roles and the preset role catalogue.

use std::fmt::{Display, Formatter};

use discepto_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{Permission, PermissionSet};

/// Identifier of a role namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleDomainId(i32);

impl RoleDomainId {
    /// Sentinel id of the single global role domain.
    pub const GLOBAL: Self = Self(-123);

    /// Wraps a persisted role domain id.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Returns whether this is the global role domain.
    #[must_use]
    pub fn is_global(&self) -> bool {
        *self == Self::GLOBAL
    }

    /// Returns the kind of scope this domain belongs to.
    #[must_use]
    pub fn kind(&self) -> RoleDomainKind {
        if self.is_global() {
            RoleDomainKind::Global
        } else {
            RoleDomainKind::Subdiscepto
        }
    }
}

impl Display for RoleDomainId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Scope kind of a role domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDomainKind {
    /// The site-wide domain.
    Global,
    /// A community-local domain.
    Subdiscepto,
}

impl RoleDomainKind {
    /// Returns the stable storage value stored in `roledomains.domain_type`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "discepto",
            Self::Subdiscepto => "subdiscepto",
        }
    }
}

/// Surrogate identifier of a persisted role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(i32);

impl RoleId {
    /// Wraps a persisted role id.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named, flat permission bundle inside one role domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Surrogate id.
    pub id: RoleId,
    /// Owning role domain.
    pub domain: RoleDomainId,
    /// Unique name within the domain.
    pub name: String,
    /// Preset roles are immutable through the public API.
    pub preset: bool,
}

/// Validated name of a custom (non-preset) role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleName(NonEmptyString);

impl RoleName {
    /// Validates a custom role name. Preset names are reserved.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value.into().trim())?;
        if PresetRole::from_name(value.as_str()).is_some() {
            return Err(AppError::InvalidFormat(format!(
                "role name '{}' is reserved",
                value.as_str()
            )));
        }

        Ok(Self(value))
    }

    /// Returns the role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Roles installed at bootstrap (global) or community creation (local).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetRole {
    /// Owner archetype of a domain.
    Admin,
    /// Default role of every user or member.
    Common,
    /// Marker role held by members who left in good standing.
    CommonAfterRejoin,
}

impl PresetRole {
    /// Returns the reserved role name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Common => "common",
            Self::CommonAfterRejoin => "common-after-rejoin",
        }
    }

    /// Resolves a reserved name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Self::Admin),
            "common" => Some(Self::Common),
            "common-after-rejoin" => Some(Self::CommonAfterRejoin),
            _ => None,
        }
    }

    /// Preset roles of the global domain, in creation order.
    #[must_use]
    pub fn global() -> &'static [Self] {
        &[Self::Admin, Self::Common]
    }

    /// Preset roles of a community domain, in creation order.
    #[must_use]
    pub fn subdiscepto() -> &'static [Self] {
        &[Self::Common, Self::CommonAfterRejoin, Self::Admin]
    }

    /// Returns the fixed permission set of this preset in the given scope.
    #[must_use]
    pub fn permissions(&self, kind: RoleDomainKind) -> PermissionSet {
        match (kind, self) {
            (RoleDomainKind::Global, Self::Admin) => global_admin_permissions(),
            (RoleDomainKind::Global, Self::Common) => PermissionSet::from([
                Permission::UseLocalPermissions,
                Permission::CreateVote,
                Permission::DeleteVote,
            ]),
            // No global marker role exists; the set is kept empty.
            (RoleDomainKind::Global, Self::CommonAfterRejoin) => PermissionSet::empty(),
            (RoleDomainKind::Subdiscepto, Self::Admin) => subdiscepto_owner_permissions(),
            (RoleDomainKind::Subdiscepto, Self::Common) => PermissionSet::from([
                Permission::ReadSubdiscepto,
                Permission::CreateEssay,
                Permission::CommonAfterRejoin,
                Permission::CreateReport,
            ]),
            (RoleDomainKind::Subdiscepto, Self::CommonAfterRejoin) => {
                PermissionSet::from([Permission::CommonAfterRejoin])
            }
        }
    }
}

/// All global permissions.
#[must_use]
pub fn global_admin_permissions() -> PermissionSet {
    PermissionSet::everything()
}

/// The owner archetype of a community. Deleting a community requires an
/// effective set equal to this one.
#[must_use]
pub fn subdiscepto_owner_permissions() -> PermissionSet {
    PermissionSet::from([
        Permission::ReadSubdiscepto,
        Permission::UpdateSubdiscepto,
        Permission::CreateEssay,
        Permission::DeleteEssay,
        Permission::BanUser,
        Permission::ChangeRanking,
        Permission::DeleteSubdiscepto,
        Permission::ManageRole,
        Permission::CommonAfterRejoin,
        Permission::CreateReport,
        Permission::ViewReport,
        Permission::DeleteReport,
    ])
}

/// Community permissions that are OR-ed in from the user's global set.
#[must_use]
pub fn inherited_permissions() -> PermissionSet {
    PermissionSet::from([
        Permission::ReadSubdiscepto,
        Permission::UpdateSubdiscepto,
        Permission::CreateEssay,
        Permission::DeleteEssay,
        Permission::BanUser,
        Permission::DeleteSubdiscepto,
        Permission::ChangeRanking,
        Permission::ManageRole,
        Permission::CommonAfterRejoin,
        Permission::ViewReport,
        Permission::DeleteReport,
    ])
}
