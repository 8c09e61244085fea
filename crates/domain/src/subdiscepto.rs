//! Communities ("subdisceptos") and their membership rows.

use chrono::{DateTime, Utc};
use discepto_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{Role, RoleDomainId, UserId};

/// Validated community name: one or more ASCII letters, digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubdisceptoName(String);

impl SubdisceptoName {
    /// Validates a community name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || character == '_');
        if !valid {
            return Err(AppError::InvalidFormat(format!(
                "subdiscepto name '{value}' must only contain letters, digits or '_'"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for SubdisceptoName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Persisted community row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subdiscepto {
    /// Unique name.
    pub name: SubdisceptoName,
    /// Free text description.
    pub description: String,
    /// Minimum essay content length.
    pub min_length: i32,
    /// Whether essays must ask questions.
    pub questions_required: bool,
    /// Not-safe-for-work flag.
    pub nsfw: bool,
    /// Public communities are readable by everyone.
    pub public: bool,
    /// The community's own role domain.
    pub role_domain: RoleDomainId,
}

/// Settings shared by community creation and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdisceptoSettings {
    /// Free text description.
    pub description: String,
    /// Minimum essay content length.
    pub min_length: i32,
    /// Whether essays must ask questions.
    pub questions_required: bool,
    /// Not-safe-for-work flag.
    pub nsfw: bool,
    /// Public communities are readable by everyone.
    pub public: bool,
}

impl SubdisceptoSettings {
    /// Rejects settings that no essay could satisfy.
    pub fn validate(&self) -> AppResult<()> {
        let max = i32::try_from(crate::LIMIT_MAX_CONTENT_LEN).unwrap_or(i32::MAX);
        if !(0..=max).contains(&self.min_length) {
            return Err(AppError::InvalidFormat(format!(
                "min_length must be between 0 and {max}"
            )));
        }

        Ok(())
    }
}

/// Validated input of community creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubdiscepto {
    /// Unique name.
    pub name: SubdisceptoName,
    /// Initial settings.
    pub settings: SubdisceptoSettings,
}

impl NewSubdiscepto {
    /// Validates name and settings.
    pub fn new(name: &str, settings: SubdisceptoSettings) -> AppResult<Self> {
        let name = SubdisceptoName::new(name)?;
        settings.validate()?;
        Ok(Self { name, settings })
    }
}

/// Membership row. `left_at` is set while the user is away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Community name.
    pub subdiscepto: SubdisceptoName,
    /// Member.
    pub user_id: UserId,
    /// First join time.
    pub joined_at: DateTime<Utc>,
    /// Time of the last leave, `None` while the user is a current member.
    pub left_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Returns whether the user is a current member.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// How a join request was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    /// A new membership row was inserted.
    Joined,
    /// An existing row was reopened.
    Rejoined,
}

/// Member listing entry with the member's community roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member id.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Time of the last leave, if any.
    pub left_at: Option<DateTime<Utc>>,
    /// Roles held in the community domain, ordered by role id.
    pub roles: Vec<Role>,
}

/// Listing entry of a community as seen by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdisceptoSummary {
    /// Community name.
    pub name: SubdisceptoName,
    /// Free text description.
    pub description: String,
    /// Whether the community is public.
    pub public: bool,
    /// Number of current members.
    pub members_count: i64,
    /// Whether the viewer is a current member.
    pub is_member: bool,
}
