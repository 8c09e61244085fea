use discepto_application::{EssayCapabilities, EssayHandle, SubdisceptoView};
use discepto_core::AppResult;
use discepto_domain::{
    Essay, EssayDraft, EssaySearch, FlagType, Permission, PermissionSet, ReplyType, Role,
    SubdisceptoSettings, User, UserId, VoteType,
};
use serde::{Deserialize, Serialize};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// API representation of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// The caller's global permissions next to the full vocabulary.
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub granted: PermissionSet,
    pub available: PermissionSet,
}

/// Incoming payload for community creation.
#[derive(Debug, Deserialize)]
pub struct CreateSubdisceptoRequest {
    pub name: String,
    #[serde(flatten)]
    pub settings: SubdisceptoSettings,
}

/// API representation of a community as seen by the caller.
#[derive(Debug, Serialize)]
pub struct SubdisceptoResponse {
    pub name: String,
    pub description: String,
    pub min_length: i32,
    pub questions_required: bool,
    pub nsfw: bool,
    pub public: bool,
    pub is_member: bool,
    pub permissions: PermissionSet,
}

impl From<SubdisceptoView> for SubdisceptoResponse {
    fn from(view: SubdisceptoView) -> Self {
        Self {
            name: view.subdiscepto.name.as_str().to_owned(),
            description: view.subdiscepto.description,
            min_length: view.subdiscepto.min_length,
            questions_required: view.subdiscepto.questions_required,
            nsfw: view.subdiscepto.nsfw,
            public: view.subdiscepto.public,
            is_member: view.is_member,
            permissions: view.permissions,
        }
    }
}

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// Incoming payload replacing a role's permissions.
#[derive(Debug, Deserialize)]
pub struct SetRolePermissionsRequest {
    pub permissions: Vec<Permission>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: UserId,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub name: String,
    pub preset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            name: role.name,
            preset: role.preset,
            permissions: None,
        }
    }
}

/// Incoming payload for essays and replies.
#[derive(Debug, Deserialize)]
pub struct CreateEssayRequest {
    pub thesis: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub reply_type: Option<ReplyType>,
}

impl CreateEssayRequest {
    pub fn into_draft(self) -> (EssayDraft, Option<ReplyType>) {
        (
            EssayDraft {
                thesis: self.thesis,
                content: self.content,
                tags: self.tags,
            },
            self.reply_type,
        )
    }
}

/// Query filter for reply listings.
#[derive(Debug, Default, Deserialize)]
pub struct ReplyQuery {
    pub reply_type: Option<ReplyType>,
}

/// API representation of an essay with the caller's capabilities on it.
#[derive(Debug, Serialize)]
pub struct EssayResponse {
    #[serde(flatten)]
    pub essay: Essay,
    pub can_delete: bool,
    pub can_change_ranking: bool,
}

impl From<&EssayHandle> for EssayResponse {
    fn from(handle: &EssayHandle) -> Self {
        let EssayCapabilities {
            delete,
            change_ranking,
            ..
        } = handle.capabilities();
        Self {
            essay: handle.essay().clone(),
            can_delete: delete,
            can_change_ranking: change_ranking,
        }
    }
}

/// Field an essay search runs against.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Tags,
    Thesis,
}

/// Query for essay search. Tags are comma separated.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub by: SearchField,
    pub q: String,
}

impl SearchQuery {
    pub fn into_search(self) -> AppResult<EssaySearch> {
        match self.by {
            SearchField::Tags => EssaySearch::by_tags(self.q.split(',')),
            SearchField::Thesis => EssaySearch::by_thesis(&self.q),
        }
    }
}

/// The caller's current vote on an essay.
#[derive(Debug, Serialize)]
pub struct UserVoteResponse {
    pub vote: Option<VoteType>,
}

/// Incoming payload for a vote.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote: VoteType,
}

/// Incoming payload for a report.
#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub flag: FlagType,
    #[serde(default)]
    pub description: String,
}
