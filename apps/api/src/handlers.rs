use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use discepto_application::{DisceptoHandle, RolesService, SubdisceptoHandle, UserHandle};
use discepto_core::AppError;
use discepto_domain::{
    Essay, EssayId, Member, MembershipChange, NotificationId, NotificationView, PermissionSet,
    PublicUser, ReplyType, Report, ReportId, SubdisceptoSettings, SubdisceptoSummary, UserId,
};

use crate::dto::{
    AssignRoleRequest, CreateEssayRequest, CreateReportRequest, CreateRoleRequest,
    CreateSubdisceptoRequest, EssayResponse, PermissionsResponse, RegisterUserRequest, ReplyQuery,
    RoleResponse, SearchQuery, SetRolePermissionsRequest, SubdisceptoResponse, UserResponse,
    UserVoteResponse, VoteRequest,
};
use crate::error::ApiResult;
use crate::middleware::RequestContext;
use crate::state::AppState;

mod essays;
mod health;
mod notifications;
mod roles;
mod subdisceptos;
mod users;

pub use essays::{
    create_essay_handler, create_reply_handler, create_report_handler, delete_essay_handler,
    delete_report_handler, delete_vote_handler, essay_handler, feed_handler, list_essays_handler,
    list_replies_handler, list_reports_handler, search_essays_handler, user_vote_handler,
    vote_handler,
};
pub use health::health_handler;
pub use notifications::{delete_notification_handler, list_notifications_handler};
pub use roles::{
    assign_community_role_handler, assign_global_role_handler, community_role_handler,
    create_community_role_handler, create_global_role_handler, delete_community_role_handler,
    delete_global_role_handler, global_role_handler, list_community_roles_handler,
    list_global_roles_handler, list_user_global_roles_handler, set_community_role_handler,
    set_global_role_handler, unassign_community_role_handler, unassign_global_role_handler,
};
pub use subdisceptos::{
    create_subdiscepto_handler, delete_subdiscepto_handler, join_subdiscepto_handler,
    leave_subdiscepto_handler, list_members_handler, list_subdisceptos_handler,
    subdiscepto_handler, update_subdiscepto_handler,
};
pub use users::{
    delete_user_handler, list_my_subdisceptos_handler, list_user_essays_handler,
    list_users_handler, permissions_handler, public_user_handler, register_user_handler,
};

/// The acting user, if any, and their global handle.
struct Caller {
    user: Option<UserHandle>,
    global: DisceptoHandle,
}

impl Caller {
    async fn resolve(state: &AppState, context: &RequestContext) -> ApiResult<Self> {
        let user = match context.user_id {
            Some(user_id) => Some(
                state
                    .discepto
                    .user_handle(&context.cancellation, user_id)
                    .await?,
            ),
            None => None,
        };
        let global = state
            .discepto
            .discepto_handle(&context.cancellation, user.as_ref())
            .await?;

        Ok(Self { user, global })
    }

    fn user(&self) -> ApiResult<&UserHandle> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::permission_denied(Vec::<String>::new()).into())
    }

    async fn community(&self, name: &str) -> ApiResult<SubdisceptoHandle> {
        Ok(self.global.subdiscepto_handle(name).await?)
    }
}
