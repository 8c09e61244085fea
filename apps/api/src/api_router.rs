use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/users",
            get(handlers::list_users_handler).post(handlers::register_user_handler),
        )
        .route(
            "/api/users/{user_id}",
            delete(handlers::delete_user_handler),
        )
        .route(
            "/api/users/{user_id}/profile",
            get(handlers::public_user_handler),
        )
        .route(
            "/api/users/{user_id}/essays",
            get(handlers::list_user_essays_handler),
        )
        .route(
            "/api/users/{user_id}/roles",
            get(handlers::list_user_global_roles_handler),
        )
        .route(
            "/api/me/subdisceptos",
            get(handlers::list_my_subdisceptos_handler),
        )
        .route("/api/permissions", get(handlers::permissions_handler))
        .route("/api/feed", get(handlers::feed_handler))
        .route("/api/search", get(handlers::search_essays_handler))
        .route(
            "/api/notifications",
            get(handlers::list_notifications_handler),
        )
        .route(
            "/api/notifications/{notification_id}",
            delete(handlers::delete_notification_handler),
        )
        .route(
            "/api/roles",
            get(handlers::list_global_roles_handler).post(handlers::create_global_role_handler),
        )
        .route(
            "/api/roles/{role_name}",
            get(handlers::global_role_handler)
                .put(handlers::set_global_role_handler)
                .delete(handlers::delete_global_role_handler),
        )
        .route(
            "/api/roles/{role_name}/assignments",
            post(handlers::assign_global_role_handler),
        )
        .route(
            "/api/roles/{role_name}/assignments/{user_id}",
            delete(handlers::unassign_global_role_handler),
        )
        .route(
            "/api/subdisceptos",
            get(handlers::list_subdisceptos_handler).post(handlers::create_subdiscepto_handler),
        )
        .route(
            "/api/subdisceptos/{name}",
            get(handlers::subdiscepto_handler)
                .put(handlers::update_subdiscepto_handler)
                .delete(handlers::delete_subdiscepto_handler),
        )
        .route(
            "/api/subdisceptos/{name}/members",
            get(handlers::list_members_handler),
        )
        .route(
            "/api/subdisceptos/{name}/membership",
            put(handlers::join_subdiscepto_handler).delete(handlers::leave_subdiscepto_handler),
        )
        .route(
            "/api/subdisceptos/{name}/roles",
            get(handlers::list_community_roles_handler)
                .post(handlers::create_community_role_handler),
        )
        .route(
            "/api/subdisceptos/{name}/roles/{role_name}",
            get(handlers::community_role_handler)
                .put(handlers::set_community_role_handler)
                .delete(handlers::delete_community_role_handler),
        )
        .route(
            "/api/subdisceptos/{name}/roles/{role_name}/assignments",
            post(handlers::assign_community_role_handler),
        )
        .route(
            "/api/subdisceptos/{name}/roles/{role_name}/assignments/{user_id}",
            delete(handlers::unassign_community_role_handler),
        )
        .route(
            "/api/subdisceptos/{name}/essays",
            get(handlers::list_essays_handler).post(handlers::create_essay_handler),
        )
        .route(
            "/api/subdisceptos/{name}/essays/{essay_id}",
            get(handlers::essay_handler).delete(handlers::delete_essay_handler),
        )
        .route(
            "/api/subdisceptos/{name}/essays/{essay_id}/replies",
            get(handlers::list_replies_handler).post(handlers::create_reply_handler),
        )
        .route(
            "/api/subdisceptos/{name}/essays/{essay_id}/vote",
            get(handlers::user_vote_handler)
                .put(handlers::vote_handler)
                .delete(handlers::delete_vote_handler),
        )
        .route(
            "/api/subdisceptos/{name}/essays/{essay_id}/reports",
            post(handlers::create_report_handler),
        )
        .route(
            "/api/subdisceptos/{name}/reports",
            get(handlers::list_reports_handler),
        )
        .route(
            "/api/subdisceptos/{name}/reports/{report_id}",
            delete(handlers::delete_report_handler),
        )
        .layer(from_fn_with_state(
            app_state.clone(),
            middleware::request_context,
        ));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
