use super::*;

pub async fn list_notifications_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<NotificationView>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.global.list_notifications().await?))
}

pub async fn delete_notification_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(notification_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    caller
        .global
        .delete_notification(NotificationId::new(notification_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
