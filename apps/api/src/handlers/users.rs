use super::*;

pub async fn register_user_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .discepto
        .register_user(
            &context.cancellation,
            &payload.name,
            &payload.email,
            &payload.password,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let caller = Caller::resolve(&state, &context).await?;
    let users = caller
        .global
        .list_members()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn public_user_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<PublicUser>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.global.read_public_user(UserId::new(user_id)).await?))
}

pub async fn list_user_essays_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<Vec<Essay>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.global.list_user_essays(UserId::new(user_id)).await?))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    let target = UserId::new(user_id);

    match caller.user.as_ref() {
        Some(user) if user.id() == target => user.delete().await?,
        _ => caller.global.user_handle_for(target).await?.delete().await?,
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_my_subdisceptos_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<String>>> {
    let caller = Caller::resolve(&state, &context).await?;
    let names = caller
        .global
        .list_user_subdisceptos()
        .await?
        .into_iter()
        .map(|name| name.as_str().to_owned())
        .collect();

    Ok(Json(names))
}

pub async fn permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<PermissionsResponse>> {
    let caller = Caller::resolve(&state, &context).await?;

    Ok(Json(PermissionsResponse {
        granted: caller.global.permissions().clone(),
        available: caller.global.list_available_permissions(),
    }))
}
