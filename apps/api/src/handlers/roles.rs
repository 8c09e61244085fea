use super::*;

pub async fn list_global_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let caller = Caller::resolve(&state, &context).await?;
    list_roles(caller.global.roles()).await
}

pub async fn list_community_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let caller = Caller::resolve(&state, &context).await?;
    list_roles(caller.community(&name).await?.roles()).await
}

pub async fn list_user_global_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let caller = Caller::resolve(&state, &context).await?;
    let roles = caller
        .global
        .roles()
        .list_user_roles(UserId::new(user_id))
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_global_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let caller = Caller::resolve(&state, &context).await?;
    create_role(caller.global.roles(), &payload.name).await
}

pub async fn create_community_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let caller = Caller::resolve(&state, &context).await?;
    create_role(caller.community(&name).await?.roles(), &payload.name).await
}

pub async fn global_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(role_name): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let caller = Caller::resolve(&state, &context).await?;
    describe_role(caller.global.roles(), &role_name).await
}

pub async fn community_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, role_name)): Path<(String, String)>,
) -> ApiResult<Json<RoleResponse>> {
    let caller = Caller::resolve(&state, &context).await?;
    describe_role(caller.community(&name).await?.roles(), &role_name).await
}

pub async fn set_global_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(role_name): Path<String>,
    Json(payload): Json<SetRolePermissionsRequest>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    set_permissions(caller.global.roles(), &role_name, payload).await
}

pub async fn set_community_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, role_name)): Path<(String, String)>,
    Json(payload): Json<SetRolePermissionsRequest>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    set_permissions(caller.community(&name).await?.roles(), &role_name, payload).await
}

pub async fn delete_global_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(role_name): Path<String>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    delete_role(caller.global.roles(), &role_name).await
}

pub async fn delete_community_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, role_name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    delete_role(caller.community(&name).await?.roles(), &role_name).await
}

pub async fn assign_global_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(role_name): Path<String>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    assign(caller.global.roles(), &role_name, payload.user_id).await
}

pub async fn assign_community_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, role_name)): Path<(String, String)>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    assign(
        caller.community(&name).await?.roles(),
        &role_name,
        payload.user_id,
    )
    .await
}

pub async fn unassign_global_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((role_name, user_id)): Path<(String, i32)>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    unassign(caller.global.roles(), &role_name, UserId::new(user_id)).await
}

pub async fn unassign_community_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, role_name, user_id)): Path<(String, String, i32)>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    unassign(
        caller.community(&name).await?.roles(),
        &role_name,
        UserId::new(user_id),
    )
    .await
}

async fn list_roles(roles: &RolesService) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = roles
        .list_roles()
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

async fn create_role(
    roles: &RolesService,
    role_name: &str,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = roles.create_role(role_name).await?;
    Ok((
        StatusCode::CREATED,
        Json(RoleResponse {
            permissions: Some(PermissionSet::empty()),
            ..RoleResponse::from(role)
        }),
    ))
}

async fn describe_role(roles: &RolesService, role_name: &str) -> ApiResult<Json<RoleResponse>> {
    let role = roles.find_role(role_name).await?;
    let permissions = roles.list_role_permissions(&role).await?;

    Ok(Json(RoleResponse {
        permissions: Some(permissions),
        ..RoleResponse::from(role)
    }))
}

async fn set_permissions(
    roles: &RolesService,
    role_name: &str,
    payload: SetRolePermissionsRequest,
) -> ApiResult<StatusCode> {
    let role = roles.find_role(role_name).await?;
    let permissions = PermissionSet::new(payload.permissions);
    roles.set_permissions(&role, &permissions).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_role(roles: &RolesService, role_name: &str) -> ApiResult<StatusCode> {
    let role = roles.find_role(role_name).await?;
    roles.delete_role(&role).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn assign(roles: &RolesService, role_name: &str, user_id: UserId) -> ApiResult<StatusCode> {
    let role = roles.find_role(role_name).await?;
    roles.assign(user_id, &role).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn unassign(
    roles: &RolesService,
    role_name: &str,
    user_id: UserId,
) -> ApiResult<StatusCode> {
    let role = roles.find_role(role_name).await?;
    roles.unassign(user_id, &role).await?;

    Ok(StatusCode::NO_CONTENT)
}
