use super::*;

pub async fn list_subdisceptos_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<SubdisceptoSummary>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.global.list_subdisceptos().await?))
}

pub async fn create_subdiscepto_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(payload): Json<CreateSubdisceptoRequest>,
) -> ApiResult<(StatusCode, Json<SubdisceptoResponse>)> {
    let caller = Caller::resolve(&state, &context).await?;
    let created = caller
        .global
        .create_subdiscepto(caller.user()?, &payload.name, payload.settings)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubdisceptoResponse::from(created.read_view()?)),
    ))
}

pub async fn subdiscepto_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Json<SubdisceptoResponse>> {
    let caller = Caller::resolve(&state, &context).await?;
    let community = caller.community(&name).await?;

    Ok(Json(SubdisceptoResponse::from(community.read_view()?)))
}

pub async fn update_subdiscepto_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
    Json(settings): Json<SubdisceptoSettings>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    caller.community(&name).await?.update(settings).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_subdiscepto_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    caller.community(&name).await?.delete().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Member>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.community(&name).await?.list_members().await?))
}

pub async fn join_subdiscepto_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Json<MembershipChange>> {
    let caller = Caller::resolve(&state, &context).await?;
    let change = caller
        .community(&name)
        .await?
        .add_member(caller.user()?)
        .await?;

    Ok(Json(change))
}

pub async fn leave_subdiscepto_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    caller
        .community(&name)
        .await?
        .remove_member(caller.user()?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
