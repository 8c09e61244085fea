use super::*;

pub async fn list_essays_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Essay>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.community(&name).await?.list_essays().await?))
}

pub async fn create_essay_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
    Json(payload): Json<CreateEssayRequest>,
) -> ApiResult<(StatusCode, Json<EssayResponse>)> {
    let caller = Caller::resolve(&state, &context).await?;
    let (draft, _) = payload.into_draft();
    let essay = caller
        .community(&name)
        .await?
        .create_essay(caller.user()?, draft)
        .await?;

    Ok((StatusCode::CREATED, Json(EssayResponse::from(&essay))))
}

pub async fn essay_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
) -> ApiResult<Json<EssayResponse>> {
    let caller = Caller::resolve(&state, &context).await?;
    let essay = caller
        .community(&name)
        .await?
        .essay_handle(EssayId::new(essay_id))
        .await?;

    Ok(Json(EssayResponse::from(&essay)))
}

pub async fn delete_essay_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    caller
        .community(&name)
        .await?
        .essay_handle(EssayId::new(essay_id))
        .await?
        .delete()
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_replies_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
    Query(query): Query<ReplyQuery>,
) -> ApiResult<Json<Vec<Essay>>> {
    let caller = Caller::resolve(&state, &context).await?;
    let community = caller.community(&name).await?;
    let parent = community.essay_handle(EssayId::new(essay_id)).await?;

    Ok(Json(community.list_replies(&parent, query.reply_type).await?))
}

pub async fn create_reply_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
    Json(payload): Json<CreateEssayRequest>,
) -> ApiResult<(StatusCode, Json<EssayResponse>)> {
    let caller = Caller::resolve(&state, &context).await?;
    let community = caller.community(&name).await?;
    let parent = community.essay_handle(EssayId::new(essay_id)).await?;
    let (draft, reply_type) = payload.into_draft();

    let reply = community
        .create_essay_reply(
            caller.user()?,
            draft,
            &parent,
            reply_type.unwrap_or(ReplyType::General),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(EssayResponse::from(&reply))))
}

pub async fn vote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    let community = caller.community(&name).await?;
    let essay = community.essay_handle(EssayId::new(essay_id)).await?;
    community
        .create_vote(&essay, caller.user()?, payload.vote)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_vote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
) -> ApiResult<Json<UserVoteResponse>> {
    let caller = Caller::resolve(&state, &context).await?;
    let essay = caller
        .community(&name)
        .await?
        .essay_handle(EssayId::new(essay_id))
        .await?;
    let vote = essay.user_vote(caller.user()?).await?;

    Ok(Json(UserVoteResponse { vote }))
}

pub async fn delete_vote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    let community = caller.community(&name).await?;
    let essay = community.essay_handle(EssayId::new(essay_id)).await?;
    community.delete_vote(&essay, caller.user()?).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_report_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, essay_id)): Path<(String, i32)>,
    Json(payload): Json<CreateReportRequest>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let caller = Caller::resolve(&state, &context).await?;
    let community = caller.community(&name).await?;
    let essay = community.essay_handle(EssayId::new(essay_id)).await?;
    let report = community
        .create_report(&essay, caller.user()?, payload.flag, &payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Report>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.community(&name).await?.list_reports().await?))
}

pub async fn delete_report_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((name, report_id)): Path<(String, i32)>,
) -> ApiResult<StatusCode> {
    let caller = Caller::resolve(&state, &context).await?;
    caller
        .community(&name)
        .await?
        .delete_report(ReportId::new(report_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_essays_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Essay>>> {
    let caller = Caller::resolve(&state, &context).await?;
    let search = query.into_search()?;

    Ok(Json(caller.global.search_essays(&search).await?))
}

pub async fn feed_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<Essay>>> {
    let caller = Caller::resolve(&state, &context).await?;
    Ok(Json(caller.global.list_recent_essays().await?))
}
