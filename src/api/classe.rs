//! `/api/classe` handlers.

use super::{
    cached_list, created, find_entity, json_response, parse_body, professeur_ref, ApiError,
    AppState, PageParams,
};
use crate::auth::Caller;
use crate::entity::ClasseDraft;
use crate::repository::{DataRepository, Pagination};
use crate::resource::{Resource, WriteAction};
use crate::serializer::{serialize, serialize_list};
use crate::validation::Validate;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures::future::try_join_all;

const RESOURCE: Resource = Resource::Classe;

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = params.pagination();
    cached_list(&state, RESOURCE, page, &caller, || {
        render_page(&state, page, &caller)
    })
    .await
}

async fn render_page(state: &AppState, page: Pagination, caller: &Caller) -> crate::Result<String> {
    let rows = state.store.classes.find_all_with_pagination(page).await?;
    let views = try_join_all(rows.into_iter().map(|row| state.store.classe_view(row))).await?;
    serialize_list(&views, &state.context(RESOURCE, caller))
}

pub async fn detail(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let classe = find_entity(&state.store.classes, &id).await?;
    let view = state.store.classe_view(classe).await?;
    let json = serialize(&view, &state.context(RESOURCE, &caller))?;
    Ok(json_response(StatusCode::OK, json))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, ApiError> {
    caller.require_admin(RESOURCE, WriteAction::Create)?;

    let (mut draft, raw) = parse_body::<ClasseDraft>(&body)?;
    draft.professeur_id = professeur_ref(&state, &raw).await?;
    let new = draft.check().map_err(ApiError::Validation)?;

    let classe = state.store.classes.create(&new).await?;
    state.invalidate(RESOURCE).await?;

    let id = classe.id;
    let view = state.store.classe_view(classe).await?;
    let json = serialize(&view, &state.context(RESOURCE, &caller))?;
    Ok(created(&state, RESOURCE, id, json))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    caller.require_admin(RESOURCE, WriteAction::Update)?;
    let current = find_entity(&state.store.classes, &id).await?;

    let (mut draft, raw) = parse_body::<ClasseDraft>(&body)?;
    draft.professeur_id = professeur_ref(&state, &raw).await?;
    let new = draft.check().map_err(ApiError::Validation)?;

    state.store.classes.update(current.id, &new).await?;
    state.invalidate(RESOURCE).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin(RESOURCE, WriteAction::Delete)?;
    let classe = find_entity(&state.store.classes, &id).await?;

    state.store.classes.delete(classe.id).await?;
    state.invalidate(RESOURCE).await?;
    Ok(StatusCode::NO_CONTENT)
}
