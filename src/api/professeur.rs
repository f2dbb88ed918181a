//! `/api/professeur` handlers.
//!
//! Bodies may carry `idClasse` / `idEleve` (an id or a list of ids); the
//! named classes and eleves are reassigned to the professeur. Deleting a
//! professeur deletes its classes and eleves with it.

use super::{
    cached_list, created, find_entity, id_list, json_response, parse_body, resolve_ids, ApiError,
    AppState, PageParams,
};
use crate::auth::Caller;
use crate::entity::ProfesseurDraft;
use crate::repository::{DataRepository, Pagination};
use crate::resource::{Resource, WriteAction};
use crate::serializer::{serialize, serialize_list};
use crate::validation::Validate;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures::future::try_join_all;
use serde_json::{Map, Value};

const RESOURCE: Resource = Resource::Professeur;

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
    let rows = state.store.professeurs.find_all_with_pagination(page).await?;
    let views = try_join_all(rows.into_iter().map(|row| state.store.professeur_view(row))).await?;
    serialize_list(&views, &state.context(RESOURCE, caller))
}

pub async fn detail(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let professeur = find_entity(&state.store.professeurs, &id).await?;
    let view = state.store.professeur_view(professeur).await?;
    let json = serialize(&view, &state.context(RESOURCE, &caller))?;
    Ok(json_response(StatusCode::OK, json))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, ApiError> {
    caller.require_admin(RESOURCE, WriteAction::Create)?;

    let (mut draft, raw) = parse_body::<ProfesseurDraft>(&body)?;
    resolve_children(&state, &mut draft, &raw).await?;
    let new = draft.check().map_err(ApiError::Validation)?;

    let professeur = state.store.professeurs.create(&new).await?;
    state.invalidate(RESOURCE).await?;

    let id = professeur.id;
    let view = state.store.professeur_view(professeur).await?;
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
    let current = find_entity(&state.store.professeurs, &id).await?;

    let (mut draft, raw) = parse_body::<ProfesseurDraft>(&body)?;
    resolve_children(&state, &mut draft, &raw).await?;
    let new = draft.check().map_err(ApiError::Validation)?;

    state.store.professeurs.update(current.id, &new).await?;
    state.invalidate(RESOURCE).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin(RESOURCE, WriteAction::Delete)?;
    let professeur = find_entity(&state.store.professeurs, &id).await?;

    state.store.professeurs.delete_cascade(professeur.id).await?;
    state.invalidate(RESOURCE).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_children(
    state: &AppState,
    draft: &mut ProfesseurDraft,
    raw: &Map<String, Value>,
) -> Result<(), ApiError> {
    let (classes, unknown_classes) =
        resolve_ids(&state.store.classes, id_list(raw, "idClasse")?).await?;
    let (eleves, unknown_eleves) =
        resolve_ids(&state.store.eleves, id_list(raw, "idEleve")?).await?;

    draft.classes = classes;
    draft.unknown_classes = unknown_classes;
    draft.eleves = eleves;
    draft.unknown_eleves = unknown_eleves;
    Ok(())
}
