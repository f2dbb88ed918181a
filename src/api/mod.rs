//! HTTP layer: router, shared state, error mapping and the helpers shared
//! by the three resource modules.
//!
//! Every resource exposes the same five routes:
//!
//! | Method | Path | Role |
//! |--------|------|------|
//! | GET | `/api/{resource}?page=&limit=` | any caller |
//! | GET | `/api/{resource}/{id}` | any caller |
//! | POST | `/api/{resource}` | `ROLE_ADMIN` |
//! | PUT | `/api/{resource}/{id}` | `ROLE_ADMIN` |
//! | DELETE | `/api/{resource}/{id}` | `ROLE_ADMIN` |
//!
//! List pages are served through the tag-aware cache; detail responses are
//! always rendered fresh.

pub mod classe;
pub mod eleve;
pub mod professeur;

use crate::auth::{Authenticator, Caller};
use crate::backend::{CacheBackend, InMemoryBackend};
use crate::cache::TagAwareCache;
use crate::config::AppConfig;
use crate::entity::Entity;
use crate::error::Error;
use crate::key::CacheKeyBuilder;
use crate::observability::{CountingMetrics, TtlPolicy};
use crate::repository::{DataRepository, Pagination, SqliteRepository, Store};
use crate::resource::Resource;
use crate::serializer::SerializationContext;
use crate::validation::Violation;
use crate::versioning::VersioningService;
use axum::extract::{FromRef, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub cache: TagAwareCache<InMemoryBackend>,
    pub versioning: VersioningService,
    pub auth: Authenticator,
    pub metrics: Arc<CountingMetrics>,
    /// Absolute base for `Location` headers, without trailing slash.
    pub base_url: String,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Store) -> Self {
        let metrics = Arc::new(CountingMetrics::new());
        let cache = TagAwareCache::new(InMemoryBackend::new())
            .with_metrics(metrics.clone())
            .with_ttl_policy(TtlPolicy::from_config(config.cache_ttl));

        AppState {
            store,
            cache,
            versioning: VersioningService::from_config(&config.api_version),
            auth: Authenticator::new(&config.jwt_secret),
            metrics,
            base_url: config.public_base_url.clone(),
        }
    }

    /// Serialization context for `resource`'s own representation.
    pub fn context<'a>(&self, resource: Resource, caller: &'a Caller) -> SerializationContext<'a> {
        SerializationContext::new(
            resource.group(),
            self.versioning.get_version(),
            &caller.roles,
        )
    }

    /// Evict every cached list page affected by a write to `resource`.
    pub async fn invalidate(&self, resource: Resource) -> Result<(), ApiError> {
        self.cache.invalidate_tags(resource.invalidated_tags()).await?;
        Ok(())
    }

    fn location(&self, resource: Resource, id: i64) -> String {
        format!("{}{}", self.base_url, resource.detail_path(id))
    }
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/professeur",
            get(professeur::list).post(professeur::create),
        )
        .route(
            "/api/professeur/{id}",
            get(professeur::detail)
                .put(professeur::update)
                .delete(professeur::delete),
        )
        .route("/api/eleve", get(eleve::list).post(eleve::create))
        .route(
            "/api/eleve/{id}",
            get(eleve::detail).put(eleve::update).delete(eleve::delete),
        )
        .route("/api/classe", get(classe::list).post(classe::create))
        .route(
            "/api/classe/{id}",
            get(classe::detail).put(classe::update).delete(classe::delete),
        )
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Errors a handler can answer with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Internal(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Validation(violations) => {
                (StatusCode::BAD_REQUEST, Json(violations)).into_response()
            }
            ApiError::BadRequest(message) => status_body(StatusCode::BAD_REQUEST, &message),
            ApiError::Unauthorized(message) => status_body(StatusCode::UNAUTHORIZED, &message),
            ApiError::Forbidden(message) => status_body(StatusCode::FORBIDDEN, &message),
            ApiError::Internal(e) => {
                error!("Request failed: {}", e);
                status_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn status_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "message": message })),
    )
        .into_response()
}

/// Raw `page` / `limit` query values.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

pub(crate) fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// 201 with the rendered entity and its absolute `Location`.
pub(crate) fn created(state: &AppState, resource: Resource, id: i64, body: String) -> Response {
    (
        StatusCode::CREATED,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::LOCATION, state.location(resource, id)),
        ],
        body,
    )
        .into_response()
}

/// Serve one list page of `resource` from the cache, rendering it with
/// `render` on a miss.
pub(crate) async fn cached_list<F, Fut>(
    state: &AppState,
    resource: Resource,
    page: Pagination,
    caller: &Caller,
    render: F,
) -> Result<Response, ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = crate::Result<String>>,
{
    let key = CacheKeyBuilder::list_key(
        resource.list_operation(),
        page.page,
        page.limit,
        &caller.roles,
    );
    let json = state.cache.get(&key, &[resource.cache_tag()], render).await?;
    Ok(json_response(StatusCode::OK, json))
}

/// Load the row addressed by a path id; a non-numeric id is a 404 too.
pub(crate) async fn find_entity<T: Entity>(
    repo: &SqliteRepository<T>,
    raw_id: &str,
) -> Result<T, ApiError> {
    let id: i64 = raw_id.parse().map_err(|_| ApiError::NotFound)?;
    repo.fetch_by_id(id).await?.ok_or(ApiError::NotFound)
}

/// Decode a flat JSON object body into a draft, keeping the raw object for
/// the relationship fields.
pub(crate) fn parse_body<D: DeserializeOwned>(body: &[u8]) -> Result<(D, Map<String, Value>), ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Corps JSON invalide: {}", e)))?;
    let Value::Object(raw) = value else {
        return Err(ApiError::BadRequest(
            "Le corps de la requête doit être un objet JSON".to_string(),
        ));
    };

    let draft = serde_json::from_value(Value::Object(raw.clone()))
        .map_err(|e| ApiError::BadRequest(format!("Corps JSON invalide: {}", e)))?;
    Ok((draft, raw))
}

/// Ids under `field`: absent, a single integer, or a list of integers.
pub(crate) fn id_list(raw: &Map<String, Value>, field: &str) -> Result<Vec<i64>, ApiError> {
    let invalid = || {
        ApiError::BadRequest(format!(
            "{} doit être un entier ou une liste d'entiers",
            field
        ))
    };

    match raw.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Number(n)) => n.as_i64().map(|id| vec![id]).ok_or_else(invalid),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_i64().ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

/// Split `ids` into those that exist in `repo` and those that do not.
/// Repeated ids are considered once.
pub(crate) async fn resolve_ids<T: Entity>(
    repo: &SqliteRepository<T>,
    mut ids: Vec<i64>,
) -> Result<(Vec<i64>, Vec<i64>), ApiError> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));

    let rows = repo.fetch_by_ids(&ids).await?;
    let (found, missing): (Vec<_>, Vec<_>) = ids
        .into_iter()
        .zip(rows)
        .partition(|(_, row)| row.is_some());

    Ok((
        found.into_iter().map(|(id, _)| id).collect(),
        missing.into_iter().map(|(id, _)| id).collect(),
    ))
}

/// Resolve `idProf`; `None` when absent, not an integer, or unknown.
pub(crate) async fn professeur_ref(
    state: &AppState,
    raw: &Map<String, Value>,
) -> Result<Option<i64>, ApiError> {
    let Some(id) = raw.get("idProf").and_then(Value::as_i64) else {
        return Ok(None);
    };
    Ok(state.store.professeurs.fetch_by_id(id).await?.map(|p| p.id))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let cache_up = state.cache.backend().health_check().await.unwrap_or(false);
    Json(json!({
        "status": if cache_up { "healthy" } else { "degraded" },
        "service": "school-api",
        "version": crate::VERSION,
        "apiVersion": state.versioning.get_version().to_string(),
        "cache": {
            "backend": state.cache.backend().stats(),
            "metrics": state.metrics.snapshot(),
        },
    }))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({:?})",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(json: &str) -> Map<String, Value> {
        match serde_json::from_str(json).unwrap() {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_id_list_shapes() {
        let raw = object(r#"{"idClasse": 3, "idEleve": [1, 2], "other": "x"}"#);
        assert_eq!(id_list(&raw, "idClasse").unwrap(), vec![3]);
        assert_eq!(id_list(&raw, "idEleve").unwrap(), vec![1, 2]);
        assert!(id_list(&raw, "missing").unwrap().is_empty());
        assert!(matches!(
            id_list(&raw, "other"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_body_rejects_non_objects() {
        let result = parse_body::<crate::entity::ClasseDraft>(b"[1,2]");
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let result = parse_body::<crate::entity::ClasseDraft>(b"{not json");
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_parse_body_keeps_raw_object() {
        let (draft, raw) =
            parse_body::<crate::entity::ClasseDraft>(br#"{"nom":"6e B","idProf":4}"#).unwrap();
        assert_eq!(draft.nom.as_deref(), Some("6e B"));
        assert_eq!(raw.get("idProf").and_then(Value::as_i64), Some(4));
    }

    #[test]
    fn test_page_params_fallback() {
        let params = PageParams {
            page: Some("2".to_string()),
            limit: Some("abc".to_string()),
        };
        assert_eq!(params.pagination(), Pagination::new(2, 10));
    }
}
