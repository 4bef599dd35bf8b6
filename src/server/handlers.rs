use super::auth::actor_from_headers;
use super::error::ApiError;
use super::AppState;
use crate::activity::{ActivityQuery, ActivityRecord};
use crate::export::{bulk_export, language_export, page_export};
use crate::mutation::Mutation;
use crate::tree::ImportReport;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

pub async fn health() -> &'static str {
    "OK"
}

// ==================== Export ====================

pub async fn languages(State(state): State<AppState>) -> Json<Value> {
    let languages = state.manager.read(|tree| tree.languages.clone());
    Json(json!({ "languages": languages }))
}

pub async fn export_all(State(state): State<AppState>) -> Json<Value> {
    Json(state.manager.read(bulk_export))
}

pub async fn export_language(State(state): State<AppState>, Path(lang): Path<String>) -> Json<Value> {
    let lang = lang.to_lowercase();
    Json(state.manager.read(|tree| language_export(tree, &lang)))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    lang: Option<String>,
}

pub async fn export_page(
    State(state): State<AppState>,
    Path(page_key): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let lang = query
        .lang
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty());
    let page = state
        .manager
        .read(|tree| page_export(tree, &page_key, lang.as_deref()))?;
    Ok(Json(page))
}

// ==================== Writes ====================

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    changed: bool,
    revision: u64,
}

pub async fn apply_mutation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MutationResponse>, ApiError> {
    let mutation = serde_json::from_slice::<Mutation>(&body)?.with_lowercase_languages();
    let actor = actor_from_headers(&headers);
    let applied = state.manager.apply(&actor, &mutation)?;
    Ok(Json(MutationResponse {
        changed: applied.changed,
        revision: state.manager.revision(),
    }))
}

fn parse_import(lang: &str, body: &[u8]) -> Result<(String, Value), ApiError> {
    let data: Value = serde_json::from_slice(body)?;
    Ok((lang.trim().to_lowercase(), data))
}

pub async fn import(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportReport>, ApiError> {
    let (lang, data) = parse_import(&lang, &body)?;
    let actor = actor_from_headers(&headers);
    let report = state.manager.import(&actor, &lang, &data)?;
    info!(
        "Import for {} by {}: {} added, {} updated, {} skipped",
        lang,
        actor.user_id,
        report.additions.len(),
        report.updates.len(),
        report.skipped.len()
    );
    Ok(Json(report))
}

pub async fn preview_import(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    body: Bytes,
) -> Result<Json<ImportReport>, ApiError> {
    let (lang, data) = parse_import(&lang, &body)?;
    Ok(Json(state.manager.preview_import(&lang, &data)?))
}

pub async fn backup(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let id = state.manager.create_backup().await?;
    Ok(Json(json!({ "id": id })))
}

// ==================== Queries ====================

pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Json<Vec<ActivityRecord>> {
    Json(state.manager.activity().recent(&query))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Json<Value> {
    let pages = state.manager.read(|tree| tree.search_pages(&query.q));
    Json(json!({ "pages": pages }))
}
