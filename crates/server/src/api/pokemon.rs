//! Cached record API handlers.
//!
//! Reads never wait on the network. Serving a record that is still missing
//! details or its image queues the next download in the background.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use pokeindex_core::{NextDownload, PokemonRecord, PokemonType};

use super::handlers::{api_error, internal_error, ApiError};
use crate::state::AppState;

const MAX_LIMIT: u32 = 500;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    /// Queue downloads for incomplete rows in the returned page.
    #[serde(default = "default_hydrate")]
    pub hydrate: bool,
}

fn default_limit() -> u32 {
    50
}

fn default_hydrate() -> bool {
    true
}

/// One row of the list view.
#[derive(Debug, Serialize)]
pub struct PokemonSummary {
    pub name: String,
    /// `None` while the number is unknown.
    pub number: Option<u32>,
    /// Types ordered by slot.
    pub types: Vec<PokemonType>,
    pub hydrated: bool,
    pub has_image: bool,
    pub total_statistic: u32,
}

impl From<&PokemonRecord> for PokemonSummary {
    fn from(record: &PokemonRecord) -> Self {
        let mut slots = record.types.clone();
        slots.sort_by_key(|t| t.slot);

        Self {
            name: record.name.clone(),
            number: (record.numeric_id != 0).then_some(record.numeric_id),
            types: slots.into_iter().map(|t| t.kind).collect(),
            hydrated: record.is_hydrated(),
            has_image: record.has_image(),
            total_statistic: record.total_statistic(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PokemonListResponse {
    pub entries: Vec<PokemonSummary>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Full record without image bytes.
#[derive(Debug, Serialize)]
pub struct PokemonResponse {
    #[serde(flatten)]
    pub record: PokemonRecord,
    pub hydrated: bool,
    pub has_image: bool,
    pub total_statistic: u32,
}

impl From<PokemonRecord> for PokemonResponse {
    fn from(record: PokemonRecord) -> Self {
        Self {
            hydrated: record.is_hydrated(),
            has_image: record.has_image(),
            total_statistic: record.total_statistic(),
            record,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/pokemon
///
/// List cached records ordered by number.
pub async fn list_pokemon(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PokemonListResponse>, ApiError> {
    let store = state.store();
    let limit = params.limit.min(MAX_LIMIT);

    let records = store.list(limit, params.offset).map_err(internal_error)?;
    let total = store.count().map_err(internal_error)?;

    if params.hydrate {
        let sync = state.sync();
        join_all(
            records
                .iter()
                .filter(|record| record.next_download() != NextDownload::None)
                .map(|record| sync.start_next_download(record)),
        )
        .await;
    }

    Ok(Json(PokemonListResponse {
        entries: records.iter().map(PokemonSummary::from).collect(),
        total,
        limit,
        offset: params.offset,
    }))
}

/// GET /api/v1/pokemon/{name}
///
/// Get one record by exact name.
pub async fn get_pokemon(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<PokemonResponse>, ApiError> {
    let record = state
        .store()
        .find_by_name(&name)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Pokemon not found: {}", name)))?;

    respond_with(&state, record).await
}

/// GET /api/v1/pokemon/by-number/{number}
///
/// Get one record by its national number.
pub async fn get_pokemon_by_number(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> Result<Json<PokemonResponse>, ApiError> {
    let record = state
        .store()
        .find_by_numeric_id(number)
        .map_err(internal_error)?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("Pokemon not found: #{}", number),
            )
        })?;

    respond_with(&state, record).await
}

/// GET /api/v1/pokemon/{name}/image
///
/// Raw image bytes. When they are not cached yet the download is queued and
/// the request answers 404.
pub async fn get_pokemon_image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let mut record = state
        .store()
        .find_by_name(&name)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Pokemon not found: {}", name)))?;

    if let Some(bytes) = record.image_bytes.take() {
        return Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response());
    }

    if record.image_url.is_some() {
        state.sync().load_image(&record).await;
    } else {
        state.sync().start_next_download(&record).await;
    }

    Err(api_error(
        StatusCode::NOT_FOUND,
        format!("Image for {} is not downloaded yet", name),
    ))
}

async fn respond_with(
    state: &AppState,
    record: PokemonRecord,
) -> Result<Json<PokemonResponse>, ApiError> {
    if record.next_download() != NextDownload::None {
        state.sync().start_next_download(&record).await;
    }
    Ok(Json(PokemonResponse::from(record)))
}
