//! PokeAPI response schemas and decoding into domain types.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::pokemon::{CatalogEntry, PokemonDetails, PokemonType, StatEntry, StatKind, TypeEntry};
use crate::sync::SyncError;

/// A decoded catalog page.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    /// Total number of entries upstream.
    pub count: u32,
    /// URL of the following page, if any.
    pub next_url: Option<String>,
    /// Entries on this page.
    pub entries: Vec<CatalogEntry>,
}

/// Decode a catalog page body fetched from `url`.
///
/// An unparseable `next` link is dropped, which makes this the last page.
pub fn decode_page(url: &str, body: &[u8]) -> Result<CatalogPage, SyncError> {
    if is_blank(body) {
        return Err(SyncError::NoData(url.to_string()));
    }

    let page: PageResponse =
        serde_json::from_slice(body).map_err(|e| SyncError::MalformedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let next_url = page.next.and_then(|next| match reqwest::Url::parse(&next) {
        Ok(_) => Some(next),
        Err(e) => {
            warn!(url, next = %next, "Ignoring unparseable next page URL: {}", e);
            None
        }
    });

    Ok(CatalogPage {
        count: page.count,
        next_url,
        entries: page
            .results
            .into_iter()
            .map(|item| CatalogEntry::new(item.name, item.url))
            .collect(),
    })
}

/// Decode a detail response body fetched from `url`.
///
/// Statistics and types with names this crate does not know are dropped.
pub fn decode_details(url: &str, body: &[u8]) -> Result<PokemonDetails, SyncError> {
    if is_blank(body) {
        return Err(SyncError::NoData(url.to_string()));
    }

    let detail: DetailResponse =
        serde_json::from_slice(body).map_err(|e| SyncError::MalformedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    Ok(detail.into())
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(|b| b.is_ascii_whitespace())
}

// ============================================================================
// Wire types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    count: u32,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<PageItem>,
}

#[derive(Debug, Deserialize)]
struct PageItem {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: u32,
    name: String,
    #[serde(default)]
    sprites: Sprites,
    height: u32,
    weight: u32,
    // Null for some alternate forms.
    #[serde(default)]
    base_experience: Option<u32>,
    #[serde(default)]
    order: Option<i32>,
    #[serde(default)]
    stats: Vec<StatItem>,
    #[serde(default)]
    types: Vec<TypeItem>,
}

#[derive(Debug, Default, Deserialize)]
struct Sprites {
    #[serde(default)]
    front_default: Option<String>,
    #[serde(default)]
    front_shiny: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatItem {
    base_stat: u32,
    #[serde(default)]
    #[allow(dead_code)]
    effort: u32,
    stat: NamedResource,
}

#[derive(Debug, Deserialize)]
struct TypeItem {
    slot: u32,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

impl From<DetailResponse> for PokemonDetails {
    fn from(detail: DetailResponse) -> Self {
        let statistics = detail
            .stats
            .into_iter()
            .filter_map(|item| match StatKind::from_api_name(&item.stat.name) {
                Some(kind) => Some(StatEntry {
                    kind,
                    value: item.base_stat,
                }),
                None => {
                    debug!("Dropping unknown statistic '{}'", item.stat.name);
                    None
                }
            })
            .collect();

        let types = detail
            .types
            .into_iter()
            .filter_map(|item| {
                let kind = match PokemonType::from_api_name(&item.kind.name) {
                    Some(kind) => kind,
                    None => {
                        debug!("Dropping unknown type '{}'", item.kind.name);
                        return None;
                    }
                };
                let slot = u8::try_from(item.slot).ok()?;
                Some(TypeEntry { slot, kind })
            })
            .collect();

        PokemonDetails {
            id: detail.id,
            name: detail.name,
            front_default: detail.sprites.front_default,
            front_shiny: detail.sprites.front_shiny,
            height: detail.height,
            weight: detail.weight,
            base_experience: detail.base_experience.unwrap_or(0),
            order: detail.order.unwrap_or(0),
            statistics,
            types,
        }
    }
}
