//! Testing utilities and mock implementations.
//!
//! This module provides a mock fetcher and a failure-injecting record store,
//! allowing the sync controller to be exercised end to end without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use pokeindex_core::testing::{fixtures, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! fetcher
//!     .set_json(
//!         &fixtures::page_url(0, 2),
//!         &fixtures::catalog_page(1, None, &[("clefairy", 35)]),
//!     )
//!     .await;
//!
//! // Use in create_sync_system...
//! ```

mod mock_fetcher;
mod mock_record_store;

pub use mock_fetcher::MockFetcher;
pub use mock_record_store::MockRecordStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::config::ApiConfig;
    use crate::sync::SyncOptions;

    /// API root used by all fixtures.
    pub const BASE_URL: &str = "https://pokeapi.test/api/v2";

    /// Smallest valid PNG header, enough to stand in for sprite bytes.
    pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    /// API config pointing at [`BASE_URL`] with the given page size.
    pub fn api_config(page_size: u32) -> ApiConfig {
        ApiConfig {
            base_url: BASE_URL.to_string(),
            page_size,
            ..Default::default()
        }
    }

    /// Sync options whose first page is `page_url(0, page_size)`.
    pub fn sync_options(page_size: u32) -> SyncOptions {
        let first_page_url = api_config(page_size)
            .first_page_url()
            .expect("fixture base URL is valid");
        SyncOptions::new(first_page_url)
    }

    /// Catalog page URL as the API spells it.
    pub fn page_url(offset: u32, limit: u32) -> String {
        format!("{}/pokemon/?offset={}&limit={}", BASE_URL, offset, limit)
    }

    /// Detail URL for a numeric id.
    pub fn detail_url(id: u32) -> String {
        format!("{}/pokemon/{}/", BASE_URL, id)
    }

    /// Sprite URL for a numeric id.
    pub fn image_url(id: u32) -> String {
        format!("https://sprites.test/pokemon/{}.png", id)
    }

    /// A catalog page listing `(name, id)` entries.
    pub fn catalog_page(count: u32, next: Option<&str>, entries: &[(&str, u32)]) -> Value {
        json!({
            "count": count,
            "next": next,
            "previous": null,
            "results": entries
                .iter()
                .map(|(name, id)| json!({"name": name, "url": detail_url(*id)}))
                .collect::<Vec<_>>(),
        })
    }

    /// A detail response with the given stats `(name, value)` and types `(slot, name)`.
    pub fn details(
        id: u32,
        name: &str,
        weight: u32,
        image: Option<&str>,
        stats: &[(&str, u32)],
        types: &[(u32, &str)],
    ) -> Value {
        json!({
            "id": id,
            "name": name,
            "height": 6,
            "weight": weight,
            "base_experience": 113,
            "order": 64,
            "sprites": {"front_default": image, "front_shiny": null},
            "stats": stats
                .iter()
                .map(|(stat, value)| json!({"base_stat": value, "effort": 0, "stat": {"name": stat}}))
                .collect::<Vec<_>>(),
            "types": types
                .iter()
                .map(|(slot, kind)| json!({"slot": slot, "type": {"name": kind}}))
                .collect::<Vec<_>>(),
        })
    }

    /// Clefairy (#35) as the API returns it.
    pub fn clefairy_details() -> Value {
        details(
            35,
            "clefairy",
            75,
            Some(&image_url(35)),
            &[
                ("hp", 70),
                ("attack", 45),
                ("defense", 48),
                ("special-attack", 60),
                ("special-defense", 65),
                ("speed", 35),
            ],
            &[(1, "fairy")],
        )
    }
}
