//! Merge rules for catalog pages and detail responses.

use reqwest::Url;
use tracing::{debug, warn};

use super::SyncError;
use crate::pokemon::{CatalogEntry, PokemonDetails, PokemonRecord};
use crate::store::RecordStore;

/// Outcome of merging one catalog page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Stub records created.
    pub created: usize,
    /// Entries whose name was already cached.
    pub existing: usize,
    /// Entries dropped because their detail URL did not parse.
    pub skipped: usize,
}

/// Find-or-create a stub record for every entry, then commit in one save.
///
/// Existing records are left untouched, so a page can be merged any number
/// of times without duplicating or clobbering anything.
pub fn merge_catalog_page(
    store: &dyn RecordStore,
    entries: &[CatalogEntry],
) -> Result<MergeSummary, SyncError> {
    let mut summary = MergeSummary::default();

    if let Err(e) = stage_entries(store, entries, &mut summary) {
        // Nothing from a half-merged page may reach a later save
        match store.discard_staged() {
            Ok(dropped) => debug!(dropped, "Discarded staged records after failed merge"),
            Err(discard_err) => warn!("Failed to discard staged records: {}", discard_err),
        }
        return Err(e);
    }

    store.save_all().map_err(SyncError::store_write)?;
    Ok(summary)
}

fn stage_entries(
    store: &dyn RecordStore,
    entries: &[CatalogEntry],
    summary: &mut MergeSummary,
) -> Result<(), SyncError> {
    for entry in entries {
        if let Err(e) = Url::parse(&entry.detail_url) {
            warn!(
                name = %entry.name,
                url = %entry.detail_url,
                "Skipping catalog entry with unparseable URL: {}",
                e
            );
            summary.skipped += 1;
            continue;
        }

        if store
            .find_by_name(&entry.name)
            .map_err(SyncError::store_read)?
            .is_some()
        {
            summary.existing += 1;
            continue;
        }

        store
            .insert(PokemonRecord::stub(entry))
            .map_err(SyncError::store_write)?;
        summary.created += 1;
    }
    Ok(())
}

/// Overwrite a record's detail fields with the latest response.
///
/// Statistics are replaced by kind and types by slot; entries the response
/// does not mention are kept.
pub fn apply_details(record: &mut PokemonRecord, details: &PokemonDetails) {
    if let Some(url) = choose_image_url(details) {
        record.image_url = Some(url);
    }

    record.numeric_id = details.id;
    record.height_decimeters = details.height;
    record.weight_hectograms = details.weight;
    record.sort_order = details.order;
    record.base_experience = details.base_experience;

    for stat in &details.statistics {
        match record.statistics.iter_mut().find(|s| s.kind == stat.kind) {
            Some(existing) => existing.value = stat.value,
            None => record.statistics.push(*stat),
        }
    }

    for entry in &details.types {
        if !(1..=2).contains(&entry.slot) {
            debug!(
                name = %record.name,
                slot = entry.slot,
                "Ignoring type in unsupported slot"
            );
            continue;
        }
        match record.types.iter_mut().find(|t| t.slot == entry.slot) {
            Some(existing) => existing.kind = entry.kind,
            None => record.types.push(*entry),
        }
    }
}

/// Prefer the default front sprite, fall back to the shiny one.
fn choose_image_url(details: &PokemonDetails) -> Option<String> {
    let candidate = match details
        .front_default
        .as_ref()
        .or(details.front_shiny.as_ref())
    {
        Some(candidate) => candidate,
        None => {
            warn!(name = %details.name, "Details carry no image URL");
            return None;
        }
    };

    match Url::parse(candidate) {
        Ok(_) => Some(candidate.clone()),
        Err(e) => {
            warn!(name = %details.name, url = %candidate, "Cannot parse image URL: {}", e);
            None
        }
    }
}
