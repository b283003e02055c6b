// Filter targeting engine - filter list edits and tile applicability
use crate::application::field_resolver::FieldResolution;
use crate::domain::error::{DashboardError, Result};
use crate::domain::field::FilterableFieldCatalog;
use crate::domain::filter::{DimensionFilter, FilterPatch};
use crate::domain::tile::{Tile, TileContent};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterStatus {
    Active,
    /// Target is not exposed by any current tile; the filter is kept anyway
    Orphaned,
}

pub fn targets_for(filter: &DimensionFilter, catalog: &FilterableFieldCatalog) -> bool {
    catalog.contains(&filter.target)
}

pub fn filter_status(filter: &DimensionFilter, catalog: &FilterableFieldCatalog) -> FilterStatus {
    if targets_for(filter, catalog) {
        FilterStatus::Active
    } else {
        FilterStatus::Orphaned
    }
}

/// Ids of the tiles whose own fields include the filter's target
pub fn targeted_tiles(filter: &DimensionFilter, tiles: &[Tile], resolution: &FieldResolution) -> Vec<String> {
    tiles
        .iter()
        .filter(|tile| match &tile.content {
            TileContent::SavedChart { saved_chart_uuid } => {
                resolution.chart_exposes(saved_chart_uuid, &filter.target)
            }
            TileContent::Markdown { .. } | TileContent::Loom { .. } => false,
        })
        .map(|tile| tile.uuid.clone())
        .collect()
}

/// Appends a filter; filters on the same field are additive
pub fn apply_filter(filters: &mut Vec<DimensionFilter>, filter: DimensionFilter) -> Result<()> {
    filter.validate()?;
    if filters.iter().any(|f| f.id == filter.id) {
        return Err(DashboardError::DuplicateId {
            kind: "filter",
            id: filter.id,
        });
    }
    filters.push(filter);
    Ok(())
}

pub fn update_filter<'a>(
    filters: &'a mut [DimensionFilter],
    filter_id: &str,
    patch: &FilterPatch,
) -> Result<&'a DimensionFilter> {
    let index = filters
        .iter()
        .position(|f| f.id == filter_id)
        .ok_or_else(|| DashboardError::filter_not_found(filter_id))?;
    filters[index] = filters[index].patched(patch)?;
    Ok(&filters[index])
}

pub fn remove_filter(filters: &mut Vec<DimensionFilter>, filter_id: &str) -> Result<DimensionFilter> {
    let index = filters
        .iter()
        .position(|f| f.id == filter_id)
        .ok_or_else(|| DashboardError::filter_not_found(filter_id))?;
    Ok(filters.remove(index))
}
