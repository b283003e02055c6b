// Layout engine - applies drag/resize batches to tile geometry
use crate::domain::error::Result;
use crate::domain::tile::{Tile, TileGeometry};
use serde::{Deserialize, Serialize};

/// One entry of a drag/resize batch as reported by the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutChange {
    pub tile_id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl LayoutChange {
    pub fn geometry(&self) -> TileGeometry {
        TileGeometry::new(self.x, self.y, self.w, self.h)
    }
}

/// Applies a batch and returns the ids of tiles whose geometry actually moved.
///
/// The whole batch is validated before any tile is touched. Entries for
/// unknown tiles are skipped. A tile listed more than once ends at its last
/// entry and counts as moved only if that differs from where it started.
/// An empty result means the batch was a no-op.
pub fn apply_layout_change(tiles: &mut [Tile], changes: &[LayoutChange]) -> Result<Vec<String>> {
    for change in changes {
        change.geometry().validate()?;
    }

    // geometry before the batch, for each tile the batch touches
    let mut touched: Vec<(String, TileGeometry)> = Vec::new();
    for change in changes {
        let Some(tile) = tiles.iter_mut().find(|t| t.uuid == change.tile_id) else {
            tracing::debug!("Ignoring layout change for unknown tile {}", change.tile_id);
            continue;
        };
        if !touched.iter().any(|(id, _)| *id == tile.uuid) {
            touched.push((tile.uuid.clone(), tile.geometry));
        }
        tile.geometry = change.geometry();
    }

    let moved = touched
        .into_iter()
        .filter(|(id, before)| tiles.iter().any(|t| t.uuid == *id && t.geometry != *before))
        .map(|(id, _)| id)
        .collect();
    Ok(moved)
}
