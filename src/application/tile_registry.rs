// Ordered tile container for one dashboard
use crate::domain::error::{DashboardError, Result};
use crate::domain::tile::{Tile, TilePatch};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileRegistry {
    tiles: Vec<Tile>,
}

impl TileRegistry {
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn add(&mut self, tile: Tile) -> Result<()> {
        tile.validate()?;
        if self.contains(&tile.uuid) {
            return Err(DashboardError::DuplicateId {
                kind: "tile",
                id: tile.uuid,
            });
        }
        self.tiles.push(tile);
        Ok(())
    }

    pub fn remove(&mut self, tile_id: &str) -> Result<Tile> {
        let index = self.position(tile_id)?;
        Ok(self.tiles.remove(index))
    }

    /// Replaces the tile in place; other tiles and order are untouched
    pub fn update(&mut self, tile_id: &str, patch: &TilePatch) -> Result<&Tile> {
        let index = self.position(tile_id)?;
        let patched = self.tiles[index].patched(patch)?;
        self.tiles[index] = patched;
        Ok(&self.tiles[index])
    }

    pub fn get(&self, tile_id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.uuid == tile_id)
    }

    pub fn contains(&self, tile_id: &str) -> bool {
        self.get(tile_id).is_some()
    }

    pub fn list(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn list_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn position(&self, tile_id: &str) -> Result<usize> {
        self.tiles
            .iter()
            .position(|t| t.uuid == tile_id)
            .ok_or_else(|| DashboardError::tile_not_found(tile_id))
    }
}
