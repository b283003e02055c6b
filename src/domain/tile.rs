// Tile domain model
use super::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};

/// Grid placement in grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGeometry {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl TileGeometry {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn validate(&self) -> Result<()> {
        if self.w == 0 || self.h == 0 {
            return Err(DashboardError::validation(format!(
                "tile size must be at least 1x1, got {}x{}",
                self.w, self.h
            )));
        }
        Ok(())
    }
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self::new(0, 0, 5, 3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum TileContent {
    #[serde(rename_all = "camelCase")]
    SavedChart { saved_chart_uuid: String },
    Markdown { title: String, content: String },
    Loom { title: String, url: String },
}

impl TileContent {
    pub fn kind(&self) -> &'static str {
        match self {
            TileContent::SavedChart { .. } => "saved_chart",
            TileContent::Markdown { .. } => "markdown",
            TileContent::Loom { .. } => "loom",
        }
    }

    /// The saved chart this content queries, if any
    pub fn chart_reference(&self) -> Option<&str> {
        match self {
            TileContent::SavedChart { saved_chart_uuid } => Some(saved_chart_uuid.as_str()),
            TileContent::Markdown { .. } | TileContent::Loom { .. } => None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            TileContent::SavedChart { saved_chart_uuid } if saved_chart_uuid.trim().is_empty() => {
                Err(DashboardError::validation("chart tile needs a saved chart reference"))
            }
            TileContent::Loom { url, .. } if url.trim().is_empty() => {
                Err(DashboardError::validation("embed tile needs a source url"))
            }
            TileContent::SavedChart { .. } | TileContent::Markdown { .. } | TileContent::Loom { .. } => {
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub uuid: String,
    #[serde(flatten)]
    pub geometry: TileGeometry,
    #[serde(flatten)]
    pub content: TileContent,
}

impl Tile {
    pub fn new(geometry: TileGeometry, content: TileContent) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            geometry,
            content,
        }
    }

    pub fn with_id(uuid: impl Into<String>, geometry: TileGeometry, content: TileContent) -> Self {
        Self {
            uuid: uuid.into(),
            geometry,
            content,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.uuid.trim().is_empty() {
            return Err(DashboardError::validation("tile id must not be empty"));
        }
        self.geometry.validate()?;
        self.content.validate()
    }

    /// Returns a new tile with the patch merged over geometry and/or content
    pub fn patched(&self, patch: &TilePatch) -> Result<Tile> {
        let mut tile = self.clone();
        if let Some(geometry) = patch.geometry {
            geometry.validate()?;
            tile.geometry = geometry;
        }
        if let Some(content) = &patch.content {
            if content.kind() != self.content.kind() {
                return Err(DashboardError::validation(format!(
                    "cannot change tile {} from {} to {}",
                    self.uuid,
                    self.content.kind(),
                    content.kind()
                )));
            }
            content.validate()?;
            tile.content = content.clone();
        }
        Ok(tile)
    }
}

/// Partial update for a tile; absent parts are left as they are
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePatch {
    #[serde(default)]
    pub geometry: Option<TileGeometry>,
    #[serde(default)]
    pub content: Option<TileContent>,
}
