// Dashboard domain model
use super::error::{DashboardError, Result};
use super::filter::DashboardFilters;
use super::tile::Tile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub filters: DashboardFilters,
    pub updated_at: DateTime<Utc>,
}

impl Dashboard {
    /// Checks tile invariants of a snapshot received from the server
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for tile in &self.tiles {
            tile.validate()?;
            if !seen.insert(tile.uuid.as_str()) {
                return Err(DashboardError::DuplicateId {
                    kind: "tile",
                    id: tile.uuid.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Full-replace payload sent when a session saves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDashboard {
    pub name: String,
    pub tiles: Vec<Tile>,
    pub filters: DashboardFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDashboard {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub filters: DashboardFilters,
}

/// Name/description-only update, outside the editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDetails {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DashboardError::validation("dashboard name must not be empty"));
    }
    Ok(())
}
