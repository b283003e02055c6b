// Dashboard service - Lifecycle use cases outside an editing session
use crate::application::dashboard_repository::DashboardRepository;
use crate::domain::dashboard::{CreateDashboard, Dashboard, DashboardDetails, validate_name};
use crate::domain::error::{DashboardError, Result};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn DashboardRepository>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, project_id: &str, dashboard: CreateDashboard) -> Result<Dashboard> {
        validate_name(&dashboard.name)?;
        let mut ids = HashSet::new();
        for tile in &dashboard.tiles {
            tile.validate()?;
            if !ids.insert(tile.uuid.as_str()) {
                return Err(DashboardError::DuplicateId {
                    kind: "tile",
                    id: tile.uuid.clone(),
                });
            }
        }
        for filter in &dashboard.filters.dimensions {
            filter.validate()?;
        }

        let created = self
            .repository
            .create_dashboard(project_id, &dashboard)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create dashboard in project {}: {:#}", project_id, e);
                DashboardError::persistence(e)
            })?;
        tracing::info!("Created dashboard {} ({})", created.uuid, created.name);
        Ok(created)
    }

    pub async fn delete(&self, dashboard_id: &str) -> Result<()> {
        self.repository
            .delete_dashboard(dashboard_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete dashboard {}: {:#}", dashboard_id, e);
                DashboardError::persistence(e)
            })?;
        tracing::info!("Deleted dashboard {}", dashboard_id);
        Ok(())
    }

    /// Name/description update that bypasses the tile and filter working copy
    pub async fn update_details(&self, dashboard_id: &str, details: DashboardDetails) -> Result<()> {
        validate_name(&details.name)?;
        self.repository
            .update_details(dashboard_id, &details)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update dashboard {}: {:#}", dashboard_id, e);
                DashboardError::persistence(e)
            })?;
        tracing::info!("Updated dashboard {} name to {:?}", dashboard_id, details.name);
        Ok(())
    }
}
