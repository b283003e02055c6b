// In-memory collaborators shared by unit tests
use crate::application::dashboard_repository::{DashboardRepository, FilterableFieldSource};
use crate::domain::dashboard::{CreateDashboard, Dashboard, DashboardDetails, UpdateDashboard};
use crate::domain::field::{FieldDescriptor, FieldType};
use crate::domain::filter::{DashboardFilters, DimensionFilter};
use crate::domain::tile::{Tile, TileContent, TileGeometry};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn chart_tile(id: &str, chart: &str) -> Tile {
    Tile::with_id(
        id,
        TileGeometry::new(0, 0, 6, 3),
        TileContent::SavedChart {
            saved_chart_uuid: chart.to_string(),
        },
    )
}

pub fn markdown_tile(id: &str) -> Tile {
    Tile::with_id(
        id,
        TileGeometry::new(6, 0, 6, 3),
        TileContent::Markdown {
            title: id.to_string(),
            content: "notes".to_string(),
        },
    )
}

pub fn orders_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("orders", "status", FieldType::String),
        FieldDescriptor::new("orders", "total", FieldType::Number),
    ]
}

pub fn sample_dashboard(id: &str, tiles: Vec<Tile>, filters: Vec<DimensionFilter>) -> Dashboard {
    Dashboard {
        uuid: id.to_string(),
        name: "Sales overview".to_string(),
        description: Some("Weekly numbers".to_string()),
        tiles,
        filters: DashboardFilters::from(filters),
        updated_at: Utc::now(),
    }
}

#[derive(Debug, Clone, Default)]
pub enum SaveBehaviour {
    /// Store and return the stored dashboard
    #[default]
    Echo,
    /// Store and return nothing
    Void,
    /// Store and return the given dashboard instead of the stored one
    Respond(Dashboard),
    /// Hold the request until notified, then behave like `Echo`
    Wait(Arc<Notify>),
    Fail(String),
}

#[derive(Default)]
pub struct FakeDashboardRepository {
    dashboards: Mutex<HashMap<String, Dashboard>>,
    save_behaviour: Mutex<SaveBehaviour>,
    saves: Mutex<Vec<UpdateDashboard>>,
}

impl FakeDashboardRepository {
    pub fn insert(&self, dashboard: Dashboard) {
        self.dashboards
            .lock()
            .unwrap()
            .insert(dashboard.uuid.clone(), dashboard);
    }

    pub fn get(&self, id: &str) -> Option<Dashboard> {
        self.dashboards.lock().unwrap().get(id).cloned()
    }

    pub fn set_save_behaviour(&self, behaviour: SaveBehaviour) {
        *self.save_behaviour.lock().unwrap() = behaviour;
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_save(&self) -> Option<UpdateDashboard> {
        self.saves.lock().unwrap().last().cloned()
    }

    fn missing(id: &str) -> anyhow::Error {
        anyhow::anyhow!("Dashboard {} not found", id)
    }
}

#[async_trait]
impl DashboardRepository for FakeDashboardRepository {
    async fn fetch_dashboard(&self, dashboard_id: &str) -> anyhow::Result<Dashboard> {
        self.get(dashboard_id).ok_or_else(|| Self::missing(dashboard_id))
    }

    async fn save_dashboard(
        &self,
        dashboard_id: &str,
        update: &UpdateDashboard,
    ) -> anyhow::Result<Option<Dashboard>> {
        self.saves.lock().unwrap().push(update.clone());
        let behaviour = self.save_behaviour.lock().unwrap().clone();
        match &behaviour {
            SaveBehaviour::Fail(message) => anyhow::bail!("{}", message),
            SaveBehaviour::Wait(release) => release.notified().await,
            _ => {}
        }

        let mut dashboards = self.dashboards.lock().unwrap();
        let stored = dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| Self::missing(dashboard_id))?;
        stored.name = update.name.clone();
        stored.tiles = update.tiles.clone();
        stored.filters = update.filters.clone();
        stored.updated_at = Utc::now();

        match behaviour {
            SaveBehaviour::Echo | SaveBehaviour::Wait(_) => Ok(Some(stored.clone())),
            SaveBehaviour::Respond(dashboard) => Ok(Some(dashboard)),
            SaveBehaviour::Void | SaveBehaviour::Fail(_) => Ok(None),
        }
    }

    async fn update_details(
        &self,
        dashboard_id: &str,
        details: &DashboardDetails,
    ) -> anyhow::Result<()> {
        let mut dashboards = self.dashboards.lock().unwrap();
        let stored = dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| Self::missing(dashboard_id))?;
        stored.name = details.name.clone();
        stored.description = details.description.clone();
        Ok(())
    }

    async fn create_dashboard(
        &self,
        _project_id: &str,
        dashboard: &CreateDashboard,
    ) -> anyhow::Result<Dashboard> {
        let created = Dashboard {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: dashboard.name.clone(),
            description: dashboard.description.clone(),
            tiles: dashboard.tiles.clone(),
            filters: dashboard.filters.clone(),
            updated_at: Utc::now(),
        };
        self.insert(created.clone());
        Ok(created)
    }

    async fn delete_dashboard(&self, dashboard_id: &str) -> anyhow::Result<()> {
        self.dashboards
            .lock()
            .unwrap()
            .remove(dashboard_id)
            .map(|_| ())
            .ok_or_else(|| Self::missing(dashboard_id))
    }
}

#[derive(Default)]
pub struct FakeFieldSource {
    fields: Mutex<HashMap<String, Vec<FieldDescriptor>>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFieldSource {
    pub fn expose(&self, chart: &str, fields: Vec<FieldDescriptor>) {
        self.fields.lock().unwrap().insert(chart.to_string(), fields);
    }

    pub fn fail(&self, chart: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(chart.to_string(), message.to_string());
    }

    pub fn fetch_count(&self, chart: &str) -> usize {
        self.calls.lock().unwrap().get(chart).copied().unwrap_or(0)
    }
}

#[async_trait]
impl FilterableFieldSource for FakeFieldSource {
    async fn fetch_filterable_fields(
        &self,
        saved_chart_uuid: &str,
    ) -> anyhow::Result<Vec<FieldDescriptor>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(saved_chart_uuid.to_string())
            .or_default() += 1;
        if let Some(message) = self.failures.lock().unwrap().get(saved_chart_uuid) {
            anyhow::bail!("{}", message);
        }
        Ok(self
            .fields
            .lock()
            .unwrap()
            .get(saved_chart_uuid)
            .cloned()
            .unwrap_or_default())
    }
}
