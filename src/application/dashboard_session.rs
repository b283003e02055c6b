// Dashboard session - working copy, dirty tracking and the edit/save/cancel lifecycle
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::field_resolver::{FieldResolution, FieldResolver, PartialFailure};
use crate::application::filter_targeting::{self, FilterStatus};
use crate::application::layout::{self, LayoutChange};
use crate::application::tile_registry::TileRegistry;
use crate::domain::dashboard::{Dashboard, UpdateDashboard, validate_name};
use crate::domain::error::{DashboardError, Result};
use crate::domain::field::{FieldDescriptor, FilterableFieldCatalog};
use crate::domain::filter::{DimensionFilter, FilterPatch};
use crate::domain::tile::{Tile, TilePatch};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    Viewing,
    Editing,
    Saving,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Viewing => "viewing",
            SessionMode::Editing => "editing",
            SessionMode::Saving => "saving",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterView {
    #[serde(flatten)]
    pub filter: DimensionFilter,
    pub status: FilterStatus,
    pub field: Option<FieldDescriptor>,
    pub targeted_tiles: Vec<String>,
}

/// Read model published to the UI after every state change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub dashboard_uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub mode: SessionMode,
    pub tiles: Vec<Tile>,
    pub filters: Vec<FilterView>,
    pub tiles_dirty: bool,
    pub filters_dirty: bool,
    pub has_changed: bool,
    pub is_empty: bool,
    pub filterable_fields: Vec<FieldDescriptor>,
    pub catalog_loading: bool,
    pub catalog_incomplete: bool,
    pub failed_charts: Vec<String>,
}

/// Payload captured when a save starts
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub dashboard_id: String,
    pub update: UpdateDashboard,
}

/// Tile set a catalog resolution is started for
#[derive(Debug, Clone)]
pub struct FieldResolutionRequest {
    pub revision: u64,
    pub tiles: Vec<Tile>,
}

pub struct DashboardSession {
    repository: Arc<dyn DashboardRepository>,
    resolver: FieldResolver,
    saved_snapshot: Dashboard,
    working_tiles: TileRegistry,
    working_filters: Vec<DimensionFilter>,
    pending_name: Option<String>,
    tiles_dirty: bool,
    filters_dirty: bool,
    mode: SessionMode,
    /// Bumped whenever the set of tile contents may have changed
    tiles_revision: u64,
    resolution: FieldResolution,
    view_tx: watch::Sender<DashboardView>,
}

impl DashboardSession {
    /// Fetches the dashboard and seeds a session in `Viewing` mode
    pub async fn open(
        repository: Arc<dyn DashboardRepository>,
        resolver: FieldResolver,
        dashboard_id: &str,
    ) -> Result<Self> {
        let snapshot = repository
            .fetch_dashboard(dashboard_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch dashboard {}: {:#}", dashboard_id, e);
                DashboardError::persistence(e)
            })?;
        Self::new(repository, resolver, snapshot)
    }

    pub fn new(
        repository: Arc<dyn DashboardRepository>,
        resolver: FieldResolver,
        snapshot: Dashboard,
    ) -> Result<Self> {
        snapshot.validate()?;
        let working_tiles = TileRegistry::new(snapshot.tiles.clone());
        let working_filters = snapshot.filters.dimensions.clone();
        let (view_tx, _) = watch::channel(Self::placeholder_view(&snapshot));

        let session = Self {
            repository,
            resolver,
            saved_snapshot: snapshot,
            working_tiles,
            working_filters,
            pending_name: None,
            tiles_dirty: false,
            filters_dirty: false,
            mode: SessionMode::Viewing,
            tiles_revision: 1,
            resolution: FieldResolution::empty(0),
            view_tx,
        };
        session.publish();

        tracing::info!(
            "Opened dashboard {} with {} tiles and {} filters",
            session.saved_snapshot.uuid,
            session.working_tiles.len(),
            session.working_filters.len()
        );
        Ok(session)
    }

    pub fn dashboard_id(&self) -> &str {
        &self.saved_snapshot.uuid
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn saved_snapshot(&self) -> &Dashboard {
        &self.saved_snapshot
    }

    pub fn tiles(&self) -> &[Tile] {
        self.working_tiles.list()
    }

    pub fn filters(&self) -> &[DimensionFilter] {
        &self.working_filters
    }

    pub fn tiles_dirty(&self) -> bool {
        self.tiles_dirty
    }

    pub fn filters_dirty(&self) -> bool {
        self.filters_dirty
    }

    pub fn has_changed(&self) -> bool {
        self.tiles_dirty || self.filters_dirty
    }

    pub fn tiles_revision(&self) -> u64 {
        self.tiles_revision
    }

    pub fn catalog(&self) -> &FilterableFieldCatalog {
        &self.resolution.catalog
    }

    pub fn partial_failure(&self) -> Option<&PartialFailure> {
        self.resolution.partial_failure.as_ref()
    }

    pub fn filter_status(&self, filter_id: &str) -> Result<FilterStatus> {
        let filter = self
            .working_filters
            .iter()
            .find(|f| f.id == filter_id)
            .ok_or_else(|| DashboardError::filter_not_found(filter_id))?;
        Ok(filter_targeting::filter_status(filter, self.catalog()))
    }

    pub fn repository(&self) -> Arc<dyn DashboardRepository> {
        self.repository.clone()
    }

    pub fn resolver(&self) -> FieldResolver {
        self.resolver.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view_tx.subscribe()
    }

    /// Number of live read-model subscribers, such as open event streams
    pub fn subscriber_count(&self) -> usize {
        self.view_tx.receiver_count()
    }

    pub fn enter_edit(&mut self) -> Result<()> {
        if self.mode != SessionMode::Viewing {
            return Err(self.invalid("enter edit mode"));
        }
        self.mode = SessionMode::Editing;
        tracing::info!("Editing dashboard {}", self.dashboard_id());
        self.publish();
        Ok(())
    }

    /// Discards every edit since the last fetch or save
    pub fn cancel(&mut self) -> Result<()> {
        if self.mode != SessionMode::Editing {
            return Err(self.invalid("cancel"));
        }
        self.reseed();
        self.mode = SessionMode::Viewing;
        tracing::info!("Discarded changes to dashboard {}", self.dashboard_id());
        self.publish();
        Ok(())
    }

    /// Moves to `Saving` and captures the full-replace payload
    pub fn begin_save(&mut self, name: Option<String>) -> Result<SaveRequest> {
        if self.mode != SessionMode::Editing {
            return Err(self.invalid("save"));
        }
        let name = name
            .or_else(|| self.pending_name.clone())
            .unwrap_or_else(|| self.saved_snapshot.name.clone());
        validate_name(&name)?;

        let request = SaveRequest {
            dashboard_id: self.saved_snapshot.uuid.clone(),
            update: UpdateDashboard {
                name,
                tiles: self.working_tiles.list().to_vec(),
                filters: self.working_filters.clone().into(),
            },
        };
        self.mode = SessionMode::Saving;
        tracing::info!(
            "Saving dashboard {} ({} tiles, {} filters)",
            request.dashboard_id,
            request.update.tiles.len(),
            request.update.filters.dimensions.len()
        );
        self.publish();
        Ok(request)
    }

    /// Applies the outcome of a save started with [`begin_save`](Self::begin_save).
    ///
    /// Success replaces the snapshot with what the server confirmed and returns
    /// to `Viewing`. Failure returns to `Editing` with the working copy and
    /// dirty flags exactly as they were.
    pub fn complete_save(
        &mut self,
        request: SaveRequest,
        outcome: anyhow::Result<Option<Dashboard>>,
    ) -> Result<()> {
        if self.mode != SessionMode::Saving {
            return Err(self.invalid("complete a save"));
        }

        let outcome = outcome.and_then(|confirmed| match confirmed {
            Some(dashboard) => {
                dashboard
                    .validate()
                    .map_err(|e| anyhow::Error::new(e).context("Server returned an invalid dashboard"))?;
                Ok(Some(dashboard))
            }
            None => Ok(None),
        });

        match outcome {
            Ok(confirmed) => {
                let snapshot = match confirmed {
                    Some(dashboard) => dashboard,
                    None => Dashboard {
                        name: request.update.name,
                        tiles: request.update.tiles,
                        filters: request.update.filters,
                        updated_at: chrono::Utc::now(),
                        ..self.saved_snapshot.clone()
                    },
                };
                self.saved_snapshot = snapshot;
                self.reseed();
                self.mode = SessionMode::Viewing;
                tracing::info!("Saved dashboard {} as {:?}", self.dashboard_id(), self.saved_snapshot.name);
                self.publish();
                Ok(())
            }
            Err(e) => {
                self.mode = SessionMode::Editing;
                tracing::error!("Failed to save dashboard {}: {:#}", request.dashboard_id, e);
                self.publish();
                Err(DashboardError::persistence(e))
            }
        }
    }

    /// Saves through the injected repository. Not retried on failure.
    pub async fn save(&mut self, name: Option<String>) -> Result<()> {
        let request = self.begin_save(name)?;
        let outcome = self
            .repository
            .save_dashboard(&request.dashboard_id, &request.update)
            .await;
        self.complete_save(request, outcome)
    }

    pub fn add_tile(&mut self, tile: Tile) -> Result<()> {
        self.require_editing("add a tile")?;
        self.working_tiles.add(tile)?;
        self.tiles_changed(true);
        Ok(())
    }

    pub fn update_tile(&mut self, tile_id: &str, patch: &TilePatch) -> Result<Tile> {
        self.require_editing("edit a tile")?;
        let before = self
            .working_tiles
            .get(tile_id)
            .map(|t| t.content.clone())
            .ok_or_else(|| DashboardError::tile_not_found(tile_id))?;
        let updated = self.working_tiles.update(tile_id, patch)?.clone();
        self.tiles_changed(updated.content != before);
        Ok(updated)
    }

    pub fn remove_tile(&mut self, tile_id: &str) -> Result<Tile> {
        self.require_editing("remove a tile")?;
        let removed = self.working_tiles.remove(tile_id)?;
        self.tiles_changed(true);
        Ok(removed)
    }

    /// Applies a drag/resize batch; returns the ids of tiles that moved
    pub fn apply_layout_change(&mut self, changes: &[LayoutChange]) -> Result<Vec<String>> {
        self.require_editing("change the layout")?;
        let moved = layout::apply_layout_change(self.working_tiles.list_mut(), changes)?;
        if moved.is_empty() {
            tracing::debug!("Layout batch of {} entries was a no-op", changes.len());
        } else {
            tracing::debug!("Layout batch moved tiles {:?}", moved);
            self.tiles_changed(false);
        }
        Ok(moved)
    }

    /// Stages a new dashboard name; part of the tile facet of the dirty state
    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.require_editing("rename")?;
        validate_name(name)?;
        self.pending_name = Some(name.to_string());
        self.tiles_dirty = true;
        self.publish();
        Ok(())
    }

    pub fn apply_filter(&mut self, filter: DimensionFilter) -> Result<()> {
        self.require_editing("add a filter")?;
        filter_targeting::apply_filter(&mut self.working_filters, filter)?;
        self.filters_changed();
        Ok(())
    }

    pub fn update_filter(&mut self, filter_id: &str, patch: &FilterPatch) -> Result<DimensionFilter> {
        self.require_editing("edit a filter")?;
        let updated = filter_targeting::update_filter(&mut self.working_filters, filter_id, patch)?.clone();
        self.filters_changed();
        Ok(updated)
    }

    pub fn remove_filter(&mut self, filter_id: &str) -> Result<DimensionFilter> {
        self.require_editing("remove a filter")?;
        let removed = filter_targeting::remove_filter(&mut self.working_filters, filter_id)?;
        self.filters_changed();
        Ok(removed)
    }

    pub fn begin_field_resolution(&self) -> FieldResolutionRequest {
        FieldResolutionRequest {
            revision: self.tiles_revision,
            tiles: self.working_tiles.list().to_vec(),
        }
    }

    /// Installs a completed resolution unless the tile set changed since it started
    pub fn apply_field_resolution(&mut self, resolution: FieldResolution) -> bool {
        if resolution.revision != self.tiles_revision {
            tracing::warn!(
                "Dropping superseded field resolution for revision {} (current {})",
                resolution.revision,
                self.tiles_revision
            );
            return false;
        }
        if let Some(failure) = &resolution.partial_failure {
            tracing::warn!(
                "Filterable fields may be incomplete; {} charts failed",
                failure.failures.len()
            );
        }
        self.resolution = resolution;
        self.publish();
        true
    }

    /// Resolves the catalog for the current tile set while holding the session
    pub async fn refresh_catalog(&mut self) -> bool {
        let request = self.begin_field_resolution();
        let resolution = self.resolver.resolve(request.revision, &request.tiles).await;
        self.apply_field_resolution(resolution)
    }

    pub fn view(&self) -> DashboardView {
        let tiles = self.working_tiles.list();
        let catalog = self.catalog();
        let filters = self
            .working_filters
            .iter()
            .map(|filter| FilterView {
                filter: filter.clone(),
                status: filter_targeting::filter_status(filter, catalog),
                field: catalog.find(&filter.target).cloned(),
                targeted_tiles: filter_targeting::targeted_tiles(filter, tiles, &self.resolution),
            })
            .collect();
        let failed_charts = self
            .partial_failure()
            .map(|f| f.failed_charts().map(str::to_string).collect())
            .unwrap_or_default();

        DashboardView {
            dashboard_uuid: self.saved_snapshot.uuid.clone(),
            name: self
                .pending_name
                .clone()
                .unwrap_or_else(|| self.saved_snapshot.name.clone()),
            description: self.saved_snapshot.description.clone(),
            mode: self.mode,
            tiles: tiles.to_vec(),
            filters,
            tiles_dirty: self.tiles_dirty,
            filters_dirty: self.filters_dirty,
            has_changed: self.has_changed(),
            is_empty: tiles.is_empty(),
            filterable_fields: catalog.fields().to_vec(),
            catalog_loading: self.resolution.revision != self.tiles_revision,
            catalog_incomplete: self.resolution.partial_failure.is_some(),
            failed_charts,
        }
    }

    fn placeholder_view(snapshot: &Dashboard) -> DashboardView {
        DashboardView {
            dashboard_uuid: snapshot.uuid.clone(),
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            mode: SessionMode::Viewing,
            tiles: Vec::new(),
            filters: Vec::new(),
            tiles_dirty: false,
            filters_dirty: false,
            has_changed: false,
            is_empty: true,
            filterable_fields: Vec::new(),
            catalog_loading: true,
            catalog_incomplete: false,
            failed_charts: Vec::new(),
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }

    fn reseed(&mut self) {
        self.working_tiles = TileRegistry::new(self.saved_snapshot.tiles.clone());
        self.working_filters = self.saved_snapshot.filters.dimensions.clone();
        self.pending_name = None;
        self.tiles_dirty = false;
        self.filters_dirty = false;
        self.tiles_revision += 1;
    }

    fn tiles_changed(&mut self, content_changed: bool) {
        self.tiles_dirty = true;
        if content_changed {
            self.tiles_revision += 1;
        }
        self.publish();
    }

    fn filters_changed(&mut self) {
        self.filters_dirty = true;
        self.publish();
    }

    fn require_editing(&self, action: &'static str) -> Result<()> {
        if self.mode != SessionMode::Editing {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DashboardError {
        DashboardError::InvalidTransition {
            action,
            mode: self.mode.as_str(),
        }
    }
}
