// HTTP request handlers
use crate::application::dashboard_session::{DashboardSession, DashboardView};
use crate::application::layout::LayoutChange;
use crate::domain::dashboard::{CreateDashboard, Dashboard, DashboardDetails};
use crate::domain::error::DashboardError;
use crate::domain::field::FieldRef;
use crate::domain::filter::{DimensionFilter, FilterOperator, FilterPatch};
use crate::domain::tile::{Tile, TileContent, TileGeometry, TilePatch};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::session_registry::{SharedSession, spawn_catalog_refresh};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpened {
    pub session_id: String,
    pub view: DashboardView,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveBody {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewTile {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub geometry: TileGeometry,
    #[serde(flatten)]
    pub content: TileContent,
}

impl From<NewTile> for Tile {
    fn from(new: NewTile) -> Self {
        match new.uuid {
            Some(uuid) => Tile::with_id(uuid, new.geometry, new.content),
            None => Tile::new(new.geometry, new.content),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewFilter {
    #[serde(default)]
    pub id: Option<String>,
    pub target: FieldRef,
    pub operator: FilterOperator,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

impl From<NewFilter> for DimensionFilter {
    fn from(new: NewFilter) -> Self {
        let mut filter = DimensionFilter::new(new.target, new.operator, new.values);
        if let Some(id) = new.id {
            filter.id = id;
        }
        filter
    }
}

type ViewResult = Result<Json<DashboardView>, ApiError>;

async fn lookup(state: &AppState, session_id: &str) -> Result<SharedSession, ApiError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))
}

/// Runs a mutation against a session and returns the resulting read model
async fn mutate<F>(state: &AppState, session_id: &str, refresh: bool, f: F) -> ViewResult
where
    F: FnOnce(&mut DashboardSession) -> crate::domain::error::Result<()>,
{
    let shared = lookup(state, session_id).await?;
    let view = {
        let mut session = shared.lock().await;
        f(&mut *session)?;
        session.view()
    };
    if refresh {
        spawn_catalog_refresh(shared);
    }
    Ok(Json(view))
}

pub async fn create_dashboard(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateDashboard>,
) -> Result<(StatusCode, Json<Dashboard>), ApiError> {
    let created = state.dashboard_service.create(&project_id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_dashboard_details(
    Path(dashboard_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<DashboardDetails>,
) -> Result<StatusCode, ApiError> {
    state.dashboard_service.update_details(&dashboard_id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_dashboard(
    Path(dashboard_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.dashboard_service.delete(&dashboard_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn open_session(
    Path(dashboard_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionOpened>), ApiError> {
    let session = DashboardSession::open(state.repository.clone(), state.resolver.clone(), &dashboard_id).await?;
    let view = session.view();
    let (session_id, shared) = state.sessions.insert(session).await;
    spawn_catalog_refresh(shared);
    tracing::info!("Opened session {} for dashboard {}", session_id, dashboard_id);
    Ok((StatusCode::CREATED, Json(SessionOpened { session_id, view })))
}

pub async fn get_session(Path(session_id): Path<String>, State(state): State<Arc<AppState>>) -> ViewResult {
    let shared = lookup(&state, &session_id).await?;
    let view = shared.lock().await.view();
    Ok(Json(view))
}

/// Streams the read model every time it changes
pub async fn session_events(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let shared = lookup(&state, &session_id).await?;
    let rx = shared.lock().await.subscribe();
    let stream = WatchStream::new(rx).filter_map(|view| match Event::default().json_data(&view) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            tracing::warn!("Failed to encode session view: {}", e);
            None
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn close_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    if !state.sessions.remove(&session_id).await {
        return Err(ApiError::SessionNotFound(session_id));
    }
    tracing::info!("Closed session {}", session_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn enter_edit(Path(session_id): Path<String>, State(state): State<Arc<AppState>>) -> ViewResult {
    mutate(&state, &session_id, false, |s| s.enter_edit()).await
}

pub async fn cancel_edit(Path(session_id): Path<String>, State(state): State<Arc<AppState>>) -> ViewResult {
    mutate(&state, &session_id, true, |s| s.cancel()).await
}

/// Releases the session lock while the save request is in flight.
///
/// The round-trip runs on its own task so the session leaves `Saving` even
/// when the client goes away before the response.
pub async fn save_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Option<Json<SaveBody>>,
) -> ViewResult {
    let shared = lookup(&state, &session_id).await?;
    let name = body.and_then(|Json(b)| b.name);

    let (request, repository) = {
        let mut session = shared.lock().await;
        (session.begin_save(name)?, session.repository())
    };

    let task = tokio::spawn(async move {
        let outcome = repository
            .save_dashboard(&request.dashboard_id, &request.update)
            .await;
        let view = {
            let mut session = shared.lock().await;
            session.complete_save(request, outcome)?;
            session.view()
        };
        spawn_catalog_refresh(shared);
        Ok::<_, DashboardError>(view)
    });

    let view = task
        .await
        .map_err(|e| DashboardError::persistence(anyhow::Error::new(e).context("Save task failed")))??;
    Ok(Json(view))
}

pub async fn rename_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<RenameBody>,
) -> ViewResult {
    mutate(&state, &session_id, false, |s| s.rename(&body.name)).await
}

pub async fn add_tile(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewTile>,
) -> ViewResult {
    mutate(&state, &session_id, true, |s| s.add_tile(body.into())).await
}

pub async fn update_tile(
    Path((session_id, tile_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<TilePatch>,
) -> ViewResult {
    let refresh = patch.content.is_some();
    mutate(&state, &session_id, refresh, |s| s.update_tile(&tile_id, &patch).map(|_| ())).await
}

pub async fn remove_tile(
    Path((session_id, tile_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ViewResult {
    mutate(&state, &session_id, true, |s| s.remove_tile(&tile_id).map(|_| ())).await
}

pub async fn apply_layout(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(changes): Json<Vec<LayoutChange>>,
) -> ViewResult {
    mutate(&state, &session_id, false, |s| s.apply_layout_change(&changes).map(|_| ())).await
}

pub async fn add_filter(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewFilter>,
) -> ViewResult {
    mutate(&state, &session_id, false, |s| s.apply_filter(body.into())).await
}

pub async fn update_filter(
    Path((session_id, filter_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<FilterPatch>,
) -> ViewResult {
    mutate(&state, &session_id, false, |s| s.update_filter(&filter_id, &patch).map(|_| ())).await
}

pub async fn remove_filter(
    Path((session_id, filter_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ViewResult {
    mutate(&state, &session_id, false, |s| s.remove_filter(&filter_id).map(|_| ())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_session::SessionMode;
    use crate::application::field_resolver::FieldResolver;
    use crate::application::test_support::{
        FakeDashboardRepository, FakeFieldSource, SaveBehaviour, chart_tile, orders_fields, sample_dashboard,
    };
    use crate::presentation::session_registry::refresh_catalog;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Fixture {
        repository: Arc<FakeDashboardRepository>,
        state: Arc<AppState>,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(FakeDashboardRepository::default());
        repository.insert(sample_dashboard("dash-1", vec![chart_tile("a", "orders-chart")], vec![]));
        let fields = Arc::new(FakeFieldSource::default());
        fields.expose("orders-chart", orders_fields());
        let state = Arc::new(AppState::new(repository.clone(), FieldResolver::new(fields, 4)));
        Fixture { repository, state }
    }

    async fn open(f: &Fixture) -> String {
        let (status, Json(opened)) = open_session(Path("dash-1".to_string()), State(f.state.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        opened.session_id
    }

    #[tokio::test]
    async fn test_open_unknown_dashboard_is_bad_gateway() {
        let f = fixture();
        let err = open_session(Path("nope".to_string()), State(f.state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let f = fixture();
        let err = get_session(Path("missing".to_string()), State(f.state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_filter_and_save_flow() {
        let f = fixture();
        let sid = open(&f).await;
        refresh_catalog(f.state.sessions.get(&sid).await.unwrap()).await;

        let err = add_filter(
            Path(sid.clone()),
            State(f.state.clone()),
            Json(NewFilter {
                id: None,
                target: FieldRef::new("orders", "status"),
                operator: FilterOperator::Equals,
                values: vec![json!("shipped")],
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        enter_edit(Path(sid.clone()), State(f.state.clone())).await.unwrap();
        let Json(view) = add_filter(
            Path(sid.clone()),
            State(f.state.clone()),
            Json(NewFilter {
                id: Some("f-1".to_string()),
                target: FieldRef::new("orders", "status"),
                operator: FilterOperator::Equals,
                values: vec![json!("shipped")],
            }),
        )
        .await
        .unwrap();
        assert!(view.filters_dirty);
        assert!(!view.tiles_dirty);
        assert_eq!(view.filters[0].targeted_tiles, vec!["a".to_string()]);

        let Json(view) = save_session(
            Path(sid.clone()),
            State(f.state.clone()),
            Some(Json(SaveBody {
                name: Some("Ops".to_string()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(view.mode, SessionMode::Viewing);
        assert_eq!(view.name, "Ops");
        assert!(!view.has_changed);
        assert_eq!(f.repository.get("dash-1").unwrap().filters.dimensions.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_returns_to_editing() {
        let f = fixture();
        f.repository.set_save_behaviour(SaveBehaviour::Fail("upstream unavailable".to_string()));
        let sid = open(&f).await;
        enter_edit(Path(sid.clone()), State(f.state.clone())).await.unwrap();
        rename_session(
            Path(sid.clone()),
            State(f.state.clone()),
            Json(RenameBody {
                name: "Draft".to_string(),
            }),
        )
        .await
        .unwrap();

        let err = save_session(Path(sid.clone()), State(f.state.clone()), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("upstream unavailable"));

        let Json(view) = get_session(Path(sid), State(f.state.clone())).await.unwrap();
        assert_eq!(view.mode, SessionMode::Editing);
        assert_eq!(view.name, "Draft");
        assert!(view.tiles_dirty);
    }

    #[tokio::test]
    async fn test_dropped_save_request_still_completes() {
        let f = fixture();
        let release = Arc::new(Notify::new());
        f.repository.set_save_behaviour(SaveBehaviour::Wait(release.clone()));
        let sid = open(&f).await;
        enter_edit(Path(sid.clone()), State(f.state.clone())).await.unwrap();

        let dropped = tokio::time::timeout(
            Duration::from_millis(50),
            save_session(Path(sid.clone()), State(f.state.clone()), None),
        )
        .await;
        assert!(dropped.is_err());
        release.notify_one();

        let mut mode = SessionMode::Saving;
        for _ in 0..100 {
            let Json(view) = get_session(Path(sid.clone()), State(f.state.clone())).await.unwrap();
            mode = view.mode;
            if mode != SessionMode::Saving {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(mode, SessionMode::Viewing);
        assert_eq!(f.repository.save_count(), 1);

        enter_edit(Path(sid.clone()), State(f.state.clone())).await.unwrap();
        let Json(view) = cancel_edit(Path(sid), State(f.state.clone())).await.unwrap();
        assert_eq!(view.mode, SessionMode::Viewing);
    }

    #[tokio::test]
    async fn test_tile_and_layout_endpoints() {
        let f = fixture();
        let sid = open(&f).await;
        enter_edit(Path(sid.clone()), State(f.state.clone())).await.unwrap();

        let new_tile: NewTile = serde_json::from_value(json!({
            "uuid": "notes",
            "x": 0, "y": 3, "w": 12, "h": 2,
            "type": "markdown",
            "properties": { "title": "Notes", "content": "Read me" }
        }))
        .unwrap();
        let Json(view) = add_tile(Path(sid.clone()), State(f.state.clone()), Json(new_tile))
            .await
            .unwrap();
        assert_eq!(view.tiles.len(), 2);

        let Json(view) = apply_layout(
            Path(sid.clone()),
            State(f.state.clone()),
            Json(vec![LayoutChange {
                tile_id: "notes".to_string(),
                x: 0,
                y: 3,
                w: 12,
                h: 2,
            }]),
        )
        .await
        .unwrap();
        assert_eq!(view.tiles[1].geometry, TileGeometry::new(0, 3, 12, 2));

        let err = update_tile(
            Path((sid.clone(), "ghost".to_string())),
            State(f.state.clone()),
            Json(TilePatch::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let Json(view) = remove_tile(Path((sid.clone(), "notes".to_string())), State(f.state.clone()))
            .await
            .unwrap();
        assert_eq!(view.tiles.len(), 1);

        let Json(view) = cancel_edit(Path(sid.clone()), State(f.state.clone())).await.unwrap();
        assert!(!view.tiles_dirty);

        assert_eq!(
            close_session(Path(sid.clone()), State(f.state.clone())).await.unwrap(),
            StatusCode::NO_CONTENT
        );
        assert!(close_session(Path(sid), State(f.state.clone())).await.is_err());
    }

    #[tokio::test]
    async fn test_dashboard_lifecycle_endpoints() {
        let f = fixture();
        let (status, Json(created)) = create_dashboard(
            Path("project-1".to_string()),
            State(f.state.clone()),
            Json(CreateDashboard {
                name: "New board".to_string(),
                description: None,
                tiles: vec![],
                filters: Default::default(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let status = update_dashboard_details(
            Path(created.uuid.clone()),
            State(f.state.clone()),
            Json(DashboardDetails {
                name: "Renamed board".to_string(),
                description: Some("desc".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(f.repository.get(&created.uuid).unwrap().name, "Renamed board");

        delete_dashboard(Path(created.uuid.clone()), State(f.state.clone()))
            .await
            .unwrap();
        assert!(f.repository.get(&created.uuid).is_none());
    }
}
