// Application state for HTTP handlers
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::dashboard_service::DashboardService;
use crate::application::field_resolver::FieldResolver;
use crate::presentation::session_registry::SessionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub repository: Arc<dyn DashboardRepository>,
    pub resolver: FieldResolver,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(repository: Arc<dyn DashboardRepository>, resolver: FieldResolver) -> Self {
        Self {
            dashboard_service: DashboardService::new(repository.clone()),
            repository,
            resolver,
            sessions: SessionRegistry::default(),
        }
    }
}
