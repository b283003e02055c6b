// Repository traits for dashboard persistence and field discovery
use crate::domain::dashboard::{CreateDashboard, Dashboard, DashboardDetails, UpdateDashboard};
use crate::domain::field::FieldDescriptor;
use async_trait::async_trait;

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Full snapshot including tiles and filters
    async fn fetch_dashboard(&self, dashboard_id: &str) -> anyhow::Result<Dashboard>;

    /// Full-replace save; servers that echo the stored dashboard return it
    async fn save_dashboard(
        &self,
        dashboard_id: &str,
        update: &UpdateDashboard,
    ) -> anyhow::Result<Option<Dashboard>>;

    async fn update_details(
        &self,
        dashboard_id: &str,
        details: &DashboardDetails,
    ) -> anyhow::Result<()>;

    async fn create_dashboard(
        &self,
        project_id: &str,
        dashboard: &CreateDashboard,
    ) -> anyhow::Result<Dashboard>;

    async fn delete_dashboard(&self, dashboard_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait FilterableFieldSource: Send + Sync {
    /// Fields a saved chart exposes to dashboard filters
    async fn fetch_filterable_fields(
        &self,
        saved_chart_uuid: &str,
    ) -> anyhow::Result<Vec<FieldDescriptor>>;
}
