// REST API repository implementation
use crate::application::dashboard_repository::{DashboardRepository, FilterableFieldSource};
use crate::domain::dashboard::{CreateDashboard, Dashboard, DashboardDetails, UpdateDashboard};
use crate::domain::field::FieldDescriptor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpDashboardRepository {
    host: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ApiEnvelope<T> {
    Ok {
        results: Option<T>,
    },
    Error {
        error: ApiErrorBody,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
    message: String,
}

impl ApiErrorBody {
    fn describe(&self) -> String {
        match (&self.name, self.status_code) {
            (Some(name), Some(code)) => format!("{} ({}): {}", name, code, self.message),
            (Some(name), None) => format!("{}: {}", name, self.message),
            _ => self.message.clone(),
        }
    }
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<Option<T>> {
    match envelope {
        ApiEnvelope::Ok { results } => Ok(results),
        ApiEnvelope::Error { error } => anyhow::bail!("{}", error.describe()),
    }
}

impl HttpDashboardRepository {
    pub fn new(host: String, token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn build_url(&self, segments: &[&str]) -> String {
        let path: Vec<String> = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("{}/api/v1/{}", self.host, path.join("/"))
    }

    async fn execute<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!("{} {}", method, url);
        let mut request = self
            .client
            .request(method.clone(), url)
            .header("Authorization", format!("ApiKey {}", self.token))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} {}", method, url))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ApiEnvelope<T>>(&text) {
            Ok(envelope) => unwrap_envelope(envelope),
            Err(_) if !status.is_success() => {
                anyhow::bail!("Request failed with status {}: {}", status, text)
            }
            Err(e) => Err(e).context("Failed to parse API response"),
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.execute::<(), T>(Method::GET, url, None)
            .await?
            .context("API response had no results")
    }
}

#[async_trait]
impl DashboardRepository for HttpDashboardRepository {
    async fn fetch_dashboard(&self, dashboard_id: &str) -> Result<Dashboard> {
        let url = self.build_url(&["dashboards", dashboard_id]);
        self.get(&url)
            .await
            .with_context(|| format!("Failed to fetch dashboard {}", dashboard_id))
    }

    async fn save_dashboard(
        &self,
        dashboard_id: &str,
        update: &UpdateDashboard,
    ) -> Result<Option<Dashboard>> {
        let url = self.build_url(&["dashboards", dashboard_id]);
        self.execute(Method::PATCH, &url, Some(update))
            .await
            .with_context(|| format!("Failed to save dashboard {}", dashboard_id))
    }

    async fn update_details(&self, dashboard_id: &str, details: &DashboardDetails) -> Result<()> {
        let url = self.build_url(&["dashboards", dashboard_id]);
        self.execute::<_, serde_json::Value>(Method::PATCH, &url, Some(details))
            .await
            .with_context(|| format!("Failed to update dashboard {}", dashboard_id))?;
        Ok(())
    }

    async fn create_dashboard(&self, project_id: &str, dashboard: &CreateDashboard) -> Result<Dashboard> {
        let url = self.build_url(&["projects", project_id, "dashboards"]);
        self.execute(Method::POST, &url, Some(dashboard))
            .await?
            .with_context(|| format!("Failed to create dashboard in project {}", project_id))
    }

    async fn delete_dashboard(&self, dashboard_id: &str) -> Result<()> {
        let url = self.build_url(&["dashboards", dashboard_id]);
        self.execute::<(), serde_json::Value>(Method::DELETE, &url, None)
            .await
            .with_context(|| format!("Failed to delete dashboard {}", dashboard_id))?;
        Ok(())
    }
}

#[async_trait]
impl FilterableFieldSource for HttpDashboardRepository {
    async fn fetch_filterable_fields(&self, saved_chart_uuid: &str) -> Result<Vec<FieldDescriptor>> {
        let url = self.build_url(&["saved", saved_chart_uuid, "availableFilters"]);
        self.get(&url)
            .await
            .with_context(|| format!("Failed to fetch available filters for chart {}", saved_chart_uuid))
    }
}
