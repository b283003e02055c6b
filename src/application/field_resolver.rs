// Field resolver - discovers the filterable fields exposed by a tile set
use crate::application::dashboard_repository::FilterableFieldSource;
use crate::domain::field::{FieldRef, FilterableFieldCatalog};
use crate::domain::tile::Tile;
use futures::StreamExt;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFailure {
    pub saved_chart_uuid: String,
    pub message: String,
}

/// Some charts could not report their fields; the catalog is still usable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialFailure {
    pub failures: Vec<ChartFailure>,
}

impl PartialFailure {
    pub fn failed_charts(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.saved_chart_uuid.as_str())
    }
}

/// Completed result of one resolution batch
#[derive(Debug, Clone, Default)]
pub struct FieldResolution {
    /// Tile-set revision the batch was started for
    pub revision: u64,
    pub catalog: FilterableFieldCatalog,
    pub partial_failure: Option<PartialFailure>,
    chart_fields: HashMap<String, HashSet<FieldRef>>,
}

impl FieldResolution {
    pub fn empty(revision: u64) -> Self {
        Self {
            revision,
            ..Default::default()
        }
    }

    /// Whether the given chart reported `target` among its own fields
    pub fn chart_exposes(&self, saved_chart_uuid: &str, target: &FieldRef) -> bool {
        self.chart_fields
            .get(saved_chart_uuid)
            .is_some_and(|fields| fields.contains(target))
    }
}

/// Distinct chart references in tile order; markdown and embeds contribute none
pub fn distinct_chart_references(tiles: &[Tile]) -> Vec<String> {
    let mut seen = HashSet::new();
    tiles
        .iter()
        .filter_map(|t| t.content.chart_reference())
        .filter(|uuid| seen.insert(*uuid))
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct FieldResolver {
    source: Arc<dyn FilterableFieldSource>,
    max_concurrent_fetches: usize,
}

impl FieldResolver {
    pub fn new(source: Arc<dyn FilterableFieldSource>, max_concurrent_fetches: usize) -> Self {
        Self {
            source,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// Fetches fields for every distinct chart and merges them into one catalog.
    ///
    /// Fetches run concurrently but are merged in tile order, so the first
    /// chart (by tile order) to expose a key supplies its descriptor. A failed
    /// chart contributes nothing and is listed in the partial failure.
    pub async fn resolve(&self, revision: u64, tiles: &[Tile]) -> FieldResolution {
        let started = Instant::now();
        let charts = distinct_chart_references(tiles);
        let source = &self.source;

        let results: Vec<_> = futures::stream::iter(charts)
            .map(|chart| async move {
                let result = source.fetch_filterable_fields(&chart).await;
                (chart, result)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut resolution = FieldResolution::empty(revision);
        let mut failures = Vec::new();

        for (chart, result) in results {
            match result {
                Ok(fields) => {
                    let keys = resolution.chart_fields.entry(chart).or_default();
                    for field in fields {
                        keys.insert(field.key());
                        resolution.catalog.insert(field);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch filterable fields for chart {}: {:#}", chart, e);
                    failures.push(ChartFailure {
                        saved_chart_uuid: chart,
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        if !failures.is_empty() {
            resolution.partial_failure = Some(PartialFailure { failures });
        }

        tracing::debug!(
            "Resolved {} filterable fields for revision {} in {:?}",
            resolution.catalog.len(),
            revision,
            started.elapsed()
        );

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeFieldSource, chart_tile, markdown_tile};
    use crate::domain::field::{FieldDescriptor, FieldType};

    fn source() -> Arc<FakeFieldSource> {
        let source = FakeFieldSource::default();
        source.expose(
            "orders-chart",
            vec![
                FieldDescriptor::new("orders", "status", FieldType::String),
                FieldDescriptor::new("orders", "total", FieldType::Number),
            ],
        );
        source.expose(
            "customers-chart",
            vec![
                FieldDescriptor::new("customers", "name", FieldType::String),
                FieldDescriptor::new("orders", "status", FieldType::String).with_label("Order status"),
            ],
        );
        Arc::new(source)
    }

    #[test]
    fn test_distinct_chart_references() {
        let tiles = vec![
            chart_tile("a", "orders-chart"),
            markdown_tile("b"),
            chart_tile("c", "orders-chart"),
            chart_tile("d", "customers-chart"),
        ];
        assert_eq!(
            distinct_chart_references(&tiles),
            vec!["orders-chart".to_string(), "customers-chart".to_string()]
        );
    }

    #[tokio::test]
    async fn test_catalog_has_no_duplicate_keys() {
        let source = source();
        let resolver = FieldResolver::new(source.clone(), 4);
        let tiles = vec![
            chart_tile("a", "orders-chart"),
            chart_tile("b", "customers-chart"),
            chart_tile("c", "orders-chart"),
        ];

        let resolution = resolver.resolve(1, &tiles).await;

        let keys: HashSet<_> = resolution.catalog.fields().iter().map(|f| f.key()).collect();
        assert_eq!(keys.len(), resolution.catalog.len());
        assert_eq!(resolution.catalog.len(), 3);
        // the orders chart comes first in tile order, so its unlabeled descriptor wins
        let status = resolution.catalog.find(&FieldRef::new("orders", "status")).unwrap();
        assert_eq!(status.label, None);
        assert!(resolution.partial_failure.is_none());
        assert_eq!(source.fetch_count("orders-chart"), 1);
    }

    #[tokio::test]
    async fn test_non_chart_tiles_contribute_nothing() {
        let resolver = FieldResolver::new(source(), 4);
        let resolution = resolver.resolve(7, &[markdown_tile("m")]).await;
        assert!(resolution.catalog.is_empty());
        assert_eq!(resolution.revision, 7);
    }

    #[tokio::test]
    async fn test_failed_chart_yields_partial_catalog() {
        let source = source();
        source.fail("customers-chart", "warehouse timeout");
        let resolver = FieldResolver::new(source, 4);
        let tiles = vec![chart_tile("a", "orders-chart"), chart_tile("b", "customers-chart")];

        let resolution = resolver.resolve(2, &tiles).await;

        assert_eq!(resolution.catalog.len(), 2);
        assert!(!resolution.catalog.contains(&FieldRef::new("customers", "name")));
        let failure = resolution.partial_failure.unwrap();
        assert_eq!(failure.failed_charts().collect::<Vec<_>>(), vec!["customers-chart"]);
        assert!(failure.failures[0].message.contains("warehouse timeout"));
    }

    #[tokio::test]
    async fn test_chart_exposes_tracks_per_chart_fields() {
        let resolver = FieldResolver::new(source(), 1);
        let tiles = vec![chart_tile("a", "orders-chart"), chart_tile("b", "customers-chart")];
        let resolution = resolver.resolve(3, &tiles).await;

        let status = FieldRef::new("orders", "status");
        let total = FieldRef::new("orders", "total");
        assert!(resolution.chart_exposes("orders-chart", &status));
        assert!(resolution.chart_exposes("customers-chart", &status));
        assert!(!resolution.chart_exposes("customers-chart", &total));
        assert!(!resolution.chart_exposes("missing-chart", &status));
    }
}
