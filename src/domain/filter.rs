// Dashboard-level dimension filters
use super::error::{DashboardError, Result};
use super::field::FieldRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    IsNull,
    NotNull,
    StartsWith,
    Include,
    DoesNotInclude,
    LessThan,
    GreaterThan,
}

impl FilterOperator {
    pub fn takes_values(&self) -> bool {
        match self {
            FilterOperator::IsNull | FilterOperator::NotNull => false,
            FilterOperator::Equals
            | FilterOperator::NotEquals
            | FilterOperator::StartsWith
            | FilterOperator::Include
            | FilterOperator::DoesNotInclude
            | FilterOperator::LessThan
            | FilterOperator::GreaterThan => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub id: String,
    pub target: FieldRef,
    pub operator: FilterOperator,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

impl DimensionFilter {
    pub fn new(target: FieldRef, operator: FilterOperator, values: Vec<serde_json::Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target,
            operator,
            values,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DashboardError::validation("filter id must not be empty"));
        }
        if self.target.table.trim().is_empty() || self.target.field_name.trim().is_empty() {
            return Err(DashboardError::validation(format!(
                "filter {} has an incomplete target",
                self.id
            )));
        }
        match (self.operator.takes_values(), self.values.is_empty()) {
            (true, true) => Err(DashboardError::validation(format!(
                "filter {} needs at least one value for {:?}",
                self.id, self.operator
            ))),
            (false, false) => Err(DashboardError::validation(format!(
                "filter {} takes no values for {:?}",
                self.id, self.operator
            ))),
            _ => Ok(()),
        }
    }

    pub fn patched(&self, patch: &FilterPatch) -> Result<DimensionFilter> {
        let mut filter = self.clone();
        if let Some(target) = &patch.target {
            filter.target = target.clone();
        }
        if let Some(operator) = patch.operator {
            filter.operator = operator;
        }
        if let Some(values) = &patch.values {
            filter.values = values.clone();
        }
        filter.validate()?;
        Ok(filter)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPatch {
    #[serde(default)]
    pub target: Option<FieldRef>,
    #[serde(default)]
    pub operator: Option<FilterOperator>,
    #[serde(default)]
    pub values: Option<Vec<serde_json::Value>>,
}

/// Filters as persisted with a dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFilters {
    #[serde(default)]
    pub dimensions: Vec<DimensionFilter>,
}

impl From<Vec<DimensionFilter>> for DashboardFilters {
    fn from(dimensions: Vec<DimensionFilter>) -> Self {
        Self { dimensions }
    }
}
