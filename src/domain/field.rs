// Filterable field descriptors and the deduplicated catalog
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identity of a field: `(table, fieldName)`.
///
/// On the wire a field reference is a filter target `{ "fieldId": "<table>_<field>" }`,
/// with `table` and `fieldName` carried alongside because table names may
/// themselves contain `_`. A target with only `fieldId` splits at the first `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "FilterTarget", try_from = "FilterTarget")]
pub struct FieldRef {
    pub table: String,
    pub field_name: String,
}

impl FieldRef {
    pub fn new(table: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field_name: field_name.into(),
        }
    }

    pub fn field_id(&self) -> String {
        format!("{}_{}", self.table, self.field_name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTarget {
    field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_name: Option<String>,
}

impl From<FieldRef> for FilterTarget {
    fn from(field: FieldRef) -> Self {
        Self {
            field_id: field.field_id(),
            table: Some(field.table),
            field_name: Some(field.field_name),
        }
    }
}

impl TryFrom<FilterTarget> for FieldRef {
    type Error = String;

    fn try_from(target: FilterTarget) -> Result<Self, Self::Error> {
        let field = match (target.table, target.field_name) {
            (Some(table), Some(field_name)) => FieldRef::new(table, field_name),
            (None, None) => match target.field_id.split_once('_') {
                Some((table, field_name)) => FieldRef::new(table, field_name),
                None => return Err(format!("field id {:?} has no table prefix", target.field_id)),
            },
            _ => return Err("filter target needs both table and fieldName".to_string()),
        };
        if field.field_id() != target.field_id {
            return Err(format!(
                "field id {:?} does not match {}.{}",
                target.field_id, field.table, field.field_name
            ));
        }
        Ok(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date,
    Timestamp,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub table: String,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(table: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            label: None,
            field_type,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn key(&self) -> FieldRef {
        FieldRef::new(self.table.clone(), self.name.clone())
    }

    pub fn matches(&self, target: &FieldRef) -> bool {
        self.table == target.table && self.name == target.field_name
    }
}

/// Fields exposed across every tile on a dashboard, keyed by `(table, fieldName)`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterableFieldCatalog {
    fields: Vec<FieldDescriptor>,
    #[serde(skip)]
    keys: HashSet<FieldRef>,
}

impl FilterableFieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// First writer for a key wins; returns false when the key was already present
    pub fn insert(&mut self, field: FieldDescriptor) -> bool {
        if !self.keys.insert(field.key()) {
            return false;
        }
        self.fields.push(field);
        true
    }

    pub fn contains(&self, target: &FieldRef) -> bool {
        self.keys.contains(target)
    }

    pub fn find(&self, target: &FieldRef) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.matches(target))
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldDescriptor> for FilterableFieldCatalog {
    fn from_iter<I: IntoIterator<Item = FieldDescriptor>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for field in iter {
            catalog.insert(field);
        }
        catalog
    }
}
