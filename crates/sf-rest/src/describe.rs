//! Describe types.
//!
//! Only the attributes the export pipeline reads are typed. Everything else
//! the describe call returns is kept as generic JSON, so arbitrarily nested
//! describe content survives a decode/encode cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Compound field types; their components are described as separate fields.
const COMPOUND_FIELD_TYPES: &[&str] = &["address", "location"];

/// Field types the Bulk API rejects in a query.
const BULK_UNSUPPORTED_FIELD_TYPES: &[&str] = &["base64"];

// ============================================================================
// Describe SObject Types
// ============================================================================

/// SObject describe result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DescribeSObjectResult {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescribe>,

    /// Every other attribute of the describe document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DescribeSObjectResult {
    /// Names of all fields, in describe order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Names of the fields a bulk query can select.
    ///
    /// Compound address and location fields are skipped; their components
    /// are described as separate fields. Binary `base64` fields are skipped
    /// too.
    pub fn queryable_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_bulk_queryable())
            .map(|f| f.name.clone())
            .collect()
    }

    /// Look up a single field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescribe> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ============================================================================
// Field Describe Types
// ============================================================================

/// Field describe result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldDescribe {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDescribe {
    /// Returns true for compound address/location fields.
    pub fn is_compound(&self) -> bool {
        COMPOUND_FIELD_TYPES.contains(&self.field_type.as_str())
    }

    /// Returns true if a Bulk API query may select this field.
    pub fn is_bulk_queryable(&self) -> bool {
        !self.is_compound() && !BULK_UNSUPPORTED_FIELD_TYPES.contains(&self.field_type.as_str())
    }
}
