//! Variable metadata types
//!
//! A [`Variable`] is one row of the variable view and owns the data matrix
//! column with the same `column_index`. [`VariableChanges`] is the partial
//! payload carried by create/update operations.

use crate::{Align, CellValue, Measure, Role, ValidationError, VariableType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Default display width for a new variable.
pub const DEFAULT_WIDTH: u32 = 8;
/// Default decimal places for a new numeric variable.
pub const DEFAULT_DECIMALS: u32 = 2;
/// Default column width (in characters) in the data view.
pub const DEFAULT_COLUMNS: u32 = 64;
/// Longest accepted variable name, in characters.
pub const MAX_NAME_LEN: usize = 64;
/// Most discrete missing values a variable may declare.
pub const MAX_DISCRETE_MISSING: usize = 3;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}@#$][^\s]*$").expect("variable name pattern is valid")
});

// ============================================================================
// VALUE LABELS / MISSING VALUES
// ============================================================================

/// A label attached to one data value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueLabel {
    pub value: CellValue,
    pub label: String,
}

impl ValueLabel {
    pub fn new(value: impl Into<CellValue>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Inclusive numeric range treated as missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingRange {
    pub min: f64,
    pub max: f64,
}

/// User-declared missing values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MissingValues {
    #[serde(default)]
    pub discrete: Vec<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<MissingRange>,
}

impl MissingValues {
    pub fn discrete(values: Vec<CellValue>) -> Self {
        Self {
            discrete: values,
            range: None,
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self {
            discrete: Vec::new(),
            range: Some(MissingRange { min, max }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.discrete.is_empty() && self.range.is_none()
    }

    /// Validate against the variable type that will own these values.
    ///
    /// At most three discrete values, or one range plus at most one discrete
    /// value. Ranges need `min <= max` and a non-STRING variable.
    pub fn validate(&self, var_type: VariableType) -> Result<(), ValidationError> {
        match &self.range {
            None if self.discrete.len() > MAX_DISCRETE_MISSING => {
                Err(ValidationError::ConstraintViolation {
                    constraint: "missing.discrete".to_string(),
                    reason: format!(
                        "at most {} discrete values allowed, got {}",
                        MAX_DISCRETE_MISSING,
                        self.discrete.len()
                    ),
                })
            }
            None => Ok(()),
            Some(_) if var_type.is_string() => Err(ValidationError::ConstraintViolation {
                constraint: "missing.range".to_string(),
                reason: "ranges are not allowed for STRING variables".to_string(),
            }),
            Some(range) if range.min > range.max => Err(ValidationError::ConstraintViolation {
                constraint: "missing.range".to_string(),
                reason: format!("min {} is greater than max {}", range.min, range.max),
            }),
            Some(_) if self.discrete.len() > 1 => Err(ValidationError::ConstraintViolation {
                constraint: "missing.discrete".to_string(),
                reason: "a range allows at most one extra discrete value".to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}

// ============================================================================
// VARIABLE
// ============================================================================

/// Metadata for one column of the data matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub column_index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub width: u32,
    pub decimals: u32,
    pub label: String,
    pub values: Vec<ValueLabel>,
    pub missing: Option<MissingValues>,
    pub measure: Measure,
    pub role: Role,
    pub align: Align,
    pub columns: u32,
}

impl Variable {
    /// A blank variable as materialised by gap filling or insertion.
    pub fn default_at(column_index: usize) -> Self {
        Self {
            column_index,
            name: default_name(column_index),
            var_type: VariableType::Numeric,
            width: DEFAULT_WIDTH,
            decimals: DEFAULT_DECIMALS,
            label: String::new(),
            values: Vec::new(),
            missing: None,
            measure: Measure::Unknown,
            role: Role::Input,
            align: Align::Right,
            columns: DEFAULT_COLUMNS,
        }
    }

    /// Defaults at `column_index` overlaid with `changes`.
    pub fn from_changes(column_index: usize, changes: &VariableChanges) -> Self {
        let mut variable = Self::default_at(column_index);
        variable.apply(changes);
        variable
    }

    /// Overwrite every field present in `changes`.
    pub fn apply(&mut self, changes: &VariableChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(var_type) = changes.var_type {
            self.var_type = var_type;
        }
        if let Some(width) = changes.width {
            self.width = width;
        }
        if let Some(decimals) = changes.decimals {
            self.decimals = decimals;
        }
        if let Some(label) = &changes.label {
            self.label = label.clone();
        }
        if let Some(values) = &changes.values {
            self.values = values.clone();
        }
        if let Some(missing) = &changes.missing {
            self.missing = missing.clone();
        }
        if let Some(measure) = changes.measure {
            self.measure = measure;
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
        if let Some(align) = changes.align {
            self.align = align;
        }
        if let Some(columns) = changes.columns {
            self.columns = columns;
        }
    }
}

/// Generated name for the variable at `column_index`, e.g. `VAR00001`.
pub fn default_name(column_index: usize) -> String {
    format!("VAR{:05}", column_index + 1)
}

/// Check a user-supplied variable name.
pub fn validate_variable_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            reason: format!("longer than {} characters", MAX_NAME_LEN),
        });
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            reason: "must start with a letter, @, # or $ and contain no whitespace".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// VARIABLE CHANGES
// ============================================================================

/// Partial variable fields carried by create/update operations.
///
/// `missing` is doubly optional: `None` leaves the field alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VariableType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ValueLabel>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub missing: Option<Option<MissingValues>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<Measure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl VariableChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Whether applying these changes requires re-validating column cells.
    pub fn touches_type_or_width(&self) -> bool {
        self.var_type.is_some() || self.width.is_some()
    }

    /// Names of the fields present, in declaration order.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.var_type.is_some() {
            fields.push("type");
        }
        if self.width.is_some() {
            fields.push("width");
        }
        if self.decimals.is_some() {
            fields.push("decimals");
        }
        if self.label.is_some() {
            fields.push("label");
        }
        if self.values.is_some() {
            fields.push("values");
        }
        if self.missing.is_some() {
            fields.push("missing");
        }
        if self.measure.is_some() {
            fields.push("measure");
        }
        if self.role.is_some() {
            fields.push("role");
        }
        if self.align.is_some() {
            fields.push("align");
        }
        if self.columns.is_some() {
            fields.push("columns");
        }
        fields
    }

    /// Fold `later` into `self`; fields present in `later` win.
    pub fn merge(&mut self, later: VariableChanges) {
        if later.name.is_some() {
            self.name = later.name;
        }
        if later.var_type.is_some() {
            self.var_type = later.var_type;
        }
        if later.width.is_some() {
            self.width = later.width;
        }
        if later.decimals.is_some() {
            self.decimals = later.decimals;
        }
        if later.label.is_some() {
            self.label = later.label;
        }
        if later.values.is_some() {
            self.values = later.values;
        }
        if later.missing.is_some() {
            self.missing = later.missing;
        }
        if later.measure.is_some() {
            self.measure = later.measure;
        }
        if later.role.is_some() {
            self.role = later.role;
        }
        if later.align.is_some() {
            self.align = later.align;
        }
        if later.columns.is_some() {
            self.columns = later.columns;
        }
    }

    /// STRING variables may never carry scale measurement.
    ///
    /// Resolves type and measure against `current` (the stored variable, if
    /// any) and forces `measure = nominal` when the merged state would be
    /// STRING + scale. Returns true when a correction was made.
    pub fn enforce_string_measure(&mut self, current: Option<&Variable>) -> bool {
        let var_type = self
            .var_type
            .or_else(|| current.map(|v| v.var_type))
            .unwrap_or_default();
        let measure = self
            .measure
            .or_else(|| current.map(|v| v.measure))
            .unwrap_or_default();
        if var_type.is_string() && measure == Measure::Scale {
            self.measure = Some(Measure::Nominal);
            true
        } else {
            false
        }
    }

    /// STRING variables may never carry a missing-value range.
    ///
    /// Resolves type and missing values against `current` and drops the range
    /// when the merged state would be STRING with a range. Discrete missing
    /// values survive. Returns true when a correction was made.
    pub fn enforce_string_missing(&mut self, current: Option<&Variable>) -> bool {
        let var_type = self
            .var_type
            .or_else(|| current.map(|v| v.var_type))
            .unwrap_or_default();
        if !var_type.is_string() {
            return false;
        }
        let missing = match &self.missing {
            Some(missing) => missing.clone(),
            None => current.and_then(|v| v.missing.clone()),
        };
        match missing {
            Some(mut missing) if missing.range.is_some() => {
                missing.range = None;
                self.missing = Some(Some(missing).filter(|m| !m.is_empty()));
                true
            }
            _ => false,
        }
    }
}
