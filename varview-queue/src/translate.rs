//! Event Translator
//!
//! Turns raw grid change events into queued operations. Direct edits of a
//! dialog-trigger column are vetoed and handed to the [`DialogMediator`];
//! everything else is decoded, merged per row, corrected for the STRING/scale
//! rule and enqueued as one UPDATE (or CREATE) per row, in event order.

use crate::dialog::{CellRef, DialogKind, DialogMediator};
use crate::queue::OperationQueue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use varview_core::{
    validate_variable_name, Align, Measure, MissingValues, OperationId, PendingOperation, Role,
    ValidationError, ValueLabel, VariableChanges, VariableType, VarviewResult,
};

/// Largest display width accepted from the grid.
pub const MAX_WIDTH: u32 = 32_767;
/// Largest decimal count accepted from the grid.
pub const MAX_DECIMALS: u32 = 16;

// ============================================================================
// GRID EVENTS
// ============================================================================

/// Where a grid change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    Edit,
    Autofill,
    Paste,
    Undo,
    Redo,
    Load,
    Programmatic,
}

impl ChangeSource {
    /// Typed edits, fills and pastes. Other sources replay known-good values.
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            ChangeSource::Edit | ChangeSource::Autofill | ChangeSource::Paste
        )
    }
}

/// Semantic field behind a variable-view column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableField {
    Name,
    Type,
    Width,
    Decimals,
    Label,
    Values,
    Missing,
    Columns,
    Align,
    Measure,
    Role,
}

const COLUMN_TABLE: [VariableField; 11] = [
    VariableField::Name,
    VariableField::Type,
    VariableField::Width,
    VariableField::Decimals,
    VariableField::Label,
    VariableField::Values,
    VariableField::Missing,
    VariableField::Columns,
    VariableField::Align,
    VariableField::Measure,
    VariableField::Role,
];

impl VariableField {
    pub fn from_column(col: usize) -> Option<Self> {
        COLUMN_TABLE.get(col).copied()
    }

    pub fn column(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariableField::Name => "name",
            VariableField::Type => "type",
            VariableField::Width => "width",
            VariableField::Decimals => "decimals",
            VariableField::Label => "label",
            VariableField::Values => "values",
            VariableField::Missing => "missing",
            VariableField::Columns => "columns",
            VariableField::Align => "align",
            VariableField::Measure => "measure",
            VariableField::Role => "role",
        }
    }

    /// The modal that owns direct edits of this field, if any.
    pub fn dialog_kind(&self) -> Option<DialogKind> {
        match self {
            VariableField::Type => Some(DialogKind::Type),
            VariableField::Values => Some(DialogKind::ValueLabels),
            VariableField::Missing => Some(DialogKind::MissingValues),
            _ => None,
        }
    }
}

impl fmt::Display for VariableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw cell change from the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    pub row: usize,
    pub col: usize,
    pub old_value: Value,
    pub new_value: Value,
    pub source: ChangeSource,
}

impl CellChange {
    pub fn new(
        row: usize,
        col: usize,
        old_value: Value,
        new_value: Value,
        source: ChangeSource,
    ) -> Self {
        Self {
            row,
            col,
            old_value,
            new_value,
            source,
        }
    }

    /// A direct edit from an empty cell.
    pub fn edit(row: usize, col: usize, new_value: Value) -> Self {
        Self::new(row, col, Value::Null, new_value, ChangeSource::Edit)
    }
}

/// What the grid should do with one raw change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeVerdict {
    /// Keep the edit.
    Accept,
    /// Cancel the edit; a dialog has taken over.
    Veto,
    /// Cancel the edit; the value could not be decoded.
    Reject,
}

impl ChangeVerdict {
    pub fn cancels_edit(&self) -> bool {
        !matches!(self, ChangeVerdict::Accept)
    }
}

/// Result of translating one batch of changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    /// One verdict per input change, in input order.
    pub verdicts: Vec<ChangeVerdict>,
    /// Operations enqueued, in enqueue order.
    pub enqueued: Vec<OperationId>,
}

/// A rectangular grid selection, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: CellRef,
    pub end: CellRef,
}

impl Selection {
    pub fn cell(row: usize, col: usize) -> Self {
        let cell = CellRef::new(row, col);
        Self {
            start: cell,
            end: cell,
        }
    }

    pub fn single_cell(&self) -> Option<CellRef> {
        (self.start == self.end).then_some(self.start)
    }
}

// ============================================================================
// TRANSLATOR
// ============================================================================

/// Maps grid events onto the operation queue.
#[derive(Debug, Clone)]
pub struct EventTranslator {
    queue: OperationQueue,
}

impl EventTranslator {
    pub fn new(queue: OperationQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    /// Translate one batch of grid changes.
    ///
    /// Only the first vetoed change of a batch opens a dialog; later ones are
    /// still vetoed. A row counts as existing once a CREATE for it is queued,
    /// so back-to-back batches on a new row produce CREATE then UPDATE.
    pub async fn translate(
        &self,
        changes: &[CellChange],
        dialogs: &mut DialogMediator,
    ) -> VarviewResult<Translation> {
        let mut translation = Translation::default();
        let mut rows: Vec<RowChanges> = Vec::new();
        let mut dialog_opened = false;

        for change in changes {
            if change.old_value == change.new_value {
                translation.verdicts.push(ChangeVerdict::Accept);
                continue;
            }
            let Some(field) = VariableField::from_column(change.col) else {
                tracing::debug!(
                    row = change.row,
                    col = change.col,
                    "Ignoring change to unknown column"
                );
                translation.verdicts.push(ChangeVerdict::Accept);
                continue;
            };

            if let Some(kind) = field.dialog_kind().filter(|_| change.source.is_direct()) {
                if !dialog_opened {
                    dialogs.open(kind, change.row).await?;
                    dialog_opened = true;
                }
                translation.verdicts.push(ChangeVerdict::Veto);
                continue;
            }

            match decode_field(field, &change.new_value) {
                Ok(decoded) => {
                    let verdict = translation.verdicts.len();
                    let index = match rows.iter().position(|r| r.row == change.row) {
                        Some(index) => index,
                        None => {
                            rows.push(RowChanges::new(change.row));
                            rows.len() - 1
                        }
                    };
                    let entry = &mut rows[index];
                    if decoded.missing.is_some() {
                        entry.missing_verdict = Some(verdict);
                    }
                    entry.changes.merge(decoded);
                    translation.verdicts.push(ChangeVerdict::Accept);
                }
                Err(e) => {
                    tracing::warn!(
                        row = change.row,
                        field = %field,
                        error = %e,
                        "Dropping undecodable grid value"
                    );
                    translation.verdicts.push(ChangeVerdict::Reject);
                }
            }
        }

        for RowChanges {
            row,
            mut changes,
            missing_verdict,
        } in rows
        {
            let variable = self.queue.stores().variable_at(row).await?;

            // missing values are checked against the type the row ends up with
            let var_type = changes
                .var_type
                .or(variable.as_ref().map(|v| v.var_type))
                .unwrap_or_default();
            let invalid_missing = match &changes.missing {
                Some(Some(missing)) => missing.validate(var_type).err(),
                _ => None,
            };
            if let Some(e) = invalid_missing {
                tracing::warn!(row, error = %e, "Dropping invalid missing values");
                if let Some(verdict) = missing_verdict {
                    translation.verdicts[verdict] = ChangeVerdict::Reject;
                }
                changes.missing = None;
            }
            if changes.is_empty() {
                continue;
            }

            if changes.enforce_string_measure(variable.as_ref()) {
                tracing::debug!(row, "Forced nominal measure on STRING variable");
            }
            if changes.enforce_string_missing(variable.as_ref()) {
                tracing::warn!(row, "Dropped missing-value range from STRING variable");
            }
            let operation = if self.queue.will_exist(row).await? {
                PendingOperation::UpdateVariable { row, changes }
            } else {
                PendingOperation::CreateVariable { row, data: changes }
            };
            translation.enqueued.push(self.queue.enqueue(operation)?);
        }

        Ok(translation)
    }

    /// React to a selection change. A single cell on a dialog-trigger column
    /// opens that dialog immediately.
    pub async fn on_selection(
        &self,
        selection: Selection,
        dialogs: &mut DialogMediator,
    ) -> VarviewResult<Option<DialogKind>> {
        let Some(cell) = selection.single_cell() else {
            dialogs.clear_selection();
            return Ok(None);
        };
        dialogs.select(cell);

        let Some(kind) = VariableField::from_column(cell.col).and_then(|f| f.dialog_kind()) else {
            return Ok(None);
        };
        dialogs.open(kind, cell.row).await?;
        Ok(Some(kind))
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Decoded changes for one row of a batch.
struct RowChanges {
    row: usize,
    changes: VariableChanges,
    /// Verdict slot of the change that last set missing values.
    missing_verdict: Option<usize>,
}

impl RowChanges {
    fn new(row: usize) -> Self {
        Self {
            row,
            changes: VariableChanges::new(),
            missing_verdict: None,
        }
    }
}

/// Object form of a TYPE cell, as replayed by undo/redo/load.
#[derive(Debug, Deserialize)]
struct TypeCell {
    #[serde(rename = "type")]
    var_type: VariableType,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    decimals: Option<u32>,
}

/// Decode one grid value into the changes it stands for.
///
/// Missing values are only parsed here; they depend on the row's type and
/// are validated once the whole row is merged.
fn decode_field(field: VariableField, value: &Value) -> Result<VariableChanges, ValidationError> {
    let mut changes = VariableChanges::new();
    match field {
        VariableField::Name => {
            let name = text(field, value)?.trim().to_string();
            validate_variable_name(&name)?;
            changes.name = Some(name);
        }
        VariableField::Type => match value {
            Value::Object(_) => {
                let cell: TypeCell = from_json(field, value)?;
                changes.var_type = Some(cell.var_type);
                changes.width = cell
                    .width
                    .map(|w| bounded(VariableField::Width, u64::from(w), 1, MAX_WIDTH))
                    .transpose()?;
                changes.decimals = cell
                    .decimals
                    .map(|d| bounded(VariableField::Decimals, u64::from(d), 0, MAX_DECIMALS))
                    .transpose()?;
            }
            _ => changes.var_type = Some(parse_enum(field, value)?),
        },
        VariableField::Width => changes.width = Some(number(field, value, 1, MAX_WIDTH)?),
        VariableField::Decimals => changes.decimals = Some(number(field, value, 0, MAX_DECIMALS)?),
        VariableField::Columns => changes.columns = Some(number(field, value, 1, u32::MAX)?),
        VariableField::Label => {
            changes.label = Some(match value {
                Value::Null => String::new(),
                Value::Number(n) => n.to_string(),
                _ => text(field, value)?.to_string(),
            });
        }
        VariableField::Values => {
            let values: Vec<ValueLabel> = match value {
                Value::Null => Vec::new(),
                _ => from_json(field, value)?,
            };
            changes.values = Some(values);
        }
        VariableField::Missing => {
            let missing: Option<MissingValues> = match value {
                Value::Null => None,
                _ => Some(from_json(field, value)?),
            };
            changes.missing = Some(missing.filter(|m| !m.is_empty()));
        }
        VariableField::Align => changes.align = Some(parse_enum::<Align>(field, value)?),
        VariableField::Measure => changes.measure = Some(parse_enum::<Measure>(field, value)?),
        VariableField::Role => changes.role = Some(parse_enum::<Role>(field, value)?),
    }
    Ok(changes)
}

fn invalid(field: VariableField, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.as_str().to_string(),
        reason: reason.into(),
    }
}

fn text(field: VariableField, value: &Value) -> Result<&str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| invalid(field, format!("expected text, got {}", value)))
}

fn parse_enum<T>(field: VariableField, value: &Value) -> Result<T, ValidationError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text(field, value)?
        .parse()
        .map_err(|e: T::Err| invalid(field, e.to_string()))
}

fn number(field: VariableField, value: &Value, min: u32, max: u32) -> Result<u32, ValidationError> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(field, format!("expected a whole number, got {}", value)))?;
    bounded(field, n, min, max)
}

fn bounded(field: VariableField, n: u64, min: u32, max: u32) -> Result<u32, ValidationError> {
    if n < u64::from(min) || n > u64::from(max) {
        return Err(invalid(field, format!("{} is outside {}..={}", n, min, max)));
    }
    Ok(n as u32)
}

fn from_json<T: serde::de::DeserializeOwned>(
    field: VariableField,
    value: &Value,
) -> Result<T, ValidationError> {
    serde_json::from_value(value.clone()).map_err(|e| invalid(field, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use varview_core::{CellValue, OperationKind, QueueConfig};
    use varview_storage::SharedStores;

    fn setup() -> (EventTranslator, DialogMediator) {
        let (queue, _worker) =
            OperationQueue::spawn(SharedStores::in_memory(), QueueConfig::default()).unwrap();
        (EventTranslator::new(queue.clone()), DialogMediator::new(queue))
    }

    #[test]
    fn test_column_table_round_trips() {
        for col in 0..11 {
            assert_eq!(VariableField::from_column(col).unwrap().column(), col);
        }
        assert_eq!(VariableField::from_column(11), None);
        assert_eq!(VariableField::from_column(1), Some(VariableField::Type));
        assert_eq!(VariableField::from_column(9), Some(VariableField::Measure));
    }

    #[test]
    fn test_only_three_fields_trigger_dialogs() {
        let triggers: Vec<_> = COLUMN_TABLE
            .iter()
            .filter_map(|f| f.dialog_kind())
            .collect();
        assert_eq!(
            triggers,
            vec![DialogKind::Type, DialogKind::ValueLabels, DialogKind::MissingValues]
        );
    }

    #[test]
    fn test_decode_numeric_fields_accept_numbers_and_text() {
        let width = decode_field(VariableField::Width, &json!("12")).unwrap();
        assert_eq!(width.width, Some(12));
        let decimals = decode_field(VariableField::Decimals, &json!(3)).unwrap();
        assert_eq!(decimals.decimals, Some(3));
    }

    #[test]
    fn test_decode_rejects_out_of_range_numbers() {
        assert!(decode_field(VariableField::Width, &json!(0)).is_err());
        assert!(decode_field(VariableField::Decimals, &json!(17)).is_err());
        assert!(decode_field(VariableField::Columns, &json!("wide")).is_err());
    }

    #[test]
    fn test_decode_enums_case_insensitively() {
        let measure = decode_field(VariableField::Measure, &json!("Scale")).unwrap();
        assert_eq!(measure.measure, Some(Measure::Scale));
        let role = decode_field(VariableField::Role, &json!("TARGET")).unwrap();
        assert_eq!(role.role, Some(Role::Target));
    }

    #[test]
    fn test_decode_name_validates() {
        assert!(decode_field(VariableField::Name, &json!("1abc")).is_err());
        assert!(decode_field(VariableField::Name, &json!("has space")).is_err());
        let ok = decode_field(VariableField::Name, &json!(" age ")).unwrap();
        assert_eq!(ok.name.as_deref(), Some("age"));
    }

    #[test]
    fn test_decode_missing_parses_and_clears() {
        let range = json!({"range": {"min": 1.0, "max": 3.0}});
        let decoded = decode_field(VariableField::Missing, &range).unwrap();
        assert_eq!(decoded.missing, Some(Some(MissingValues::range(1.0, 3.0))));
        assert!(decode_field(VariableField::Missing, &json!("three")).is_err());

        let cleared = decode_field(VariableField::Missing, &Value::Null).unwrap();
        assert_eq!(cleared.missing, Some(None));
    }

    #[test]
    fn test_decode_type_object_form() {
        let decoded = decode_field(
            VariableField::Type,
            &json!({"type": "STRING", "width": 20, "decimals": 0}),
        )
        .unwrap();
        assert_eq!(decoded.var_type, Some(VariableType::String));
        assert_eq!(decoded.width, Some(20));
        assert_eq!(decoded.decimals, Some(0));
    }

    #[tokio::test]
    async fn test_same_row_changes_merge_into_one_create() {
        let (translator, mut dialogs) = setup();
        let changes = [
            CellChange::edit(0, 0, json!("age")),
            CellChange::edit(0, 4, json!("Age in years")),
        ];
        let translation = translator.translate(&changes, &mut dialogs).await.unwrap();
        assert_eq!(translation.verdicts, vec![ChangeVerdict::Accept; 2]);
        assert_eq!(translation.enqueued.len(), 1);

        translator.queue().settled().await.unwrap();
        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(stored.name, "age");
        assert_eq!(stored.label, "Age in years");
    }

    #[tokio::test]
    async fn test_existing_row_gets_update() {
        let (translator, mut dialogs) = setup();
        translator
            .translate(&[CellChange::edit(0, 0, json!("a"))], &mut dialogs)
            .await
            .unwrap();
        translator.queue().settled().await.unwrap();

        translator
            .translate(&[CellChange::edit(0, 2, json!(20))], &mut dialogs)
            .await
            .unwrap();
        translator.queue().settled().await.unwrap();

        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(stored.name, "a");
        assert_eq!(stored.width, 20);
        assert_eq!(translator.queue().metrics().skipped, 0);
    }

    #[tokio::test]
    async fn test_back_to_back_batches_on_new_row_keep_both_edits() {
        let (translator, mut dialogs) = setup();
        // no settle in between: the first CREATE is still queued
        let first = translator
            .translate(&[CellChange::edit(0, 0, json!("age"))], &mut dialogs)
            .await
            .unwrap();
        let second = translator
            .translate(&[CellChange::edit(0, 2, json!(20))], &mut dialogs)
            .await
            .unwrap();
        assert_eq!(first.verdicts, vec![ChangeVerdict::Accept]);
        assert_eq!(second.verdicts, vec![ChangeVerdict::Accept]);
        translator.queue().settled().await.unwrap();

        let history = translator.queue().history().unwrap();
        let kinds: Vec<_> = history.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::CreateVariable, OperationKind::UpdateVariable]
        );
        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(stored.name, "age");
        assert_eq!(stored.width, 20);
        assert_eq!(translator.queue().metrics().skipped, 0);
    }

    #[tokio::test]
    async fn test_later_row_sees_gap_filled_by_earlier_create() {
        let (translator, mut dialogs) = setup();
        let changes = [
            CellChange::edit(3, 0, json!("d")),
            CellChange::edit(1, 0, json!("b")),
        ];
        translator.translate(&changes, &mut dialogs).await.unwrap();
        translator.queue().settled().await.unwrap();

        let snapshot = translator.queue().stores().snapshot().await.unwrap();
        assert_eq!(snapshot.variables.len(), 4);
        assert_eq!(snapshot.variables[1].name, "b");
        assert_eq!(snapshot.variables[3].name, "d");
        assert_eq!(translator.queue().metrics().skipped, 0);
    }

    #[tokio::test]
    async fn test_missing_values_checked_against_merged_type() {
        let (translator, mut dialogs) = setup();
        let range = json!({"range": {"min": 1.0, "max": 3.0}});

        // range arrives before the type that forbids it
        let changes = [
            CellChange::new(0, 6, Value::Null, range.clone(), ChangeSource::Load),
            CellChange::new(0, 1, Value::Null, json!("STRING"), ChangeSource::Load),
        ];
        let translation = translator.translate(&changes, &mut dialogs).await.unwrap();
        assert_eq!(
            translation.verdicts,
            vec![ChangeVerdict::Reject, ChangeVerdict::Accept]
        );
        translator.queue().settled().await.unwrap();
        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(stored.var_type, VariableType::String);
        assert_eq!(stored.missing, None);

        // and on a STRING row, a range paired with a numeric type is fine
        let changes = [
            CellChange::new(0, 6, Value::Null, range, ChangeSource::Load),
            CellChange::new(0, 1, Value::Null, json!("NUMERIC"), ChangeSource::Load),
        ];
        let translation = translator.translate(&changes, &mut dialogs).await.unwrap();
        assert_eq!(translation.verdicts, vec![ChangeVerdict::Accept; 2]);
        translator.queue().settled().await.unwrap();
        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(stored.var_type, VariableType::Numeric);
        assert_eq!(stored.missing, Some(MissingValues::range(1.0, 3.0)));
    }

    #[tokio::test]
    async fn test_direct_type_edit_is_vetoed_and_opens_dialog() {
        let (translator, mut dialogs) = setup();
        let translation = translator
            .translate(&[CellChange::edit(3, 1, json!("STRING"))], &mut dialogs)
            .await
            .unwrap();

        assert_eq!(translation.verdicts, vec![ChangeVerdict::Veto]);
        assert!(translation.enqueued.is_empty());
        assert_eq!(translator.queue().pending(), 0);
        let open = dialogs.open_dialog().unwrap();
        assert_eq!((open.kind, open.row), (DialogKind::Type, 3));
    }

    #[tokio::test]
    async fn test_paste_over_two_trigger_cells_opens_first_dialog() {
        let (translator, mut dialogs) = setup();
        let changes = [
            CellChange::new(0, 5, Value::Null, json!([]), ChangeSource::Paste),
            CellChange::new(0, 6, Value::Null, json!({"discrete": [9]}), ChangeSource::Paste),
        ];
        let translation = translator.translate(&changes, &mut dialogs).await.unwrap();
        assert_eq!(translation.verdicts, vec![ChangeVerdict::Veto; 2]);
        assert_eq!(dialogs.open_dialog().unwrap().kind, DialogKind::ValueLabels);
    }

    #[tokio::test]
    async fn test_undo_of_trigger_field_passes_through() {
        let (translator, mut dialogs) = setup();
        let change = CellChange::new(
            0,
            6,
            Value::Null,
            json!({"discrete": [99]}),
            ChangeSource::Undo,
        );
        let translation = translator.translate(&[change], &mut dialogs).await.unwrap();
        assert_eq!(translation.verdicts, vec![ChangeVerdict::Accept]);
        assert!(dialogs.open_dialog().is_none());

        translator.queue().settled().await.unwrap();
        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(
            stored.missing,
            Some(MissingValues::discrete(vec![CellValue::Number(99.0)]))
        );
    }

    #[tokio::test]
    async fn test_unchanged_and_bad_values() {
        let (translator, mut dialogs) = setup();
        let changes = [
            CellChange::new(0, 0, json!("same"), json!("same"), ChangeSource::Edit),
            CellChange::edit(0, 2, json!("wide")),
            CellChange::edit(0, 3, json!(1)),
            CellChange::edit(0, 42, json!("x")),
        ];
        let translation = translator.translate(&changes, &mut dialogs).await.unwrap();
        assert_eq!(
            translation.verdicts,
            vec![
                ChangeVerdict::Accept,
                ChangeVerdict::Reject,
                ChangeVerdict::Accept,
                ChangeVerdict::Accept,
            ]
        );
        assert_eq!(translation.enqueued.len(), 1);
        assert!(translation.verdicts[1].cancels_edit());
    }

    #[tokio::test]
    async fn test_string_with_scale_is_corrected_before_enqueue() {
        let (translator, mut dialogs) = setup();
        let changes = [
            CellChange::new(0, 1, Value::Null, json!("STRING"), ChangeSource::Load),
            CellChange::edit(0, 9, json!("scale")),
        ];
        translator.translate(&changes, &mut dialogs).await.unwrap();
        translator.queue().settled().await.unwrap();

        let stored = translator.queue().stores().variable_at(0).await.unwrap().unwrap();
        assert_eq!(stored.var_type, VariableType::String);
        assert_eq!(stored.measure, Measure::Nominal);
    }

    #[tokio::test]
    async fn test_selection_on_trigger_column_opens_dialog() {
        let (translator, mut dialogs) = setup();
        let kind = translator
            .on_selection(Selection::cell(2, 6), &mut dialogs)
            .await
            .unwrap();
        assert_eq!(kind, Some(DialogKind::MissingValues));
        assert_eq!(dialogs.selected(), Some(CellRef::new(2, 6)));

        let none = translator
            .on_selection(Selection::cell(2, 0), &mut dialogs)
            .await
            .unwrap();
        assert_eq!(none, None);
        // moving off a trigger column leaves the open dialog alone
        assert!(dialogs.open_dialog().is_some());
    }

    #[tokio::test]
    async fn test_range_selection_clears_selected_cell() {
        let (translator, mut dialogs) = setup();
        dialogs.select(CellRef::new(0, 0));
        let range = Selection {
            start: CellRef::new(0, 0),
            end: CellRef::new(3, 1),
        };
        assert_eq!(translator.on_selection(range, &mut dialogs).await.unwrap(), None);
        assert_eq!(dialogs.selected(), None);
    }
}
