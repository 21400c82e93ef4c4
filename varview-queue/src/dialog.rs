//! Dialog Mediator
//!
//! Type, value-label and missing-value edits never go straight from the grid
//! to the stores. They open a modal instead, and only a confirmed modal value
//! becomes a queued operation. At most one modal is open at a time:
//!
//! ```text
//! Closed --(trigger selected/edited)--> Open --(save)--> Closed + queued op
//!                                        |
//!                                        +--(cancel)--> Closed
//! ```

use crate::queue::OperationQueue;
use serde::{Deserialize, Serialize};
use std::fmt;
use varview_core::{
    MissingValues, OperationId, PendingOperation, QueueError, ValueLabel, Variable,
    VariableChanges, VariableType, VarviewResult,
};

/// The three mutually exclusive modals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Type,
    ValueLabels,
    MissingValues,
}

impl DialogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogKind::Type => "type",
            DialogKind::ValueLabels => "values",
            DialogKind::MissingValues => "missing",
        }
    }
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully-formed field value, as shown in or confirmed by a modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DialogValue {
    Type {
        var_type: VariableType,
        width: u32,
        decimals: u32,
    },
    ValueLabels(Vec<ValueLabel>),
    MissingValues(Option<MissingValues>),
}

impl DialogValue {
    pub fn kind(&self) -> DialogKind {
        match self {
            DialogValue::Type { .. } => DialogKind::Type,
            DialogValue::ValueLabels(_) => DialogKind::ValueLabels,
            DialogValue::MissingValues(_) => DialogKind::MissingValues,
        }
    }

    /// The value a `kind` modal starts from for `variable`.
    pub fn initial_for(kind: DialogKind, variable: &Variable) -> Self {
        match kind {
            DialogKind::Type => DialogValue::Type {
                var_type: variable.var_type,
                width: variable.width,
                decimals: variable.decimals,
            },
            DialogKind::ValueLabels => DialogValue::ValueLabels(variable.values.clone()),
            DialogKind::MissingValues => DialogValue::MissingValues(variable.missing.clone()),
        }
    }

    /// The field changes this value stands for.
    pub fn into_changes(self) -> VariableChanges {
        match self {
            DialogValue::Type {
                var_type,
                width,
                decimals,
            } => VariableChanges {
                var_type: Some(var_type),
                width: Some(width),
                decimals: Some(decimals),
                ..Default::default()
            },
            DialogValue::ValueLabels(values) => VariableChanges {
                values: Some(values),
                ..Default::default()
            },
            DialogValue::MissingValues(missing) => VariableChanges {
                missing: Some(missing),
                ..Default::default()
            },
        }
    }
}

/// The one open modal.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenDialog {
    pub kind: DialogKind,
    pub row: usize,
    pub initial: DialogValue,
}

/// What a dialog component renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogProps {
    pub open: bool,
    pub initial_value: Option<DialogValue>,
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Tracks the selected cell and the open modal, and turns confirmed modal
/// values into queued operations.
#[derive(Debug)]
pub struct DialogMediator {
    queue: OperationQueue,
    selected: Option<CellRef>,
    open: Option<OpenDialog>,
}

impl DialogMediator {
    pub fn new(queue: OperationQueue) -> Self {
        Self {
            queue,
            selected: None,
            open: None,
        }
    }

    pub fn select(&mut self, cell: CellRef) {
        self.selected = Some(cell);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<CellRef> {
        self.selected
    }

    pub fn open_dialog(&self) -> Option<&OpenDialog> {
        self.open.as_ref()
    }

    /// Open the `kind` modal for `row`, replacing any modal already open.
    ///
    /// The initial value comes from the settled variable at `row`, or the
    /// defaults for that index when none exists yet.
    pub async fn open(&mut self, kind: DialogKind, row: usize) -> VarviewResult<&OpenDialog> {
        let variable = self
            .queue
            .stores()
            .variable_at(row)
            .await?
            .unwrap_or_else(|| Variable::default_at(row));

        if let Some(previous) = &self.open {
            tracing::debug!(
                previous = %previous.kind,
                previous_row = previous.row,
                "Replacing open dialog"
            );
        }
        tracing::debug!(kind = %kind, row, "Dialog opened");

        let dialog = OpenDialog {
            kind,
            row,
            initial: DialogValue::initial_for(kind, &variable),
        };
        Ok(self.open.insert(dialog))
    }

    pub fn props(&self, kind: DialogKind) -> DialogProps {
        match &self.open {
            Some(dialog) if dialog.kind == kind => DialogProps {
                open: true,
                initial_value: Some(dialog.initial.clone()),
            },
            _ => DialogProps {
                open: false,
                initial_value: None,
            },
        }
    }

    /// Visibility callback from a dialog component. Closing is a cancel;
    /// opening is driven by selection and edits, so `true` is ignored.
    pub fn on_open_change(&mut self, kind: DialogKind, open: bool) {
        if open {
            return;
        }
        if self.open.as_ref().is_some_and(|d| d.kind == kind) {
            self.cancel();
        }
    }

    /// Close the open modal without enqueueing anything.
    pub fn cancel(&mut self) -> Option<OpenDialog> {
        let closed = self.open.take();
        if let Some(dialog) = &closed {
            tracing::debug!(kind = %dialog.kind, row = dialog.row, "Dialog cancelled");
        }
        closed
    }

    /// Confirm the open modal with `value`.
    ///
    /// Creates the variable first when the row has none and no CREATE for it
    /// is queued, then enqueues an UPDATE carrying the confirmed fields, and
    /// closes the modal. A STRING type drops any missing-value range. A
    /// value of the wrong kind, or missing values that fail validation, leave
    /// the modal open.
    pub async fn save(&mut self, value: DialogValue) -> VarviewResult<OperationId> {
        let dialog = self.open.as_ref().ok_or(QueueError::DialogNotOpen)?;
        if value.kind() != dialog.kind {
            return Err(QueueError::DialogKindMismatch {
                open: dialog.kind.as_str(),
                got: value.kind().as_str(),
            }
            .into());
        }
        let row = dialog.row;

        let current = self.queue.stores().variable_at(row).await?;
        if let DialogValue::MissingValues(Some(missing)) = &value {
            let var_type = current.as_ref().map(|v| v.var_type).unwrap_or_default();
            missing.validate(var_type)?;
        }

        let mut changes = value.into_changes();
        if changes.enforce_string_measure(current.as_ref()) {
            tracing::debug!(row, "Forced nominal measure on STRING variable");
        }
        if changes.enforce_string_missing(current.as_ref()) {
            tracing::warn!(row, "Dropped missing-value range from STRING variable");
        }

        if !self.queue.will_exist(row).await? {
            self.queue.enqueue(PendingOperation::CreateVariable {
                row,
                data: VariableChanges::new(),
            })?;
        }
        let id = self
            .queue
            .enqueue(PendingOperation::UpdateVariable { row, changes })?;

        if let Some(dialog) = self.open.take() {
            tracing::debug!(kind = %dialog.kind, row, operation_id = %id, "Dialog saved");
        }
        Ok(id)
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }
}
