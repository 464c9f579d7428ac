use serde::Serialize;
use tracing::debug;

use super::format::{format_grouped, parse_number, strip_grouping};
use super::store::InputStore;
use super::types::InputField;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    NotANumber,
    Negative,
    AboveMaximum,
}

/// What a single edit did to its field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EditOutcome {
    Committed(f64),
    /// Empty text; the field resets to zero.
    Cleared,
    Rejected(RejectReason),
}

impl EditOutcome {
    /// Value written to the store, if any.
    pub fn committed_value(self) -> Option<f64> {
        match self {
            EditOutcome::Committed(value) => Some(value),
            EditOutcome::Cleared => Some(0.0),
            EditOutcome::Rejected(_) => None,
        }
    }
}

/// Normalizes one raw edit against an inclusive maximum.
pub fn parse_edit(raw: &str, max: f64) -> EditOutcome {
    let stripped = strip_grouping(raw);
    if stripped.trim().is_empty() {
        return EditOutcome::Cleared;
    }
    let Some(value) = parse_number(&stripped) else {
        return EditOutcome::Rejected(RejectReason::NotANumber);
    };
    if value < 0.0 {
        return EditOutcome::Rejected(RejectReason::Negative);
    }
    if value > max {
        return EditOutcome::Rejected(RejectReason::AboveMaximum);
    }
    // `-0` and underflowing negatives parse to -0.0.
    if value == 0.0 {
        return EditOutcome::Committed(0.0);
    }
    EditOutcome::Committed(value)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedField {
    pub field: InputField,
    pub label: &'static str,
    pub display: String,
    pub max: f64,
}

/// The four labelled inputs, bound to an injected store.
#[derive(Debug, Clone)]
pub struct InputForm {
    store: InputStore,
}

impl InputForm {
    pub fn new(store: InputStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &InputStore {
        &self.store
    }

    /// Applies raw field text. Rejected edits leave the store untouched.
    pub fn edit(&self, field: InputField, raw: &str) -> EditOutcome {
        let outcome = parse_edit(raw, field.max());
        match outcome.committed_value() {
            Some(value) => self.store.set(field, value),
            None => debug!(field = field.key(), raw, ?outcome, "edit discarded"),
        }
        outcome
    }

    pub fn display_value(&self, field: InputField) -> String {
        format_grouped(self.store.get(field))
    }

    pub fn render(&self) -> Vec<RenderedField> {
        let values = self.store.snapshot();
        InputField::ALL
            .into_iter()
            .map(|field| RenderedField {
                field,
                label: field.label(),
                display: format_grouped(values.get(field)),
                max: field.max(),
            })
            .collect()
    }

    /// Required fields that still render blank.
    pub fn missing_fields(&self) -> Vec<InputField> {
        let values = self.store.snapshot();
        InputField::ALL
            .into_iter()
            .filter(|field| values.get(*field) == 0.0)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}
