//! Typed field values and their wide-row persistence shape.
//!
//! A submitted answer is persisted as a `submitted_fields` row with five
//! nullable value columns of which exactly one is set. Application code never
//! handles that shape directly: an answer is a [`FieldValue`], a closed tagged
//! union whose kind must match the template field's [`FieldType`].
//!
//! - [`to_domain`] reads a persisted row as a typed value.
//! - [`to_persistence`] writes a typed value as a full five-column rewrite.
//! - [`SubmittedValueInput::parse`] checks a client payload entry against the
//!   field's declared type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field_type::FieldType;
use crate::types::{DbId, Timestamp};

/// A single answer. The variant is the value kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Textarea(String),
    Number(i32),
    Date(Timestamp),
    Checkbox(bool),
}

impl FieldValue {
    /// The field type this value belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Textarea(_) => FieldType::Textarea,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Checkbox(_) => FieldType::Checkbox,
        }
    }
}

/// The five nullable value columns of a `submitted_fields` row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueColumns {
    pub text_value: Option<String>,
    pub textarea_value: Option<String>,
    pub number_value: Option<i32>,
    pub date_value: Option<Timestamp>,
    pub checkbox_value: Option<bool>,
}

impl ValueColumns {
    /// Number of non-null value columns.
    pub fn populated_count(&self) -> usize {
        [
            self.text_value.is_some(),
            self.textarea_value.is_some(),
            self.number_value.is_some(),
            self.date_value.is_some(),
            self.checkbox_value.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

/// Read a persisted answer as a typed value for a field of type `declared`.
///
/// `None` (no row) means the field is unanswered and yields `Ok(None)`.
/// Fails with [`CoreError::InvariantViolation`] when more than one column is
/// populated or when the populated column is not the one `declared` selects.
pub fn to_domain(
    row: Option<&ValueColumns>,
    declared: FieldType,
) -> Result<Option<FieldValue>, CoreError> {
    let Some(columns) = row else {
        return Ok(None);
    };

    match columns.populated_count() {
        0 => return Ok(None),
        1 => {}
        n => {
            return Err(CoreError::InvariantViolation(format!(
                "Stored answer has {n} populated value columns; exactly one is allowed"
            )))
        }
    }

    let value = match declared {
        FieldType::Text => columns.text_value.clone().map(FieldValue::Text),
        FieldType::Textarea => columns.textarea_value.clone().map(FieldValue::Textarea),
        FieldType::Number => columns.number_value.map(FieldValue::Number),
        FieldType::Date => columns.date_value.map(FieldValue::Date),
        FieldType::Checkbox => columns.checkbox_value.map(FieldValue::Checkbox),
    };

    value.map(Some).ok_or_else(|| {
        CoreError::InvariantViolation(format!(
            "Stored answer does not hold a {declared} value"
        ))
    })
}

/// Write `value` as a full rewrite of all five value columns.
///
/// Four columns are always null and one holds the value, or all five are null
/// when `value` is `None`. Fails with [`CoreError::InvariantViolation`] when
/// the value kind does not match `declared`.
pub fn to_persistence(
    declared: FieldType,
    value: Option<&FieldValue>,
) -> Result<ValueColumns, CoreError> {
    let mut columns = ValueColumns::default();
    let Some(value) = value else {
        return Ok(columns);
    };

    if value.field_type() != declared {
        return Err(CoreError::InvariantViolation(format!(
            "A {} value cannot be stored in a {declared} field",
            value.field_type()
        )));
    }

    match value {
        FieldValue::Text(v) => columns.text_value = Some(v.clone()),
        FieldValue::Textarea(v) => columns.textarea_value = Some(v.clone()),
        FieldValue::Number(v) => columns.number_value = Some(*v),
        FieldValue::Date(v) => columns.date_value = Some(*v),
        FieldValue::Checkbox(v) => columns.checkbox_value = Some(*v),
    }
    Ok(columns)
}

/// One entry of a submission sync payload, in the five-slot shape clients send.
///
/// Number and date slots are loosely typed so that an out-of-range number or
/// a malformed date becomes a typed error from [`Self::parse`] rather than a
/// decode failure of the whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmittedValueInput {
    pub template_field_id: DbId,
    pub text_value: Option<String>,
    pub textarea_value: Option<String>,
    pub number_value: Option<serde_json::Number>,
    pub date_value: Option<String>,
    pub checkbox_value: Option<bool>,
}

impl SubmittedValueInput {
    /// Build the payload entry a client would send for `value`.
    pub fn from_value(template_field_id: impl Into<DbId>, value: Option<&FieldValue>) -> Self {
        let mut input = Self {
            template_field_id: template_field_id.into(),
            ..Self::default()
        };
        match value {
            Some(FieldValue::Text(v)) => input.text_value = Some(v.clone()),
            Some(FieldValue::Textarea(v)) => input.textarea_value = Some(v.clone()),
            Some(FieldValue::Number(v)) => input.number_value = Some((*v).into()),
            Some(FieldValue::Date(v)) => input.date_value = Some(v.to_rfc3339()),
            Some(FieldValue::Checkbox(v)) => input.checkbox_value = Some(*v),
            None => {}
        }
        input
    }

    /// Types of the populated slots, in column order.
    fn populated_slots(&self) -> Vec<FieldType> {
        [
            (FieldType::Text, self.text_value.is_some()),
            (FieldType::Textarea, self.textarea_value.is_some()),
            (FieldType::Number, self.number_value.is_some()),
            (FieldType::Date, self.date_value.is_some()),
            (FieldType::Checkbox, self.checkbox_value.is_some()),
        ]
        .into_iter()
        .filter_map(|(slot, populated)| populated.then_some(slot))
        .collect()
    }

    /// Check this entry against the field's declared type.
    ///
    /// - No populated slot: `Ok(None)`, the entry carries no answer.
    /// - More than one: [`CoreError::InvariantViolation`].
    /// - A slot other than the declared type's: [`CoreError::Validation`].
    /// - A number outside the integer column: [`CoreError::ValueOutOfRange`].
    /// - A fractional number or malformed date: [`CoreError::Validation`].
    pub fn parse(&self, declared: FieldType) -> Result<Option<FieldValue>, CoreError> {
        let field = &self.template_field_id;
        let slot = match self.populated_slots().as_slice() {
            [] => return Ok(None),
            [slot] => *slot,
            many => {
                let names: Vec<&str> = many.iter().map(|t| t.as_str()).collect();
                return Err(CoreError::InvariantViolation(format!(
                    "Field {field} has {} populated value slots ({}); exactly one is allowed",
                    many.len(),
                    names.join(", ")
                )));
            }
        };

        if slot != declared {
            return Err(CoreError::Validation(format!(
                "Field {field} is declared as {declared} but received a {slot} value"
            )));
        }

        let value = match declared {
            FieldType::Text => self.text_value.clone().map(FieldValue::Text),
            FieldType::Textarea => self.textarea_value.clone().map(FieldValue::Textarea),
            FieldType::Number => self
                .number_value
                .as_ref()
                .map(|n| parse_number(field, n))
                .transpose()?
                .map(FieldValue::Number),
            FieldType::Date => self
                .date_value
                .as_deref()
                .map(|d| parse_date(field, d))
                .transpose()?
                .map(FieldValue::Date),
            FieldType::Checkbox => self.checkbox_value.map(FieldValue::Checkbox),
        };
        Ok(value)
    }
}

/// Narrow a JSON number to the `INTEGER` column range.
fn parse_number(field: &str, number: &serde_json::Number) -> Result<i32, CoreError> {
    let out_of_range = || CoreError::ValueOutOfRange {
        field: field.to_string(),
        value: number.to_string(),
    };

    if let Some(n) = number.as_i64() {
        return i32::try_from(n).map_err(|_| out_of_range());
    }
    if number.as_u64().is_some() {
        return Err(out_of_range());
    }

    let f = number.as_f64().ok_or_else(out_of_range)?;
    if f.fract() != 0.0 {
        return Err(CoreError::Validation(format!(
            "Field {field} expects a whole number, got {number}"
        )));
    }
    if f < f64::from(i32::MIN) || f > f64::from(i32::MAX) {
        return Err(out_of_range());
    }
    Ok(f as i32)
}

/// Accept an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_date(field: &str, raw: &str) -> Result<Timestamp, CoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            CoreError::Validation(format!("Field {field} has a malformed date '{raw}'"))
        })
}
