//! Submission and submitted field models and DTOs.

use fichas_core::error::CoreError;
use fichas_core::field_type::FieldType;
use fichas_core::field_value::{self, FieldValue, ValueColumns};
use fichas_core::submission_state::SubmissionState;
use fichas_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::template::{Template, TemplateField};

/// A row from the `submissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: DbId,
    pub template_id: DbId,
    pub submitter_id: String,
    #[sqlx(try_from = "String")]
    pub state: SubmissionState,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A raw row from the `submitted_fields` table.
///
/// The five value columns stay inside this crate; callers get a
/// [`SubmittedField`] with a typed value instead.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubmittedFieldRow {
    pub submission_id: DbId,
    pub template_field_id: DbId,
    pub text_value: Option<String>,
    pub textarea_value: Option<String>,
    pub number_value: Option<i32>,
    pub date_value: Option<Timestamp>,
    pub checkbox_value: Option<bool>,
    #[allow(dead_code)]
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SubmittedFieldRow {
    pub(crate) fn columns(&self) -> ValueColumns {
        ValueColumns {
            text_value: self.text_value.clone(),
            textarea_value: self.textarea_value.clone(),
            number_value: self.number_value,
            date_value: self.date_value,
            checkbox_value: self.checkbox_value,
        }
    }

    /// Read this row as the answer to a field of type `declared`.
    pub(crate) fn into_domain(self, declared: FieldType) -> Result<SubmittedField, CoreError> {
        let value = field_value::to_domain(Some(&self.columns()), declared)?.ok_or_else(|| {
            CoreError::InvariantViolation(format!(
                "Answer to field {} in submission {} holds no value",
                self.template_field_id, self.submission_id
            ))
        })?;
        Ok(SubmittedField {
            submission_id: self.submission_id,
            template_field_id: self.template_field_id,
            value,
            updated_at: self.updated_at,
        })
    }
}

/// A persisted answer to one template field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedField {
    pub submission_id: DbId,
    pub template_field_id: DbId,
    pub value: FieldValue,
    pub updated_at: Timestamp,
}

/// A template field paired with the submission's answer, if any.
#[derive(Debug, Clone, Serialize)]
pub struct FilledField {
    #[serde(flatten)]
    pub field: TemplateField,
    /// `None` when the field is unanswered.
    pub value: Option<FieldValue>,
}

/// A submission with its template and every template field's answer, in
/// template field order.
#[derive(Debug, Clone, Serialize)]
pub struct FullSubmission {
    #[serde(flatten)]
    pub submission: Submission,
    pub template: Template,
    pub fields: Vec<FilledField>,
}

/// A submission list entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubmissionSummary {
    pub id: DbId,
    pub template_id: DbId,
    pub template_name: String,
    pub submitter_id: String,
    #[sqlx(try_from = "String")]
    pub state: SubmissionState,
    pub submitted_at: Option<Timestamp>,
    pub answered_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for starting a new submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmission {
    pub template_id: DbId,
}

/// Which submissions a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionFilter {
    All,
    Submitter(String),
}
