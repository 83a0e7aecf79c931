//! Repository for the `submissions` and `submitted_fields` tables.

use std::collections::{HashMap, HashSet};

use fichas_core::error::CoreError;
use fichas_core::field_value::{self, FieldValue, SubmittedValueInput};
use fichas_core::ids::generate_id;
use fichas_core::reconcile::{self, RowAction};
use fichas_core::submission_state::SubmissionState;
use fichas_core::types::DbId;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::submission::{
    FilledField, FullSubmission, Submission, SubmissionFilter, SubmissionSummary, SubmittedField,
    SubmittedFieldRow,
};
use crate::models::template::TemplateField;
use crate::repositories::TemplateRepo;

/// Column list for the `submissions` table.
const COLUMNS: &str =
    "id, template_id, submitter_id, state, submitted_at, created_at, updated_at";

/// Column list for the `submitted_fields` table.
const VALUE_COLUMNS: &str = "submission_id, template_field_id, text_value, textarea_value, \
    number_value, date_value, checkbox_value, created_at, updated_at";

/// Provides create, fetch, answer sync and review transitions for submissions.
pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Start a draft submission of `template_id` for `submitter_id`.
    pub async fn create(
        pool: &PgPool,
        template_id: &str,
        submitter_id: &str,
    ) -> StoreResult<Submission> {
        if TemplateRepo::find_by_id(pool, template_id).await?.is_none() {
            return Err(not_found("Template", template_id).into());
        }

        let query = format!(
            "INSERT INTO submissions (id, template_id, submitter_id, state) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let submission = sqlx::query_as::<_, Submission>(&query)
            .bind(generate_id())
            .bind(template_id)
            .bind(submitter_id)
            .bind(SubmissionState::Draft.as_str())
            .fetch_one(pool)
            .await?;
        Ok(submission)
    }

    /// Find a submission by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE id = $1");
        sqlx::query_as::<_, Submission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load a submission with its template and every template field paired
    /// with its answer. Unanswered fields carry `value: None`.
    pub async fn find_full(pool: &PgPool, id: &str) -> StoreResult<Option<FullSubmission>> {
        let Some(submission) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let template = TemplateRepo::find_by_id(pool, &submission.template_id)
            .await?
            .ok_or_else(|| not_found("Template", &submission.template_id))?;
        let template_fields = TemplateRepo::fetch_fields(pool, &template.id).await?;

        let query = format!("SELECT {VALUE_COLUMNS} FROM submitted_fields WHERE submission_id = $1");
        let rows: HashMap<DbId, SubmittedFieldRow> =
            sqlx::query_as::<_, SubmittedFieldRow>(&query)
                .bind(&submission.id)
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|row| (row.template_field_id.clone(), row))
                .collect();

        let mut fields = Vec::with_capacity(template_fields.len());
        for field in template_fields {
            let columns = rows.get(&field.id).map(SubmittedFieldRow::columns);
            let value = field_value::to_domain(columns.as_ref(), field.field_type)?;
            fields.push(FilledField { field, value });
        }

        Ok(Some(FullSubmission {
            submission,
            template,
            fields,
        }))
    }

    /// List submissions, newest first, with template name and answer count.
    pub async fn list_summaries(
        pool: &PgPool,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionSummary>, sqlx::Error> {
        let select = "SELECT s.id, s.template_id, t.name AS template_name, s.submitter_id, \
                s.state, s.submitted_at, \
                (SELECT COUNT(*) FROM submitted_fields sf WHERE sf.submission_id = s.id) \
                    AS answered_count, \
                s.created_at, s.updated_at \
             FROM submissions s \
             JOIN templates t ON t.id = s.template_id";
        match filter {
            SubmissionFilter::All => {
                let query = format!("{select} ORDER BY s.created_at DESC, s.id");
                sqlx::query_as::<_, SubmissionSummary>(&query)
                    .fetch_all(pool)
                    .await
            }
            SubmissionFilter::Submitter(submitter_id) => {
                let query = format!(
                    "{select} WHERE s.submitter_id = $1 ORDER BY s.created_at DESC, s.id"
                );
                sqlx::query_as::<_, SubmissionSummary>(&query)
                    .bind(submitter_id)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Upsert answers for a submission.
    ///
    /// Runs in one transaction with the submission row locked. The whole
    /// batch is validated before anything is written; one bad entry rejects
    /// all of them:
    /// - unknown submission: [`CoreError::NotFound`]
    /// - approved submission: [`CoreError::SubmissionLocked`]
    /// - field not on the submission's template, or listed twice:
    ///   [`CoreError::Validation`]
    /// - more than one populated slot: [`CoreError::InvariantViolation`]
    /// - slot of the wrong type, bad number or date: see
    ///   [`SubmittedValueInput::parse`]
    ///
    /// An entry with no populated slot is accepted and writes nothing.
    /// Persisted answers the batch does not mention are left alone; this
    /// operation never deletes. Returns the written answers in input order.
    pub async fn sync_submitted_fields(
        pool: &PgPool,
        submission_id: &str,
        values: &[SubmittedValueInput],
    ) -> StoreResult<Vec<SubmittedField>> {
        let mut tx = pool.begin().await?;

        let submission = Self::lock_inner(&mut tx, submission_id).await?;
        if submission.state.is_locked() {
            return Err(CoreError::SubmissionLocked {
                id: submission.id.clone(),
            }
            .into());
        }

        Self::share_template_inner(&mut tx, &submission.template_id).await?;
        let template_fields: HashMap<DbId, TemplateField> =
            TemplateRepo::fetch_fields(&mut *tx, &submission.template_id)
                .await?
                .into_iter()
                .map(|f| (f.id.clone(), f))
                .collect();

        let mut seen = HashSet::new();
        let mut parsed: Vec<(&TemplateField, FieldValue)> = Vec::with_capacity(values.len());
        for input in values {
            let field = template_fields.get(&input.template_field_id).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Field {} does not belong to template {}",
                    input.template_field_id, submission.template_id
                ))
            })?;
            if !seen.insert(field.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate entry for {} in sync payload",
                    field.id
                ))
                .into());
            }
            if let Some(value) = input.parse(field.field_type)? {
                parsed.push((field, value));
            }
        }

        let existing: Vec<DbId> = sqlx::query_scalar(
            "SELECT template_field_id FROM submitted_fields WHERE submission_id = $1",
        )
        .bind(&submission.id)
        .fetch_all(&mut *tx)
        .await?;
        let plan = reconcile::plan(
            existing,
            parsed.iter().map(|(field, _)| Some(field.id.clone())),
        )?;

        let mut synced = Vec::with_capacity(parsed.len());
        for ((field, value), action) in parsed.iter().zip(&plan.actions) {
            let columns = field_value::to_persistence(field.field_type, Some(value))?;
            let sql = match action {
                RowAction::Update(_) => format!(
                    "UPDATE submitted_fields SET \
                        text_value = $3, textarea_value = $4, number_value = $5, \
                        date_value = $6, checkbox_value = $7 \
                     WHERE submission_id = $1 AND template_field_id = $2 \
                     RETURNING {VALUE_COLUMNS}"
                ),
                RowAction::Create => format!(
                    "INSERT INTO submitted_fields \
                        (submission_id, template_field_id, text_value, textarea_value, \
                         number_value, date_value, checkbox_value) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     RETURNING {VALUE_COLUMNS}"
                ),
            };
            let row = sqlx::query_as::<_, SubmittedFieldRow>(&sql)
                .bind(&submission.id)
                .bind(&field.id)
                .bind(&columns.text_value)
                .bind(&columns.textarea_value)
                .bind(columns.number_value)
                .bind(columns.date_value)
                .bind(columns.checkbox_value)
                .fetch_one(&mut *tx)
                .await?;
            synced.push(row.into_domain(field.field_type)?);
        }

        tx.commit().await?;
        Ok(synced)
    }

    /// Send a draft (or a submission with requested changes) for review.
    ///
    /// Every required template field must be answered.
    pub async fn submit(pool: &PgPool, id: &str) -> StoreResult<Submission> {
        Self::transition(pool, id, SubmissionState::WaitingReview).await
    }

    /// Approve a submission under review. Approved submissions are final.
    pub async fn approve(pool: &PgPool, id: &str) -> StoreResult<Submission> {
        Self::transition(pool, id, SubmissionState::Approved).await
    }

    /// Send a submission under review back to its submitter.
    pub async fn request_changes(pool: &PgPool, id: &str) -> StoreResult<Submission> {
        Self::transition(pool, id, SubmissionState::ChangesRequested).await
    }

    /// Move a submission to `next` if the state machine allows it.
    pub async fn transition(
        pool: &PgPool,
        id: &str,
        next: SubmissionState,
    ) -> StoreResult<Submission> {
        let mut tx = pool.begin().await?;

        let submission = Self::lock_inner(&mut tx, id).await?;
        submission.state.check_transition(&submission.id, next)?;

        if next == SubmissionState::WaitingReview {
            Self::share_template_inner(&mut tx, &submission.template_id).await?;
            Self::ensure_required_answered_inner(&mut tx, &submission).await?;
        }

        let query = format!(
            "UPDATE submissions SET \
                state = $2, \
                submitted_at = CASE WHEN $3 THEN NOW() ELSE submitted_at END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Submission>(&query)
            .bind(&submission.id)
            .bind(next.as_str())
            .bind(next == SubmissionState::WaitingReview)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Load and row-lock a submission for the rest of the transaction.
    async fn lock_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: &str,
    ) -> StoreResult<Submission> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE");
        let submission = sqlx::query_as::<_, Submission>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found("Submission", id))?;
        Ok(submission)
    }

    /// Hold a share lock on the template row so a concurrent template sync
    /// (which updates that row first) cannot change field types or the
    /// required set until this transaction ends.
    async fn share_template_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: &str,
    ) -> StoreResult<()> {
        sqlx::query("SELECT id FROM templates WHERE id = $1 FOR SHARE")
            .bind(template_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found("Template", template_id))?;
        Ok(())
    }

    async fn ensure_required_answered_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        submission: &Submission,
    ) -> StoreResult<()> {
        let missing: Vec<String> = sqlx::query_scalar(
            "SELECT f.name FROM template_fields f \
             WHERE f.template_id = $1 AND f.required \
               AND NOT EXISTS ( \
                   SELECT 1 FROM submitted_fields sf \
                   WHERE sf.submission_id = $2 AND sf.template_field_id = f.id) \
             ORDER BY f.sort_order, f.created_at, f.id",
        )
        .bind(&submission.template_id)
        .bind(&submission.id)
        .fetch_all(&mut **tx)
        .await?;

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Required fields are unanswered: {}",
                missing.join(", ")
            ))
            .into())
        }
    }
}

fn not_found(entity: &'static str, id: &str) -> CoreError {
    CoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}
