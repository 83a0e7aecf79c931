//! Repository for the `templates` and `template_fields` tables.

use std::collections::HashMap;

use fichas_core::error::CoreError;
use fichas_core::field_type::FieldType;
use fichas_core::ids::{generate_id, is_valid_id};
use fichas_core::reconcile::{self, RowAction};
use fichas_core::types::DbId;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::template::{
    CreateTemplate, SyncTemplate, Template, TemplateField, TemplateFieldInput, TemplateSummary,
    TemplateWithFields,
};

/// Name given to a template created without one.
pub const DEFAULT_TEMPLATE_NAME: &str = "Novo template";

/// Description given to a template created without one.
pub const DEFAULT_TEMPLATE_DESCRIPTION: &str = "Detalhes sobre o template";

/// Column list for the `templates` table.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Column list for the `template_fields` table.
const FIELD_COLUMNS: &str =
    "id, template_id, name, required, field_type, sort_order, created_at, updated_at";

/// Provides create, fetch, and reconciling sync for templates and their fields.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert an empty template, falling back to the default name and
    /// description for whichever is `None`.
    pub async fn create(
        pool: &PgPool,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (id, name, description) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(generate_id())
            .bind(name.unwrap_or(DEFAULT_TEMPLATE_NAME))
            .bind(description.unwrap_or(DEFAULT_TEMPLATE_DESCRIPTION))
            .fetch_one(pool)
            .await
    }

    /// Insert a template and its initial fields in one transaction.
    ///
    /// Every field gets a fresh id; ids in the input are ignored. Field
    /// order follows the input order.
    pub async fn create_with_fields(
        pool: &PgPool,
        input: &CreateTemplate,
    ) -> StoreResult<TemplateWithFields> {
        check_field_count(input.fields.len())?;

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO templates (id, name, description) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(generate_id())
            .bind(input.name.as_deref().unwrap_or(DEFAULT_TEMPLATE_NAME))
            .bind(
                input
                    .description
                    .as_deref()
                    .unwrap_or(DEFAULT_TEMPLATE_DESCRIPTION),
            )
            .fetch_one(&mut *tx)
            .await?;

        let mut fields = Vec::with_capacity(input.fields.len());
        for (position, field) in input.fields.iter().enumerate() {
            let created =
                Self::insert_field_inner(&mut tx, &template.id, field, sort_order(position)?)
                    .await?;
            fields.push(created);
        }

        tx.commit().await?;
        Ok(TemplateWithFields { template, fields })
    }

    /// Find a template by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a template by id together with its fields in display order.
    pub async fn find_with_fields(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<TemplateWithFields>, sqlx::Error> {
        match Self::find_by_id(pool, id).await? {
            Some(template) => {
                let fields = Self::fetch_fields(pool, &template.id).await?;
                Ok(Some(TemplateWithFields { template, fields }))
            }
            None => Ok(None),
        }
    }

    /// List the fields of a template ordered by `sort_order`, ties broken by
    /// insertion time.
    pub async fn fetch_fields<'e>(
        executor: impl sqlx::PgExecutor<'e>,
        template_id: &str,
    ) -> Result<Vec<TemplateField>, sqlx::Error> {
        let query = format!(
            "SELECT {FIELD_COLUMNS} FROM template_fields \
             WHERE template_id = $1 \
             ORDER BY sort_order, created_at, id"
        );
        sqlx::query_as::<_, TemplateField>(&query)
            .bind(template_id)
            .fetch_all(executor)
            .await
    }

    /// List every template with its field and submission counts, most
    /// recently updated first.
    pub async fn list_summaries(pool: &PgPool) -> Result<Vec<TemplateSummary>, sqlx::Error> {
        sqlx::query_as::<_, TemplateSummary>(
            "SELECT t.id, t.name, t.description, \
                (SELECT COUNT(*) FROM template_fields f WHERE f.template_id = t.id) AS field_count, \
                (SELECT COUNT(*) FROM submissions s WHERE s.template_id = t.id) AS submission_count, \
                t.created_at, t.updated_at \
             FROM templates t \
             ORDER BY t.updated_at DESC, t.id",
        )
        .fetch_all(pool)
        .await
    }

    /// Reconcile a template's persisted fields with `input.fields`.
    ///
    /// Runs in one transaction:
    /// 1. Overwrite name and description (this also locks the template row).
    /// 2. Diff the incoming field ids against the persisted ones. Listed
    ///    fields whose id is persisted are updated; the rest are created
    ///    with fresh ids.
    /// 3. Delete persisted fields the payload omitted.
    ///
    /// `sort_order` is taken from each field's position in `input.fields`,
    /// and the returned fields keep that order.
    ///
    /// Fails with [`CoreError::NotFound`] for an unknown template,
    /// [`CoreError::Validation`] when a persisted id is listed twice, and
    /// [`CoreError::Conflict`] when a deleted or re-typed field already has
    /// submitted answers. Nothing is written on failure.
    pub async fn sync_template_and_fields(
        pool: &PgPool,
        id: &str,
        input: &SyncTemplate,
    ) -> StoreResult<TemplateWithFields> {
        check_field_count(input.fields.len())?;

        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE templates SET name = $2, description = $3 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Template",
                id: id.to_string(),
            })?;

        let existing: HashMap<DbId, FieldType> = Self::fetch_fields(&mut *tx, &template.id)
            .await?
            .into_iter()
            .map(|f| (f.id, f.field_type))
            .collect();

        // Client-side placeholder ids can never match a persisted row.
        let incoming = input
            .fields
            .iter()
            .map(|f| f.id.clone().filter(|candidate| is_valid_id(candidate)));
        let plan = reconcile::plan(existing.keys().cloned(), incoming)?;

        let mut guarded: Vec<DbId> = plan.stale.clone();
        for (field, action) in input.fields.iter().zip(&plan.actions) {
            if let RowAction::Update(field_id) = action {
                if existing.get(field_id) != Some(&field.field_type) {
                    guarded.push(field_id.clone());
                }
            }
        }
        Self::ensure_unanswered_inner(&mut tx, &guarded).await?;

        let mut fields = Vec::with_capacity(input.fields.len());
        for (position, (field, action)) in input.fields.iter().zip(&plan.actions).enumerate() {
            let order = sort_order(position)?;
            let synced = match action {
                RowAction::Update(field_id) => {
                    Self::update_field_inner(&mut tx, &template.id, field_id, field, order).await?
                }
                RowAction::Create => {
                    Self::insert_field_inner(&mut tx, &template.id, field, order).await?
                }
            };
            fields.push(synced);
        }

        if !plan.stale.is_empty() {
            sqlx::query("DELETE FROM template_fields WHERE template_id = $1 AND id = ANY($2)")
                .bind(&template.id)
                .bind(&plan.stale)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(TemplateWithFields { template, fields })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn insert_field_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: &str,
        field: &TemplateFieldInput,
        sort_order: i16,
    ) -> Result<TemplateField, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_fields \
                (id, template_id, name, required, field_type, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {FIELD_COLUMNS}"
        );
        sqlx::query_as::<_, TemplateField>(&query)
            .bind(generate_id())
            .bind(template_id)
            .bind(&field.name)
            .bind(field.required)
            .bind(field.field_type.as_str())
            .bind(sort_order)
            .fetch_one(&mut **tx)
            .await
    }

    async fn update_field_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: &str,
        field_id: &str,
        field: &TemplateFieldInput,
        sort_order: i16,
    ) -> Result<TemplateField, sqlx::Error> {
        let query = format!(
            "UPDATE template_fields SET \
                name = $3, required = $4, field_type = $5, sort_order = $6 \
             WHERE id = $1 AND template_id = $2 \
             RETURNING {FIELD_COLUMNS}"
        );
        sqlx::query_as::<_, TemplateField>(&query)
            .bind(field_id)
            .bind(template_id)
            .bind(&field.name)
            .bind(field.required)
            .bind(field.field_type.as_str())
            .bind(sort_order)
            .fetch_one(&mut **tx)
            .await
    }

    /// Fail with [`CoreError::Conflict`] if any of `field_ids` has answers.
    async fn ensure_unanswered_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        field_ids: &[DbId],
    ) -> StoreResult<()> {
        if field_ids.is_empty() {
            return Ok(());
        }
        let answered: Vec<DbId> = sqlx::query_scalar(
            "SELECT DISTINCT template_field_id FROM submitted_fields \
             WHERE template_field_id = ANY($1) \
             ORDER BY template_field_id",
        )
        .bind(field_ids)
        .fetch_all(&mut **tx)
        .await?;

        if answered.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Fields already answered in submissions cannot be removed or re-typed: {}",
                answered.join(", ")
            ))
            .into())
        }
    }
}

/// Display rank for the field at `position` in a payload.
fn sort_order(position: usize) -> Result<i16, CoreError> {
    i16::try_from(position)
        .map_err(|_| CoreError::Validation(format!("Field position {position} is too large")))
}

fn check_field_count(count: usize) -> Result<(), CoreError> {
    if count > i16::MAX as usize + 1 {
        return Err(CoreError::Validation(format!(
            "A template holds at most {} fields, got {count}",
            i16::MAX as usize + 1
        )));
    }
    Ok(())
}
