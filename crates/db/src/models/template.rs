//! Template and template field models and DTOs.

use fichas_core::field_type::FieldType;
use fichas_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `template_fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateField {
    pub id: DbId,
    pub template_id: DbId,
    pub name: String,
    pub required: bool,
    #[sqlx(try_from = "String")]
    pub field_type: FieldType,
    /// Display rank. Written from the field's position in the last payload.
    pub sort_order: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A template together with its fields in display order.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithFields {
    #[serde(flatten)]
    pub template: Template,
    pub fields: Vec<TemplateField>,
}

/// A template list entry with aggregate counts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateSummary {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub field_count: i64,
    pub submission_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One field in a create or sync payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TemplateFieldInput {
    /// Persisted id of the field. Absent, or not one of the template's
    /// current field ids, for a field added on the client.
    #[serde(default)]
    pub id: Option<DbId>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub field_type: FieldType,
}

/// DTO for creating a template. Name and description fall back to the
/// "new template" defaults when omitted.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub fields: Vec<TemplateFieldInput>,
}

/// DTO for a reconciling template sync.
///
/// `fields` is the complete field list: listed fields are created or
/// updated in this order, and persisted fields missing from it are deleted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SyncTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(nested)]
    pub fields: Vec<TemplateFieldInput>,
}
