//! Handlers for the `/templates` resource.

use axum::extract::{Path, State};
use axum::Json;
use fichas_core::error::CoreError;
use fichas_core::types::DbId;
use fichas_db::models::template::{
    CreateTemplate, SyncTemplate, TemplateSummary, TemplateWithFields,
};
use fichas_db::repositories::TemplateRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::{created, Created, DataResponse};
use crate::state::AppState;

/// GET /api/v1/templates
pub async fn list(
    RequireAuth(_auth): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<TemplateSummary>>>> {
    let templates = TemplateRepo::list_summaries(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/templates
///
/// Without fields this is the "new template" action; name and description
/// fall back to their defaults.
pub async fn create(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<Created<TemplateWithFields>> {
    input.validate()?;

    let template = if input.fields.is_empty() {
        let template = TemplateRepo::create(
            &state.pool,
            input.name.as_deref(),
            input.description.as_deref(),
        )
        .await?;
        TemplateWithFields {
            template,
            fields: Vec::new(),
        }
    } else {
        TemplateRepo::create_with_fields(&state.pool, &input).await?
    };

    tracing::info!(
        template_id = %template.template.id,
        field_count = template.fields.len(),
        user_id = %auth.user.id,
        "Template created",
    );
    Ok(created(template))
}

/// GET /api/v1/templates/{id}
pub async fn get_by_id(
    RequireAuth(_auth): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TemplateWithFields>>> {
    let template = TemplateRepo::find_with_fields(&state.pool, &id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/templates/{id}
///
/// Replace the template's field list. Fields missing from the payload are
/// deleted.
pub async fn sync(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SyncTemplate>,
) -> AppResult<Json<DataResponse<TemplateWithFields>>> {
    input.validate()?;

    let synced = TemplateRepo::sync_template_and_fields(&state.pool, &id, &input).await?;

    tracing::info!(
        template_id = %id,
        field_count = synced.fields.len(),
        user_id = %auth.user.id,
        "Template synced",
    );
    Ok(Json(DataResponse { data: synced }))
}
