//! Handlers for the `/submissions` resource.
//!
//! Sellers see and edit only their own submissions; admins see all of them
//! and run the review transitions.

use std::collections::{BTreeSet, HashMap};

use axum::extract::{Path, State};
use axum::Json;
use fichas_core::error::CoreError;
use fichas_core::field_value::SubmittedValueInput;
use fichas_core::types::DbId;
use fichas_db::models::submission::{
    CreateSubmission, FullSubmission, Submission, SubmissionFilter, SubmissionSummary,
    SubmittedField,
};
use fichas_db::repositories::SubmissionRepo;
use serde::{Deserialize, Serialize};

use crate::auth::gateway::User;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::{created, Created, DataResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /submissions/{id}/fields`.
#[derive(Debug, Deserialize)]
pub struct SyncSubmittedFields {
    pub fields: Vec<SubmittedValueInput>,
}

/// A submission list entry labelled with its submitter.
#[derive(Debug, Serialize)]
pub struct SubmissionListItem {
    #[serde(flatten)]
    pub summary: SubmissionSummary,
    /// `None` when the auth service no longer knows the submitter.
    pub submitter: Option<User>,
}

/// A full submission labelled with its submitter.
#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: FullSubmission,
    pub submitter: Option<User>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/submissions
pub async fn list(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SubmissionListItem>>>> {
    let filter = if auth.user.is_admin() {
        SubmissionFilter::All
    } else {
        SubmissionFilter::Submitter(auth.user.id.clone())
    };
    let summaries = SubmissionRepo::list_summaries(&state.pool, &filter).await?;

    let submitter_ids: Vec<String> = summaries
        .iter()
        .map(|s| s.submitter_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let users: HashMap<String, User> = state
        .auth
        .users_by_ids(&auth.token, &submitter_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    let items = summaries
        .into_iter()
        .map(|summary| SubmissionListItem {
            submitter: users.get(&summary.submitter_id).cloned(),
            summary,
        })
        .collect();
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/submissions
pub async fn create(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<CreateSubmission>,
) -> AppResult<Created<Submission>> {
    let submission = SubmissionRepo::create(&state.pool, &input.template_id, &auth.user.id).await?;

    tracing::info!(
        submission_id = %submission.id,
        template_id = %submission.template_id,
        user_id = %auth.user.id,
        "Submission created",
    );
    Ok(created(submission))
}

/// GET /api/v1/submissions/{id}
pub async fn get_by_id(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SubmissionDetail>>> {
    let full = SubmissionRepo::find_full(&state.pool, &id)
        .await?
        .ok_or_else(|| submission_not_found(&id))?;
    ensure_owner_or_admin(&auth, &full.submission)?;

    let submitter = if full.submission.submitter_id == auth.user.id {
        Some(auth.user.clone())
    } else {
        state
            .auth
            .users_by_ids(&auth.token, std::slice::from_ref(&full.submission.submitter_id))
            .await?
            .into_iter()
            .next()
    };

    Ok(Json(DataResponse {
        data: SubmissionDetail {
            submission: full,
            submitter,
        },
    }))
}

/// PUT /api/v1/submissions/{id}/fields
///
/// Upsert answers. The batch is all-or-nothing; answers not listed are kept.
pub async fn sync_fields(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SyncSubmittedFields>,
) -> AppResult<Json<DataResponse<Vec<SubmittedField>>>> {
    let submission = find_submission(&state, &id).await?;
    ensure_owner_or_admin(&auth, &submission)?;

    let synced = SubmissionRepo::sync_submitted_fields(&state.pool, &id, &input.fields).await?;

    tracing::info!(
        submission_id = %id,
        received = input.fields.len(),
        written = synced.len(),
        user_id = %auth.user.id,
        "Submission fields synced",
    );
    Ok(Json(DataResponse { data: synced }))
}

/// POST /api/v1/submissions/{id}/submit
///
/// Only the submitter may send a submission for review.
pub async fn submit(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Submission>>> {
    let submission = find_submission(&state, &id).await?;
    if submission.submitter_id != auth.user.id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the submitter can submit for review".into(),
        )));
    }

    let updated = SubmissionRepo::submit(&state.pool, &id).await?;
    tracing::info!(submission_id = %id, user_id = %auth.user.id, "Submission sent for review");
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/submissions/{id}/approve
pub async fn approve(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Submission>>> {
    let updated = SubmissionRepo::approve(&state.pool, &id).await?;
    tracing::info!(submission_id = %id, user_id = %auth.user.id, "Submission approved");
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/submissions/{id}/request-changes
pub async fn request_changes(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Submission>>> {
    let updated = SubmissionRepo::request_changes(&state.pool, &id).await?;
    tracing::info!(submission_id = %id, user_id = %auth.user.id, "Changes requested");
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_submission(state: &AppState, id: &str) -> AppResult<Submission> {
    SubmissionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| submission_not_found(id))
}

fn ensure_owner_or_admin(auth: &AuthUser, submission: &Submission) -> AppResult<()> {
    if auth.user.is_admin() || submission.submitter_id == auth.user.id {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Submission belongs to another user".into(),
        )))
    }
}

fn submission_not_found(id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Submission",
        id: id.to_string(),
    })
}
