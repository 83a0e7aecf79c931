//! Interleaving tests for a template sync racing an answer sync.
//!
//! A side transaction holds a row lock to park one sync mid-flight, the
//! other sync is started, and the side lock is released. Whatever the
//! order, every stored answer must still match its field's declared type.

use std::time::Duration;

use assert_matches::assert_matches;
use fichas_core::error::CoreError;
use fichas_core::field_type::FieldType;
use fichas_core::field_value::{FieldValue, SubmittedValueInput};
use fichas_db::models::template::{CreateTemplate, SyncTemplate, TemplateFieldInput};
use fichas_db::repositories::{SubmissionRepo, TemplateRepo};
use fichas_db::StoreError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    template_id: String,
    field_id: String,
    submission_id: String,
}

/// One optional `text` field and a draft submission of it.
async fn fixture(pool: &PgPool) -> Fixture {
    let created = TemplateRepo::create_with_fields(
        pool,
        &CreateTemplate {
            name: Some("Ficha".to_string()),
            description: None,
            fields: vec![TemplateFieldInput {
                id: None,
                name: "nome".to_string(),
                required: false,
                field_type: FieldType::Text,
            }],
        },
    )
    .await
    .unwrap();
    let submission = SubmissionRepo::create(pool, &created.template.id, "seller-1")
        .await
        .unwrap();
    Fixture {
        template_id: created.template.id,
        field_id: created.fields[0].id.clone(),
        submission_id: submission.id,
    }
}

/// Payload that keeps the field but re-types it to `number`.
fn retype_to_number(fx: &Fixture) -> SyncTemplate {
    SyncTemplate {
        name: "Ficha".to_string(),
        description: None,
        fields: vec![TemplateFieldInput {
            id: Some(fx.field_id.clone()),
            name: "nome".to_string(),
            required: false,
            field_type: FieldType::Number,
        }],
    }
}

fn text_answer(fx: &Fixture) -> Vec<SubmittedValueInput> {
    vec![SubmittedValueInput::from_value(
        fx.field_id.clone(),
        Some(&FieldValue::Text("hello".to_string())),
    )]
}

/// Block until `count` sessions of this database are waiting on a lock.
async fn wait_for_lock_waiters(pool: &PgPool, count: i64) {
    for _ in 0..200 {
        let (waiting,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pg_stat_activity \
             WHERE datname = current_database() AND wait_event_type = 'Lock'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        if waiting >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("expected {count} sessions waiting on a lock");
}

async fn stored_field_type(pool: &PgPool, field_id: &str) -> String {
    let (field_type,): (String,) =
        sqlx::query_as("SELECT field_type FROM template_fields WHERE id = $1")
            .bind(field_id)
            .fetch_one(pool)
            .await
            .unwrap();
    field_type
}

// ---------------------------------------------------------------------------
// Test: template sync first
// ---------------------------------------------------------------------------

/// The answer sync waits for the in-flight re-type and then validates
/// against the new type.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_answer_sync_waits_for_retype(pool: PgPool) {
    let fx = fixture(&pool).await;

    // Park the template sync on the field row update, after its answer check.
    let mut side = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM template_fields WHERE id = $1 FOR NO KEY UPDATE")
        .bind(&fx.field_id)
        .execute(&mut *side)
        .await
        .unwrap();

    let retype = tokio::spawn({
        let pool = pool.clone();
        let template_id = fx.template_id.clone();
        let input = retype_to_number(&fx);
        async move { TemplateRepo::sync_template_and_fields(&pool, &template_id, &input).await }
    });
    wait_for_lock_waiters(&pool, 1).await;

    let answer = tokio::spawn({
        let pool = pool.clone();
        let submission_id = fx.submission_id.clone();
        let values = text_answer(&fx);
        async move { SubmissionRepo::sync_submitted_fields(&pool, &submission_id, &values).await }
    });
    wait_for_lock_waiters(&pool, 2).await;

    side.rollback().await.unwrap();

    assert!(retype.await.unwrap().is_ok());
    assert_matches!(
        answer.await.unwrap(),
        Err(StoreError::Core(CoreError::Validation(_)))
    );
    assert_eq!(stored_field_type(&pool, &fx.field_id).await, "number");

    let full = SubmissionRepo::find_full(&pool, &fx.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(full.fields[0].value, None);
}

// ---------------------------------------------------------------------------
// Test: answer sync first
// ---------------------------------------------------------------------------

/// The re-type waits for the in-flight answer and then refuses to change
/// an answered field.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retype_waits_for_answer_sync(pool: PgPool) {
    let fx = fixture(&pool).await;

    // Park the answer sync on its foreign key check, with the template
    // already share-locked.
    let mut side = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM template_fields WHERE id = $1 FOR UPDATE")
        .bind(&fx.field_id)
        .execute(&mut *side)
        .await
        .unwrap();

    let answer = tokio::spawn({
        let pool = pool.clone();
        let submission_id = fx.submission_id.clone();
        let values = text_answer(&fx);
        async move { SubmissionRepo::sync_submitted_fields(&pool, &submission_id, &values).await }
    });
    wait_for_lock_waiters(&pool, 1).await;

    let retype = tokio::spawn({
        let pool = pool.clone();
        let template_id = fx.template_id.clone();
        let input = retype_to_number(&fx);
        async move { TemplateRepo::sync_template_and_fields(&pool, &template_id, &input).await }
    });
    wait_for_lock_waiters(&pool, 2).await;

    side.rollback().await.unwrap();

    assert_eq!(answer.await.unwrap().unwrap().len(), 1);
    assert_matches!(
        retype.await.unwrap(),
        Err(StoreError::Core(CoreError::Conflict(_)))
    );
    assert_eq!(stored_field_type(&pool, &fx.field_id).await, "text");

    let full = SubmissionRepo::find_full(&pool, &fx.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        full.fields[0].value,
        Some(FieldValue::Text("hello".to_string()))
    );
}
