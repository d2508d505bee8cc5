use shared_types::{AppError, Form, FormStatus, FormType, RoznamaEntry};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Insert a form. The partial unique index on CASE_ROZNAMA turns a second
/// log for the same case into a `Conflict`.
pub async fn insert(pool: &Pool<Postgres>, form: &Form) -> Result<Form, AppError> {
    sqlx::query_as::<_, Form>(
        r#"
        INSERT INTO forms
            (id, case_id, form_type, status, content, created_by,
             submitted_at, approved_by, approved_at, rejection_reason,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id, case_id, form_type, status, content, created_by,
                  submitted_at, approved_by, approved_at, rejection_reason,
                  created_at, updated_at
        "#,
    )
    .bind(form.id)
    .bind(form.case_id)
    .bind(form.form_type.as_str())
    .bind(form.status.as_str())
    .bind(&form.content)
    .bind(&form.created_by)
    .bind(form.submitted_at)
    .bind(&form.approved_by)
    .bind(form.approved_at)
    .bind(&form.rejection_reason)
    .bind(form.created_at)
    .bind(form.updated_at)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Find a form by ID.
pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Form>, AppError> {
    sqlx::query_as::<_, Form>(
        r#"
        SELECT id, case_id, form_type, status, content, created_by,
               submitted_at, approved_by, approved_at, rejection_reason,
               created_at, updated_at
        FROM forms
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Forms of a case in creation order, optionally narrowed to one status.
pub async fn list_by_case(
    pool: &Pool<Postgres>,
    case_id: Uuid,
    status: Option<FormStatus>,
) -> Result<Vec<Form>, AppError> {
    sqlx::query_as::<_, Form>(
        r#"
        SELECT id, case_id, form_type, status, content, created_by,
               submitted_at, approved_by, approved_at, rejection_reason,
               created_at, updated_at
        FROM forms
        WHERE case_id = $1
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at, id
        "#,
    )
    .bind(case_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// The case's proceedings log, if one has been started.
pub async fn find_roznama(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Option<Form>, AppError> {
    sqlx::query_as::<_, Form>(
        r#"
        SELECT id, case_id, form_type, status, content, created_by,
               submitted_at, approved_by, approved_at, rejection_reason,
               created_at, updated_at
        FROM forms
        WHERE case_id = $1 AND form_type = $2
        "#,
    )
    .bind(case_id)
    .bind(FormType::CaseRoznama.as_str())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Persist a status change made with `Form::apply`, guarded on the status
/// the caller read. Returns None if the form moved in between.
pub async fn update_status(
    pool: &Pool<Postgres>,
    form: &Form,
    expected: FormStatus,
) -> Result<Option<Form>, AppError> {
    sqlx::query_as::<_, Form>(
        r#"
        UPDATE forms SET
            status           = $3,
            submitted_at     = $4,
            approved_by      = $5,
            approved_at      = $6,
            rejection_reason = $7,
            updated_at       = $8
        WHERE id = $1 AND status = $2
        RETURNING id, case_id, form_type, status, content, created_by,
                  submitted_at, approved_by, approved_at, rejection_reason,
                  created_at, updated_at
        "#,
    )
    .bind(form.id)
    .bind(expected.as_str())
    .bind(form.status.as_str())
    .bind(form.submitted_at)
    .bind(&form.approved_by)
    .bind(form.approved_at)
    .bind(&form.rejection_reason)
    .bind(form.updated_at)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Append one entry to the end of a Roznama in a single statement so
/// concurrent appends never drop each other. Returns the new entry count.
pub async fn append_roznama_entry(
    pool: &Pool<Postgres>,
    form_id: Uuid,
    entry: &RoznamaEntry,
) -> Result<usize, AppError> {
    let entry = serde_json::to_value(entry)
        .map_err(|e| AppError::internal(format!("Failed to encode Roznama entry: {e}")))?;

    let count: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE forms SET
            content = jsonb_set(
                content,
                '{entries}',
                COALESCE(content->'entries', '[]'::jsonb) || jsonb_build_array($2::jsonb)
            ),
            updated_at = NOW()
        WHERE id = $1 AND form_type = $3
        RETURNING jsonb_array_length(content->'entries')
        "#,
    )
    .bind(form_id)
    .bind(entry)
    .bind(FormType::CaseRoznama.as_str())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    count
        .map(|c| c as usize)
        .ok_or_else(|| AppError::not_found("Roznama not found"))
}
