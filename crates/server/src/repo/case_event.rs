use shared_types::{AppError, CaseEvent};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Append a case event. Events are never updated or deleted.
pub async fn insert(pool: &Pool<Postgres>, event: &CaseEvent) -> Result<CaseEvent, AppError> {
    sqlx::query_as::<_, CaseEvent>(
        r#"
        INSERT INTO case_events
            (id, case_id, event_type, reference_id, performed_by, remark, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, case_id, event_type, reference_id, performed_by, remark, created_at
        "#,
    )
    .bind(event.id)
    .bind(event.case_id)
    .bind(event.event_type.as_str())
    .bind(event.reference_id)
    .bind(&event.performed_by)
    .bind(&event.remark)
    .bind(event.created_at)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// The audit trail of a case in the order it was written.
pub async fn list_by_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<CaseEvent>, AppError> {
    sqlx::query_as::<_, CaseEvent>(
        r#"
        SELECT id, case_id, event_type, reference_id, performed_by, remark, created_at
        FROM case_events
        WHERE case_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
