use shared_types::{AppError, CaseStatus, ChapterCase};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Find a case by ID.
pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<ChapterCase>, AppError> {
    sqlx::query_as::<_, ChapterCase>(
        r#"
        SELECT id, branch_case_number, authority_case_number, section_codes,
               police_station_id, officer_id, status, display_locale,
               closing_remark, created_at, updated_at, closed_at
        FROM chapter_cases
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Move a case from `expected` to `next`. Returns None when the row is no
/// longer in `expected` (someone else moved it first) or does not exist.
pub async fn update_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    expected: CaseStatus,
    next: CaseStatus,
    remark: Option<&str>,
) -> Result<Option<ChapterCase>, AppError> {
    sqlx::query_as::<_, ChapterCase>(
        r#"
        UPDATE chapter_cases SET
            status         = $3,
            closing_remark = CASE WHEN $3 = 'CLOSED' THEN $4 ELSE closing_remark END,
            closed_at      = CASE WHEN $3 = 'CLOSED' THEN NOW() ELSE closed_at END,
            updated_at     = NOW()
        WHERE id = $1 AND status = $2
        RETURNING id, branch_case_number, authority_case_number, section_codes,
                  police_station_id, officer_id, status, display_locale,
                  closing_remark, created_at, updated_at, closed_at
        "#,
    )
    .bind(id)
    .bind(expected.as_str())
    .bind(next.as_str())
    .bind(remark)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
