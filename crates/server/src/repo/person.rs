use shared_types::{AppError, Person};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// All persons attached to a case, oldest first.
pub async fn list_by_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<Person>, AppError> {
    sqlx::query_as::<_, Person>(
        r#"
        SELECT id, case_id, role, name, age, gender, mobile, address,
               signature_path, photo_path, document_path, created_at, updated_at
        FROM persons
        WHERE case_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Persons of `case_id` whose id is in `ids`. Ids belonging to other cases
/// or deleted persons are silently absent from the result.
pub async fn find_many(
    pool: &Pool<Postgres>,
    case_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Person>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Person>(
        r#"
        SELECT id, case_id, role, name, age, gender, mobile, address,
               signature_path, photo_path, document_path, created_at, updated_at
        FROM persons
        WHERE case_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(case_id)
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
