use shared_types::{AppError, CaseFile};
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Insert an issued case file. `case_file_number` is unique; a duplicate
/// surfaces as `Conflict` and writes nothing. There is no
/// update or delete counterpart.
pub async fn insert(pool: &Pool<Postgres>, file: &CaseFile) -> Result<CaseFile, AppError> {
    sqlx::query_as::<_, CaseFile>(
        r#"
        INSERT INTO case_files
            (id, case_id, case_file_number, pages, path, integrity_hash,
             issued_at, issued_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, case_id, case_file_number, pages, path, integrity_hash,
                  issued_at, issued_by
        "#,
    )
    .bind(file.id)
    .bind(file.case_id)
    .bind(&file.case_file_number)
    .bind(Json(&file.pages))
    .bind(&file.pdf.path)
    .bind(&file.pdf.integrity_hash)
    .bind(file.issued_at)
    .bind(&file.issued_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Find a case file by its number.
pub async fn find_by_number(
    pool: &Pool<Postgres>,
    case_file_number: &str,
) -> Result<Option<CaseFile>, AppError> {
    sqlx::query_as::<_, CaseFile>(
        r#"
        SELECT id, case_id, case_file_number, pages, path, integrity_hash,
               issued_at, issued_by
        FROM case_files
        WHERE case_file_number = $1
        "#,
    )
    .bind(case_file_number)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// All case files issued for a case, oldest first.
pub async fn list_by_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<CaseFile>, AppError> {
    sqlx::query_as::<_, CaseFile>(
        r#"
        SELECT id, case_id, case_file_number, pages, path, integrity_hash,
               issued_at, issued_by
        FROM case_files
        WHERE case_id = $1
        ORDER BY issued_at
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
