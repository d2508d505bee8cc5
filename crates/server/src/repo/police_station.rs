use shared_types::{AppError, PoliceStation};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Find a police station by ID.
pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<PoliceStation>, AppError> {
    sqlx::query_as::<_, PoliceStation>(
        "SELECT id, name, district FROM police_stations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
