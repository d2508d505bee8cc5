//! The entity store seam. The pipeline is written against [`EntityStore`];
//! [`PgEntityStore`] backs it with the `repo` modules.

use shared_types::{
    AppError, CaseEvent, CaseFile, CaseStatus, ChapterCase, Form, FormStatus, Person,
    PoliceStation, RoznamaEntry,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::repo;

/// Persistence operations the chapter-case pipeline depends on.
///
/// Implementations must enforce two uniqueness rules at the storage layer
/// and report violations as `Conflict`: one `CASE_ROZNAMA` form per case,
/// and one case file per `case_file_number`.
#[allow(async_fn_in_trait)]
pub trait EntityStore: Send + Sync {
    async fn find_case(&self, id: Uuid) -> Result<Option<ChapterCase>, AppError>;

    /// Compare-and-set on the case status. None when the case is missing or
    /// is no longer in `expected`.
    async fn update_case_status(
        &self,
        id: Uuid,
        expected: CaseStatus,
        next: CaseStatus,
        remark: Option<&str>,
    ) -> Result<Option<ChapterCase>, AppError>;

    async fn find_police_station(&self, id: Uuid) -> Result<Option<PoliceStation>, AppError>;

    async fn list_persons(&self, case_id: Uuid) -> Result<Vec<Person>, AppError>;

    /// Persons of `case_id` among `ids`; unknown ids are simply absent.
    async fn find_persons(&self, case_id: Uuid, ids: &[Uuid]) -> Result<Vec<Person>, AppError>;

    async fn find_form(&self, id: Uuid) -> Result<Option<Form>, AppError>;

    /// Forms of a case in creation order.
    async fn list_forms(
        &self,
        case_id: Uuid,
        status: Option<FormStatus>,
    ) -> Result<Vec<Form>, AppError>;

    async fn find_roznama_form(&self, case_id: Uuid) -> Result<Option<Form>, AppError>;

    async fn insert_form(&self, form: &Form) -> Result<Form, AppError>;

    /// Persist a status change, guarded on `expected`. None when the form
    /// moved in between.
    async fn update_form_status(
        &self,
        form: &Form,
        expected: FormStatus,
    ) -> Result<Option<Form>, AppError>;

    /// Append to the end of a Roznama's entries; returns the new count.
    async fn append_roznama_entry(
        &self,
        form_id: Uuid,
        entry: &RoznamaEntry,
    ) -> Result<usize, AppError>;

    async fn find_case_file_by_number(
        &self,
        case_file_number: &str,
    ) -> Result<Option<CaseFile>, AppError>;

    async fn list_case_files(&self, case_id: Uuid) -> Result<Vec<CaseFile>, AppError>;

    async fn insert_case_file(&self, file: &CaseFile) -> Result<CaseFile, AppError>;

    async fn insert_case_event(&self, event: &CaseEvent) -> Result<CaseEvent, AppError>;

    async fn list_case_events(&self, case_id: Uuid) -> Result<Vec<CaseEvent>, AppError>;
}

/// Postgres-backed entity store.
#[derive(Clone)]
pub struct PgEntityStore {
    pool: Pool<Postgres>,
}

impl PgEntityStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

impl EntityStore for PgEntityStore {
    async fn find_case(&self, id: Uuid) -> Result<Option<ChapterCase>, AppError> {
        repo::case::find_by_id(&self.pool, id).await
    }

    async fn update_case_status(
        &self,
        id: Uuid,
        expected: CaseStatus,
        next: CaseStatus,
        remark: Option<&str>,
    ) -> Result<Option<ChapterCase>, AppError> {
        repo::case::update_status(&self.pool, id, expected, next, remark).await
    }

    async fn find_police_station(&self, id: Uuid) -> Result<Option<PoliceStation>, AppError> {
        repo::police_station::find_by_id(&self.pool, id).await
    }

    async fn list_persons(&self, case_id: Uuid) -> Result<Vec<Person>, AppError> {
        repo::person::list_by_case(&self.pool, case_id).await
    }

    async fn find_persons(&self, case_id: Uuid, ids: &[Uuid]) -> Result<Vec<Person>, AppError> {
        repo::person::find_many(&self.pool, case_id, ids).await
    }

    async fn find_form(&self, id: Uuid) -> Result<Option<Form>, AppError> {
        repo::form::find_by_id(&self.pool, id).await
    }

    async fn list_forms(
        &self,
        case_id: Uuid,
        status: Option<FormStatus>,
    ) -> Result<Vec<Form>, AppError> {
        repo::form::list_by_case(&self.pool, case_id, status).await
    }

    async fn find_roznama_form(&self, case_id: Uuid) -> Result<Option<Form>, AppError> {
        repo::form::find_roznama(&self.pool, case_id).await
    }

    async fn insert_form(&self, form: &Form) -> Result<Form, AppError> {
        repo::form::insert(&self.pool, form).await
    }

    async fn update_form_status(
        &self,
        form: &Form,
        expected: FormStatus,
    ) -> Result<Option<Form>, AppError> {
        repo::form::update_status(&self.pool, form, expected).await
    }

    async fn append_roznama_entry(
        &self,
        form_id: Uuid,
        entry: &RoznamaEntry,
    ) -> Result<usize, AppError> {
        repo::form::append_roznama_entry(&self.pool, form_id, entry).await
    }

    async fn find_case_file_by_number(
        &self,
        case_file_number: &str,
    ) -> Result<Option<CaseFile>, AppError> {
        repo::case_file::find_by_number(&self.pool, case_file_number).await
    }

    async fn list_case_files(&self, case_id: Uuid) -> Result<Vec<CaseFile>, AppError> {
        repo::case_file::list_by_case(&self.pool, case_id).await
    }

    async fn insert_case_file(&self, file: &CaseFile) -> Result<CaseFile, AppError> {
        repo::case_file::insert(&self.pool, file).await
    }

    async fn insert_case_event(&self, event: &CaseEvent) -> Result<CaseEvent, AppError> {
        repo::case_event::insert(&self.pool, event).await
    }

    async fn list_case_events(&self, case_id: Uuid) -> Result<Vec<CaseEvent>, AppError> {
        repo::case_event::list_by_case(&self.pool, case_id).await
    }
}
