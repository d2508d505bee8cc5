//! In-memory collaborators and fixtures for pipeline tests. The store
//! enforces the same uniqueness rules as the Postgres schema.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use server::pipeline::Pipeline;
use server::render::{DocumentRenderer, RenderedDocument};
use server::storage::{BlobStore, PutOutcome};
use server::store::{EntityStore, PgEntityStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use shared_types::{
    AppError, CaseEvent, CaseEventType, CaseFile, CaseStatus, ChapterCase, Form, FormStatus,
    FormType, IssuanceSettings, PageSnapshot, Person, PersonRole, PoliceStation, RenderMode,
    RoznamaContent, RoznamaEntry, RoznamaHeader,
};
use uuid::Uuid;

// ── Entity store ────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    stations: Vec<PoliceStation>,
    cases: Vec<ChapterCase>,
    persons: Vec<Person>,
    forms: Vec<Form>,
    case_files: Vec<CaseFile>,
    events: Vec<CaseEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// When set, every case status update fails with a database error.
    pub fail_case_status_updates: AtomicBool,
    /// When set, the next Roznama lookup misses, as if a concurrent first
    /// entry had not committed yet.
    pub hide_roznama_once: AtomicBool,
}

impl MemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_station(&self, station: PoliceStation) {
        self.with(|s| s.stations.push(station));
    }

    pub fn add_case(&self, case: ChapterCase) {
        self.with(|s| s.cases.push(case));
    }

    pub fn add_person(&self, person: Person) {
        self.with(|s| s.persons.push(person));
    }

    pub fn add_form(&self, form: Form) {
        self.with(|s| s.forms.push(form));
    }

    pub fn case(&self, id: Uuid) -> ChapterCase {
        self.with(|s| s.cases.iter().find(|c| c.id == id).cloned().unwrap())
    }

    pub fn roznama_forms(&self, case_id: Uuid) -> Vec<Form> {
        self.with(|s| {
            s.forms
                .iter()
                .filter(|f| f.case_id == case_id && f.form_type == FormType::CaseRoznama)
                .cloned()
                .collect()
        })
    }

    pub fn case_files(&self) -> Vec<CaseFile> {
        self.with(|s| s.case_files.clone())
    }

    pub fn events_of(&self, case_id: Uuid, event_type: CaseEventType) -> Vec<CaseEvent> {
        self.with(|s| {
            s.events
                .iter()
                .filter(|e| e.case_id == case_id && e.event_type == event_type)
                .cloned()
                .collect()
        })
    }
}

impl EntityStore for MemoryStore {
    async fn find_case(&self, id: Uuid) -> Result<Option<ChapterCase>, AppError> {
        Ok(self.with(|s| s.cases.iter().find(|c| c.id == id).cloned()))
    }

    async fn update_case_status(
        &self,
        id: Uuid,
        expected: CaseStatus,
        next: CaseStatus,
        remark: Option<&str>,
    ) -> Result<Option<ChapterCase>, AppError> {
        if self.fail_case_status_updates.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset during status update"));
        }
        Ok(self.with(|s| {
            let case = s
                .cases
                .iter_mut()
                .find(|c| c.id == id && c.status == expected)?;
            let now = Utc::now();
            case.status = next;
            case.updated_at = now;
            if next == CaseStatus::Closed {
                case.closing_remark = remark.map(str::to_string);
                case.closed_at = Some(now);
            }
            Some(case.clone())
        }))
    }

    async fn find_police_station(&self, id: Uuid) -> Result<Option<PoliceStation>, AppError> {
        Ok(self.with(|s| s.stations.iter().find(|p| p.id == id).cloned()))
    }

    async fn list_persons(&self, case_id: Uuid) -> Result<Vec<Person>, AppError> {
        Ok(self.with(|s| {
            s.persons
                .iter()
                .filter(|p| p.case_id == case_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_persons(&self, case_id: Uuid, ids: &[Uuid]) -> Result<Vec<Person>, AppError> {
        Ok(self.with(|s| {
            s.persons
                .iter()
                .filter(|p| p.case_id == case_id && ids.contains(&p.id))
                .cloned()
                .collect()
        }))
    }

    async fn find_form(&self, id: Uuid) -> Result<Option<Form>, AppError> {
        Ok(self.with(|s| s.forms.iter().find(|f| f.id == id).cloned()))
    }

    async fn list_forms(
        &self,
        case_id: Uuid,
        status: Option<FormStatus>,
    ) -> Result<Vec<Form>, AppError> {
        Ok(self.with(|s| {
            s.forms
                .iter()
                .filter(|f| f.case_id == case_id && status.is_none_or(|st| f.status == st))
                .cloned()
                .collect()
        }))
    }

    async fn find_roznama_form(&self, case_id: Uuid) -> Result<Option<Form>, AppError> {
        if self.hide_roznama_once.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.roznama_forms(case_id).into_iter().next())
    }

    async fn insert_form(&self, form: &Form) -> Result<Form, AppError> {
        self.with(|s| {
            let duplicate_roznama = form.form_type == FormType::CaseRoznama
                && s.forms
                    .iter()
                    .any(|f| f.case_id == form.case_id && f.form_type == FormType::CaseRoznama);
            if duplicate_roznama {
                return Err(AppError::conflict("A Roznama already exists for this case"));
            }
            s.forms.push(form.clone());
            Ok(form.clone())
        })
    }

    async fn update_form_status(
        &self,
        form: &Form,
        expected: FormStatus,
    ) -> Result<Option<Form>, AppError> {
        Ok(self.with(|s| {
            let slot = s
                .forms
                .iter_mut()
                .find(|f| f.id == form.id && f.status == expected)?;
            *slot = form.clone();
            Some(form.clone())
        }))
    }

    async fn append_roznama_entry(
        &self,
        form_id: Uuid,
        entry: &RoznamaEntry,
    ) -> Result<usize, AppError> {
        self.with(|s| {
            let form = s
                .forms
                .iter_mut()
                .find(|f| f.id == form_id && f.form_type == FormType::CaseRoznama)
                .ok_or_else(|| AppError::not_found("Roznama not found"))?;
            let mut content = RoznamaContent::from_value(&form.content)?;
            content.entries.push(entry.clone());
            form.content = content.to_value();
            form.updated_at = Utc::now();
            Ok(content.entries.len())
        })
    }

    async fn find_case_file_by_number(
        &self,
        case_file_number: &str,
    ) -> Result<Option<CaseFile>, AppError> {
        Ok(self.with(|s| {
            s.case_files
                .iter()
                .find(|f| f.case_file_number == case_file_number)
                .cloned()
        }))
    }

    async fn list_case_files(&self, case_id: Uuid) -> Result<Vec<CaseFile>, AppError> {
        Ok(self.with(|s| {
            s.case_files
                .iter()
                .filter(|f| f.case_id == case_id)
                .cloned()
                .collect()
        }))
    }

    async fn insert_case_file(&self, file: &CaseFile) -> Result<CaseFile, AppError> {
        self.with(|s| {
            if s
                .case_files
                .iter()
                .any(|f| f.case_file_number == file.case_file_number)
            {
                return Err(AppError::conflict("Case file number already exists"));
            }
            s.case_files.push(file.clone());
            Ok(file.clone())
        })
    }

    async fn insert_case_event(&self, event: &CaseEvent) -> Result<CaseEvent, AppError> {
        self.with(|s| s.events.push(event.clone()));
        Ok(event.clone())
    }

    async fn list_case_events(&self, case_id: Uuid) -> Result<Vec<CaseEvent>, AppError> {
        Ok(self.with(|s| {
            s.events
                .iter()
                .filter(|e| e.case_id == case_id)
                .cloned()
                .collect()
        }))
    }
}

// ── Blob store ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    unsignable: Mutex<HashSet<String>>,
}

impl MemoryBlobStore {
    /// Make signing `key` fail.
    pub fn refuse_to_sign(&self, key: &str) {
        self.unsignable.lock().unwrap().insert(key.to_string());
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn overwrite(&self, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_vec());
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, _content_type: &str, body: Vec<u8>) -> Result<String, String> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(key.to_string())
    }

    async fn put_new(
        &self,
        key: &str,
        _content_type: &str,
        body: Vec<u8>,
    ) -> Result<PutOutcome, String> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            return Ok(PutOutcome::AlreadyExists);
        }
        objects.insert(key.to_string(), body);
        Ok(PutOutcome::Written)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, String> {
        self.object(key).ok_or_else(|| format!("no object at {key}"))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, String> {
        if self.unsignable.lock().unwrap().contains(key) {
            return Err(format!("access denied for {key}"));
        }
        Ok(format!("https://blobs.test/{key}?expires={}", ttl.as_secs()))
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ── Renderer ────────────────────────────────────────────────────────

/// Writes a small deterministic document instead of compiling Typst, and
/// remembers every call.
pub struct RecordingRenderer {
    blobs: Arc<MemoryBlobStore>,
    calls: Mutex<Vec<(String, RenderMode, Vec<PageSnapshot>)>>,
    pub fail: AtomicBool,
    pub issued_writes: AtomicUsize,
}

impl RecordingRenderer {
    pub fn new(blobs: Arc<MemoryBlobStore>) -> Self {
        Self {
            blobs,
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            issued_writes: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<(String, RenderMode, Vec<PageSnapshot>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DocumentRenderer for RecordingRenderer {
    async fn render(
        &self,
        pages: &[PageSnapshot],
        output_path: &str,
        mode: RenderMode,
    ) -> Result<RenderedDocument, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((output_path.to_string(), mode, pages.to_vec()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::render("Typst compilation failed: unknown variable"));
        }

        let body = serde_json::to_vec(pages).unwrap();
        let mut bytes = format!("%PDF-fake {}\n", mode.as_str()).into_bytes();
        bytes.extend_from_slice(&body);

        match mode {
            RenderMode::Issued => {
                match self
                    .blobs
                    .put_new(output_path, "application/pdf", bytes.clone())
                    .await
                    .unwrap()
                {
                    PutOutcome::Written => {
                        self.issued_writes.fetch_add(1, Ordering::SeqCst);
                    }
                    PutOutcome::AlreadyExists => {
                        return Err(AppError::conflict(format!(
                            "A document already exists at {output_path}"
                        )))
                    }
                }
            }
            _ => {
                self.blobs
                    .put(output_path, "application/pdf", bytes.clone())
                    .await
                    .unwrap();
            }
        }

        Ok(RenderedDocument {
            path: output_path.to_string(),
            bytes,
        })
    }
}

// ── Pipeline wiring ─────────────────────────────────────────────────

pub type TestPipeline = Pipeline<MemoryStore, MemoryBlobStore, RecordingRenderer>;

pub fn test_pipeline() -> TestPipeline {
    let blobs = Arc::new(MemoryBlobStore::default());
    let renderer = Arc::new(RecordingRenderer::new(Arc::clone(&blobs)));
    Pipeline::assemble(
        Arc::new(MemoryStore::default()),
        blobs,
        renderer,
        IssuanceSettings::default(),
    )
}

// ── Postgres ────────────────────────────────────────────────────────

/// Serializes tests that truncate and seed the shared database.
static PG_TEST_MUTEX: std::sync::LazyLock<tokio::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| tokio::sync::Mutex::new(()));

/// A `PgEntityStore` over a freshly migrated and truncated database, plus
/// the pool for seeding rows the store has no insert for. The guard must be
/// held for the whole test.
///
/// Returns None when neither `TEST_DATABASE_URL` nor `DATABASE_URL` is set,
/// so the in-memory suite still runs without Postgres.
pub async fn test_pg_store() -> Option<(
    PgEntityStore,
    Pool<Postgres>,
    tokio::sync::MutexGuard<'static, ()>,
)> {
    let guard = PG_TEST_MUTEX.lock().await;

    let _ = dotenvy::dotenv();
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping Postgres store test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query(
        "TRUNCATE case_events, case_files, forms, persons, chapter_cases, police_stations CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to truncate");

    Some((PgEntityStore::new(pool.clone()), pool, guard))
}

/// Insert a REGISTERED case row directly.
pub async fn seed_pg_case(pool: &Pool<Postgres>, branch: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO chapter_cases (id, branch_case_number, authority_case_number, section_codes, officer_id, status)
         VALUES ($1, $2, $3, $4, $5, 'REGISTERED')",
    )
    .bind(id)
    .bind(branch)
    .bind("SDM/45")
    .bind(vec!["107".to_string()])
    .bind(Uuid::new_v4())
    .execute(pool)
    .await
    .expect("Failed to seed case");
    id
}

// ── Fixtures ────────────────────────────────────────────────────────

pub const OFFICER: &str = "officer-a";
pub const ADMIN: &str = "admin-sdm";

pub fn create_test_station(p: &TestPipeline, name: &str) -> Uuid {
    let station = PoliceStation {
        id: Uuid::new_v4(),
        name: name.to_string(),
        district: Some("Pune".to_string()),
    };
    let id = station.id;
    p.store.add_station(station);
    id
}

pub fn create_test_case(p: &TestPipeline, branch: &str, station_id: Option<Uuid>) -> Uuid {
    let now = Utc::now();
    let case = ChapterCase {
        id: Uuid::new_v4(),
        branch_case_number: branch.to_string(),
        authority_case_number: Some("SDM/45".to_string()),
        section_codes: vec!["107".to_string(), "116(3)".to_string()],
        police_station_id: station_id,
        officer_id: Uuid::new_v4(),
        status: CaseStatus::Registered,
        display_locale: None,
        closing_remark: None,
        created_at: now,
        updated_at: now,
        closed_at: None,
    };
    let id = case.id;
    p.store.add_case(case);
    id
}

pub fn create_test_person(
    p: &TestPipeline,
    case_id: Uuid,
    role: PersonRole,
    name: &str,
    signature_path: Option<&str>,
) -> Uuid {
    let now = Utc::now();
    let person = Person {
        id: Uuid::new_v4(),
        case_id,
        role,
        name: name.to_string(),
        age: Some(40),
        gender: None,
        mobile: None,
        address: Some("Ward 4".to_string()),
        signature_path: signature_path.map(str::to_string),
        photo_path: None,
        document_path: None,
        created_at: now,
        updated_at: now,
    };
    let id = person.id;
    p.store.add_person(person);
    id
}

/// A form inserted directly with the given status, bypassing the lifecycle.
pub fn create_test_form(
    p: &TestPipeline,
    case_id: Uuid,
    form_type: FormType,
    status: FormStatus,
    content: Value,
) -> Uuid {
    let form = Form::new(case_id, form_type, status, content, OFFICER, Utc::now());
    let id = form.id;
    p.store.add_form(form);
    id
}

pub fn test_header() -> RoznamaHeader {
    RoznamaHeader {
        branch_case_number: "BR-12/2024".to_string(),
        authority_case_number: Some("SDM/45".to_string()),
        police_station: "Kotwali".to_string(),
        section_codes: vec!["107".to_string()],
        applicant_names: vec!["State".to_string()],
        defendant_names: vec!["Ravi".to_string()],
    }
}

pub fn test_entry(date: &str, proceedings: &str) -> RoznamaEntry {
    RoznamaEntry {
        date: date.to_string(),
        proceedings: proceedings.to_string(),
        next_date: None,
        present_accused_person_ids: Vec::new(),
    }
}

pub fn page_types(pages: &[PageSnapshot]) -> Vec<&'static str> {
    pages.iter().map(|p| p.page_type.as_str()).collect()
}
