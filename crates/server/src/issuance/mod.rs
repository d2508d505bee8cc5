//! Case File Issuance Engine: assembles the ordered page set of a case,
//! renders it, hashes the output and persists the immutable case file.

pub mod numbering;
pub mod page_order;

pub use numbering::{derive_case_file_number, integrity_hash, path_safe};
pub use page_order::{ISSUANCE_PAGE_ORDER, ISSUANCE_PAGE_ORDER_VERSION};

use std::sync::Arc;

use chrono::Utc;
use shared_types::{
    AppError, CaseEvent, CaseEventType, CaseFile, ChapterCase, Form, FormStatus, FormType,
    IntegrityReport, PageSnapshot, PdfArtifact, PreviewDocument, RenderMode,
};
use uuid::Uuid;

use crate::render::DocumentRenderer;
use crate::resolver::PageResolver;
use crate::storage::{storage_error, BlobStore};
use crate::store::EntityStore;

/// Forms that feed a case file: every approved form plus the proceedings
/// log, which is included while DRAFT or APPROVED.
struct IssuableForms {
    roznama: Option<Form>,
    approved: Vec<Form>,
}

impl IssuableForms {
    fn is_empty(&self) -> bool {
        self.roznama.is_none() && self.approved.is_empty()
    }
}

pub struct IssuanceEngine<S, B, R> {
    store: Arc<S>,
    blobs: Arc<B>,
    renderer: Arc<R>,
    resolver: PageResolver<S, B>,
}

impl<S, B, R> Clone for IssuanceEngine<S, B, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            blobs: Arc::clone(&self.blobs),
            renderer: Arc::clone(&self.renderer),
            resolver: self.resolver.clone(),
        }
    }
}

impl<S: EntityStore, B: BlobStore, R: DocumentRenderer> IssuanceEngine<S, B, R> {
    pub fn new(store: Arc<S>, blobs: Arc<B>, renderer: Arc<R>, resolver: PageResolver<S, B>) -> Self {
        Self {
            store,
            blobs,
            renderer,
            resolver,
        }
    }

    /// Issue the case file `case_file_number` for a case.
    ///
    /// Nothing is rendered or written when the number is already taken. The
    /// store's unique constraint on the number is the final arbiter when two
    /// issuances race; the loser gets `Conflict` and leaves no trace.
    pub async fn issue_case_file(
        &self,
        case_id: Uuid,
        case_file_number: &str,
        issued_by: &str,
    ) -> Result<CaseFile, AppError> {
        let case_file_number = case_file_number.trim();
        if case_file_number.is_empty() {
            return Err(AppError::invalid_field(
                "case_file_number",
                "Case file number is required",
            ));
        }

        let case = self.load_case(case_id).await?;
        let forms = self.issuable_forms(case_id).await?;
        if forms.is_empty() {
            return Err(AppError::validation(
                format!(
                    "Nothing to issue for case {}: no approved forms and no Roznama",
                    case.branch_case_number
                ),
                Default::default(),
            ));
        }

        let pages = self.assemble_pages(&case, &forms).await?;

        if self
            .store
            .find_case_file_by_number(case_file_number)
            .await?
            .is_some()
        {
            tracing::warn!(case_file_number, "Case file number already issued");
            return Err(duplicate_number(case_file_number));
        }

        let output_path = format!(
            "{}/{}.pdf",
            self.resolver.settings().case_file_prefix,
            path_safe(case_file_number)
        );
        let rendered = self
            .renderer
            .render(&pages, &output_path, RenderMode::Issued)
            .await?;
        let hash = integrity_hash(&rendered.bytes);

        let file = CaseFile {
            id: Uuid::new_v4(),
            case_id,
            case_file_number: case_file_number.to_string(),
            pages,
            pdf: PdfArtifact {
                path: rendered.path,
                integrity_hash: hash,
            },
            issued_at: Utc::now(),
            issued_by: issued_by.to_string(),
        };

        let file = match self.store.insert_case_file(&file).await {
            Ok(saved) => saved,
            Err(e) if e.is_conflict() => {
                tracing::warn!(case_file_number, "Lost case file number race");
                return Err(duplicate_number(case_file_number));
            }
            Err(e) => {
                // The record never landed; free the number's storage key.
                if let Err(del) = self.blobs.delete(&file.pdf.path).await {
                    tracing::warn!(path = %file.pdf.path, error = %del, "Orphaned case file left in storage");
                }
                return Err(e);
            }
        };

        let event = CaseEvent::new(
            case_id,
            CaseEventType::CaseFileIssued,
            Some(file.id),
            issued_by,
            Some(format!("Case file {} issued", file.case_file_number)),
        );
        if let Err(e) = self.store.insert_case_event(&event).await {
            tracing::error!(
                case_file_number = %file.case_file_number,
                error = %e,
                "Case file issued but audit event was not recorded"
            );
            return Err(e);
        }

        tracing::info!(
            case_id = %case_id,
            case_file_number = %file.case_file_number,
            pages = file.pages.len(),
            hash = %file.pdf.integrity_hash,
            "Case file issued"
        );
        Ok(file)
    }

    /// Render a single form as a disposable preview. Draft forms are
    /// accepted here and nowhere else.
    pub async fn preview_form_pdf(&self, form_id: Uuid) -> Result<PreviewDocument, AppError> {
        let form = self
            .store
            .find_form(form_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Form {form_id} not found")))?;
        let case = self.load_case(form.case_id).await?;

        let pages = self.resolver.resolve_form(&case, &form).await?;
        let label = form.form_type.as_str().to_ascii_lowercase();
        self.render_preview(case.id, &label, pages).await
    }

    /// Render everything that would go into a case file right now, without
    /// hashing or persisting anything.
    pub async fn preview_full_case_pdf(&self, case_id: Uuid) -> Result<PreviewDocument, AppError> {
        let case = self.load_case(case_id).await?;
        let forms = self.issuable_forms(case_id).await?;
        if forms.is_empty() {
            return Err(AppError::validation(
                format!(
                    "Nothing to preview for case {}: no approved forms and no Roznama",
                    case.branch_case_number
                ),
                Default::default(),
            ));
        }

        let pages = self.assemble_pages(&case, &forms).await?;
        self.render_preview(case.id, "case-file", pages).await
    }

    /// Re-hash the stored bytes of an issued case file and compare with the
    /// digest recorded at issuance.
    pub async fn verify_case_file(
        &self,
        case_file_number: &str,
    ) -> Result<IntegrityReport, AppError> {
        let file = self
            .store
            .find_case_file_by_number(case_file_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Case file {case_file_number} not found"))
            })?;

        let bytes = self
            .blobs
            .get(&file.pdf.path)
            .await
            .map_err(|e| storage_error("Failed to read case file", e))?;
        let actual_hash = integrity_hash(&bytes);
        let intact = actual_hash == file.pdf.integrity_hash;
        if !intact {
            tracing::error!(
                case_file_number,
                path = %file.pdf.path,
                "Case file bytes do not match recorded hash"
            );
        }

        Ok(IntegrityReport {
            case_file_number: file.case_file_number,
            path: file.pdf.path,
            expected_hash: file.pdf.integrity_hash,
            actual_hash,
            intact,
        })
    }

    async fn load_case(&self, case_id: Uuid) -> Result<ChapterCase, AppError> {
        self.store
            .find_case(case_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Case {case_id} not found")))
    }

    async fn issuable_forms(&self, case_id: Uuid) -> Result<IssuableForms, AppError> {
        let approved = self
            .store
            .list_forms(case_id, Some(FormStatus::Approved))
            .await?
            .into_iter()
            .filter(|f| f.form_type != FormType::CaseRoznama)
            .collect();
        let roznama = self
            .store
            .find_roznama_form(case_id)
            .await?
            .filter(|f| matches!(f.status, FormStatus::Draft | FormStatus::Approved));
        Ok(IssuableForms { roznama, approved })
    }

    /// Walk [`ISSUANCE_PAGE_ORDER`] and resolve each present form. Any
    /// resolver failure aborts the whole assembly.
    async fn assemble_pages(
        &self,
        case: &ChapterCase,
        forms: &IssuableForms,
    ) -> Result<Vec<PageSnapshot>, AppError> {
        let mut pages = Vec::new();
        for form_type in ISSUANCE_PAGE_ORDER {
            if form_type == FormType::CaseRoznama {
                if let Some(roznama) = forms.roznama.as_ref() {
                    pages.extend(self.resolver.resolve_form(case, roznama).await?);
                }
                continue;
            }
            for form in forms.approved.iter().filter(|f| f.form_type == form_type) {
                pages.extend(self.resolver.resolve_form(case, form).await?);
            }
        }
        Ok(pages)
    }

    async fn render_preview(
        &self,
        case_id: Uuid,
        label: &str,
        pages: Vec<PageSnapshot>,
    ) -> Result<PreviewDocument, AppError> {
        let output_path = format!(
            "{}/{}/{}-{}.pdf",
            self.resolver.settings().preview_prefix,
            case_id,
            label,
            Utc::now().timestamp_millis()
        );
        let rendered = self
            .renderer
            .render(&pages, &output_path, RenderMode::Preview)
            .await?;
        tracing::info!(case_id = %case_id, path = %rendered.path, pages = pages.len(), "Preview rendered");
        Ok(PreviewDocument {
            path: rendered.path,
            pages,
        })
    }
}

fn duplicate_number(case_file_number: &str) -> AppError {
    AppError::conflict(format!("Case file {case_file_number} already exists"))
}
