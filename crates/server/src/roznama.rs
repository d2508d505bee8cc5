//! Roznama Log Manager: the single append-only proceedings log of a case,
//! and the optional issue-then-close saga triggered by a final entry.

use std::sync::Arc;

use chrono::Utc;
use shared_types::{
    AddEntryOutcome, AddEntryRequest, AppError, CaseEvent, CaseEventType, ChapterCase,
    ClosureOutcome, CloseRequest, Form, FormStatus, FormType, RoznamaContent, RoznamaEntry,
    RoznamaHeader,
};
use uuid::Uuid;

use crate::error_convert::ValidateRequest;
use crate::issuance::{derive_case_file_number, IssuanceEngine};
use crate::lifecycle::LifecycleController;
use crate::render::DocumentRenderer;
use crate::storage::BlobStore;
use crate::store::EntityStore;

pub struct RoznamaLog<S, B, R> {
    store: Arc<S>,
    lifecycle: LifecycleController<S>,
    issuance: IssuanceEngine<S, B, R>,
}

impl<S, B, R> Clone for RoznamaLog<S, B, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lifecycle: self.lifecycle.clone(),
            issuance: self.issuance.clone(),
        }
    }
}

impl<S: EntityStore, B: BlobStore, R: DocumentRenderer> RoznamaLog<S, B, R> {
    pub fn new(
        store: Arc<S>,
        lifecycle: LifecycleController<S>,
        issuance: IssuanceEngine<S, B, R>,
    ) -> Self {
        Self {
            store,
            lifecycle,
            issuance,
        }
    }

    /// Append a proceedings entry, creating the log on the first entry.
    ///
    /// With `close` set, the case file is issued and then the case closed.
    /// The entry is kept whatever happens to the closure; the outcome says
    /// which phase, if any, failed.
    pub async fn add_entry(
        &self,
        case_id: Uuid,
        request: AddEntryRequest,
        performed_by: &str,
    ) -> Result<AddEntryOutcome, AppError> {
        let case = self.lifecycle.load_open_case(case_id).await?;

        let entry = request.entry.normalized();
        entry.validate_request()?;

        let (roznama, created_roznama) = self
            .roznama_for_append(&case, request.header.as_ref(), performed_by)
            .await?;

        let total_entries = self.store.append_roznama_entry(roznama.id, &entry).await?;
        let event = CaseEvent::new(
            case_id,
            CaseEventType::RoznamaEntryAdded,
            Some(roznama.id),
            performed_by,
            Some(format!("Hearing of {}", entry.date)),
        );
        self.store.insert_case_event(&event).await?;

        tracing::info!(
            case_id = %case_id,
            form_id = %roznama.id,
            created_roznama,
            total_entries,
            "Roznama entry added"
        );

        let closure = match request.close {
            Some(close) => self.close_after_entry(&case, close, performed_by).await,
            None => ClosureOutcome::NotRequested,
        };
        let case_closed = matches!(closure, ClosureOutcome::Closed { .. });

        Ok(AddEntryOutcome {
            created_roznama,
            total_entries,
            case_closed,
            closure,
        })
    }

    /// Retry only the status change of a closure whose case file was
    /// already issued. Never issues anything.
    pub async fn retry_closure(
        &self,
        case_id: Uuid,
        case_file_number: &str,
        remark: Option<&str>,
        performed_by: &str,
    ) -> Result<ClosureOutcome, AppError> {
        let case_file = self
            .store
            .find_case_file_by_number(case_file_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Case file {case_file_number} not found"))
            })?;

        let case = self.lifecycle.load_case(case_id).await?;
        if case.status.is_closed() {
            return Ok(ClosureOutcome::Closed { case_file });
        }

        match self
            .lifecycle
            .close_case(case_id, &case_file, remark, performed_by)
            .await
        {
            Ok(_) => Ok(ClosureOutcome::Closed { case_file }),
            Err(error) => {
                tracing::error!(case_id = %case_id, case_file_number, error = %error, "Closure retry failed");
                Ok(ClosureOutcome::PartialSuccess { case_file, error })
            }
        }
    }

    /// The case's log, creating it from `header` when this is the first
    /// entry. A concurrent first entry that wins the create is reused, so a
    /// case never ends up with two logs.
    async fn roznama_for_append(
        &self,
        case: &ChapterCase,
        header: Option<&RoznamaHeader>,
        performed_by: &str,
    ) -> Result<(Form, bool), AppError> {
        if let Some(existing) = self.store.find_roznama_form(case.id).await? {
            return Ok((existing, false));
        }

        let header = header.ok_or_else(|| {
            AppError::invalid_field("header", "Roznama header required for first entry")
        })?;
        header.validate_request()?;

        let form = Form::new(
            case.id,
            FormType::CaseRoznama,
            FormStatus::Approved,
            RoznamaContent::seeded(header.clone()).to_value(),
            performed_by,
            Utc::now(),
        );

        match self.store.insert_form(&form).await {
            Ok(created) => {
                let event = CaseEvent::new(
                    case.id,
                    CaseEventType::FormCreated,
                    Some(created.id),
                    performed_by,
                    Some(FormType::CaseRoznama.as_str().to_string()),
                );
                self.store.insert_case_event(&event).await?;
                Ok((created, true))
            }
            Err(e) if e.is_conflict() => {
                tracing::info!(case_id = %case.id, "Concurrent first Roznama entry; appending to the winner");
                let winner = self.store.find_roznama_form(case.id).await?.ok_or(e)?;
                Ok((winner, false))
            }
            Err(e) => Err(e),
        }
    }

    async fn close_after_entry(
        &self,
        case: &ChapterCase,
        close: CloseRequest,
        performed_by: &str,
    ) -> ClosureOutcome {
        let case_file_number = close
            .case_file_number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| derive_case_file_number(case, Utc::now()));

        let case_file = match self
            .issuance
            .issue_case_file(case.id, &case_file_number, performed_by)
            .await
        {
            Ok(file) => file,
            Err(error) => {
                tracing::error!(case_id = %case.id, case_file_number, error = %error, "Closure aborted: issuance failed");
                return ClosureOutcome::IssuanceFailed { error };
            }
        };

        match self
            .lifecycle
            .close_case(case.id, &case_file, close.remark.as_deref(), performed_by)
            .await
        {
            Ok(_) => ClosureOutcome::Closed { case_file },
            Err(error) => {
                tracing::error!(
                    case_id = %case.id,
                    case_file_number = %case_file.case_file_number,
                    error = %error,
                    "Case file issued but case was not closed"
                );
                ClosureOutcome::PartialSuccess { case_file, error }
            }
        }
    }
}

/// Entries of a log in append order.
pub fn entries_of(form: &Form) -> Result<Vec<RoznamaEntry>, AppError> {
    Ok(RoznamaContent::from_value(&form.content)?.entries)
}
