//! Case Lifecycle Controller: the form and case status machines and the
//! rule that a closed case accepts no further changes.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use shared_types::{
    AppError, CaseAction, CaseEvent, CaseEventType, CaseFile, CaseStatus, ChapterCase, Form,
    FormAction, FormStatus, FormType,
};
use uuid::Uuid;

use crate::store::EntityStore;

pub const DEFAULT_CLOSING_REMARK: &str = "Closed via final Roznama entry";

pub struct LifecycleController<S> {
    store: Arc<S>,
}

impl<S> Clone for LifecycleController<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntityStore> LifecycleController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load a case, failing `NotFound` when absent.
    pub async fn load_case(&self, case_id: Uuid) -> Result<ChapterCase, AppError> {
        self.store
            .find_case(case_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Case {case_id} not found")))
    }

    /// Load a case that still accepts changes.
    pub async fn load_open_case(&self, case_id: Uuid) -> Result<ChapterCase, AppError> {
        let case = self.load_case(case_id).await?;
        case.status.ensure_open()?;
        Ok(case)
    }

    /// Create a DRAFT form. The proceedings log is owned by the Roznama
    /// manager and cannot be created here.
    pub async fn create_form(
        &self,
        case_id: Uuid,
        form_type: FormType,
        content: Value,
        created_by: &str,
    ) -> Result<Form, AppError> {
        if form_type == FormType::CaseRoznama {
            return Err(AppError::invalid_field(
                "form_type",
                "The Roznama is created by its first entry",
            ));
        }
        self.load_open_case(case_id).await?;

        let form = Form::new(case_id, form_type, FormStatus::Draft, content, created_by, Utc::now());
        let form = self.store.insert_form(&form).await?;
        self.record(
            case_id,
            CaseEventType::FormCreated,
            Some(form.id),
            created_by,
            Some(form_type.as_str().to_string()),
        )
        .await?;

        tracing::info!(case_id = %case_id, form_id = %form.id, form_type = form_type.as_str(), "Form created");
        Ok(form)
    }

    pub async fn submit_form(&self, form_id: Uuid, performed_by: &str) -> Result<Form, AppError> {
        self.transition_form(form_id, FormAction::Submit, performed_by)
            .await
    }

    pub async fn approve_form(&self, form_id: Uuid, approved_by: &str) -> Result<Form, AppError> {
        let approved_by = approved_by.trim();
        let action = FormAction::Approve {
            approved_by: approved_by.to_string(),
        };
        self.transition_form(form_id, action, approved_by).await
    }

    pub async fn reject_form(
        &self,
        form_id: Uuid,
        reason: &str,
        performed_by: &str,
    ) -> Result<Form, AppError> {
        let action = FormAction::Reject {
            reason: reason.trim().to_string(),
        };
        self.transition_form(form_id, action, performed_by).await
    }

    async fn transition_form(
        &self,
        form_id: Uuid,
        action: FormAction,
        performed_by: &str,
    ) -> Result<Form, AppError> {
        let mut form = self
            .store
            .find_form(form_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Form {form_id} not found")))?;
        self.load_open_case(form.case_id).await?;

        let previous = form.status;
        form.apply(&action, Utc::now())?;

        let form = self
            .store
            .update_form_status(&form, previous)
            .await?
            .ok_or_else(|| {
                AppError::invalid_state(format!(
                    "Form {form_id} is no longer {}; reload and retry",
                    previous.as_str()
                ))
            })?;

        let (event_type, remark) = match &action {
            FormAction::Submit => (CaseEventType::FormSubmitted, None),
            FormAction::Approve { .. } => (CaseEventType::FormApproved, None),
            FormAction::Reject { reason } => (CaseEventType::FormRejected, Some(reason.clone())),
        };
        self.record(form.case_id, event_type, Some(form.id), performed_by, remark)
            .await?;

        tracing::info!(
            form_id = %form.id,
            from = previous.as_str(),
            to = form.status.as_str(),
            "Form status changed"
        );
        Ok(form)
    }

    /// Move a case forward through its open stages. Closing goes through
    /// [`close_case`](Self::close_case) only.
    pub async fn advance_case(
        &self,
        case_id: Uuid,
        action: CaseAction,
        performed_by: &str,
    ) -> Result<ChapterCase, AppError> {
        if action == CaseAction::Close {
            return Err(AppError::invalid_state(
                "A case is closed only by issuing its case file",
            ));
        }
        let case = self.load_case(case_id).await?;
        let next = case.status.transition(action)?;
        let updated = self.swap_status(&case, next, None).await?;

        self.record(
            case_id,
            CaseEventType::CaseStatusChanged,
            None,
            performed_by,
            Some(format!("{} -> {}", case.status.as_str(), next.as_str())),
        )
        .await?;
        Ok(updated)
    }

    /// Close a case on the strength of an issued case file belonging to it.
    pub async fn close_case(
        &self,
        case_id: Uuid,
        case_file: &CaseFile,
        remark: Option<&str>,
        performed_by: &str,
    ) -> Result<ChapterCase, AppError> {
        if case_file.case_id != case_id {
            return Err(AppError::invalid_state(format!(
                "Case file {} was not issued for case {case_id}",
                case_file.case_file_number
            )));
        }
        let issued = self
            .store
            .find_case_file_by_number(&case_file.case_file_number)
            .await?
            .filter(|f| f.id == case_file.id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Case file {} has not been issued",
                    case_file.case_file_number
                ))
            })?;

        let case = self.load_case(case_id).await?;
        let next = case.status.transition(CaseAction::Close)?;
        let remark = remark
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CLOSING_REMARK);
        let closed = self.swap_status(&case, next, Some(remark)).await?;

        self.record(
            case_id,
            CaseEventType::CaseClosed,
            Some(issued.id),
            performed_by,
            Some(remark.to_string()),
        )
        .await?;

        tracing::info!(case_id = %case_id, case_file_number = %issued.case_file_number, "Case closed");
        Ok(closed)
    }

    async fn swap_status(
        &self,
        case: &ChapterCase,
        next: CaseStatus,
        remark: Option<&str>,
    ) -> Result<ChapterCase, AppError> {
        self.store
            .update_case_status(case.id, case.status, next, remark)
            .await?
            .ok_or_else(|| {
                AppError::invalid_state(format!(
                    "Case {} is no longer {}; reload and retry",
                    case.id,
                    case.status.as_str()
                ))
            })
    }

    async fn record(
        &self,
        case_id: Uuid,
        event_type: CaseEventType,
        reference_id: Option<Uuid>,
        performed_by: &str,
        remark: Option<String>,
    ) -> Result<CaseEvent, AppError> {
        let event = CaseEvent::new(case_id, event_type, reference_id, performed_by, remark);
        self.store.insert_case_event(&event).await
    }
}
