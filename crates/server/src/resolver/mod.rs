//! Page Data Resolver: turns a form plus its case into self-contained,
//! rendering-ready page snapshots. One resolver per form shape.

pub mod final_order;
pub mod person_form;
pub mod roznama;
pub mod signature;

use std::sync::Arc;

use serde::Serialize;
use shared_types::{
    AppError, CaseHeaderData, ChapterCase, DisplayLocale, Form, FormScope, FormType,
    IssuanceSettings, PageSnapshot, Person, PersonRole, PoliceStation, UNKNOWN_STATION,
};

use crate::storage::BlobStore;
use crate::store::EntityStore;

/// Resolves forms into page snapshots, reading persons and stations from
/// the entity store and presentable file URLs from the blob store.
pub struct PageResolver<S, B> {
    store: Arc<S>,
    blobs: Arc<B>,
    settings: IssuanceSettings,
}

impl<S, B> Clone for PageResolver<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            blobs: Arc::clone(&self.blobs),
            settings: self.settings.clone(),
        }
    }
}

impl<S: EntityStore, B: BlobStore> PageResolver<S, B> {
    pub fn new(store: Arc<S>, blobs: Arc<B>, settings: IssuanceSettings) -> Self {
        Self {
            store,
            blobs,
            settings,
        }
    }

    pub fn settings(&self) -> &IssuanceSettings {
        &self.settings
    }

    /// Resolve one form into its pages: one per matched person for
    /// person-scoped forms, exactly one for case-scoped forms.
    pub async fn resolve_form(
        &self,
        case: &ChapterCase,
        form: &Form,
    ) -> Result<Vec<PageSnapshot>, AppError> {
        if form.case_id != case.id {
            return Err(AppError::invalid_state(format!(
                "Form {} does not belong to case {}",
                form.id, case.id
            )));
        }

        let pages = match (form.form_type, form.form_type.scope()) {
            (FormType::CaseRoznama, _) => {
                let data = roznama::resolve(self, case, form).await?;
                vec![snapshot(form.form_type, &data)?]
            }
            (_, FormScope::PerPerson { role }) => {
                let pages = person_form::resolve(self, case, form, role).await?;
                pages
                    .iter()
                    .map(|data| snapshot(form.form_type, data))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (_, FormScope::PerCase) => {
                let data = final_order::resolve(self, case, form).await?;
                vec![snapshot(form.form_type, &data)?]
            }
        };

        tracing::debug!(
            case_id = %case.id,
            form_id = %form.id,
            form_type = form.form_type.as_str(),
            pages = pages.len(),
            "Resolved form pages"
        );
        Ok(pages)
    }

    fn locale(&self, case: &ChapterCase) -> DisplayLocale {
        DisplayLocale::resolve(case.display_locale.as_deref(), &self.settings.default_locale)
    }

    async fn station(&self, case: &ChapterCase) -> Result<Option<PoliceStation>, AppError> {
        match case.police_station_id {
            Some(id) => self.store.find_police_station(id).await,
            None => Ok(None),
        }
    }

    async fn signed(&self, path: Option<&str>) -> Option<String> {
        signature::presentable_url(self.blobs.as_ref(), path, self.settings.signed_url_ttl_secs)
            .await
    }
}

/// Freeze resolved page data into an owned snapshot.
fn snapshot<T: Serialize>(form_type: FormType, data: &T) -> Result<PageSnapshot, AppError> {
    let data = serde_json::to_value(data)
        .map_err(|e| AppError::internal(format!("Failed to snapshot page data: {e}")))?;
    Ok(PageSnapshot {
        page_type: form_type,
        template_version: form_type.template_version().to_string(),
        data,
    })
}

fn case_header(case: &ChapterCase, station_name: &str) -> CaseHeaderData {
    CaseHeaderData {
        branch_case_number: case.branch_case_number.clone(),
        authority_case_number: case.authority_case_number.clone(),
        police_station: station_name.to_string(),
        section_codes: case.section_codes.clone(),
    }
}

fn names_with_role(persons: &[Person], role: PersonRole) -> Vec<String> {
    persons
        .iter()
        .filter(|p| p.role == role)
        .map(|p| p.name.clone())
        .collect()
}

fn station_display(station: Option<&PoliceStation>) -> &str {
    station.map(|s| s.name.as_str()).unwrap_or(UNKNOWN_STATION)
}

/// Plural noun used in "no valid ... found" messages.
fn role_noun(role: Option<PersonRole>) -> &'static str {
    match role {
        Some(PersonRole::Defendant) => "defendants",
        Some(PersonRole::Applicant) => "applicants",
        Some(PersonRole::Witness) => "witnesses",
        None => "persons",
    }
}
