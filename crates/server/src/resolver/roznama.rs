use std::collections::HashMap;

use shared_types::{
    AppError, ChapterCase, Form, PersonRole, PresentAccused, RoznamaContent, RoznamaPageData,
    RoznamaPageEntry,
};
use uuid::Uuid;

use super::{case_header, names_with_role, PageResolver};
use crate::storage::BlobStore;
use crate::store::EntityStore;

/// The proceedings log page. Unlike other pages the station is mandatory:
/// the header is what identifies the log.
pub async fn resolve<S: EntityStore, B: BlobStore>(
    resolver: &PageResolver<S, B>,
    case: &ChapterCase,
    form: &Form,
) -> Result<RoznamaPageData, AppError> {
    let station = resolver.station(case).await?.ok_or_else(|| {
        AppError::not_found(format!(
            "Police station not found for case {}",
            case.branch_case_number
        ))
    })?;

    let content = RoznamaContent::from_value(&form.content)?;
    let persons = resolver.store.list_persons(case.id).await?;
    let locale = resolver.locale(case);

    let mut applicants = names_with_role(&persons, PersonRole::Applicant);
    let mut defendant_names = names_with_role(&persons, PersonRole::Defendant);
    if let Some(header) = content.header.as_ref() {
        if applicants.is_empty() {
            applicants = header.applicant_names.clone();
        }
        if defendant_names.is_empty() {
            defendant_names = header.defendant_names.clone();
        }
    }

    let defendants: Vec<_> = persons
        .iter()
        .filter(|p| p.role == PersonRole::Defendant)
        .collect();

    // Each defendant's signature is signed at most once per page.
    let mut signatures: HashMap<Uuid, Option<String>> = HashMap::new();
    let mut entries = Vec::with_capacity(content.entries.len());
    for (index, entry) in content.entries.iter().enumerate() {
        let mut present_accused = Vec::new();
        for defendant in defendants
            .iter()
            .filter(|d| entry.present_accused_person_ids.contains(&d.id))
        {
            let signature_url = match signatures.get(&defendant.id) {
                Some(url) => url.clone(),
                None => {
                    let url = resolver.signed(defendant.signature_path.as_deref()).await;
                    signatures.insert(defendant.id, url.clone());
                    url
                }
            };
            present_accused.push(PresentAccused {
                person_id: defendant.id,
                name: defendant.name.clone(),
                signature_url,
            });
        }

        entries.push(RoznamaPageEntry {
            serial: index + 1,
            date: locale.format_date(&entry.date),
            proceedings: entry.proceedings.clone(),
            next_date: locale.format_optional_date(entry.next_date.as_deref()),
            present_accused,
        });
    }

    Ok(RoznamaPageData {
        form_id: form.id,
        title: form.form_type.title().to_string(),
        case: case_header(case, &station.name),
        station_district: station.district.clone(),
        applicants,
        defendants: defendant_names,
        entries,
    })
}
