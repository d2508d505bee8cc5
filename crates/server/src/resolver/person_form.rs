use shared_types::content::PersonFormFields;
use shared_types::{AppError, ChapterCase, Form, Person, PersonDetails, PersonPageData, PersonRole};

use super::{case_header, role_noun, station_display, PageResolver};
use crate::storage::BlobStore;
use crate::store::EntityStore;

/// One page per referenced person, in the order the form lists them.
/// Persons of another case or of the wrong role are skipped; if none remain
/// the form cannot produce pages.
pub async fn resolve<S: EntityStore, B: BlobStore>(
    resolver: &PageResolver<S, B>,
    case: &ChapterCase,
    form: &Form,
    role: Option<PersonRole>,
) -> Result<Vec<PersonPageData>, AppError> {
    let fields = PersonFormFields::from_content(form.form_type, &form.content);

    let found = if fields.person_ids.is_empty() {
        Vec::new()
    } else {
        resolver.store.find_persons(case.id, &fields.person_ids).await?
    };
    let matched = in_listed_order(&fields.person_ids, &found, role);

    if matched.is_empty() {
        return Err(AppError::not_found(format!(
            "No valid {} found for {}",
            role_noun(role),
            form.form_type.title()
        )));
    }

    let station = resolver.station(case).await?;
    let header = case_header(case, station_display(station.as_ref()));
    let locale = resolver.locale(case);
    let hearing_date = fields.hearing_date.as_deref().map(|d| locale.format_date(d));

    let mut pages = Vec::with_capacity(matched.len());
    for person in matched {
        pages.push(PersonPageData {
            form_id: form.id,
            form_type: form.form_type,
            title: form.form_type.title().to_string(),
            case: header.clone(),
            person: details(person),
            signature_url: resolver.signed(person.signature_path.as_deref()).await,
            photo_url: resolver.signed(person.photo_path.as_deref()).await,
            hearing_date: hearing_date.clone(),
            bond_amount: fields.bond_amount.clone(),
            bond_period: fields.bond_period.clone(),
            statement_text: fields.statement_text.clone(),
            remarks: fields.remarks.clone(),
        });
    }
    Ok(pages)
}

fn in_listed_order<'a>(
    ids: &[uuid::Uuid],
    found: &'a [Person],
    role: Option<PersonRole>,
) -> Vec<&'a Person> {
    ids.iter()
        .filter_map(|id| found.iter().find(|p| p.id == *id))
        .filter(|p| role.is_none_or(|r| p.role == r))
        .collect()
}

fn details(person: &Person) -> PersonDetails {
    PersonDetails {
        id: person.id,
        name: person.name.clone(),
        role: person.role,
        age: person.age,
        gender: person.gender.clone(),
        mobile: person.mobile.clone(),
        address: person.address.clone(),
    }
}
