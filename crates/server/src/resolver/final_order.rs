use shared_types::content::FinalOrderFields;
use shared_types::{AppError, ChapterCase, FinalOrderPageData, Form, PersonRole};

use super::{case_header, names_with_role, station_display, PageResolver};
use crate::storage::BlobStore;
use crate::store::EntityStore;

pub async fn resolve<S: EntityStore, B: BlobStore>(
    resolver: &PageResolver<S, B>,
    case: &ChapterCase,
    form: &Form,
) -> Result<FinalOrderPageData, AppError> {
    let fields = FinalOrderFields::from_content(&form.content);
    let order_text = fields
        .order_text
        .ok_or_else(|| AppError::invalid_field("orderText", "Final order text is required"))?;

    let persons = resolver.store.list_persons(case.id).await?;
    let station = resolver.station(case).await?;
    let locale = resolver.locale(case);

    Ok(FinalOrderPageData {
        form_id: form.id,
        title: form.form_type.title().to_string(),
        case: case_header(case, station_display(station.as_ref())),
        applicants: names_with_role(&persons, PersonRole::Applicant),
        defendants: names_with_role(&persons, PersonRole::Defendant),
        order_text,
        order_date: locale.format_optional_date(fields.order_date.as_deref()),
        remarks: fields.remarks,
    })
}
