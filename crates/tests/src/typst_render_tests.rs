use std::sync::Arc;

use serde_json::json;
use server::issuance::IssuanceEngine;
use server::render::{DocumentRenderer, TypstRenderer};
use server::resolver::PageResolver;
use shared_types::{
    AddEntryRequest, AppErrorKind, FormStatus, FormType, IssuanceSettings, PageSnapshot,
    PersonRole, RenderMode, RoznamaContent, RoznamaEntry,
};

use crate::common::{
    create_test_case, create_test_form, create_test_person, create_test_station, test_header,
    test_pipeline, MemoryBlobStore, OFFICER,
};

fn final_order_page() -> PageSnapshot {
    PageSnapshot {
        page_type: FormType::FinalOrder,
        template_version: "v1".into(),
        data: json!({
            "form_id": "6f1c1d2e-0000-4000-8000-000000000002",
            "title": "Final Order",
            "case": {
                "branch_case_number": "BR-90/2024",
                "authority_case_number": "SDM/45",
                "police_station": "Kotwali",
                "section_codes": []
            },
            "applicants": [],
            "defendants": ["Ravi \"Raju\" Patil"],
            "order_text": "Bond of Rs. 5000 accepted.\nProceedings closed.",
            "order_date": "-",
            "remarks": null
        }),
    }
}

#[tokio::test]
async fn issued_render_is_write_once() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let renderer = TypstRenderer::new(Arc::clone(&blobs), 1);
    let pages = vec![final_order_page()];

    let first = renderer
        .render(&pages, "case-files/CF-90.pdf", RenderMode::Issued)
        .await
        .unwrap();
    assert!(first.bytes.starts_with(b"%PDF-"));
    assert_eq!(blobs.object("case-files/CF-90.pdf").unwrap(), first.bytes);

    let err = renderer
        .render(&pages, "case-files/CF-90.pdf", RenderMode::Issued)
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);
    assert_eq!(blobs.object("case-files/CF-90.pdf").unwrap(), first.bytes);
}

#[tokio::test]
async fn preview_render_may_replace_its_path() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let renderer = TypstRenderer::new(Arc::clone(&blobs), 2);
    let pages = vec![final_order_page()];

    renderer.render(&pages, "previews/x.pdf", RenderMode::Preview).await.unwrap();
    renderer.render(&pages, "previews/x.pdf", RenderMode::Preview).await.unwrap();

    assert!(blobs.object("previews/x.pdf").unwrap().starts_with(b"%PDF-"));
}

#[tokio::test]
async fn empty_page_list_is_a_render_error() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let renderer = TypstRenderer::new(blobs, 1);

    let err = renderer.render(&[], "previews/empty.pdf", RenderMode::Preview).await.unwrap_err();

    assert_eq!(err.kind, AppErrorKind::RenderError);
}

#[tokio::test]
async fn concurrent_renders_each_produce_their_own_document() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let renderer = TypstRenderer::new(Arc::clone(&blobs), 2);
    let pages = vec![final_order_page()];

    let (a, b, c) = tokio::join!(
        renderer.render(&pages, "previews/a.pdf", RenderMode::Preview),
        renderer.render(&pages, "previews/b.pdf", RenderMode::Preview),
        renderer.render(&pages, "previews/c.pdf", RenderMode::Preview),
    );

    for (doc, path) in [(a, "previews/a.pdf"), (b, "previews/b.pdf"), (c, "previews/c.pdf")] {
        let doc = doc.unwrap();
        assert_eq!(doc.path, path);
        assert!(doc.bytes.starts_with(b"%PDF-"));
    }
}

#[tokio::test]
async fn full_issuance_through_typst_verifies() {
    let p = test_pipeline();
    let station = create_test_station(&p, "Kotwali");
    let case_id = create_test_case(&p, "BR-91/2024", Some(station));
    let d1 = create_test_person(&p, case_id, PersonRole::Defendant, "Ravi", Some("signatures/ravi.png"));
    create_test_person(&p, case_id, PersonRole::Applicant, "State", None);

    let mut content = RoznamaContent::seeded(test_header());
    content.entries.push(RoznamaEntry {
        date: "2024-01-10".into(),
        proceedings: "Notice served; accused present".into(),
        next_date: Some("2024-02-12".into()),
        present_accused_person_ids: vec![d1],
    });
    create_test_form(&p, case_id, FormType::CaseRoznama, FormStatus::Approved, content.to_value());
    create_test_form(
        &p,
        case_id,
        FormType::InterimBond125126,
        FormStatus::Approved,
        json!({ "bondAccusedIds": [d1.to_string()], "bondAmount": "5000", "bondPeriod": "6 months" }),
    );
    create_test_form(
        &p,
        case_id,
        FormType::FinalOrder,
        FormStatus::Approved,
        json!({ "orderText": "Bond executed; proceedings dropped.", "orderDate": "2024-02-12" }),
    );

    let settings = IssuanceSettings::default();
    let renderer = Arc::new(TypstRenderer::new(Arc::clone(&p.blobs), settings.max_concurrent_renders));
    let resolver = PageResolver::new(Arc::clone(&p.store), Arc::clone(&p.blobs), settings);
    let engine = IssuanceEngine::new(Arc::clone(&p.store), Arc::clone(&p.blobs), renderer, resolver);

    let file = engine.issue_case_file(case_id, "CF-91", OFFICER).await.unwrap();
    assert_eq!(file.pages.len(), 3);
    assert!(p.blobs.object(&file.pdf.path).unwrap().starts_with(b"%PDF-"));

    let report = engine.verify_case_file("CF-91").await.unwrap();
    assert!(report.intact);

    // The log keeps accepting entries until the case is closed.
    let later = AddEntryRequest {
        entry: crate::common::test_entry("2024-02-12", "Final order pronounced"),
        header: None,
        close: None,
    };
    p.roznama.add_entry(case_id, later, OFFICER).await.unwrap();
    assert!(engine.verify_case_file("CF-91").await.unwrap().intact);
}
