use chrono::DateTime;
use eicr_pdf::config::ExportConfig;
use eicr_pdf::pagesize::Orientation;
use eicr_pdf::{orientations, CertificateRequest, Document, ExportOptions, Exporter};
use serde_json::{json, Value};

fn options() -> ExportOptions {
    ExportOptions {
        generated_at: Some(
            DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").expect("valid"),
        ),
        ..Default::default()
    }
}

fn request(form: Value) -> CertificateRequest {
    serde_json::from_value(json!({ "formData": form })).expect("request parses")
}

fn base_form() -> Value {
    json!({
        "certificateNumber": "EICR-001",
        "clientName": "Jane Doe",
        "installationAddress": "1 High Street",
        "inspectionDate": "2024-01-15",
        "inspectorName": "Sam Sparks",
        "overallAssessment": "satisfactory"
    })
}

fn with(mut form: Value, key: &str, value: Value) -> Value {
    form[key] = value;
    form
}

async fn layout(form: Value) -> Document {
    Exporter::new(ExportConfig::default())
        .layout_certificate(&request(form).form_data, &options())
        .await
        .expect("lays out")
}

fn all_text(document: &Document) -> Vec<String> {
    (0..document.page_count())
        .flat_map(|i| document.page_text(i))
        .map(String::from)
        .collect()
}

fn landscape_pages(document: &Document) -> usize {
    orientations(document)
        .into_iter()
        .filter(|o| *o == Orientation::Landscape)
        .count()
}

fn bookmarks(document: &Document) -> Vec<&str> {
    document
        .outline
        .entries
        .iter()
        .map(|entry| entry.title.as_str())
        .collect()
}

#[tokio::test]
async fn no_test_results_means_no_landscape_pages() {
    let document = layout(base_form()).await;
    assert_eq!(landscape_pages(&document), 0);
    assert!(!bookmarks(&document).contains(&"Schedule of Test Results"));
    assert!(!bookmarks(&document).contains(&"Observations"));
    assert!(!bookmarks(&document).contains(&"Schedule of Inspections"));
}

#[tokio::test]
async fn one_landscape_page_per_board() {
    let form = with(
        base_form(),
        "testResults",
        json!([
            { "circuitNumber": "1", "circuitDescription": "Lights", "boardId": "DB1", "zs": "0.62" },
            { "circuitNumber": "2", "circuitDescription": "Sockets", "boardId": "DB1" },
            { "circuitNumber": "1", "circuitDescription": "Garage", "boardId": "DB2" }
        ]),
    );
    let form = with(
        form,
        "distributionBoards",
        json!([{ "id": "DB2", "name": "Sub board", "location": "Garage" }]),
    );
    let document = layout(form).await;

    assert_eq!(landscape_pages(&document), 2);
    let text = all_text(&document);
    assert!(text.iter().any(|t| t == "Distribution Board: DB1"));
    assert!(text.iter().any(|t| t == "Distribution Board: Sub board (Garage)"));
    assert!(text.iter().any(|t| t == "Lights"));
}

#[tokio::test]
async fn a_single_board_has_no_board_header() {
    let form = with(
        base_form(),
        "testResults",
        json!([
            { "circuitNumber": "1", "boardId": "DB1" },
            { "circuitNumber": "2", "boardId": "DB1" }
        ]),
    );
    let document = layout(form).await;

    assert_eq!(landscape_pages(&document), 1);
    assert!(!all_text(&document)
        .iter()
        .any(|t| t.starts_with("Distribution Board")));
}

#[tokio::test]
async fn satisfactory_only_without_serious_codes() {
    let form = with(
        base_form(),
        "defectObservations",
        json!([{ "id": "1", "defectCode": "C3", "item": "Labelling" }]),
    );
    let text = all_text(&layout(form).await);
    assert!(text.iter().any(|t| t == "SATISFACTORY"));

    let form = with(
        base_form(),
        "defectObservations",
        json!([
            { "id": "1", "defectCode": "C2", "item": "Bonding" },
            { "id": "2", "defectCode": "C1", "item": "Main Switch" }
        ]),
    );
    let document = layout(form).await;
    let text = all_text(&document);
    assert!(text.iter().any(|t| t == "UNSATISFACTORY"));
    assert!(text
        .iter()
        .any(|t| t == "Danger present (C1) - immediate remedial action required"));
    assert!(text.iter().any(|t| t == "[C1] Main Switch"));
    assert!(bookmarks(&document).contains(&"Observations"));
}

#[tokio::test]
async fn missing_marker_is_unsatisfactory_even_when_defect_free() {
    let mut form = base_form();
    form["overallAssessment"] = Value::Null;
    let text = all_text(&layout(form).await);
    assert!(text.iter().any(|t| t == "UNSATISFACTORY"));
    assert!(text.iter().any(|t| t == "The installation requires attention"));
}

#[tokio::test]
async fn checklist_page_only_with_items() {
    let form = with(
        base_form(),
        "inspectionItems",
        json!([
            { "id": "a", "section": "Intake equipment", "item": "Service cable", "outcome": "satisfactory" },
            { "id": "b", "section": "Intake equipment", "item": "Meter tails", "outcome": "C2" }
        ]),
    );
    let document = layout(form).await;
    assert!(bookmarks(&document).contains(&"Schedule of Inspections"));
    let text = all_text(&document);
    assert!(text.iter().any(|t| t == "Intake equipment"));
    assert!(text.iter().any(|t| t == "Meter tails"));
}

#[tokio::test]
async fn closing_pages_are_always_present() {
    let document = layout(base_form()).await;
    let text = all_text(&document);
    for expected in [
        "Inspected By",
        "Report Authorised For Issue By",
        "Date to be confirmed",
        "GUIDANCE FOR RECIPIENTS",
        "1.",
        "10.",
    ] {
        assert!(
            text.iter().any(|t| t == expected),
            "missing {expected:?}"
        );
    }
    assert_eq!(
        bookmarks(&document),
        vec!["Certificate", "Declaration"]
    );

    let dated = with(base_form(), "nextInspectionDate", json!("2029-01-15"));
    let text = all_text(&layout(dated).await);
    assert!(text.iter().any(|t| t == "15/01/2029"));
}

#[tokio::test]
async fn signature_boxes_use_their_own_signer_details() {
    let mut form = base_form();
    form["companyAddress"] = json!("9 Company Street");
    form["companyPhone"] = json!("0121 123 4567");
    form["inspectedByName"] = json!("JAMES WILSON");
    form["inspectedByAddress"] = json!("789 Contractor Lane");
    form["reportAuthorisedByName"] = json!("Ann Lee");
    form["reportAuthorisedByAddress"] = json!("1 Head Office Road");
    form["reportAuthorisedByMembershipNo"] = json!("NIC123456");
    let text = all_text(&layout(form).await);

    for expected in [
        "JAMES WILSON",
        "789 Contractor Lane",
        "Ann Lee",
        "1 Head Office Road",
        "NIC123456",
    ] {
        assert!(text.iter().any(|t| t == expected), "missing {expected:?}");
    }
    assert!(!text.iter().any(|t| t == "9 Company Street"));
}

#[tokio::test]
async fn every_page_is_watermarked_and_numbered() {
    let document = layout(base_form()).await;
    let pages = document.page_count();
    assert_eq!(document.form_xobjects.len(), 1);
    for i in 0..pages {
        let text = document.page_text(i);
        assert!(text.contains(&format!("Page {} of {pages}", i + 1).as_str()));
    }
    assert!(document.page_text(0).contains(&"Generated 15/01/2024 10:30"));

    let mut config = ExportConfig::default();
    config.watermark.enabled = false;
    let unmarked = Exporter::new(config)
        .layout_certificate(&request(base_form()).form_data, &options())
        .await
        .expect("lays out");
    assert_eq!(unmarked.form_xobjects.len(), 0);
}

#[tokio::test]
async fn verification_placeholder_follows_the_options() {
    let exporter = Exporter::new(ExportConfig::default());
    let form = request(base_form()).form_data;

    let plain = exporter.layout_certificate(&form, &options()).await.expect("lays out");
    assert!(!all_text(&plain).iter().any(|t| t == "Scan to verify"));

    let options = ExportOptions {
        verification_url: Some("https://example.com/verify/EICR-001".to_string()),
        ..options()
    };
    let verified = exporter.layout_certificate(&form, &options).await.expect("lays out");
    assert!(all_text(&verified).iter().any(|t| t == "Scan to verify"));
}

#[tokio::test]
async fn exports_sanitised_metadata_and_bytes() {
    let form = with(base_form(), "clientName", json!("<b>Jane Doe</b>"));
    let exported = Exporter::new(ExportConfig::default())
        .export_certificate(request(form).form_data, &options())
        .await
        .expect("exports");

    assert_eq!(exported.filename, "EICR_EICR-001_bJane-Doeb_2024-01-15.pdf");
    assert_eq!(exported.metadata.title, "EICR - bJane Doe/b");
    assert_eq!(exported.metadata.author, "Sam Sparks");
    assert!(exported.bytes.starts_with(b"%PDF-"));
    let tail = String::from_utf8_lossy(&exported.bytes[exported.bytes.len() - 16..]).to_string();
    assert!(tail.contains("%%EOF"));

    let dir = tempfile::tempdir().expect("temp dir");
    let path = exported
        .save_to(&dir.path().join("out"))
        .await
        .expect("saves");
    assert_eq!(path, dir.path().join("out").join(&exported.filename));
    assert_eq!(std::fs::read(&path).expect("reads"), exported.bytes);
}
