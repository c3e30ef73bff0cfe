use async_trait::async_trait;
use chrono::DateTime;
use eicr_pdf::config::ExportConfig;
use eicr_pdf::photos::{ObservationPhoto, PhotoStore};
use eicr_pdf::{CertificateError, Document, ExportOptions, Exporter, ObservationsRequest, PageContents, Pt};
use image::{DynamicImage, ImageOutputFormat};
use serde_json::json;
use std::collections::HashMap;

fn request() -> ObservationsRequest {
    serde_json::from_value(json!({
        "formData": { "clientName": "Jane Doe", "inspectionDate": "2024-01-15" },
        "observations": [{
            "id": "1",
            "defectCode": "C1",
            "item": "Main Switch",
            "description": "Exposed live conductor",
            "recommendation": "Isolate",
            "rectified": false
        }],
        "options": { "generatedAt": "2024-01-15T10:30:00+00:00" }
    }))
    .expect("request parses")
}

fn all_text(document: &Document) -> Vec<String> {
    (0..document.page_count())
        .flat_map(|i| document.page_text(i))
        .map(String::from)
        .collect()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("encodes");
    out.into_inner()
}

/// Photos keyed by observation id, files keyed by URL
#[derive(Default)]
struct MemoryStore {
    records: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<u8>>,
    listing_fails: bool,
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn photos_for_observation(
        &self,
        observation_id: &str,
    ) -> eicr_pdf::Result<Vec<ObservationPhoto>> {
        if self.listing_fails {
            return Err(CertificateError::PhotoStoreStatus {
                status: 503,
                url: "memory://photos".to_string(),
            });
        }
        Ok(self
            .records
            .get(observation_id)
            .into_iter()
            .flatten()
            .map(|path| ObservationPhoto {
                file_path: path.clone(),
            })
            .collect())
    }

    fn public_url(&self, file_path: &str) -> String {
        format!("memory://{file_path}")
    }

    async fn fetch(&self, url: &str) -> eicr_pdf::Result<Vec<u8>> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| CertificateError::Layout(format!("{url} not found")))
    }
}

#[tokio::test]
async fn lists_installation_details_and_observations() {
    let request = request();
    let exporter = Exporter::new(ExportConfig::default());
    let document = exporter
        .layout_observations(&request.form_data, &request.observations, &request.options)
        .await
        .expect("lays out");

    let text = all_text(&document);
    for expected in [
        "Client: Jane Doe",
        "Inspection Date: 15/01/2024",
        "[C1] Main Switch",
        "Exposed live conductor",
        "Recommendation: Isolate",
        "Rectified: No",
        "Page 1 of 1",
    ] {
        assert!(
            text.iter().any(|t| t == expected),
            "missing {expected:?} in {text:?}"
        );
    }
}

#[tokio::test]
async fn line_breaks_in_observations_do_not_overlap() {
    let mut request = request();
    request.observations[0].item = "Main\nSwitch".into();
    let exporter = Exporter::new(ExportConfig::default());
    let document = exporter
        .layout_observations(&request.form_data, &request.observations, &request.options)
        .await
        .expect("lays out");

    let text = all_text(&document);
    assert!(text.iter().any(|t| t == "[C1] Main Switch"), "{text:?}");
    assert!(!text.iter().any(|t| t == "Switch"));

    let spans: Vec<_> = document
        .pages_in_order()
        .flat_map(|page| page.contents.iter())
        .filter_map(|content| match content {
            PageContents::Text(spans) => Some(spans.iter()),
            _ => None,
        })
        .flatten()
        .collect();
    let baseline = |text: &str| {
        spans
            .iter()
            .find(|span| span.text.starts_with(text))
            .map(|span| span.coords.1 .0)
            .expect("span drawn")
    };
    // PDF y grows upwards, so the next line has the lower baseline
    let gap = baseline("[C1] Main Switch") - baseline("Danger present");
    assert!(gap > 6.0, "heading and next line are {gap}pt apart");
}

#[tokio::test]
async fn writes_a_named_pdf() {
    let request = request();
    let exporter = Exporter::new(ExportConfig::default());
    let exported = exporter
        .export_observations(&request.form_data, &request.observations, &request.options)
        .await
        .expect("exports");

    assert_eq!(exported.filename, "EICR_Observations_Jane-Doe_2024-01-15.pdf");
    assert_eq!(exported.page_count, 1);
    assert!(exported.bytes.starts_with(b"%PDF-"));
    let tail = String::from_utf8_lossy(&exported.bytes[exported.bytes.len() - 16..]).to_string();
    assert!(tail.contains("%%EOF"));
    assert_eq!(exported.metadata.title, "EICR - Jane Doe");
}

#[tokio::test]
async fn embeds_photos_and_skips_broken_ones() {
    let request = request();
    let store = MemoryStore {
        records: HashMap::from([(
            "1".to_string(),
            vec!["board.png".to_string(), "missing.png".to_string()],
        )]),
        files: HashMap::from([("memory://board.png".to_string(), png(960, 540))]),
        ..Default::default()
    };
    let exporter = Exporter::new(ExportConfig::default()).with_photo_store(store);
    let document = exporter
        .layout_observations(&request.form_data, &request.observations, &request.options)
        .await
        .expect("lays out");

    assert_eq!(document.images.len(), 1);
    let placed: Vec<_> = document
        .pages_in_order()
        .flat_map(|page| page.contents.iter())
        .filter_map(|content| match content {
            PageContents::Image(image) => Some(image.position),
            _ => None,
        })
        .collect();
    assert_eq!(placed.len(), 1);
    let expected_width = Pt::from(eicr_pdf::Mm(80.0));
    let expected_height = Pt::from(eicr_pdf::Mm(45.0));
    assert!((placed[0].width().0 - expected_width.0).abs() < 0.01);
    assert!((placed[0].height().0 - expected_height.0).abs() < 0.01);
}

#[tokio::test]
async fn a_failing_photo_store_does_not_abort_the_report() {
    let request = request();
    let store = MemoryStore {
        listing_fails: true,
        ..Default::default()
    };
    let exporter = Exporter::new(ExportConfig::default()).with_photo_store(store);
    let document = exporter
        .layout_observations(&request.form_data, &request.observations, &request.options)
        .await
        .expect("lays out");

    assert_eq!(document.images.len(), 0);
    assert!(all_text(&document).iter().any(|t| t == "[C1] Main Switch"));
}

#[tokio::test]
async fn many_observations_flow_onto_more_pages() {
    let mut request = request();
    let observation = request.observations[0].clone();
    request.observations = vec![observation; 40];
    let exporter = Exporter::new(ExportConfig::default());
    let document = exporter
        .layout_observations(&request.form_data, &request.observations, &ExportOptions::default())
        .await
        .expect("lays out");

    let pages = document.page_count();
    assert!(pages > 1);
    let headings = all_text(&document)
        .iter()
        .filter(|t| *t == "[C1] Main Switch")
        .count();
    assert_eq!(headings, 40);
    assert!(all_text(&document).contains(&format!("Page {pages} of {pages}")));
}

#[test]
fn generated_at_round_trips_through_options() {
    let request = request();
    assert_eq!(
        request.options.generated_at,
        Some(DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").expect("valid"))
    );
}
