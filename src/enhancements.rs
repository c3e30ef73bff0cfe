//! Features that apply across a certificate rather than to one section: signature
//! stamps, the watermark, verification boxes, formatting helpers and document
//! metadata.

use crate::colour::colours;
use crate::context::RenderContext;
use crate::document::Document;
use crate::form_xobject::{FormXObject, FormXObjectLayout};
use crate::image::{is_image_data_uri, Image};
use crate::info::CertificateMetadata;
use crate::layout::*;
use crate::model::FormData;
use crate::page::{Page, SpanFont, SpanLayout};
use crate::rect::{Area, Rect};
use crate::transform::Transform;
use crate::units::*;
use crate::{CertificateError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use id_arena::Id;
use tracing::{debug, warn};

/// Small print drawn under a signature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureDetails {
    /// When the signature was applied, already formatted
    pub timestamp: String,
    pub location: Option<String>,
    pub reason: Option<String>,
}

/// Place a signature image in `area` and write its details beneath it. Returns the
/// height used below `area.y`.
///
/// Never fails: a missing or undecodable signature is logged and leaves a blank box.
pub fn stamp_signature(
    document: &mut Document,
    ctx: &RenderContext,
    page: Id<Page>,
    area: Area,
    signature: &str,
    details: &SignatureDetails,
) -> Mm {
    match try_stamp_signature(document, ctx, page, area, signature, details) {
        Ok(height) => height,
        Err(e) => {
            warn!(error = %e, "could not stamp signature");
            Mm(0.0)
        }
    }
}

fn try_stamp_signature(
    document: &mut Document,
    ctx: &RenderContext,
    page: Id<Page>,
    area: Area,
    signature: &str,
    details: &SignatureDetails,
) -> Result<Mm> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Ok(Mm(0.0));
    }
    if !is_image_data_uri(signature) {
        return Err(CertificateError::DataUri(
            "signature is not an embedded image".to_string(),
        ));
    }

    let image = Image::from_data_uri(signature)?;
    let (width, height) = fit_within(image.aspect_ratio(), area.width, area.height);
    let image_id = document.add_image(image);
    place_image(
        document,
        page,
        image_id,
        Area::new(area.x, area.y, width, height),
    )?;

    let mut lines = vec![format!("Digitally signed: {}", details.timestamp)];
    if let Some(location) = details.location.as_deref().filter(|l| !l.trim().is_empty()) {
        lines.push(format!("Location: {location}"));
    }
    if let Some(reason) = details.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        lines.push(format!("Reason: {reason}"));
    }
    let style = ctx.regular(Pt(6.0)).coloured(colours::MUTED);
    let leading = Mm(2.6);
    let bottom = draw_lines(
        document,
        page,
        &lines,
        area.x,
        area.y + height + Mm(3.0),
        leading,
        &style,
    )?;
    Ok(bottom - area.y)
}

/// The largest size with the given aspect ratio that fits in the box
fn fit_within(aspect_ratio: f32, max_width: Mm, max_height: Mm) -> (Mm, Mm) {
    let width = max_width.min(max_height * aspect_ratio);
    (width, width / aspect_ratio)
}

/// Stamp `text` diagonally and translucently through the centre of every page that
/// exists. Run once, after all content and before the footers.
pub fn add_watermark(
    document: &mut Document,
    ctx: &RenderContext,
    text: &str,
    opacity: f32,
    font_size: Pt,
) -> Result<()> {
    let text = text.trim();
    if text.is_empty() || document.page_count() == 0 {
        return Ok(());
    }

    let font_id = ctx.fonts.bold;
    let (width, ascent, descent) = {
        let font = document.fonts.get(font_id).ok_or_else(|| {
            CertificateError::Layout("watermark font is not in the document".to_string())
        })?;
        (
            Pt::from(width_of_text(text, font, font_size)),
            font.ascent(font_size),
            font.descent(font_size),
        )
    };

    // laid out with the text's visual centre on the form's origin
    let mut form = FormXObject::from_bbox(Rect {
        x1: -width / 2.0,
        y1: descent - (ascent + descent) / 2.0,
        x2: width / 2.0,
        y2: ascent - (ascent + descent) / 2.0,
    });
    form.add_span(SpanLayout {
        text: text.to_string(),
        font: SpanFont {
            id: font_id,
            size: font_size,
        },
        colour: colours::WATERMARK,
        coords: (-width / 2.0, -(ascent + descent) / 2.0),
    });
    let form = document.add_form_xobject(form);
    let state = document.add_opacity(opacity.clamp(0.0, 1.0));

    let pages = document.page_order.clone();
    for id in pages {
        let page = document.pages.get_mut(id).ok_or_else(|| {
            CertificateError::Layout("watermarking a page that is not in the document".to_string())
        })?;
        let (cx, cy) = page.to_pdf(page.width() / 2.0, page.height() / 2.0);
        page.add_form_xobject(FormXObjectLayout {
            xobj_id: form,
            transform: Transform::rotate_degrees(45.0).with_translate(cx, cy),
            graphics_state: Some(state),
        });
    }
    debug!(pages = document.page_count(), "watermarked");
    Ok(())
}

/// Contents of a [validation_stamp]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationStamp {
    pub certificate_id: String,
    pub issue_date: String,
    pub expiry_date: Option<String>,
    pub version: String,
}

/// A small bordered box in the top-right corner of the page carrying the
/// certificate id, dates and version. Returns the y below the box.
pub fn validation_stamp(
    document: &mut Document,
    ctx: &RenderContext,
    page: Id<Page>,
    stamp: &ValidationStamp,
) -> Result<Mm> {
    let (page_width, margins) = {
        let p = document.pages.get(page).ok_or_else(|| {
            CertificateError::Layout("stamping a page that is not in the document".to_string())
        })?;
        (p.width(), p.margins)
    };

    let mut lines = vec![
        format!("Certificate: {}", stamp.certificate_id),
        format!("Issued: {}", stamp.issue_date),
    ];
    if let Some(expiry) = stamp.expiry_date.as_deref().filter(|e| !e.is_empty()) {
        lines.push(format!("Expires: {expiry}"));
    }
    lines.push(format!("Version: {}", stamp.version));

    let width = Mm(55.0);
    let leading = Mm(3.6);
    let height = leading * lines.len() as f32 + Mm(3.0);
    let area = Area::new(page_width - margins.right - width, margins.top, width, height);
    rect(
        document,
        page,
        area,
        Paint::Stroke {
            colour: colours::PRIMARY,
            width: Mm(0.4),
        },
    )?;
    draw_lines(
        document,
        page,
        &lines,
        area.x + Mm(2.0),
        area.y + Mm(4.0),
        leading,
        &ctx.regular(Pt(7.0)),
    )?;
    Ok(area.bottom())
}

/// A bordered square standing in for a verification QR code, with the URL printed
/// beneath it. Failures are logged and leave the space blank.
pub fn qr_placeholder(
    document: &mut Document,
    ctx: &RenderContext,
    page: Id<Page>,
    x: Mm,
    y: Mm,
    size: Mm,
    url: &str,
) {
    let drawn = (|| -> Result<()> {
        rect(
            document,
            page,
            Area::new(x, y, size, size),
            Paint::Stroke {
                colour: colours::TEXT,
                width: Mm(0.3),
            },
        )?;
        let style = ctx.bold(Pt(7.0)).aligned(Align::Centre);
        draw_text(
            document,
            page,
            "Scan to verify",
            x + size / 2.0,
            y + size / 2.0 + Mm(1.0),
            &style,
        )?;
        let url = truncate_with_ellipsis(url.trim(), 48);
        draw_text(
            document,
            page,
            &url,
            x + size / 2.0,
            y + size + Mm(3.5),
            &ctx.regular(Pt(5.5)).aligned(Align::Centre),
        )
    })();
    if let Err(e) = drawn {
        warn!(error = %e, "could not draw verification placeholder");
    }
}

/// Format an amount of money the en-GB way, e.g. `£1,234.56`
pub fn format_currency(amount: f64) -> String {
    let pence = (amount.abs() * 100.0).round() as u64;
    let (pounds, pence) = (pence / 100, pence % 100);

    let digits = pounds.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && (pounds > 0 || pence > 0) {
        "-"
    } else {
        ""
    };
    format!("{sign}£{grouped}.{pence:02}")
}

fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(input) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Format a date as `DD/MM/YYYY`, or `DD/MM/YYYY HH:MM` with `with_time`. A missing
/// or unreadable date gives `""`.
pub fn format_date(input: Option<&str>, with_time: bool) -> String {
    match input.and_then(parse_date) {
        Some(dt) if with_time => dt.format("%d/%m/%Y %H:%M").to_string(),
        Some(dt) => dt.format("%d/%m/%Y").to_string(),
        None => String::new(),
    }
}

/// [format_date] for a timestamp that's already parsed
pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// Document properties for a full certificate
pub fn build_metadata(form: &FormData, generated_at: DateTime<FixedOffset>) -> CertificateMetadata {
    let title = match form.client_name.trim() {
        "" => "Electrical Installation Condition Report".to_string(),
        client => format!("EICR - {client}"),
    };
    let author = [form.inspector_name.trim(), form.company_name.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();

    let mut keywords: Vec<String> = ["EICR", "Electrical Installation Condition Report", "BS 7671"]
        .into_iter()
        .map(String::from)
        .collect();
    if form.certificate_number.is_present() {
        keywords.push(form.certificate_number.trim().to_string());
    }

    CertificateMetadata {
        title,
        subject: "Electrical Installation Condition Report".to_string(),
        author,
        creator: "eicr-pdf".to_string(),
        producer: concat!("eicr-pdf ", env!("CARGO_PKG_VERSION")).to_string(),
        keywords,
        creation_date: generated_at,
        mod_date: generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSection;
    use crate::page::PageContents;
    use crate::pagesize::{PageOrientation, A4};
    use crate::safe::Text;
    use base64::Engine;

    fn setup(pages: usize) -> (Document, RenderContext) {
        let mut doc = Document::default();
        let generated_at = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").unwrap();
        let ctx = RenderContext::builtin(&mut doc, LayoutSection::default(), generated_at);
        for i in 0..pages {
            let size = if i % 2 == 0 { A4 } else { A4.landscape() };
            doc.add_page(Page::new(size, Some(Margins::all(Mm(15.0)))));
        }
        (doc, ctx)
    }

    fn png_data_uri(width: u32, height: u32) -> String {
        let image = image::DynamicImage::new_rgb8(width, height);
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .expect("encodes");
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
        )
    }

    #[test]
    fn dates() {
        assert_eq!(format_date(None, false), "");
        assert_eq!(format_date(Some(""), false), "");
        assert_eq!(format_date(Some("not a date"), false), "");
        assert_eq!(format_date(Some("2024-02-30"), false), "");
        assert_eq!(format_date(Some("2024-01-15"), false), "15/01/2024");
        assert_eq!(format_date(Some("2024-01-15T14:05:00Z"), true), "15/01/2024 14:05");
        assert_eq!(format_date(Some("2024-01-15"), true), "15/01/2024 00:00");
        assert_eq!(format_date(Some("15/01/2024"), false), "15/01/2024");
    }

    #[test]
    fn currency() {
        assert_eq!(format_currency(1234.56), "£1,234.56");
        assert_eq!(format_currency(0.0), "£0.00");
        assert_eq!(format_currency(999.999), "£1,000.00");
        assert_eq!(format_currency(1_000_000.0), "£1,000,000.00");
        assert_eq!(format_currency(-12.5), "-£12.50");
    }

    #[test]
    fn watermark_goes_on_every_page() {
        let (mut doc, ctx) = setup(3);
        add_watermark(&mut doc, &ctx, "ORIGINAL CERTIFICATE", 0.1, Pt(60.0)).expect("watermarks");
        assert_eq!(doc.form_xobjects.len(), 1);
        assert_eq!(doc.graphics_states.len(), 1);
        for page in doc.pages_in_order() {
            let Some(PageContents::FormXObject(layout)) = page.contents.last() else {
                panic!("expected a watermark placement");
            };
            assert_eq!(layout.graphics_state, Some(0));
            let (cx, cy) = page.to_pdf(page.width() / 2.0, page.height() / 2.0);
            assert_eq!((layout.transform.e, layout.transform.f), (*cx, *cy));
        }
    }

    #[test]
    fn broken_signatures_are_skipped() {
        let (mut doc, ctx) = setup(1);
        let page = doc.page_order[0];
        let area = Area::new(Mm(20.0), Mm(100.0), Mm(60.0), Mm(20.0));
        let details = SignatureDetails {
            timestamp: "15/01/2024 10:30".to_string(),
            ..Default::default()
        };

        assert_eq!(stamp_signature(&mut doc, &ctx, page, area, "", &details), Mm(0.0));
        assert_eq!(
            stamp_signature(&mut doc, &ctx, page, area, "J. Smith", &details),
            Mm(0.0)
        );
        assert_eq!(
            stamp_signature(&mut doc, &ctx, page, area, "data:image/png;base64,!!!", &details),
            Mm(0.0)
        );
        assert!(doc.images.len() == 0);

        let used = stamp_signature(&mut doc, &ctx, page, area, &png_data_uri(300, 100), &details);
        assert!(used > Mm(20.0));
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.page_text(0), vec!["Digitally signed: 15/01/2024 10:30"]);
    }

    #[test]
    fn validation_stamp_lists_its_fields() {
        let (mut doc, ctx) = setup(1);
        let page = doc.page_order[0];
        let bottom = validation_stamp(
            &mut doc,
            &ctx,
            page,
            &ValidationStamp {
                certificate_id: "EICR-001".to_string(),
                issue_date: "15/01/2024".to_string(),
                expiry_date: None,
                version: "1.0".to_string(),
            },
        )
        .expect("draws");
        assert!(bottom > Mm(15.0));
        assert_eq!(
            doc.page_text(0),
            vec!["Certificate: EICR-001", "Issued: 15/01/2024", "Version: 1.0"]
        );
    }

    #[test]
    fn metadata_from_the_form() {
        let form = FormData {
            client_name: Text::from("Jane Doe"),
            company_name: Text::from("Sparks Ltd"),
            certificate_number: Text::from("EICR-001"),
            ..Default::default()
        };
        let at = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").unwrap();
        let metadata = build_metadata(&form, at);
        assert_eq!(metadata.title, "EICR - Jane Doe");
        assert_eq!(metadata.subject, "Electrical Installation Condition Report");
        assert_eq!(metadata.author, "Sparks Ltd");
        assert!(metadata.keywords.contains(&"EICR-001".to_string()));
        assert_eq!(metadata.creation_date, at);
    }
}
