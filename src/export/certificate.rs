use super::observations::observation_block;
use super::{write_out, ExportOptions, ExportedDocument, Exporter, Flow};
use crate::colour::colours;
use crate::context::Symbol;
use crate::document::Document;
use crate::draw::labelled_checkbox;
use crate::enhancements::*;
use crate::filename::certificate_filename;
use crate::format::*;
use crate::layout::*;
use crate::model::{DefectCode, FormData};
use crate::pagesize::Orientation;
use crate::rect::Area;
use crate::sanitize::sanitize_object;
use crate::templates::*;
use crate::units::*;
use crate::validation::{calculate_quality_metrics, validate_eicr_data};
use crate::Result;
use tracing::{debug, info};

const DECLARATION: &str = "I/We, being the person(s) responsible for the inspection and testing \
of the electrical installation (as indicated by my/our signatures below), particulars of which \
are described in this report, having exercised reasonable skill and care when carrying out the \
inspection and testing, hereby declare that the information in this report, including the \
observations and the attached schedules, provides an accurate assessment of the condition of \
the electrical installation taking into account the stated extent of the installation and the \
limitations of the inspection and testing.";

const INSPECTOR_DECLARATION: &str = "I/We declare that the inspection and testing recorded in \
this report was carried out in accordance with BS 7671 using the instruments listed above, and \
that the results recorded are a true reflection of the installation at the time of inspection.";

const GUIDANCE: [&str; 10] = [
    "This report is an important and valuable document which should be retained for future \
     reference.",
    "The purpose of this report is to confirm, as far as reasonably practicable, whether or not \
     the electrical installation is in a satisfactory condition for continued service. It \
     identifies any damage, deterioration, defects or conditions which may give rise to danger.",
    "The person ordering the report should have received the original and the inspector should \
     have retained a duplicate.",
    "The original report should be kept in a safe place and shown to any person inspecting or \
     working on the installation in future. If the property changes hands, pass it to the new \
     owner or occupier.",
    "Where the installation includes a residual current device (RCD), it should be tested \
     six-monthly by pressing the button marked 'T' or 'Test'.",
    "The extent and limitations section identifies the parts of the installation covered by \
     this report and any limits on the inspection and testing carried out.",
    "Observations classified C1 (Danger present) require immediate remedial action. The person \
     responsible for the installation should act without delay.",
    "Observations classified C2 (Potentially dangerous) require urgent remedial action. Those \
     classified FI (Further investigation) should be investigated as soon as possible.",
    "Observations classified C3 (Improvement recommended) do not on their own make the \
     installation unsatisfactory, but acting on them would improve safety.",
    "For safety, the installation should be re-inspected by a competent person at appropriate \
     intervals. The recommended date of the next inspection is given in this report.",
];

/// Codes explained in the legend under the observations, in severity order
const LEGEND: [DefectCode; 4] = [DefectCode::C1, DefectCode::C2, DefectCode::C3, DefectCode::FI];

const CHECKBOX_ROW: Mm = Mm(6.0);

fn client_and_installation(flow: &mut Flow, form: &FormData) -> Result<()> {
    flow.section("1. DETAILS OF THE CLIENT")?;
    flow.fields(&format_client(form))?;
    flow.gap(Mm(3.0));

    flow.section("2. DETAILS OF THE INSTALLATION")?;
    flow.fields(&format_installation(form))?;
    flow.gap(Mm(3.0));

    flow.section("3. PURPOSE AND EXTENT OF THE REPORT")?;
    flow.fields(&format_purpose(form))?;
    flow.gap(Mm(3.0));

    flow.section("4. DECLARATION")?;
    flow.paragraph(DECLARATION, Mm(0.0), &flow.ctx.regular(Pt(8.0)))?;
    flow.gap(Mm(3.0));
    Ok(())
}

/// A row of ticked or unticked boxes after a bold caption
fn checkbox_row(flow: &mut Flow, caption: &str, boxes: &[(&str, bool)]) -> Result<()> {
    flow.ensure(CHECKBOX_ROW)?;
    let caption_style = flow.ctx.bold(Pt(8.0));
    draw_text(
        flow.doc,
        flow.cursor.page,
        caption,
        flow.left,
        flow.cursor.y + Mm(2.8),
        &caption_style,
    )?;
    let mut x = flow.left + Mm(38.0);
    for (label, checked) in boxes {
        x = labelled_checkbox(flow.doc, flow.ctx, flow.cursor, x, label, *checked)?;
    }
    flow.gap(CHECKBOX_ROW);
    Ok(())
}

fn supply_and_earthing(flow: &mut Flow, form: &FormData) -> Result<()> {
    let symbols = flow.ctx.symbols;

    flow.section("5. SUPPLY CHARACTERISTICS")?;
    flow.fields(&format_supply(form, symbols))?;
    flow.gap(Mm(3.0));

    flow.section("6. EARTHING AND PROTECTIVE BONDING")?;
    flow.fields(&format_earthing(form, symbols))?;
    flow.gap(Mm(1.0));
    checkbox_row(
        flow,
        "Bonding to:",
        &[
            ("Water", *form.bonding_water),
            ("Gas", *form.bonding_gas),
            ("Oil", *form.bonding_oil),
            ("Structural steel", *form.bonding_structural_steel),
            ("Lightning protection", *form.bonding_lightning_protection),
        ],
    )?;
    if form.bonding_other.is_present() {
        let other = format!("Other bonding: {}", form.bonding_other.trim());
        flow.paragraph(&other, Mm(38.0), &flow.ctx.regular(Pt(8.0)))?;
    }
    checkbox_row(
        flow,
        "Verified:",
        &[
            ("Earthing conductor", *form.earthing_conductor_verified),
            ("Main protective bonding", *form.main_bonding_verified),
        ],
    )?;
    flow.gap(Mm(3.0));

    flow.section("7. CONSUMER UNIT AND MAIN SWITCH")?;
    flow.fields(&format_consumer_unit(form))?;
    flow.gap(Mm(3.0));

    flow.section("8. DISTRIBUTION BOARD VERIFICATION")?;
    let ipf = match form.db_ipf.trim() {
        "" => String::new(),
        ipf => format!("{ipf}kA"),
    };
    flow.fields(&[
        ("Board reference", form.db_reference.trim().to_string()),
        ("Location", form.db_location.trim().to_string()),
        ("Zs at board", symbols.suffixed(&form.db_zs, Symbol::Ohm)),
        ("Ipf at board", ipf),
    ])?;
    checkbox_row(
        flow,
        "Confirmed:",
        &[
            ("Polarity", *form.polarity_confirmed),
            ("Phase sequence", *form.phase_sequence_confirmed),
        ],
    )?;
    flow.gap(Mm(3.0));
    Ok(())
}

fn overall_assessment(flow: &mut Flow, form: &FormData, counts: &DefectCounts) -> Result<()> {
    let assessment = assess(form, counts);
    info!(
        satisfactory = assessment.satisfactory,
        c1 = counts.c1,
        c2 = counts.c2,
        c3 = counts.c3,
        fi = counts.fi,
        "overall assessment"
    );

    flow.section("9. OVERALL ASSESSMENT OF THE INSTALLATION")?;
    let height = Mm(22.0);
    flow.ensure(height + Mm(3.0))?;
    let area = Area::new(flow.left, flow.cursor.y, flow.width, height);
    rect(
        flow.doc,
        flow.cursor.page,
        area,
        Paint::Stroke {
            colour: assessment.colour(),
            width: Mm(0.8),
        },
    )?;
    let centre = flow.left + flow.width / 2.0;
    draw_text(
        flow.doc,
        flow.cursor.page,
        assessment.label,
        centre,
        area.y + Mm(8.0),
        &flow
            .ctx
            .bold(Pt(16.0))
            .coloured(assessment.colour())
            .aligned(Align::Centre),
    )?;
    draw_text(
        flow.doc,
        flow.cursor.page,
        assessment.reason,
        centre,
        area.y + Mm(13.5),
        &flow.ctx.regular(Pt(9.0)).aligned(Align::Centre),
    )?;
    let tally = format!(
        "C1: {}    C2: {}    C3: {}    FI: {}    Total: {}",
        counts.c1,
        counts.c2,
        counts.c3,
        counts.fi,
        counts.total()
    );
    draw_text(
        flow.doc,
        flow.cursor.page,
        &tally,
        centre,
        area.y + Mm(18.5),
        &flow
            .ctx
            .regular(Pt(8.0))
            .coloured(colours::MUTED)
            .aligned(Align::Centre),
    )?;
    flow.gap(height + Mm(3.0));

    if form.additional_comments.is_present() {
        flow.line("Additional comments:", &flow.ctx.bold(Pt(8.0)))?;
        flow.paragraph(
            form.additional_comments.trim(),
            Mm(0.0),
            &flow.ctx.regular(Pt(8.0)),
        )?;
        flow.gap(Mm(3.0));
    }
    Ok(())
}

fn code_legend(flow: &mut Flow) -> Result<()> {
    flow.gap(Mm(2.0));
    flow.line("CLASSIFICATION CODES", &flow.ctx.bold(Pt(8.5)))?;
    for code in LEGEND {
        let style = flow.ctx.regular(Pt(8.0)).coloured(code_colour(code));
        let entry = format!(
            "{code} - {}. {}",
            code_description(code),
            code_urgency(code)
        );
        flow.paragraph(&entry, Mm(2.0), &style)?;
    }
    Ok(())
}

fn test_results_pages(flow: &mut Flow, form: &FormData) -> Result<()> {
    let groups = group_by_board(&form.test_results);
    let titled = groups.len() > 1;
    for (i, (board_id, results)) in groups.iter().enumerate() {
        flow.new_page(Orientation::Landscape);
        if i == 0 {
            flow.bookmark("Schedule of Test Results");
        }
        flow.line(
            "SCHEDULE OF CIRCUIT DETAILS AND TEST RESULTS",
            &flow.ctx.bold(Pt(11.0)).coloured(colours::PRIMARY),
        )?;
        if titled {
            let title = board_title(board_id, &form.distribution_boards);
            flow.line(&title, &flow.ctx.bold(Pt(9.0)))?;
        }
        flow.gap(Mm(2.0));
        flow.cursor = test_results_table(flow.doc, flow.ctx, flow.cursor, flow.left, results)?;
        debug!(board = %board_id, circuits = results.len(), "test results laid out");
    }
    Ok(())
}

fn signature_box(
    flow: &mut Flow,
    x: Mm,
    width: Mm,
    title: &str,
    fields: &[Field],
    signature: &str,
    details: &SignatureDetails,
) -> Result<Mm> {
    let page = flow.cursor.page;
    let top = flow.cursor.y;
    let inner = x + Mm(3.0);
    let label = flow.ctx.bold(Pt(7.5));
    let value = flow.ctx.regular(Pt(7.5));

    draw_text(
        flow.doc,
        page,
        title,
        inner,
        top + Mm(5.5),
        &flow.ctx.bold(Pt(9.0)).coloured(colours::PRIMARY),
    )?;
    let mut y = top + Mm(11.0);
    for (name, text) in fields {
        draw_text(flow.doc, page, &format!("{name}:"), inner, y, &label)?;
        let shown = truncate_with_ellipsis(text, 38);
        draw_text(flow.doc, page, &shown, inner + Mm(24.0), y, &value)?;
        y += Mm(4.2);
    }

    draw_text(flow.doc, page, "Signature:", inner, y + Mm(1.0), &label)?;
    let area = Area::new(inner + Mm(24.0), y - Mm(2.0), width - Mm(30.0), Mm(14.0));
    let used = stamp_signature(flow.doc, flow.ctx, page, area, signature, details);
    Ok(area.y + used.max(area.height) + Mm(3.0) - top)
}

fn declaration_page(flow: &mut Flow, form: &FormData, options: &ExportOptions) -> Result<()> {
    flow.new_page(Orientation::Portrait);
    flow.bookmark("Declaration");

    flow.section("TEST INSTRUMENTS")?;
    flow.fields(&[
        ("Make / model", form.test_instrument_make.trim().to_string()),
        ("Serial number", form.test_instrument_serial.trim().to_string()),
        (
            "Calibration date",
            format_date(Some(form.test_instrument_calibration_date.as_str()), false),
        ),
    ])?;
    flow.gap(Mm(3.0));

    flow.section("INSPECTOR DECLARATION")?;
    flow.paragraph(INSPECTOR_DECLARATION, Mm(0.0), &flow.ctx.regular(Pt(8.0)))?;
    flow.gap(Mm(3.0));

    flow.section("PROFESSIONAL REGISTRATION")?;
    flow.fields(&[
        ("Scheme", form.registration_scheme.trim().to_string()),
        ("Registration no.", form.registration_number.trim().to_string()),
        ("Qualifications", form.inspector_qualifications.trim().to_string()),
    ])?;
    flow.gap(Mm(4.0));

    let estimate = Mm(62.0);
    flow.ensure(estimate)?;
    let gutter = Mm(6.0);
    let width = (flow.width - gutter) / 2.0;
    let signed = |reason: &str| SignatureDetails {
        timestamp: format_timestamp(&flow.ctx.generated_at),
        location: form
            .installation_address
            .is_present()
            .then(|| form.installation_address.trim().to_string()),
        reason: Some(reason.to_string()),
    };
    let (inspected, authorised) = (
        signed("Inspection and testing"),
        signed("Authorised for issue"),
    );
    let left = flow.left;
    let heights = [
        signature_box(
            flow,
            left,
            width,
            "Inspected By",
            &format_inspector(form),
            form.inspecting_signature(),
            &inspected,
        )?,
        signature_box(
            flow,
            left + width + gutter,
            width,
            "Report Authorised For Issue By",
            &format_authoriser(form),
            &form.authorised_by_signature,
            &authorised,
        )?,
    ];
    let height = heights[0].max(heights[1]);
    for x in [left, left + width + gutter] {
        rect(
            flow.doc,
            flow.cursor.page,
            Area::new(x, flow.cursor.y, width, height),
            Paint::Stroke {
                colour: colours::PRIMARY,
                width: Mm(0.4),
            },
        )?;
    }
    flow.gap(height + Mm(5.0));

    if let Some(url) = options.verification_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let size = Mm(25.0);
        flow.ensure(size + Mm(6.0))?;
        draw_text(
            flow.doc,
            flow.cursor.page,
            "Verify this certificate online:",
            flow.left,
            flow.cursor.y + Mm(4.0),
            &flow.ctx.bold(Pt(8.0)),
        )?;
        let x = flow.left + flow.width - size;
        qr_placeholder(flow.doc, flow.ctx, flow.cursor.page, x, flow.cursor.y, size, url);
        flow.gap(size + Mm(6.0));
    }
    Ok(())
}

fn next_inspection(flow: &mut Flow, form: &FormData) -> Result<()> {
    let height = Mm(20.0);
    flow.ensure(height + Mm(4.0))?;
    let area = Area::new(flow.left, flow.cursor.y, flow.width, height);
    rect(
        flow.doc,
        flow.cursor.page,
        area,
        Paint::FillAndStroke {
            fill: colours::AMBER_TINT,
            stroke: colours::AMBER,
            width: Mm(0.8),
        },
    )?;
    let centre = flow.left + flow.width / 2.0;
    draw_text(
        flow.doc,
        flow.cursor.page,
        "RECOMMENDED DATE OF NEXT INSPECTION",
        centre,
        area.y + Mm(6.0),
        &flow.ctx.bold(Pt(8.0)).aligned(Align::Centre),
    )?;
    let date = match format_date(Some(form.next_inspection_date.as_str()), false) {
        d if d.is_empty() => "Date to be confirmed".to_string(),
        d => d,
    };
    draw_text(
        flow.doc,
        flow.cursor.page,
        &date,
        centre,
        area.y + Mm(14.5),
        &flow.ctx.bold(Pt(16.0)).aligned(Align::Centre),
    )?;
    flow.gap(height + Mm(4.0));
    Ok(())
}

fn guidance(flow: &mut Flow) -> Result<()> {
    let style = flow.ctx.regular(Pt(7.0));
    let leading = flow.leading(&style)?;
    let gutter = Mm(6.0);
    let width = (flow.width - gutter) / 2.0;
    let number_width = Mm(5.0);

    let mut columns: [Vec<(usize, Vec<String>)>; 2] = [Vec::new(), Vec::new()];
    for (i, paragraph) in GUIDANCE.iter().enumerate() {
        let lines = flow.wrap(paragraph, &style, width - number_width)?;
        columns[i * 2 / GUIDANCE.len()].push((i + 1, lines));
    }
    let paragraph_gap = Mm(1.5);
    let column_height = |column: &[(usize, Vec<String>)]| {
        column
            .iter()
            .map(|(_, lines)| leading * lines.len() as f32 + paragraph_gap)
            .sum::<Mm>()
    };
    let height = column_height(&columns[0]).max(column_height(&columns[1]));

    flow.ensure(flow.ctx.layout.section_header_height + height + Mm(4.0))?;
    flow.section("GUIDANCE FOR RECIPIENTS")?;
    let top = flow.cursor.y;
    for (c, column) in columns.iter().enumerate() {
        let x = flow.left + (width + gutter) * c as f32;
        let mut y = top + leading * 0.75;
        for (number, lines) in column {
            draw_text(flow.doc, flow.cursor.page, &format!("{number}."), x, y, &style)?;
            y = draw_lines(flow.doc, flow.cursor.page, lines, x + number_width, y, leading, &style)?;
            y += paragraph_gap;
        }
    }
    flow.gap(height);
    Ok(())
}

impl Exporter {
    /// Lay out the full certificate without writing it. The form is expected to be
    /// sanitised already.
    pub async fn layout_certificate(
        &self,
        form: &FormData,
        options: &ExportOptions,
    ) -> Result<Document> {
        let report = validate_eicr_data(form);
        let metrics = calculate_quality_metrics(form);
        info!(
            completion = report.completion_score,
            missing = ?report.missing_fields,
            warnings = ?report.warnings,
            quality = metrics.overall_score,
            test_coverage = metrics.test_coverage,
            "certificate export started"
        );

        let mut document = Document::default();
        let ctx = self.context(&mut document, options).await;
        let branding = format_company(form);
        let counts = count_defects(&form.defect_observations);

        let mut flow = Flow::start(&mut document, &ctx);
        flow.bookmark("Certificate");
        let header = HeaderInfo {
            certificate_number: form.certificate_number.trim().to_string(),
            date: format_date(Some(form.inspection_date.as_str()), false),
            branding: branding.clone(),
        };
        let y = header_block(flow.doc, flow.ctx, flow.cursor.page, &header)?;
        flow.cursor = flow.cursor.at(y);

        client_and_installation(&mut flow, form)?;
        supply_and_earthing(&mut flow, form)?;
        overall_assessment(&mut flow, form, &counts)?;

        if !form.defect_observations.is_empty() {
            flow.new_page(Orientation::Portrait);
            flow.bookmark("Observations");
            flow.section(&format!(
                "10. OBSERVATIONS AND RECOMMENDATIONS ({})",
                form.defect_observations.len()
            ))?;
            for observation in format_observations(&form.defect_observations) {
                observation_block(
                    &mut flow,
                    &observation,
                    self.photos.as_ref(),
                    &self.config.photos,
                )
                .await?;
            }
            code_legend(&mut flow)?;
        }

        if !form.test_results.is_empty() {
            test_results_pages(&mut flow, form)?;
        }

        if !form.inspection_items.is_empty() {
            flow.new_page(Orientation::Portrait);
            flow.bookmark("Schedule of Inspections");
            flow.section("SCHEDULE OF INSPECTIONS")?;
            flow.cursor = inspection_checklist_table(
                flow.doc,
                flow.ctx,
                flow.cursor,
                flow.left,
                &form.inspection_items,
            )?;
        }

        declaration_page(&mut flow, form, options)?;
        next_inspection(&mut flow, form)?;
        guidance(&mut flow)?;

        let watermark = &self.config.watermark;
        if watermark.enabled {
            let text = options.watermark_text.as_deref().unwrap_or(&watermark.text);
            add_watermark(&mut document, &ctx, text, watermark.opacity, watermark.font_size)?;
        }
        apply_footers(&mut document, &ctx, &branding)?;
        Ok(document)
    }

    /// Build the full certificate. The form is sanitised first; everything after
    /// that reads it as-is.
    pub async fn export_certificate(
        &self,
        form: FormData,
        options: &ExportOptions,
    ) -> Result<ExportedDocument> {
        let form = sanitize_object(form)?;
        let generated_at = options.generated_at();
        let options = ExportOptions {
            generated_at: Some(generated_at),
            ..options.clone()
        };
        let document = self.layout_certificate(&form, &options).await?;
        write_out(
            document,
            certificate_filename(&form),
            build_metadata(&form, generated_at),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_splits_evenly() {
        let columns: Vec<usize> = (0..GUIDANCE.len())
            .map(|i| i * 2 / GUIDANCE.len())
            .collect();
        assert_eq!(columns.iter().filter(|&&c| c == 0).count(), 5);
        assert_eq!(columns.iter().filter(|&&c| c == 1).count(), 5);
    }
}
