use super::{write_out, ExportOptions, ExportedDocument, Exporter, Flow};
use crate::colour::colours;
use crate::config::PhotosSection;
use crate::document::Document;
use crate::enhancements::{build_metadata, format_date};
use crate::filename::observations_filename;
use crate::format::*;
use crate::layout::*;
use crate::model::{DefectCode, DefectObservation, FormData};
use crate::photos::{attach_observation_photos, PhotoStore};
use crate::rect::Area;
use crate::templates::{apply_footers, header_block, HeaderInfo};
use crate::units::*;
use crate::Result;
use tracing::{debug, info};

/// Most of a page an observation block asks the guard for up front; longer blocks
/// break between lines instead
const MAX_BLOCK_ESTIMATE: Mm = Mm(60.0);

const BODY_INDENT: Mm = Mm(4.0);

/// One observation: its coded heading, what the code means, the description,
/// recommendation, regulation and rectified state, then its photos
pub(crate) async fn observation_block(
    flow: &mut Flow<'_>,
    observation: &FormattedObservation,
    store: &dyn PhotoStore,
    photos: &PhotosSection,
) -> Result<()> {
    let ctx = flow.ctx;
    let heading = ctx.bold(Pt(10.0)).coloured(code_colour(observation.code));
    let meaning = ctx.regular(Pt(7.5)).coloured(colours::MUTED);
    let body = ctx.regular(Pt(9.0));

    let text_width = flow.width - BODY_INDENT;
    let description = flow.wrap(&observation.description, &body, text_width)?;
    let recommendation = match observation.recommendation.as_str() {
        "" => Vec::new(),
        r => flow.wrap(&format!("Recommendation: {r}"), &body, text_width)?,
    };
    let regulation = match observation.regulation.as_str() {
        "" => Vec::new(),
        r => flow.wrap(&format!("Regulation: {r}"), &body, text_width)?,
    };

    let body_lines = description.len() + recommendation.len() + regulation.len() + 1;
    let estimate = flow.leading(&heading)?
        + flow.leading(&meaning)?
        + flow.leading(&body)? * body_lines as f32
        + Mm(4.0);
    flow.ensure(estimate.min(MAX_BLOCK_ESTIMATE))?;

    let top = flow.cursor;
    flow.lines(&[observation.heading.clone()], flow.left + BODY_INDENT, &heading)?;
    if observation.code != DefectCode::Unknown {
        let summary = match observation.urgency {
            "" => observation.code_description.to_string(),
            urgency => format!("{}. {urgency}", observation.code_description),
        };
        flow.lines(&[summary], flow.left + BODY_INDENT, &meaning)?;
    }
    if top.page == flow.cursor.page {
        rect(
            flow.doc,
            top.page,
            Area::new(flow.left, top.y + Mm(0.5), Mm(1.2), flow.cursor.y - top.y),
            Paint::Fill(code_colour(observation.code)),
        )?;
    }

    let x = flow.left + BODY_INDENT;
    flow.lines(&description, x, &body)?;
    flow.lines(&recommendation, x, &body)?;
    flow.lines(&regulation, x, &body)?;
    flow.lines(&[format!("Rectified: {}", observation.rectified)], x, &body)?;
    flow.gap(Mm(2.0));

    flow.cursor =
        attach_observation_photos(flow.doc, store, &observation.id, flow.cursor, x, photos).await?;
    flow.gap(Mm(3.0));
    debug!(id = %observation.id, code = %observation.code, "observation laid out");
    Ok(())
}

fn installation_lines(form: &FormData) -> Vec<String> {
    let date = match format_date(Some(form.inspection_date.as_str()), false) {
        d if d.is_empty() => NOT_SPECIFIED.to_string(),
        d => d,
    };
    let mut lines = vec![
        format!("Client: {}", form.client_name.or(NOT_SPECIFIED)),
        format!(
            "Installation Address: {}",
            form.installation_address.or(NOT_SPECIFIED)
        ),
        format!("Inspection Date: {date}"),
    ];
    if form.inspector_name.is_present() {
        lines.push(format!("Inspector: {}", form.inspector_name.trim()));
    }
    lines
}

impl Exporter {
    /// Lay out the observations-only report without writing it
    pub async fn layout_observations(
        &self,
        form: &FormData,
        observations: &[DefectObservation],
        options: &ExportOptions,
    ) -> Result<Document> {
        let mut document = Document::default();
        let ctx = self.context(&mut document, options).await;
        let branding = format_company(form);
        info!(observations = observations.len(), "observations export started");

        let mut flow = Flow::start(&mut document, &ctx);
        let header = HeaderInfo {
            certificate_number: form.report_reference.or(form.certificate_number.as_str()).to_string(),
            date: format_date(Some(form.inspection_date.as_str()), false),
            branding: branding.clone(),
        };
        let y = header_block(flow.doc, flow.ctx, flow.cursor.page, &header)?;
        flow.cursor = flow.cursor.at(y);
        flow.bookmark("Observations");

        flow.section("INSTALLATION DETAILS")?;
        let detail = ctx.regular(Pt(9.0));
        for line in installation_lines(form) {
            flow.line(&line, &detail)?;
        }
        flow.gap(Mm(4.0));

        flow.section(&format!("OBSERVATIONS ({})", observations.len()))?;
        if observations.is_empty() {
            flow.line("No observations recorded.", &detail.coloured(colours::MUTED))?;
        }
        for observation in format_observations(observations) {
            observation_block(&mut flow, &observation, self.photos.as_ref(), &self.config.photos)
                .await?;
        }

        apply_footers(&mut document, &ctx, &branding)?;
        Ok(document)
    }

    /// Build the observations-only report: header, installation details, then each
    /// observation with its photos
    pub async fn export_observations(
        &self,
        form: &FormData,
        observations: &[DefectObservation],
        options: &ExportOptions,
    ) -> Result<ExportedDocument> {
        let generated_at = options.generated_at();
        let options = ExportOptions {
            generated_at: Some(generated_at),
            ..options.clone()
        };
        let document = self.layout_observations(form, observations, &options).await?;
        let mut metadata = build_metadata(form, generated_at);
        metadata.subject = "EICR Observations".to_string();
        write_out(document, observations_filename(form), metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe::Text;

    #[test]
    fn installation_lines_default_blank_fields() {
        let lines = installation_lines(&FormData {
            client_name: Text::from("Jane Doe"),
            inspection_date: Text::from("2024-01-15"),
            ..Default::default()
        });
        assert_eq!(
            lines,
            vec![
                "Client: Jane Doe".to_string(),
                "Installation Address: Not specified".to_string(),
                "Inspection Date: 15/01/2024".to_string(),
            ]
        );
    }
}
