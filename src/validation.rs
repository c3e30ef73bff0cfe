//! Advisory checks on how complete a certificate is. Nothing here stops an export;
//! the scores are only logged.

use crate::model::{DefectCode, FormData};
use crate::safe::Text;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Percentage of the required fields that are filled in
    pub completion_score: u8,
    pub missing_fields: Vec<&'static str>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub overall_score: u8,
    pub completeness: u8,
    /// Percentage of circuits with both insulation resistance and Zs recorded
    pub test_coverage: u8,
    /// Percentage of observations with a description and a recommendation
    pub observation_detail: u8,
}

fn required_fields(form: &FormData) -> [(&'static str, &Text); 10] {
    [
        ("clientName", &form.client_name),
        ("installationAddress", &form.installation_address),
        ("inspectionDate", &form.inspection_date),
        ("purposeOfInspection", &form.purpose_of_inspection),
        ("earthingArrangement", &form.earthing_arrangement),
        ("supplyVoltage", &form.supply_voltage),
        ("mainSwitchCurrentRating", &form.main_switch_current_rating),
        ("inspectorName", form.inspecting_name()),
        ("inspectorSignature", form.inspecting_signature()),
        ("nextInspectionDate", &form.next_inspection_date),
    ]
}

fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 100;
    }
    ((part * 100) / whole) as u8
}

pub fn validate_eicr_data(form: &FormData) -> ValidationReport {
    let fields = required_fields(form);
    let missing_fields: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| !value.is_present())
        .map(|(name, _)| *name)
        .collect();

    let mut warnings = Vec::new();
    if form.test_results.is_empty() {
        warnings.push("No circuit test results recorded".to_string());
    }
    if form.inspection_items.is_empty() {
        warnings.push("No inspection schedule recorded".to_string());
    }
    let unclassified = form
        .defect_observations
        .iter()
        .filter(|o| o.defect_code == DefectCode::Unknown)
        .count();
    if unclassified > 0 {
        warnings.push(format!("{unclassified} observation(s) have no classification code"));
    }

    ValidationReport {
        completion_score: percentage(fields.len() - missing_fields.len(), fields.len()),
        missing_fields,
        warnings,
    }
}

pub fn calculate_quality_metrics(form: &FormData) -> QualityMetrics {
    let completeness = validate_eicr_data(form).completion_score;

    let tested = form
        .test_results
        .iter()
        .filter(|r| r.insulation_live_earth.is_present() && r.zs.is_present())
        .count();
    let test_coverage = percentage(tested, form.test_results.len());

    let detailed = form
        .defect_observations
        .iter()
        .filter(|o| o.description.is_present() && o.recommendation.is_present())
        .count();
    let observation_detail = percentage(detailed, form.defect_observations.len());

    let overall = (completeness as u32 * 2 + test_coverage as u32 + observation_detail as u32) / 4;
    QualityMetrics {
        overall_score: overall as u8,
        completeness,
        test_coverage,
        observation_detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CircuitTestResult, DefectObservation};

    #[test]
    fn empty_forms_score_zero() {
        let report = validate_eicr_data(&FormData::default());
        assert_eq!(report.completion_score, 0);
        assert_eq!(report.missing_fields.len(), 10);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn metrics_weigh_completeness_double() {
        let form = FormData {
            client_name: Text::from("Jane Doe"),
            test_results: vec![
                CircuitTestResult {
                    insulation_live_earth: Text::from(">200"),
                    zs: Text::from("0.35"),
                    ..Default::default()
                },
                CircuitTestResult::default(),
            ],
            defect_observations: vec![DefectObservation {
                defect_code: DefectCode::C3,
                ..Default::default()
            }],
            ..Default::default()
        };
        let metrics = calculate_quality_metrics(&form);
        assert_eq!(metrics.completeness, 10);
        assert_eq!(metrics.test_coverage, 50);
        assert_eq!(metrics.observation_detail, 0);
        assert_eq!(metrics.overall_score, (10 * 2 + 50) / 4);
    }
}
