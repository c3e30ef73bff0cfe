//! Turning raw records into the strings the certificate prints.
//!
//! Nothing here draws or fails: missing fields become `""` or a stated default,
//! and every lookup (defect code to meaning, outcome to display code) is resolved
//! before layout sees the data.

use crate::colour::{colours, Colour};
use crate::context::{Symbol, Symbols};
use crate::layout::truncate_with_ellipsis;
use crate::model::*;

/// Placeholder for required-looking fields that were left blank
pub const NOT_SPECIFIED: &str = "Not specified";

/// Longest observation item text printed in a summary line
const ITEM_SUMMARY_CHARS: usize = 60;

/// What a defect code means
pub fn code_description(code: DefectCode) -> &'static str {
    match code {
        DefectCode::C1 => "Danger present - risk of injury",
        DefectCode::C2 => "Potentially dangerous",
        DefectCode::C3 => "Improvement recommended",
        DefectCode::FI => "Further investigation required",
        DefectCode::NotApplicable => "Not applicable",
        DefectCode::Limitation => "Limitation",
        DefectCode::Unknown => "Unclassified",
    }
}

/// How soon a defect code needs acting on
pub fn code_urgency(code: DefectCode) -> &'static str {
    match code {
        DefectCode::C1 => "Immediate action required",
        DefectCode::C2 => "Urgent remedial action required",
        DefectCode::C3 => "Improvement recommended",
        DefectCode::FI => "Investigate without delay",
        DefectCode::NotApplicable | DefectCode::Limitation | DefectCode::Unknown => "",
    }
}

/// Highlight colour of a code badge
pub fn code_colour(code: DefectCode) -> Colour {
    match code {
        DefectCode::C1 => colours::CODE_C1,
        DefectCode::C2 => colours::CODE_C2,
        DefectCode::C3 => colours::CODE_C3,
        DefectCode::FI => colours::CODE_FI,
        _ => colours::MUTED,
    }
}

/// Number of observations per actionable code. Observations coded N/A, LIM or not
/// coded at all count towards nothing.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DefectCounts {
    pub c1: usize,
    pub c2: usize,
    pub c3: usize,
    pub fi: usize,
}

impl DefectCounts {
    pub fn total(&self) -> usize {
        self.c1 + self.c2 + self.c3 + self.fi
    }
}

pub fn count_defects(observations: &[DefectObservation]) -> DefectCounts {
    observations
        .iter()
        .fold(DefectCounts::default(), |mut counts, o| {
            match o.defect_code {
                DefectCode::C1 => counts.c1 += 1,
                DefectCode::C2 => counts.c2 += 1,
                DefectCode::C3 => counts.c3 += 1,
                DefectCode::FI => counts.fi += 1,
                _ => {}
            }
            counts
        })
}

/// The overall assessment printed on the summary
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub satisfactory: bool,
    /// "SATISFACTORY" or "UNSATISFACTORY"
    pub label: &'static str,
    pub reason: &'static str,
}

impl Assessment {
    pub fn colour(&self) -> Colour {
        if self.satisfactory {
            colours::SATISFACTORY
        } else {
            colours::UNSATISFACTORY
        }
    }
}

/// Whether the form carries an explicit satisfactory marker
pub fn marked_satisfactory(form: &FormData) -> bool {
    form.overall_assessment.trim().eq_ignore_ascii_case("satisfactory")
        || form
            .satisfactory_for_continued_use
            .trim()
            .eq_ignore_ascii_case("yes")
}

/// Satisfactory only with no C1, C2 or FI observations *and* an explicit marker;
/// otherwise the reason names the most severe code present, in the order C1, C2, FI.
pub fn assess(form: &FormData, counts: &DefectCounts) -> Assessment {
    let defect_free = counts.c1 == 0 && counts.c2 == 0 && counts.fi == 0;
    if defect_free && marked_satisfactory(form) {
        return Assessment {
            satisfactory: true,
            label: "SATISFACTORY",
            reason: "The installation is satisfactory for continued use",
        };
    }

    let reason = if counts.c1 > 0 {
        "Danger present (C1) - immediate remedial action required"
    } else if counts.c2 > 0 {
        "Potentially dangerous conditions (C2) - urgent remedial action required"
    } else if counts.fi > 0 {
        "Further investigation (FI) required without delay"
    } else {
        "The installation requires attention"
    };

    Assessment {
        satisfactory: false,
        label: "UNSATISFACTORY",
        reason,
    }
}

/// An observation ready to print
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedObservation {
    pub id: String,
    pub code: DefectCode,
    /// `[C1] Main Switch`
    pub heading: String,
    pub description: String,
    pub recommendation: String,
    pub regulation: String,
    pub rectified: String,
    pub code_description: &'static str,
    pub urgency: &'static str,
}

pub fn format_observation(observation: &DefectObservation) -> FormattedObservation {
    let code = observation.defect_code;
    let item = truncate_with_ellipsis(observation.item.or("Observation"), ITEM_SUMMARY_CHARS);
    let heading = match code {
        DefectCode::Unknown => item,
        code => format!("[{code}] {item}"),
    };

    FormattedObservation {
        id: observation.id.trim().to_string(),
        code,
        heading,
        description: observation.description.trim().to_string(),
        recommendation: observation.recommendation.trim().to_string(),
        regulation: observation.regulation.trim().to_string(),
        rectified: observation.rectified.to_string(),
        code_description: code_description(code),
        urgency: code_urgency(code),
    }
}

pub fn format_observations(observations: &[DefectObservation]) -> Vec<FormattedObservation> {
    observations.iter().map(format_observation).collect()
}

/// The 30 cells of a schedule-of-test-results row, in column order
pub fn format_test_result(result: &CircuitTestResult) -> Vec<String> {
    [
        &result.circuit_number,
        &result.circuit_description,
        &result.type_of_wiring,
        &result.reference_method,
        &result.points_served,
        &result.live_size,
        &result.cpc_size,
        &result.bs_standard,
        &result.protective_device_curve,
        &result.protective_device_rating,
        &result.protective_device_ka_rating,
        &result.max_zs,
        &result.rcd_bs_standard,
        &result.rcd_type,
        &result.rcd_rating,
        &result.rcd_rating_a,
        &result.ring_r1,
        &result.ring_rn,
        &result.ring_r2,
        &result.r1r2,
        &result.r2,
        &result.insulation_test_voltage,
        &result.insulation_live_neutral,
        &result.insulation_live_earth,
        &result.polarity,
        &result.zs,
        &result.rcd_one_x,
        &result.rcd_test_button,
        &result.afdd_test,
        &result.notes,
    ]
    .into_iter()
    .map(|field| field.trim().to_string())
    .collect()
}

/// Header of the schedule of test results, matching [format_test_result]
pub fn test_result_headings(symbols: Symbols) -> Vec<String> {
    let mm2 = format!("mm{}", symbols.resolve(Symbol::Squared));
    let ohm = symbols.resolve(Symbol::Ohm).trim().to_string();
    vec![
        "Cct".to_string(),
        "Description".to_string(),
        "Wiring".to_string(),
        "Ref".to_string(),
        "Pts".to_string(),
        format!("Live {mm2}"),
        format!("CPC {mm2}"),
        "BS (EN)".to_string(),
        "Type".to_string(),
        "A".to_string(),
        "kA".to_string(),
        format!("Max Zs {ohm}"),
        "RCD BS (EN)".to_string(),
        "RCD type".to_string(),
        "mA".to_string(),
        "RCD A".to_string(),
        "r1".to_string(),
        "rn".to_string(),
        "r2".to_string(),
        "R1+R2".to_string(),
        "R2".to_string(),
        "Test V".to_string(),
        "IR L-N".to_string(),
        "IR L-E".to_string(),
        "Pol".to_string(),
        format!("Zs {ohm}"),
        "RCD ms".to_string(),
        "Btn".to_string(),
        "AFDD".to_string(),
        "Remarks".to_string(),
    ]
}

/// The 10 cells of a circuit-schedule row, with unit suffixes on present values
pub fn format_circuit(result: &CircuitTestResult, symbols: Symbols) -> Vec<String> {
    let size = |value: &str| {
        let value = value.trim();
        if value.is_empty() {
            String::new()
        } else {
            format!("{value}mm{}", symbols.resolve(Symbol::Squared))
        }
    };
    let device = [
        result.bs_standard.trim(),
        result.protective_device_curve.trim(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ");
    let amps = |value: &str| {
        let value = value.trim();
        if value.is_empty() {
            String::new()
        } else {
            format!("{value}A")
        }
    };

    vec![
        result.circuit_number.trim().to_string(),
        result.circuit_description.trim().to_string(),
        size(&result.live_size),
        size(&result.cpc_size),
        device,
        amps(&result.protective_device_rating),
        result.protective_device_ka_rating.trim().to_string(),
        symbols.suffixed(&result.max_zs, Symbol::Ohm),
        symbols.suffixed(&result.zs, Symbol::Ohm),
        result.rcd_rating.trim().to_string(),
    ]
}

pub fn circuit_headings() -> Vec<String> {
    [
        "No.",
        "Description",
        "Live",
        "CPC",
        "Device",
        "Rating",
        "kA",
        "Max Zs",
        "Zs",
        "RCD mA",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// The 4 cells of an inspection checklist row: number, item, clause, outcome code
pub fn format_inspection_item(item: &InspectionItem) -> Vec<String> {
    let number = match item.item_number.trim() {
        "" => item.id.trim(),
        number => number,
    };
    let mut description = item.item.trim().to_string();
    if item.notes.is_present() {
        description = format!("{description} ({})", item.notes.trim());
    }
    vec![
        number.to_string(),
        description,
        item.clause.trim().to_string(),
        item.outcome.display_code().to_string(),
    ]
}

/// Group items by a key, keeping both the groups and the items within them in the
/// order they first appear
fn group_by<'a, T>(items: &'a [T], key: impl Fn(&T) -> String) -> Vec<(String, Vec<&'a T>)> {
    let mut groups: Vec<(String, Vec<&T>)> = Vec::new();
    for item in items {
        let key = key(item);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(item),
            None => groups.push((key, vec![item])),
        }
    }
    groups
}

/// Checklist items grouped by section; items without one go under "General"
pub fn group_by_section(items: &[InspectionItem]) -> Vec<(String, Vec<&InspectionItem>)> {
    group_by(items, |item| item.section.or("General").to_string())
}

/// Test results grouped by board id; results without one share the `""` group
pub fn group_by_board(results: &[CircuitTestResult]) -> Vec<(String, Vec<&CircuitTestResult>)> {
    group_by(results, |result| result.board_id.trim().to_string())
}

/// A readable title for a board group: the board's name and location when the form
/// lists the board, its id otherwise
pub fn board_title(board_id: &str, boards: &[DistributionBoard]) -> String {
    let board = boards.iter().find(|b| b.id.trim() == board_id);
    match board {
        Some(board) if board.name.is_present() && board.location.is_present() => format!(
            "Distribution Board: {} ({})",
            board.name.trim(),
            board.location.trim()
        ),
        Some(board) if board.name.is_present() => {
            format!("Distribution Board: {}", board.name.trim())
        }
        _ if board_id.is_empty() => "Distribution Board".to_string(),
        _ => format!("Distribution Board: {board_id}"),
    }
}

/// A label and the value printed beside it
pub type Field = (&'static str, String);

fn or_default(text: &crate::safe::Text) -> String {
    text.or(NOT_SPECIFIED).to_string()
}

fn plain(text: &crate::safe::Text) -> String {
    text.trim().to_string()
}

pub fn format_client(form: &FormData) -> Vec<Field> {
    vec![
        ("Client", or_default(&form.client_name)),
        ("Address", plain(&form.client_address)),
        ("Phone", plain(&form.client_phone)),
        ("Email", plain(&form.client_email)),
    ]
}

pub fn format_installation(form: &FormData) -> Vec<Field> {
    vec![
        ("Installation address", or_default(&form.installation_address)),
        ("Occupier", plain(&form.occupier)),
        ("Premises", or_default(&form.premises_type)),
        ("Description", plain(&form.premises_description)),
        ("Estimated age", plain(&form.estimated_age_of_installation)),
        ("Alterations", plain(&form.evidence_of_alterations)),
        ("Alterations age", plain(&form.alterations_age)),
        ("Records available", plain(&form.records_available)),
    ]
}

pub fn format_purpose(form: &FormData) -> Vec<Field> {
    vec![
        ("Purpose", or_default(&form.purpose_of_inspection)),
        (
            "Inspection date",
            crate::enhancements::format_date(Some(form.inspection_date.as_str()), false),
        ),
        ("Extent", plain(&form.extent_of_inspection)),
        ("Agreed limitations", plain(&form.agreed_limitations)),
        ("Agreed with", plain(&form.agreed_with)),
        ("Operational limits", plain(&form.operational_limitations)),
    ]
}

pub fn format_supply(form: &FormData, symbols: Symbols) -> Vec<Field> {
    let units = |value: &crate::safe::Text, unit: &str| {
        let value = value.trim();
        if value.is_empty() {
            String::new()
        } else {
            format!("{value}{unit}")
        }
    };
    vec![
        ("Earthing", or_default(&form.earthing_arrangement)),
        ("Supply type", plain(&form.supply_type)),
        ("Voltage", units(&form.supply_voltage, "V")),
        ("Frequency", units(&form.supply_frequency, "Hz")),
        ("Phases", plain(&form.supply_phases)),
        ("PFC", units(&form.prospective_fault_current, "kA")),
        (
            "Ze",
            symbols.suffixed(&form.external_earth_loop_impedance, Symbol::Ohm),
        ),
        ("Supply device BS (EN)", plain(&form.supply_device_bs_en)),
        ("Supply device type", plain(&form.supply_device_type)),
        ("Supply device rating", units(&form.supply_device_rating, "A")),
    ]
}

pub fn format_earthing(form: &FormData, symbols: Symbols) -> Vec<Field> {
    let csa = |value: &crate::safe::Text| {
        let value = value.trim();
        if value.is_empty() {
            String::new()
        } else {
            format!("{value}mm{}", symbols.resolve(Symbol::Squared))
        }
    };
    vec![
        ("Means of earthing", or_default(&form.means_of_earthing)),
        ("Electrode type", plain(&form.earth_electrode_type)),
        (
            "Electrode resistance",
            symbols.suffixed(&form.earth_electrode_resistance, Symbol::Ohm),
        ),
        ("Earthing conductor", plain(&form.earthing_conductor_material)),
        ("Earthing conductor CSA", csa(&form.earthing_conductor_csa)),
        ("Bonding conductor", plain(&form.main_bonding_conductor_material)),
        ("Bonding conductor CSA", csa(&form.main_bonding_csa)),
    ]
}

pub fn format_consumer_unit(form: &FormData) -> Vec<Field> {
    vec![
        ("Location", plain(&form.consumer_unit_location)),
        ("Manufacturer", plain(&form.consumer_unit_manufacturer)),
        ("Main switch BS (EN)", plain(&form.main_switch_bs_en)),
        ("Poles", plain(&form.main_switch_poles)),
        ("Current rating", plain(&form.main_switch_current_rating)),
        ("Voltage rating", plain(&form.main_switch_voltage_rating)),
        ("RCD operating current", plain(&form.rcd_operating_current)),
        ("RCD operating time", plain(&form.rcd_operating_time)),
    ]
}

pub fn format_inspector(form: &FormData) -> Vec<Field> {
    let registration = [
        form.registration_scheme.trim(),
        form.registration_number.trim(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" - ");
    let scheme = match form.inspected_by_cp_scheme.trim() {
        "" => registration,
        scheme => scheme.to_string(),
    };
    vec![
        ("Name", or_default(form.inspecting_name())),
        ("Position", plain(&form.inspector_position)),
        ("Qualifications", plain(&form.inspector_qualifications)),
        (
            "Organisation",
            plain(first_present(&form.inspected_by_for_on_behalf_of, &form.company_name)),
        ),
        (
            "Address",
            plain(first_present(&form.inspected_by_address, &form.company_address)),
        ),
        ("Scheme", scheme),
        (
            "Date",
            crate::enhancements::format_date(Some(form.inspector_date.as_str()), false),
        ),
    ]
}

pub fn format_authoriser(form: &FormData) -> Vec<Field> {
    vec![
        ("Name", or_default(&form.authorised_by_name)),
        ("Position", plain(&form.authorised_by_position)),
        (
            "Organisation",
            plain(first_present(&form.authorised_by_for_on_behalf_of, &form.company_name)),
        ),
        (
            "Address",
            plain(first_present(&form.authorised_by_address, &form.company_address)),
        ),
        ("Membership", plain(&form.authorised_by_membership)),
        (
            "Date",
            crate::enhancements::format_date(Some(form.authorised_by_date.as_str()), false),
        ),
    ]
}

/// Company details for the header and footer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyBranding {
    pub name: String,
    pub tagline: String,
    /// Address, phone, email and website joined on one line
    pub contact_line: String,
    /// An image data URI
    pub logo: Option<String>,
}

pub fn format_company(form: &FormData) -> CompanyBranding {
    let contact_line = [
        form.company_address.trim(),
        form.company_phone.trim(),
        form.company_email.trim(),
        form.company_website.trim(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" | ");

    CompanyBranding {
        name: plain(&form.company_name),
        tagline: plain(&form.company_tagline),
        contact_line,
        logo: form
            .company_logo
            .is_present()
            .then(|| form.company_logo.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe::Text;

    fn observation(code: DefectCode) -> DefectObservation {
        DefectObservation {
            defect_code: code,
            ..Default::default()
        }
    }

    fn observations(codes: &[DefectCode]) -> Vec<DefectObservation> {
        codes.iter().copied().map(observation).collect()
    }

    #[test]
    fn counts_exclude_not_applicable() {
        use DefectCode::*;
        let counts = count_defects(&observations(&[C1, C2, C2, C3, FI, NotApplicable]));
        assert_eq!(
            counts,
            DefectCounts {
                c1: 1,
                c2: 2,
                c3: 1,
                fi: 1
            }
        );
        assert_eq!(counts.total(), 5);
    }

    fn marked() -> FormData {
        FormData {
            satisfactory_for_continued_use: Text::from("Yes"),
            ..Default::default()
        }
    }

    #[test]
    fn satisfactory_needs_no_serious_defects_and_a_marker() {
        use DefectCode::*;
        let assessment = assess(&marked(), &count_defects(&observations(&[C3, C3])));
        assert!(assessment.satisfactory);
        assert_eq!(assessment.label, "SATISFACTORY");

        let unmarked = assess(&FormData::default(), &DefectCounts::default());
        assert!(!unmarked.satisfactory);
        assert_eq!(unmarked.reason, "The installation requires attention");

        let by_assessment = FormData {
            overall_assessment: Text::from("satisfactory"),
            ..Default::default()
        };
        assert!(assess(&by_assessment, &DefectCounts::default()).satisfactory);
    }

    #[test]
    fn reasons_follow_severity() {
        use DefectCode::*;
        let c1 = assess(&marked(), &count_defects(&observations(&[FI, C2, C1, C3])));
        assert_eq!(c1.label, "UNSATISFACTORY");
        assert!(c1.reason.contains("C1"));

        let c2 = assess(&marked(), &count_defects(&observations(&[FI, C2, C3])));
        assert!(c2.reason.contains("C2"));

        let fi = assess(&marked(), &count_defects(&observations(&[FI, C3])));
        assert!(fi.reason.contains("FI"));
    }

    #[test]
    fn observation_headings() {
        let formatted = format_observation(&DefectObservation {
            id: Text::from("1"),
            item: Text::from("Main Switch"),
            defect_code: DefectCode::C1,
            description: Text::from("Exposed live conductor"),
            ..Default::default()
        });
        assert_eq!(formatted.heading, "[C1] Main Switch");
        assert_eq!(formatted.rectified, "No");
        assert_eq!(formatted.urgency, "Immediate action required");
    }

    #[test]
    fn test_results_fill_every_column() {
        let result = CircuitTestResult {
            circuit_number: Text::from("1"),
            zs: Text::from("0.35"),
            ..Default::default()
        };
        let row = format_test_result(&result);
        assert_eq!(row.len(), 30);
        assert_eq!(row.len(), test_result_headings(Symbols::default()).len());
        assert_eq!(row[0], "1");
        assert_eq!(row[25], "0.35");
        assert!(row[1].is_empty());
    }

    #[test]
    fn circuit_units_follow_the_font() {
        let result = CircuitTestResult {
            live_size: Text::from("2.5"),
            zs: Text::from("0.35"),
            ..Default::default()
        };
        let ascii = format_circuit(&result, Symbols { unicode: false });
        assert_eq!(ascii[2], "2.5mm2");
        assert_eq!(ascii[8], "0.35 Ohms");
        assert_eq!(ascii[3], "");
        let unicode = format_circuit(&result, Symbols { unicode: true });
        assert_eq!(unicode[2], "2.5mm²");
        assert_eq!(unicode[8], "0.35Ω");
        assert_eq!(unicode.len(), circuit_headings().len());
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let results: Vec<CircuitTestResult> = ["DB2", "DB1", "DB2"]
            .into_iter()
            .map(|id| CircuitTestResult {
                board_id: Text::from(id),
                ..Default::default()
            })
            .collect();
        let groups = group_by_board(&results);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "DB2");
        assert_eq!(groups[0].1.len(), 2);

        let boards = vec![DistributionBoard {
            id: Text::from("DB1"),
            name: Text::from("Garage"),
            location: Text::default(),
        }];
        assert_eq!(board_title("DB1", &boards), "Distribution Board: Garage");
        assert_eq!(board_title("DB2", &boards), "Distribution Board: DB2");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let form = FormData::default();
        assert_eq!(format_client(&form)[0].1, NOT_SPECIFIED);
        assert_eq!(format_supply(&form, Symbols::default())[6].1, "");
        assert_eq!(format_company(&form), CompanyBranding::default());
        let items = format_inspection_item(&InspectionItem {
            item_number: Text::from("1.1"),
            outcome: InspectionOutcome::Satisfactory,
            ..Default::default()
        });
        assert_eq!(items, vec!["1.1", "", "", "OK"]);
    }
}
