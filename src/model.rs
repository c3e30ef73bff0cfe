//! The records a certificate is built from.
//!
//! Every field is optional: missing strings deserialise as empty [Text], missing
//! flags as `false`, and missing lists as empty.

use crate::safe::{Flag, Text};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Everything the inspector entered for one EICR
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormData {
    // report
    pub certificate_number: Text,
    pub report_reference: Text,

    // client and installation
    pub client_name: Text,
    pub client_address: Text,
    pub client_phone: Text,
    pub client_email: Text,
    pub installation_address: Text,
    pub occupier: Text,
    pub premises_type: Text,
    pub premises_description: Text,
    pub estimated_age_of_installation: Text,
    pub evidence_of_alterations: Text,
    pub alterations_age: Text,
    pub records_available: Text,

    // purpose and extent
    pub purpose_of_inspection: Text,
    pub inspection_date: Text,
    pub extent_of_inspection: Text,
    pub agreed_limitations: Text,
    pub agreed_with: Text,
    pub operational_limitations: Text,

    // supply characteristics
    pub earthing_arrangement: Text,
    pub supply_type: Text,
    pub supply_voltage: Text,
    pub supply_frequency: Text,
    pub supply_phases: Text,
    pub prospective_fault_current: Text,
    pub external_earth_loop_impedance: Text,
    pub supply_device_bs_en: Text,
    pub supply_device_type: Text,
    pub supply_device_rating: Text,

    // earthing and bonding
    pub means_of_earthing: Text,
    pub earth_electrode_type: Text,
    pub earth_electrode_resistance: Text,
    pub earthing_conductor_material: Text,
    pub earthing_conductor_csa: Text,
    pub earthing_conductor_verified: Flag,
    pub main_bonding_conductor_material: Text,
    pub main_bonding_csa: Text,
    pub main_bonding_verified: Flag,
    pub bonding_water: Flag,
    pub bonding_gas: Flag,
    pub bonding_oil: Flag,
    pub bonding_structural_steel: Flag,
    pub bonding_lightning_protection: Flag,
    pub bonding_other: Text,

    // consumer unit / main switch
    #[serde(alias = "cuLocation")]
    pub consumer_unit_location: Text,
    #[serde(alias = "cuManufacturer")]
    pub consumer_unit_manufacturer: Text,
    pub main_switch_bs_en: Text,
    pub main_switch_poles: Text,
    pub main_switch_current_rating: Text,
    pub main_switch_voltage_rating: Text,
    pub rcd_operating_current: Text,
    pub rcd_operating_time: Text,

    // distribution board verification
    pub db_reference: Text,
    pub db_location: Text,
    pub db_zs: Text,
    pub db_ipf: Text,
    pub polarity_confirmed: Flag,
    pub phase_sequence_confirmed: Flag,

    // overall assessment
    pub overall_assessment: Text,
    pub satisfactory_for_continued_use: Text,
    pub additional_comments: Text,

    // test instrument
    pub test_instrument_make: Text,
    pub test_instrument_serial: Text,
    #[serde(alias = "calibrationDate")]
    pub test_instrument_calibration_date: Text,

    // inspector
    pub inspector_name: Text,
    pub inspector_signature: Text,
    #[serde(alias = "inspectedByPosition")]
    pub inspector_position: Text,
    pub inspector_qualifications: Text,
    pub inspector_date: Text,
    pub registration_scheme: Text,
    pub registration_number: Text,

    // "inspected by" box, each falling back to the inspector or company details
    pub inspected_by_name: Text,
    pub inspected_by_signature: Text,
    pub inspected_by_for_on_behalf_of: Text,
    pub inspected_by_address: Text,
    pub inspected_by_cp_scheme: Text,

    // authoriser
    #[serde(alias = "reportAuthorisedByName")]
    pub authorised_by_name: Text,
    #[serde(alias = "reportAuthorisedBySignature")]
    pub authorised_by_signature: Text,
    #[serde(alias = "reportAuthorisedByPosition")]
    pub authorised_by_position: Text,
    #[serde(alias = "reportAuthorisedByDate")]
    pub authorised_by_date: Text,
    #[serde(alias = "reportAuthorisedByMembershipNo")]
    pub authorised_by_membership: Text,
    #[serde(alias = "reportAuthorisedByForOnBehalfOf")]
    pub authorised_by_for_on_behalf_of: Text,
    #[serde(alias = "reportAuthorisedByAddress")]
    pub authorised_by_address: Text,

    // company branding
    pub company_name: Text,
    pub company_tagline: Text,
    pub company_address: Text,
    pub company_phone: Text,
    pub company_email: Text,
    pub company_website: Text,
    pub company_logo: Text,

    pub next_inspection_date: Text,

    pub defect_observations: Vec<DefectObservation>,
    pub inspection_items: Vec<InspectionItem>,
    pub test_results: Vec<CircuitTestResult>,
    pub distribution_boards: Vec<DistributionBoard>,
}

impl FormData {
    /// The name signed in the "inspected by" box
    pub fn inspecting_name(&self) -> &Text {
        first_present(&self.inspected_by_name, &self.inspector_name)
    }

    /// The signature in the "inspected by" box
    pub fn inspecting_signature(&self) -> &Text {
        first_present(&self.inspected_by_signature, &self.inspector_signature)
    }
}

pub(crate) fn first_present<'a>(preferred: &'a Text, fallback: &'a Text) -> &'a Text {
    if preferred.is_present() {
        preferred
    } else {
        fallback
    }
}

/// Severity classification of an observation
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DefectCode {
    /// Danger present, immediate remedial action required
    C1,
    /// Potentially dangerous, urgent remedial action required
    C2,
    /// Improvement recommended
    C3,
    /// Further investigation required without delay
    FI,
    NotApplicable,
    Limitation,
    /// Anything not recognised, including a missing code
    #[default]
    Unknown,
}

impl DefectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectCode::C1 => "C1",
            DefectCode::C2 => "C2",
            DefectCode::C3 => "C3",
            DefectCode::FI => "FI",
            DefectCode::NotApplicable => "N/A",
            DefectCode::Limitation => "LIM",
            DefectCode::Unknown => "",
        }
    }
}

impl FromStr for DefectCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "C1" => DefectCode::C1,
            "C2" => DefectCode::C2,
            "C3" => DefectCode::C3,
            "FI" => DefectCode::FI,
            "N/A" | "NA" => DefectCode::NotApplicable,
            "LIM" => DefectCode::Limitation,
            _ => DefectCode::Unknown,
        })
    }
}

impl fmt::Display for DefectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation recorded during the inspection
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefectObservation {
    pub id: Text,
    pub item: Text,
    pub defect_code: DefectCode,
    pub description: Text,
    pub recommendation: Text,
    pub rectified: Flag,
    /// BS 7671 regulation the observation relates to
    pub regulation: Text,
}

/// Result of inspecting one checklist item
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum InspectionOutcome {
    Satisfactory,
    C1,
    C2,
    C3,
    NotApplicable,
    NotVerified,
    Limitation,
    #[default]
    Unknown,
}

impl InspectionOutcome {
    /// The code printed in the checklist outcome column
    pub fn display_code(&self) -> &'static str {
        match self {
            InspectionOutcome::Satisfactory => "OK",
            InspectionOutcome::C1 => "C1",
            InspectionOutcome::C2 => "C2",
            InspectionOutcome::C3 => "C3",
            InspectionOutcome::NotApplicable => "N/A",
            InspectionOutcome::NotVerified => "N/V",
            InspectionOutcome::Limitation => "LIM",
            InspectionOutcome::Unknown => "",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            InspectionOutcome::Satisfactory => "satisfactory",
            InspectionOutcome::C1 => "C1",
            InspectionOutcome::C2 => "C2",
            InspectionOutcome::C3 => "C3",
            InspectionOutcome::NotApplicable => "not-applicable",
            InspectionOutcome::NotVerified => "not-verified",
            InspectionOutcome::Limitation => "limitation",
            InspectionOutcome::Unknown => "",
        }
    }
}

impl FromStr for InspectionOutcome {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "satisfactory" | "ok" | "pass" => InspectionOutcome::Satisfactory,
            "c1" => InspectionOutcome::C1,
            "c2" => InspectionOutcome::C2,
            "c3" => InspectionOutcome::C3,
            "not-applicable" | "n/a" | "na" => InspectionOutcome::NotApplicable,
            "not-verified" | "n/v" | "nv" => InspectionOutcome::NotVerified,
            "limitation" | "lim" => InspectionOutcome::Limitation,
            _ => InspectionOutcome::Unknown,
        })
    }
}

/// Both code enums round-trip through their string forms, accepting any JSON value
/// on the way in
macro_rules! string_coded {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = Text::deserialize(deserializer)?;
                Ok(text.parse().unwrap_or_default())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

string_coded!(DefectCode);
string_coded!(InspectionOutcome);

/// One line of the schedule of inspections
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InspectionItem {
    pub id: Text,
    pub section: Text,
    pub item_number: Text,
    pub item: Text,
    pub clause: Text,
    pub inspected: Flag,
    pub outcome: InspectionOutcome,
    pub notes: Text,
}

/// One row of the schedule of circuit details and test results. All measurements
/// are carried as the strings the inspector entered.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitTestResult {
    pub circuit_number: Text,
    pub circuit_description: Text,
    pub type_of_wiring: Text,
    pub reference_method: Text,
    pub points_served: Text,
    pub live_size: Text,
    pub cpc_size: Text,
    pub bs_standard: Text,
    pub protective_device_curve: Text,
    pub protective_device_rating: Text,
    pub protective_device_ka_rating: Text,
    pub max_zs: Text,
    pub rcd_bs_standard: Text,
    pub rcd_type: Text,
    pub rcd_rating: Text,
    pub rcd_rating_a: Text,
    pub ring_r1: Text,
    pub ring_rn: Text,
    pub ring_r2: Text,
    pub r1r2: Text,
    pub r2: Text,
    pub insulation_test_voltage: Text,
    pub insulation_live_neutral: Text,
    pub insulation_live_earth: Text,
    pub polarity: Text,
    pub zs: Text,
    pub rcd_one_x: Text,
    pub rcd_test_button: Text,
    pub afdd_test: Text,
    pub notes: Text,
    pub board_id: Text,
}

/// A distribution board the circuits hang off
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistributionBoard {
    pub id: Text,
    pub name: Text,
    pub location: Text,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_loose_form_data() {
        let form: FormData = serde_json::from_value(json!({
            "clientName": "Jane Doe",
            "inspectionDate": "2024-01-15",
            "supplyVoltage": 230,
            "bondingWater": "yes",
            "defectObservations": [
                {"id": 1, "item": "Main Switch", "defectCode": "C1", "rectified": false},
                {"id": "2", "defectCode": "n/a"},
                {"id": "3", "defectCode": null}
            ],
            "inspectionItems": [{"section": "1.0", "outcome": "not-verified"}],
            "testResults": [{"circuitNumber": 1, "zs": 0.35, "boardId": "DB1"}]
        }))
        .expect("parses");

        assert_eq!(form.client_name.as_str(), "Jane Doe");
        assert_eq!(form.supply_voltage.as_str(), "230");
        assert!(*form.bonding_water);
        assert!(!*form.bonding_gas);
        assert_eq!(form.defect_observations[0].id.as_str(), "1");
        assert_eq!(form.defect_observations[0].defect_code, DefectCode::C1);
        assert_eq!(
            form.defect_observations[1].defect_code,
            DefectCode::NotApplicable
        );
        assert_eq!(form.defect_observations[2].defect_code, DefectCode::Unknown);
        assert_eq!(form.inspection_items[0].outcome.display_code(), "N/V");
        assert_eq!(form.test_results[0].zs.as_str(), "0.35");
        assert_eq!(form.test_results[0].board_id.as_str(), "DB1");
    }

    #[test]
    fn accepts_the_signing_keys_the_form_sends() {
        let form: FormData = serde_json::from_value(json!({
            "inspectorName": "James Wilson",
            "inspectedByName": "JAMES WILSON",
            "inspectorSignature": "data:image/png;base64,AAAA",
            "inspectedByPosition": "Senior Electrician",
            "inspectedByAddress": "789 Contractor Lane",
            "reportAuthorisedByName": "Ann Lee",
            "reportAuthorisedBySignature": "data:image/png;base64,BBBB",
            "reportAuthorisedByMembershipNo": "NIC123456",
            "reportAuthorisedByAddress": "1 Head Office Road",
            "cuLocation": "Under stairs",
            "calibrationDate": "2024-01-15"
        }))
        .expect("parses");

        assert_eq!(form.inspecting_name().as_str(), "JAMES WILSON");
        assert_eq!(
            form.inspecting_signature().as_str(),
            "data:image/png;base64,AAAA"
        );
        assert_eq!(form.inspector_position.as_str(), "Senior Electrician");
        assert_eq!(form.inspected_by_address.as_str(), "789 Contractor Lane");
        assert_eq!(form.authorised_by_name.as_str(), "Ann Lee");
        assert_eq!(
            form.authorised_by_signature.as_str(),
            "data:image/png;base64,BBBB"
        );
        assert_eq!(form.authorised_by_membership.as_str(), "NIC123456");
        assert_eq!(form.authorised_by_address.as_str(), "1 Head Office Road");
        assert_eq!(form.consumer_unit_location.as_str(), "Under stairs");
        assert_eq!(form.test_instrument_calibration_date.as_str(), "2024-01-15");
    }

    #[test]
    fn codes_serialise_as_strings() {
        let observation = DefectObservation {
            defect_code: DefectCode::NotApplicable,
            ..Default::default()
        };
        let value = serde_json::to_value(&observation).expect("serialises");
        assert_eq!(value["defectCode"], json!("N/A"));
        let back: DefectObservation = serde_json::from_value(value).expect("parses");
        assert_eq!(back, observation);
    }
}
