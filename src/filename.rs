//! Output file names.

use crate::model::FormData;
use chrono::NaiveDate;

fn clean(part: &str) -> String {
    part.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

fn iso_date(input: &str) -> String {
    let input = input.trim();
    let date = input.get(..10).unwrap_or(input);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn build(prefix: &str, parts: &[String], fallback: &str) -> String {
    let parts: Vec<&str> = parts
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return fallback.to_string();
    }
    format!("{prefix}_{}.pdf", parts.join("_"))
}

/// `EICR_Observations_<ref>_<client>_<YYYY-MM-DD>.pdf`
pub fn observations_filename(form: &FormData) -> String {
    let reference = match form.report_reference.trim() {
        "" => form.certificate_number.as_str(),
        reference => reference,
    };
    build(
        "EICR_Observations",
        &[
            clean(reference),
            clean(&form.client_name),
            iso_date(&form.inspection_date),
        ],
        "EICR_Observations.pdf",
    )
}

/// `EICR_<certificate>_<client>_<YYYY-MM-DD>.pdf`
pub fn certificate_filename(form: &FormData) -> String {
    build(
        "EICR",
        &[
            clean(&form.certificate_number),
            clean(&form.client_name),
            iso_date(&form.inspection_date),
        ],
        "EICR_Certificate.pdf",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe::Text;

    #[test]
    fn names_from_the_form() {
        let form = FormData {
            certificate_number: Text::from("EICR/2024/001"),
            client_name: Text::from("Jane  O'Doe"),
            inspection_date: Text::from("2024-01-15"),
            ..Default::default()
        };
        assert_eq!(certificate_filename(&form), "EICR_EICR2024001_Jane-ODoe_2024-01-15.pdf");
        assert_eq!(
            observations_filename(&form),
            "EICR_Observations_EICR2024001_Jane-ODoe_2024-01-15.pdf"
        );
    }

    #[test]
    fn falls_back_when_empty() {
        let form = FormData {
            inspection_date: Text::from("next week"),
            ..Default::default()
        };
        assert_eq!(certificate_filename(&form), "EICR_Certificate.pdf");
        assert_eq!(observations_filename(&form), "EICR_Observations.pdf");
    }
}
