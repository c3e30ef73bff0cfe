//! Export configuration file support
//!
//! Handles parsing of the TOML configuration and environment variable
//! overrides for the photo store.

use crate::layout::Margins;
use crate::units::{Mm, Pt};
use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable for the photo store base URL
pub const ENV_PHOTO_STORE_URL: &str = "EICR_PHOTO_STORE_URL";

/// Environment variable for the photo store API key
pub const ENV_PHOTO_STORE_KEY: &str = "EICR_PHOTO_STORE_KEY";

/// Everything about an export that isn't part of the certificate data itself
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub fonts: FontsSection,
    pub layout: LayoutSection,
    pub watermark: WatermarkSection,
    pub photos: PhotosSection,
}

/// The optional Unicode font family
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontsSection {
    /// Name the family is reported as
    pub family: String,
    /// TrueType file for regular text
    pub regular: Option<PathBuf>,
    /// TrueType file for bold text; the regular face is used when missing
    pub bold: Option<PathBuf>,
}

impl Default for FontsSection {
    fn default() -> Self {
        Self {
            family: "Roboto".to_string(),
            regular: None,
            bold: None,
        }
    }
}

/// Page geometry and the tuned table column widths
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub margins: Margins,
    /// Margins of the landscape schedule-of-test-results pages
    pub landscape_margins: Margins,
    pub form_row_height: Mm,
    pub section_header_height: Mm,
    /// Widths of the 30 schedule-of-test-results columns (landscape)
    pub test_result_columns: Vec<Mm>,
    /// Widths of the 10 circuit-schedule columns (portrait)
    pub circuit_columns: Vec<Mm>,
    /// Widths of the 4 inspection-checklist columns (portrait)
    pub checklist_columns: Vec<Mm>,
}

/// Widths in millimetres, in column order: circuit no, description, wiring type,
/// reference method, points, live, cpc, BS (EN), curve, rating, kA, max Zs,
/// RCD BS (EN), RCD type, RCD mA, RCD A, r1, rn, r2, R1+R2, R2, test voltage,
/// IR L-N, IR L-E, polarity, Zs, RCD ms, test button, AFDD, remarks
const TEST_RESULT_COLUMNS: [f32; 30] = [
    7.0, 28.0, 9.0, 7.0, 7.0, 7.0, 7.0, 12.0, 7.0, 7.0, 7.0, 8.0, 12.0, 8.0, 7.0, 7.0, 7.0, 7.0,
    7.0, 8.0, 7.0, 8.0, 9.0, 9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 28.0,
];

const CIRCUIT_COLUMNS: [f32; 10] = [10.0, 40.0, 14.0, 12.0, 14.0, 12.0, 10.0, 22.0, 22.0, 24.0];

const CHECKLIST_COLUMNS: [f32; 4] = [16.0, 106.0, 34.0, 24.0];

impl Default for LayoutSection {
    fn default() -> Self {
        let mm = |widths: &[f32]| widths.iter().copied().map(Mm).collect();
        Self {
            margins: Margins::all(Mm(15.0)),
            landscape_margins: Margins::symmetric(Mm(15.0), Mm(10.0)),
            form_row_height: Mm(7.0),
            section_header_height: Mm(8.0),
            test_result_columns: mm(&TEST_RESULT_COLUMNS),
            circuit_columns: mm(&CIRCUIT_COLUMNS),
            checklist_columns: mm(&CHECKLIST_COLUMNS),
        }
    }
}

/// The translucent label stamped across every page
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatermarkSection {
    pub enabled: bool,
    pub text: String,
    pub opacity: f32,
    pub font_size: Pt,
}

impl Default for WatermarkSection {
    fn default() -> Self {
        Self {
            enabled: true,
            text: "ORIGINAL CERTIFICATE".to_string(),
            opacity: 0.1,
            font_size: Pt(60.0),
        }
    }
}

/// Where inspection photographs are fetched from
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhotosSection {
    /// Base URL of the store, e.g. `https://project.example.co`
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Table of photo records, queried by observation id
    pub table: String,
    /// Storage bucket the photo files live in
    pub bucket: String,
    /// Per-request timeout; no timeout when unset
    pub timeout_secs: Option<u64>,
    /// Largest box a photo is scaled into
    pub max_width: Mm,
    pub max_height: Mm,
}

impl Default for PhotosSection {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            table: "observation_photos".to_string(),
            bucket: "inspection-photos".to_string(),
            timeout_secs: None,
            max_width: Mm(80.0),
            max_height: Mm(60.0),
        }
    }
}

impl ExportConfig {
    /// Parse a TOML configuration; every key is optional
    pub fn from_toml_str(source: &str) -> Result<ExportConfig> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML configuration file
    pub async fn load(path: &Path) -> Result<ExportConfig> {
        let source = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&source)
    }

    /// Apply [ENV_PHOTO_STORE_URL] and [ENV_PHOTO_STORE_KEY], when set
    pub fn with_env_overrides(self) -> ExportConfig {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ExportConfig {
        if let Some(url) = lookup(ENV_PHOTO_STORE_URL).filter(|v| !v.is_empty()) {
            self.photos.base_url = Some(url);
        }
        if let Some(key) = lookup(ENV_PHOTO_STORE_KEY).filter(|v| !v.is_empty()) {
            self.photos.api_key = Some(key);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.fonts.family, "Roboto");
        assert_eq!(config.watermark.text, "ORIGINAL CERTIFICATE");
        assert_eq!(config.photos.max_width, Mm(80.0));
        assert_eq!(config.photos.max_height, Mm(60.0));
        assert_eq!(config.layout.test_result_columns.len(), 30);
        let total: Mm = config.layout.test_result_columns.iter().copied().sum();
        // landscape A4 less the landscape margins
        let margins = config.layout.landscape_margins;
        assert!((total.0 - (297.0 - margins.left.0 - margins.right.0)).abs() < 1e-3);
    }

    #[test]
    fn parses_partial_toml() {
        let config = ExportConfig::from_toml_str(
            r#"
            [fonts]
            regular = "fonts/Roboto-Regular.ttf"

            [layout.margins]
            top = 20.0
            left = 12.5

            [watermark]
            enabled = false

            [photos]
            base_url = "https://photos.example.com"
            timeout_secs = 15
            "#,
        )
        .expect("parses");

        assert_eq!(config.fonts.family, "Roboto");
        assert_eq!(
            config.fonts.regular,
            Some(PathBuf::from("fonts/Roboto-Regular.ttf"))
        );
        assert_eq!(config.layout.margins.top, Mm(20.0));
        assert_eq!(config.layout.margins.left, Mm(12.5));
        assert_eq!(config.layout.margins.bottom, Mm(0.0));
        assert!(!config.watermark.enabled);
        assert_eq!(config.watermark.opacity, 0.1);
        assert_eq!(config.photos.timeout_secs, Some(15));
        assert_eq!(config.photos.bucket, "inspection-photos");
    }

    #[test]
    fn environment_overrides_photo_store() {
        let config = ExportConfig::default().with_overrides(|key| match key {
            ENV_PHOTO_STORE_URL => Some("https://store.example.com".to_string()),
            ENV_PHOTO_STORE_KEY => Some(String::new()),
            _ => None,
        });
        assert_eq!(
            config.photos.base_url.as_deref(),
            Some("https://store.example.com")
        );
        assert_eq!(config.photos.api_key, None);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(ExportConfig::from_toml_str("[layout\nmargins = 3").is_err());
    }
}
