use thiserror::Error;

/// All errors that the crate can generate
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error(transparent)]
    /// An I/O error occurred
    Io(#[from] std::io::Error),

    #[error(transparent)]
    /// [owned_ttf_parser] failed to parse the font
    FaceParsing(#[from] owned_ttf_parser::FaceParsingError),

    #[error(transparent)]
    /// [image] failed to parse the image
    Image(#[from] image::ImageError),

    #[error(transparent)]
    /// [usvg] failed to parse the image
    Svg(#[from] usvg::Error),

    #[error("failed to convert SVG to PDF: {0}")]
    /// [svg2pdf] could not convert a parsed SVG
    SvgConversion(String),

    #[error(transparent)]
    /// An embedded image payload wasn't valid base64
    Base64(#[from] base64::DecodeError),

    #[error("malformed data URI: {0}")]
    /// A `data:` URI was missing its header or payload
    DataUri(String),

    #[error(transparent)]
    /// The remote photo store could not be reached
    Http(#[from] reqwest::Error),

    #[error("photo store returned status {status} for {url}")]
    /// The remote photo store answered with a non-success status
    PhotoStoreStatus { status: u16, url: String },

    #[error(transparent)]
    /// JSON input could not be parsed
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    /// The TOML configuration could not be parsed
    Config(#[from] toml::de::Error),

    #[error("layout error: {0}")]
    /// A value reached the drawing layer in a state it cannot render
    Layout(String),
}

pub type Result<T> = std::result::Result<T, CertificateError>;
