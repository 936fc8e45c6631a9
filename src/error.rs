use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Settings file parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Settings file write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Tesseract-OCR not found. Install it or set ocr.binary_path in {0}")]
    OcrBinaryNotFound(String),

    #[error("{0}")]
    Validation(#[from] crate::batch::ValidationError),

    #[error("CLI error: {0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, GraderError>;
