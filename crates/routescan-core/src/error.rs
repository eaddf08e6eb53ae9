//! Error types for the routescan-core library.

use thiserror::Error;

/// Main error type for the routescan library.
#[derive(Error, Debug)]
pub enum ScanError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// CSV reading or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON reading or writing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet writing error.
    #[error("XLSX error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Spreadsheet reading error.
    #[error("XLSX error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    /// A results table row that can't be turned back into a record.
    #[error("invalid results table row {row}: {message}")]
    Table { row: usize, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to rasterize pages.
    #[error("failed to rasterize: {0}")]
    Rasterize(String),

    /// Failed to write an exported page.
    #[error("failed to export page: {0}")]
    Export(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine could not be started or exited with a failure.
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// Orientation output could not be interpreted.
    #[error("orientation detection failed: {0}")]
    Orientation(String),

    /// The image could not be handed to the engine.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors for identifiers that fail their fixed-width format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Route identifiers are exactly 8 ASCII digits.
    #[error("invalid route id {0:?}: expected 8 digits")]
    RouteId(String),

    /// Location numbers are exactly 4 ASCII digits.
    #[error("invalid location number {0:?}: expected 4 digits")]
    LocationNumber(String),
}

/// Result type for the routescan library.
pub type Result<T> = std::result::Result<T, ScanError>;
