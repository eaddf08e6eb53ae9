//! Core library for delivery manifest OCR.
//!
//! This crate provides:
//! - PDF page rasterization (poppler or embedded scan images) and single-page export
//! - OCR through an external engine, with preprocessing and orientation correction
//! - Route, location and store name extraction from manifest pages
//! - Bounded parallel batch processing into a deduplicated result table
//! - CSV query loading and lookup

pub mod error;
pub mod manifest;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use error::{Result, ScanError};
pub use manifest::{FieldRuleset, PageExtractor};
pub use models::{load_queries, ExtractionRecord, LocationNumber, Query, ResultSet, RouteId, ScanConfig};
pub use ocr::{ImagePreprocessor, OcrBackend, OrientationCorrector, TesseractBackend};
pub use pdf::{PageExporter, PageImage, PageRasterizer};
pub use pipeline::{BatchDriver, DocumentPipeline};
