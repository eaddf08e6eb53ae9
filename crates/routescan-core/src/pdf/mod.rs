//! PDF rasterization and single-page export.

mod embedded;
mod export;
mod poppler;

pub use embedded::EmbeddedImageRasterizer;
pub use export::{unique_output_path, PageExporter};
pub use poppler::PopplerRasterizer;

use std::path::Path;

use image::DynamicImage;

use crate::error::PdfError;
use crate::models::config::{PdfConfig, RasterizerKind};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A single rasterized PDF page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Rendered pixels.
    pub image: DynamicImage,
    /// Page number (1-indexed).
    pub page_number: u32,
    /// Identifier of the source document.
    pub document: String,
}

/// Trait for turning PDF pages into images.
pub trait PageRasterizer: Send + Sync {
    /// Render every page of the document, in page order.
    fn rasterize(&self, path: &Path, document: &str) -> Result<Vec<PageImage>>;
}

/// Build the rasterizer selected in the configuration.
pub fn rasterizer_from_config(config: &PdfConfig) -> Box<dyn PageRasterizer> {
    match config.rasterizer {
        RasterizerKind::Poppler => Box::new(
            PopplerRasterizer::new(config.pdftoppm_path.clone()).with_dpi(config.render_dpi),
        ),
        RasterizerKind::Embedded => Box::new(EmbeddedImageRasterizer::new()),
    }
}

impl<T: PageRasterizer + ?Sized> PageRasterizer for Box<T> {
    fn rasterize(&self, path: &Path, document: &str) -> Result<Vec<PageImage>> {
        (**self).rasterize(path, document)
    }
}

/// Count the pages of a PDF file.
#[cfg(test)]
pub(crate) fn page_count(path: &Path) -> Result<u32> {
    let doc = lopdf::Document::load(path).map_err(|e| PdfError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
