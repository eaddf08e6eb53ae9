//! Page rendering with poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{PageImage, PageRasterizer, Result};
use crate::error::PdfError;

/// Renders pages to PNG with `pdftoppm` and loads them back.
pub struct PopplerRasterizer {
    pdftoppm_path: PathBuf,
    dpi: u32,
}

impl PopplerRasterizer {
    pub fn new(pdftoppm_path: impl Into<PathBuf>) -> Self {
        Self {
            pdftoppm_path: pdftoppm_path.into(),
            dpi: 200,
        }
    }

    /// Set the render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
}

impl PageRasterizer for PopplerRasterizer {
    fn rasterize(&self, path: &Path, document: &str) -> Result<Vec<PageImage>> {
        let temp_dir = tempfile::Builder::new()
            .prefix("pages-")
            .tempdir()
            .map_err(|e| PdfError::Rasterize(format!("failed to create temp dir: {}", e)))?;
        let output_prefix = temp_dir.path().join("page");

        let output = Command::new(&self.pdftoppm_path)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(path)
            .arg(&output_prefix)
            .output()
            .map_err(|e| {
                PdfError::Rasterize(format!(
                    "failed to run {}: {}",
                    self.pdftoppm_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PdfError::Rasterize(format!(
                "pdftoppm failed on {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let mut rendered: Vec<(u32, PathBuf)> = std::fs::read_dir(temp_dir.path())
            .map_err(|e| PdfError::Rasterize(e.to_string()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|p| rendered_page_number(&p).map(|n| (n, p)))
            .collect();
        rendered.sort_by_key(|(n, _)| *n);

        if rendered.is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (page_number, page_path) in rendered {
            let image = image::open(&page_path).map_err(|e| {
                PdfError::Rasterize(format!("failed to load page {}: {}", page_number, e))
            })?;
            debug!(
                "Rendered page {} of {} at {}x{}",
                page_number,
                document,
                image.width(),
                image.height()
            );
            pages.push(PageImage {
                image,
                page_number,
                document: document.to_string(),
            });
        }

        info!("Converted {} to images. Number of pages: {}", document, pages.len());
        Ok(pages)
    }
}

/// Page number from a `pdftoppm` output name such as `page-07.png`.
///
/// The number is zero-padded to the width of the page count.
fn rendered_page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_page_number() {
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-010.png")), Some(10));
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-2.ppm")), None);
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page.png")), None);
    }

    #[test]
    fn test_missing_tool_is_rasterize_error() {
        let rasterizer = PopplerRasterizer::new("/nonexistent/pdftoppm");
        let result = rasterizer.rasterize(Path::new("missing.pdf"), "missing.pdf");
        assert!(matches!(result, Err(PdfError::Rasterize(_))));
    }
}
