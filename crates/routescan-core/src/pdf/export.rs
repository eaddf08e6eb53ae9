//! Single-page PDF export for matched records.

use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::info;

use super::Result;
use crate::error::PdfError;
use crate::models::Query;

/// First free path of the form `"{route} - {location}.pdf"` in `dir`,
/// falling back to `"{route} - {location} (n).pdf"` with n from 1.
pub fn unique_output_path(dir: &Path, query: &Query) -> PathBuf {
    let stem = format!("{} - {}", query.route_id, query.location_number);
    let mut path = dir.join(format!("{}.pdf", stem));
    let mut count = 1;
    while path.exists() {
        path = dir.join(format!("{} ({}).pdf", stem, count));
        count += 1;
    }
    path
}

/// Writes single pages of source PDFs into an output directory.
pub struct PageExporter {
    output_dir: PathBuf,
}

impl PageExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Copy page `page_number` (1-indexed) of `source` into a new PDF named
    /// after the query. Never overwrites an existing file.
    pub fn export(&self, source: &Path, page_number: u32, query: &Query) -> Result<PathBuf> {
        let mut doc = Document::load(source).map_err(|e| {
            PdfError::Export(format!("failed to open {}: {}", source.display(), e))
        })?;
        if doc.is_encrypted() && doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if !pages.contains(&page_number) {
            return Err(PdfError::InvalidPage(page_number));
        }

        let others: Vec<u32> = pages.into_iter().filter(|&p| p != page_number).collect();
        if !others.is_empty() {
            doc.delete_pages(&others);
        }
        doc.prune_objects();

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            PdfError::Export(format!(
                "failed to create {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let path = unique_output_path(&self.output_dir, query);
        doc.save(&path)
            .map_err(|e| PdfError::Export(format!("failed to write {}: {}", path.display(), e)))?;

        info!("Saved extracted page to {}", path.display());
        Ok(path)
    }
}
