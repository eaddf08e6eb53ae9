//! Single-document pipeline: rasterize, preprocess and extract each page.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::manifest::PageExtractor;
use crate::models::{ExtractionRecord, ScanConfig};
use crate::ocr::{ImagePreprocessor, OcrBackend, TesseractBackend};
use crate::pdf::{rasterizer_from_config, PageImage, PageRasterizer};

/// Runs every page of one PDF through preprocessing and field extraction.
pub struct DocumentPipeline<R, E>
where
    R: PageRasterizer,
    E: OcrBackend,
{
    rasterizer: R,
    preprocessor: ImagePreprocessor,
    extractor: PageExtractor<E>,
}

impl DocumentPipeline<Box<dyn PageRasterizer>, Arc<TesseractBackend>> {
    /// Build the production pipeline: configured rasterizer, preprocessing
    /// and tesseract engine with the default manifest rules.
    pub fn from_config(config: &ScanConfig) -> Self {
        let engine = Arc::new(TesseractBackend::new(config.ocr.clone()));
        let extractor = PageExtractor::new(engine).with_orientation(config.orientation.clone());
        Self::new(rasterizer_from_config(&config.pdf), extractor)
            .with_preprocessor(ImagePreprocessor::from_config(&config.preprocess))
    }
}

impl<R, E> DocumentPipeline<R, E>
where
    R: PageRasterizer,
    E: OcrBackend,
{
    pub fn new(rasterizer: R, extractor: PageExtractor<E>) -> Self {
        Self {
            rasterizer,
            preprocessor: ImagePreprocessor::default(),
            extractor,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Extract records from every page of `path`, in page order.
    ///
    /// `document` is the identifier written to the `PDF` column. A document
    /// that can't be rasterized is logged and yields no records.
    pub fn process(&self, path: &Path, document: &str) -> Vec<ExtractionRecord> {
        let pages = match self.rasterizer.rasterize(path, document) {
            Ok(pages) => pages,
            Err(e) => {
                error!("Error processing {}: {}", document, e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for page in pages {
            records.extend(self.process_page(page));
        }

        info!("Extracted {} records from {}", records.len(), document);
        records
    }

    fn process_page(&self, page: PageImage) -> Vec<ExtractionRecord> {
        debug!("Processing page {} of {}", page.page_number, page.document);
        let prepared = PageImage {
            image: self.preprocessor.process(&page.image),
            ..page
        };
        self.extractor.extract(&prepared)
    }
}
