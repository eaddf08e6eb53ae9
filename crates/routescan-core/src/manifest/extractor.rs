//! Per-page extraction: orientation, OCR, field matching and fallback.

use image::DynamicImage;
use tracing::{debug, error, info, warn};

use crate::error::OcrError;
use crate::models::config::OrientationConfig;
use crate::models::ExtractionRecord;
use crate::ocr::{OcrBackend, OrientationCorrector, Rotation};
use crate::pdf::PageImage;

use super::rules::{FieldRuleset, PageMatches};

/// Turns one preprocessed page into extraction records.
pub struct PageExtractor<E: OcrBackend> {
    engine: E,
    ruleset: FieldRuleset,
    orientation: OrientationConfig,
}

impl<E: OcrBackend> PageExtractor<E> {
    /// Create an extractor with the default manifest rules.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            ruleset: FieldRuleset::default(),
            orientation: OrientationConfig::default(),
        }
    }

    /// Use a different set of field rules.
    pub fn with_ruleset(mut self, ruleset: FieldRuleset) -> Self {
        self.ruleset = ruleset;
        self
    }

    /// Set orientation detection behavior.
    pub fn with_orientation(mut self, config: OrientationConfig) -> Self {
        self.orientation = config;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Extract every record on the page.
    ///
    /// Never fails: errors are logged with the page's context and produce an
    /// empty list.
    pub fn extract(&self, page: &PageImage) -> Vec<ExtractionRecord> {
        match self.try_extract(page) {
            Ok(records) => records,
            Err(e) => {
                error!(
                    "OCR extraction failed on {} page {}: {}",
                    page.document, page.page_number, e
                );
                Vec::new()
            }
        }
    }

    fn try_extract(&self, page: &PageImage) -> Result<Vec<ExtractionRecord>, OcrError> {
        self.engine.sweep_temp_files();

        let (image, rotation) = self.upright(page);

        let mut text = self.engine.recognize(&image)?;
        let mut matches = self.ruleset.apply(&text);

        if !matches.has_routes() {
            let flipped = Rotation::Deg180.correct(&image);
            info!(
                "Rotated page {} of {} by 180 degrees as fallback",
                page.page_number, page.document
            );
            let flipped_text = self.engine.recognize(&flipped)?;
            let flipped_matches = self.ruleset.apply(&flipped_text);
            if flipped_matches.has_routes() {
                info!(
                    "Found RouteID after rotating 180 degrees on page {} of {}",
                    page.page_number, page.document
                );
                text = flipped_text;
                matches = flipped_matches;
            }
        }

        log_matches(page, rotation, &text, &matches);

        let records = matches.into_records(&page.document, page.page_number);
        if records.is_empty() {
            info!(
                "No Route IDs found on page {} of {} after all orientation attempts",
                page.page_number, page.document
            );
        }
        for record in &records {
            info!(
                "Found RouteID {} on page {} of {}",
                record.route_id, record.page_number, record.pdf
            );
        }
        Ok(records)
    }

    /// Best-effort orientation correction; falls back to the page as given.
    fn upright(&self, page: &PageImage) -> (DynamicImage, Rotation) {
        if !self.orientation.enabled {
            return (page.image.clone(), Rotation::None);
        }

        let corrector = OrientationCorrector::from_config(&self.engine, &self.orientation);
        match corrector.correct(&page.image) {
            Ok((image, rotation)) => {
                debug!(
                    "OSD for {} page {}: Rotate={}",
                    page.document, page.page_number, rotation
                );
                if rotation != Rotation::None {
                    info!(
                        "Rotated page {} of {} by -{} to correct orientation",
                        page.page_number, page.document, rotation
                    );
                }
                (image, rotation)
            }
            Err(e) => {
                warn!(
                    "Orientation detection failed for {} page {}: {}",
                    page.document, page.page_number, e
                );
                (page.image.clone(), Rotation::None)
            }
        }
    }
}

fn log_matches(page: &PageImage, rotation: Rotation, text: &str, matches: &PageMatches) {
    let Some(header) = &matches.header else {
        return;
    };
    for route in &matches.routes {
        debug!(
            "PDF: {} - Page: {}\nRotation Applied: {}\nOCR Text:\n{}\n\
             Extracted RouteID: {}\nExtracted Location Number: {}\n\
             Extracted Store Name: {}\nSource Pattern: {}",
            page.document,
            page.page_number,
            rotation,
            text,
            route,
            header.location_number,
            header.store_name,
            header.source
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Answers OCR calls from a script and records what it was shown.
    struct ScriptedEngine {
        texts: Mutex<VecDeque<Result<String, OcrError>>>,
        osd: Result<String, ()>,
        seen: Mutex<Vec<u8>>,
        sweeps: AtomicU32,
    }

    impl ScriptedEngine {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: Mutex::new(texts.iter().map(|t| Ok(t.to_string())).collect()),
                osd: Ok("Rotate: 0\n".to_string()),
                seen: Mutex::new(Vec::new()),
                sweeps: AtomicU32::new(0),
            }
        }

        fn with_osd(mut self, osd: Result<&str, ()>) -> Self {
            self.osd = osd.map(str::to_string);
            self
        }

        fn failing() -> Self {
            let engine = Self::new(&[]);
            engine
                .texts
                .lock()
                .unwrap()
                .push_back(Err(OcrError::Engine("crashed".to_string())));
            engine
        }

        /// Top-left pixel of every image passed to `recognize`.
        fn seen(&self) -> Vec<u8> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl OcrBackend for ScriptedEngine {
        fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
            self.seen.lock().unwrap().push(image.to_luma8().get_pixel(0, 0)[0]);
            self.texts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        fn detect_orientation(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            self.osd
                .clone()
                .map_err(|_| OcrError::Engine("osd unavailable".to_string()))
        }

        fn sweep_temp_files(&self) {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn page() -> PageImage {
        // Black top-left corner, white bottom-right corner.
        let mut img = GrayImage::from_pixel(3, 2, Luma([128]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(2, 1, Luma([255]));
        PageImage {
            image: DynamicImage::ImageLuma8(img),
            page_number: 4,
            document: "batch/manifest.pdf".to_string(),
        }
    }

    fn extractor(engine: ScriptedEngine) -> PageExtractor<ScriptedEngine> {
        PageExtractor::new(engine).with_orientation(OrientationConfig {
            retry_delay_ms: 0,
            ..OrientationConfig::default()
        })
    }

    fn tuple(record: &ExtractionRecord) -> (&str, &str, &str) {
        (
            record.route_id.as_str(),
            record.location_number.as_str(),
            record.store_name.as_str(),
        )
    }

    #[test]
    fn test_xdock_page_yields_single_record() {
        let extractor = extractor(ScriptedEngine::new(&[
            "Route: 12345678\nX-Dock WH: 1234-Main Street Store\n",
        ]));
        let records = extractor.extract(&page());

        assert_eq!(records.len(), 1);
        assert_eq!(tuple(&records[0]), ("12345678", "1234", "Main Street Store"));
        assert_eq!(records[0].pdf, "batch/manifest.pdf");
        assert_eq!(records[0].page_number, 4);
        // No fallback pass when the first pass finds a route.
        assert_eq!(extractor.engine().seen().len(), 1);
        assert_eq!(extractor.engine().sweeps.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_xdock_priority_over_to() {
        let extractor = extractor(ScriptedEngine::new(&[
            "To 5 4321-Other Place\nRoute 12345678\nX-Dock WH: 1234-Depot",
        ]));
        let records = extractor.extract(&page());

        assert_eq!(records.len(), 1);
        assert_eq!(tuple(&records[0]), ("12345678", "1234", "Depot"));
    }

    #[test]
    fn test_phone_suffix_stripped() {
        let extractor = extractor(ScriptedEngine::new(&[
            "Route: 12345678\nTo 7 0042-Corner Shop Phone 5551234",
        ]));
        let records = extractor.extract(&page());

        assert_eq!(tuple(&records[0]), ("12345678", "0042", "Corner Shop"));
    }

    #[test]
    fn test_route_without_header_dropped() {
        let extractor = extractor(ScriptedEngine::new(&["Route: 12345678\nno headers here;"]));
        assert!(extractor.extract(&page()).is_empty());
    }

    #[test]
    fn test_rotated_pass_supersedes_first_pass() {
        let extractor = extractor(ScriptedEngine::new(&[
            "To 1 1111-Ghost Store",
            "Route: 87654321\nTo 9 2222-Real Store",
        ]));
        let records = extractor.extract(&page());

        assert_eq!(records.len(), 1);
        assert_eq!(tuple(&records[0]), ("87654321", "2222", "Real Store"));
        // Second pass saw the page turned upside down.
        assert_eq!(extractor.engine().seen(), vec![0, 255]);
    }

    #[test]
    fn test_no_routes_in_either_pass() {
        let extractor = extractor(ScriptedEngine::new(&["To 1 1111-Ghost", "nothing"]));
        assert!(extractor.extract(&page()).is_empty());
        assert_eq!(extractor.engine().seen().len(), 2);
    }

    #[test]
    fn test_orientation_failure_uses_page_as_is() {
        let engine = ScriptedEngine::new(&["Route: 12345678\nX-Dock WH: 1234-Depot"]).with_osd(Err(()));
        let extractor = extractor(engine);
        let records = extractor.extract(&page());

        assert_eq!(records.len(), 1);
        assert_eq!(extractor.engine().seen(), vec![0]);
    }

    #[test]
    fn test_orientation_correction_applied() {
        let engine =
            ScriptedEngine::new(&["Route: 12345678\nX-Dock WH: 1234-Depot"]).with_osd(Ok("Rotate: 180"));
        let extractor = extractor(engine);
        extractor.extract(&page());

        assert_eq!(extractor.engine().seen(), vec![255]);
    }

    #[test]
    fn test_orientation_can_be_disabled() {
        let engine =
            ScriptedEngine::new(&["Route: 12345678\nX-Dock WH: 1234-Depot"]).with_osd(Ok("Rotate: 180"));
        let extractor = PageExtractor::new(engine).with_orientation(OrientationConfig {
            enabled: false,
            ..OrientationConfig::default()
        });
        extractor.extract(&page());

        assert_eq!(extractor.engine().seen(), vec![0]);
    }

    #[test]
    fn test_custom_ruleset() {
        use crate::manifest::HeaderRule;
        use regex::Regex;

        let ruleset = FieldRuleset::new(
            Regex::new(r"(?i)\bTrip\s*#?\s*(\d{8})\b").unwrap(),
            vec![HeaderRule::new(
                "Deliver To",
                Regex::new(r"(?i)Deliver To\s*(\d{4})\s+([A-Za-z ]+)").unwrap(),
                1,
            )],
        );
        let extractor = extractor(ScriptedEngine::new(&["Trip #12345678\nDeliver To 0042 Corner Shop"]))
            .with_ruleset(ruleset);
        let records = extractor.extract(&page());

        assert_eq!(records.len(), 1);
        assert_eq!(tuple(&records[0]), ("12345678", "0042", "Corner Shop"));
    }

    #[test]
    fn test_engine_failure_yields_empty() {
        let extractor = extractor(ScriptedEngine::failing());
        assert!(extractor.extract(&page()).is_empty());
    }
}
