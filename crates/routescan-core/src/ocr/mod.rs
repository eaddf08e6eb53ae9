//! OCR pipeline: page preprocessing, orientation correction, and the engine seam.

mod orientation;
mod preprocessing;
mod tesseract;

pub use orientation::{parse_osd_rotation, OrientationCorrector, Rotation};
pub use preprocessing::ImagePreprocessor;
pub use tesseract::{sweep_temp_files, TesseractBackend};

use image::DynamicImage;

use crate::error::OcrError;

/// An external OCR engine.
///
/// Implementations must be shareable across batch workers.
pub trait OcrBackend: Send + Sync {
    /// Recognize the full text of a page image.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Run orientation and script detection and return the raw report.
    ///
    /// The report contains a `Rotate: <degrees>` line.
    fn detect_orientation(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Remove leftovers from earlier engine runs. Failures are only logged.
    fn sweep_temp_files(&self) {}
}

impl<T: OcrBackend + ?Sized> OcrBackend for std::sync::Arc<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        (**self).recognize(image)
    }

    fn detect_orientation(&self, image: &DynamicImage) -> Result<String, OcrError> {
        (**self).detect_orientation(image)
    }

    fn sweep_temp_files(&self) {
        (**self).sweep_temp_files()
    }
}
