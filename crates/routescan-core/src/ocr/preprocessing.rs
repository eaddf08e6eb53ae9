//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::trace;

use crate::models::config::PreprocessConfig;

/// Sharpen kernel, normalized by its sum (16).
const SHARPEN_KERNEL: [i32; 9] = [-2, -2, -2, -2, 32, -2, -2, -2, -2];
const SHARPEN_SCALE: i32 = 16;

/// Image preprocessor for the OCR pipeline.
///
/// Runs grayscale, contrast boost, sharpening, and a hard threshold, in that
/// order. Every step produces a new image.
pub struct ImagePreprocessor {
    /// Contrast enhancement factor around the mean luminance.
    contrast: f32,
    /// Pixels below this luminance become black.
    threshold: u8,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            contrast: 2.0,
            threshold: 128,
        }
    }

    /// Create a preprocessor from configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new()
            .with_contrast(config.contrast)
            .with_threshold(config.threshold)
    }

    /// Set the contrast factor.
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    /// Set the binarization threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Prepare a rasterized page for text recognition.
    pub fn process(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        trace!("Preprocessing {}x{} page", width, height);

        let gray = image.to_luma8();
        let contrasted = self.enhance_contrast(&gray);
        let sharpened = sharpen(&contrasted);
        let binary = self.binarize(&sharpened);

        DynamicImage::ImageLuma8(binary)
    }

    fn enhance_contrast(&self, image: &GrayImage) -> GrayImage {
        let mean = mean_luminance(image);
        let mut result = GrayImage::new(image.width(), image.height());

        for (x, y, pixel) in image.enumerate_pixels() {
            let value = mean + self.contrast * (pixel[0] as f32 - mean);
            result.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }

        result
    }

    fn binarize(&self, image: &GrayImage) -> GrayImage {
        let mut result = GrayImage::new(image.width(), image.height());

        for (x, y, pixel) in image.enumerate_pixels() {
            let output = if pixel[0] < self.threshold { 0 } else { 255 };
            result.put_pixel(x, y, Luma([output]));
        }

        result
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean luminance rounded to the nearest integer level.
fn mean_luminance(image: &GrayImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    (sum as f64 / count as f64).round() as f32
}

/// 3x3 sharpen convolution. Border pixels are copied unchanged.
fn sharpen(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = image.clone();

    if width < 3 || height < 3 {
        return result;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = 0i32;
            for (i, weight) in SHARPEN_KERNEL.iter().enumerate() {
                let kx = x + (i as u32 % 3) - 1;
                let ky = y + (i as u32 / 3) - 1;
                acc += weight * image.get_pixel(kx, ky)[0] as i32;
            }
            let value = (acc + SHARPEN_SCALE / 2).div_euclid(SHARPEN_SCALE);
            result.put_pixel(x, y, Luma([value.clamp(0, 255) as u8]));
        }
    }

    result
}
