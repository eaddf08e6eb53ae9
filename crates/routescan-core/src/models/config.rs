//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding [`OcrConfig::tesseract_path`].
pub const ENV_TESSERACT: &str = "ROUTESCAN_TESSERACT";
/// Environment variable overriding [`PdfConfig::pdftoppm_path`].
pub const ENV_PDFTOPPM: &str = "ROUTESCAN_PDFTOPPM";
/// Environment variable overriding [`OcrConfig::tessdata_dir`].
pub const ENV_TESSDATA_DIR: &str = "ROUTESCAN_TESSDATA_DIR";

/// Main configuration for the routescan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Image cleanup before OCR.
    pub preprocess: PreprocessConfig,

    /// Orientation correction configuration.
    pub orientation: OrientationConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Batch scheduling configuration.
    pub batch: BatchConfig,
}

/// Tesseract invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable (name on PATH or absolute path).
    pub tesseract_path: PathBuf,

    /// Passed to tesseract as `TESSDATA_PREFIX` when set.
    pub tessdata_dir: Option<PathBuf>,

    /// Recognition language.
    pub language: String,

    /// OCR engine mode (`--oem`).
    pub engine_mode: u8,

    /// Page segmentation mode for text recognition (`--psm`).
    pub text_psm: u8,

    /// Page segmentation mode for orientation detection (`--psm`).
    pub osd_psm: u8,

    /// Filename prefix for images handed to tesseract.
    pub temp_prefix: String,

    /// Prefixed temp files older than this are swept before each page.
    pub stale_temp_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            tessdata_dir: None,
            language: "eng".to_string(),
            engine_mode: 3,
            text_psm: 6,
            osd_psm: 0,
            temp_prefix: "routescan_".to_string(),
            stale_temp_secs: 300,
        }
    }
}

/// Image cleanup applied to every page before OCR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Contrast factor around the mean luminance.
    pub contrast: f32,

    /// Binarization cutoff; darker pixels become black.
    pub threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast: 2.0,
            threshold: 128,
        }
    }
}

/// Orientation detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Run OSD before text recognition.
    pub enabled: bool,

    /// Total OSD attempts before giving up.
    pub max_attempts: u32,

    /// Fixed delay between OSD attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// How PDF pages are turned into images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterizerKind {
    /// Render with poppler's `pdftoppm`.
    Poppler,
    /// Decode the scanned image embedded in each page.
    Embedded,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Rasterizer backend.
    pub rasterizer: RasterizerKind,

    /// `pdftoppm` executable (name on PATH or absolute path).
    pub pdftoppm_path: PathBuf,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 200,
            rasterizer: RasterizerKind::Poppler,
            pdftoppm_path: PathBuf::from("pdftoppm"),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on concurrently processed documents.
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

impl BatchConfig {
    /// Pool size: one less than the available parallelism, capped at
    /// `max_workers`, never below 1.
    pub fn pool_size(&self, available_parallelism: usize) -> usize {
        available_parallelism
            .saturating_sub(1)
            .min(self.max_workers)
            .max(1)
    }
}

impl ScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var_os(key));
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(path) = non_empty(ENV_TESSERACT) {
            self.ocr.tesseract_path = path;
        }
        if let Some(path) = non_empty(ENV_PDFTOPPM) {
            self.pdf.pdftoppm_path = path;
        }
        if let Some(path) = non_empty(ENV_TESSDATA_DIR) {
            self.ocr.tessdata_dir = Some(path);
        }
    }
}
