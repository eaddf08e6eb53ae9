//! OCR backend that shells out to the `tesseract` executable.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, SystemTime};

use image::{DynamicImage, ImageFormat};
use tracing::{debug, trace, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::OcrBackend;

/// Tesseract invoked as a child process.
///
/// Each call writes the page to a prefixed PNG in the temp directory and
/// reads the result from stdout. Engine paths and `TESSDATA_PREFIX` are
/// passed per command; the process environment is never modified.
pub struct TesseractBackend {
    config: OcrConfig,
    temp_dir: PathBuf,
}

impl TesseractBackend {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Put temporary page images somewhere other than the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Check that the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.tesseract_path)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn text_args(&self) -> Vec<String> {
        vec![
            "--oem".to_string(),
            self.config.engine_mode.to_string(),
            "--psm".to_string(),
            self.config.text_psm.to_string(),
            "-l".to_string(),
            self.config.language.clone(),
        ]
    }

    fn osd_args(&self) -> Vec<String> {
        vec![
            "--oem".to_string(),
            self.config.engine_mode.to_string(),
            "--psm".to_string(),
            self.config.osd_psm.to_string(),
            "-l".to_string(),
            "osd".to_string(),
        ]
    }

    fn run(&self, image: &DynamicImage, args: &[String]) -> Result<Output, OcrError> {
        let input = tempfile::Builder::new()
            .prefix(&self.config.temp_prefix)
            .suffix(".png")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| OcrError::InvalidImage(format!("failed to create temp file: {}", e)))?;

        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(format!("failed to encode page: {}", e)))?;

        let mut command = Command::new(&self.config.tesseract_path);
        command.arg(input.path()).arg("stdout").args(args);
        if let Some(ref tessdata) = self.config.tessdata_dir {
            command.env("TESSDATA_PREFIX", tessdata);
        }

        trace!("Running {:?}", command);
        let output = command.output().map_err(|e| {
            OcrError::Engine(format!(
                "failed to run {} (is it installed?): {}",
                self.config.tesseract_path.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

impl OcrBackend for TesseractBackend {
    /// Recognized text is stdout only. Diagnostics such as "Empty page!!"
    /// go to stderr and are never treated as page text.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let output = self.run(image, &self.text_args())?;
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Recognized {} chars", text.len());
        Ok(text)
    }

    fn detect_orientation(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let output = self.run(image, &self.osd_args())?;
        Ok(osd_report(&output))
    }

    fn sweep_temp_files(&self) {
        sweep_temp_files(
            &self.temp_dir,
            &self.config.temp_prefix,
            Duration::from_secs(self.config.stale_temp_secs),
        );
    }
}

/// OSD report from a finished run. Some tesseract versions write it to
/// stderr instead of stdout.
fn osd_report(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Rotate:") {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("Rotate:") {
            return stderr.into_owned();
        }
    }
    stdout.into_owned()
}

/// Delete files in `dir` whose names start with `prefix` and whose last
/// modification is at least `min_age` ago.
///
/// Other workers may be removing the same files; every failure is logged
/// and skipped. Returns the number of files removed.
pub fn sweep_temp_files(dir: &Path, prefix: &str, min_age: Duration) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list temp dir {}: {}", dir.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }

        let stale = entry
            .metadata()
            .ok()
            .filter(|m| m.is_file())
            .and_then(|m| m.modified().ok())
            .is_some_and(|modified| now.duration_since(modified).unwrap_or_default() >= min_age);
        if !stale {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove temporary file {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        debug!("Swept {} stale temp files from {}", removed, dir.display());
    }
    removed
}
