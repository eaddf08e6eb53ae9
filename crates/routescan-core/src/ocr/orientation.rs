//! Page orientation detection and correction.

use std::fmt;
use std::thread;
use std::time::Duration;

use image::DynamicImage;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::models::config::OrientationConfig;

use super::OcrBackend;

lazy_static! {
    static ref ROTATE_LINE: Regex = Regex::new(r"Rotate: (\d+)").unwrap();
}

/// A right-angle page rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map a reported angle in degrees to a rotation.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::None),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Undo a rotation reported by OSD: rotate clockwise by the reported
    /// angle. The canvas grows to fit, so nothing is cropped.
    pub fn correct(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::None => image.clone(),
            Self::Deg90 => image.rotate90(),
            Self::Deg180 => image.rotate180(),
            Self::Deg270 => image.rotate270(),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Extract the rotation from an OSD report.
pub fn parse_osd_rotation(report: &str) -> Result<Rotation, OcrError> {
    let caps = ROTATE_LINE
        .captures(report)
        .ok_or_else(|| OcrError::Orientation("no Rotate line in OSD output".to_string()))?;

    let degrees: u32 = caps[1]
        .parse()
        .map_err(|_| OcrError::Orientation(format!("unreadable angle {:?}", &caps[1])))?;

    Rotation::from_degrees(degrees)
        .ok_or_else(|| OcrError::Orientation(format!("unsupported angle {}", degrees)))
}

/// Detects page rotation with the engine's OSD mode and rotates pages upright.
pub struct OrientationCorrector<'a, E: OcrBackend + ?Sized> {
    engine: &'a E,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<'a, E: OcrBackend + ?Sized> OrientationCorrector<'a, E> {
    /// Create a corrector with three attempts and a one second delay.
    pub fn new(engine: &'a E) -> Self {
        Self::from_config(engine, &OrientationConfig::default())
    }

    pub fn from_config(engine: &'a E, config: &OrientationConfig) -> Self {
        Self {
            engine,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Override the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Detect the page's rotation.
    ///
    /// Engine failures are retried with a fixed delay. A report that can't be
    /// parsed is returned as an error straight away.
    pub fn detect(&self, image: &DynamicImage) -> Result<Rotation, OcrError> {
        let report = self.detect_with_retry(image)?;
        parse_osd_rotation(&report)
    }

    /// Rotate the image upright, returning the applied correction.
    pub fn correct(&self, image: &DynamicImage) -> Result<(DynamicImage, Rotation), OcrError> {
        let rotation = self.detect(image)?;
        if rotation != Rotation::None {
            debug!("Rotating page by -{} to correct orientation", rotation);
        }
        Ok((rotation.correct(image), rotation))
    }

    fn detect_with_retry(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let mut attempt = 1;
        loop {
            match self.engine.detect_orientation(image) {
                Ok(report) => return Ok(report),
                Err(e) if attempt < self.max_attempts => {
                    warn!("OSD attempt {} failed: {}", attempt, e);
                    thread::sleep(self.retry_delay);
                    attempt += 1;
                }
                Err(e) => {
                    warn!("OSD attempt {} failed, giving up: {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
