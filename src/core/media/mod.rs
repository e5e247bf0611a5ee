//! # Media Module
//!
//! Payload-derived metadata. Only the image header is read; pixels are
//! never decoded.

use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Pixel dimensions of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height, `None` for a zero height
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            return None;
        }
        Some(self.width as f64 / self.height as f64)
    }
}

/// Read image dimensions from payload bytes.
///
/// The format is guessed from magic bytes, so the url extension does not
/// have to be trusted. Returns `None` when the bytes are not a readable image.
pub fn read_dimensions(payload: &[u8]) -> Option<Dimensions> {
    let reader = ImageReader::new(Cursor::new(payload))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(Dimensions { width, height })
}
