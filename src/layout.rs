//! Placement and styling parameters.
//!
//! Bounding boxes arrive in the coordinate space of the front-end picker, a
//! fixed 900×550 canvas, and are rescaled to the real template size here.

use image::Rgb;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::CertError;

pub const REFERENCE_WIDTH: f64 = 900.0;
pub const REFERENCE_HEIGHT: f64 = 550.0;

/// Rectangle drawn on the reference canvas. Start may exceed end; only the
/// midpoint is used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

/// Absolute pixel position on the template where the text center goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl BoundingBox {
    /// Parse the `sx,sy,ex,ey` form field.
    pub fn parse(raw: &str) -> Result<Self, CertError> {
        let values = raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        CertError::validation(format!("Invalid coordinate '{}'", part.trim()))
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        match values.as_slice() {
            &[start_x, start_y, end_x, end_y] => Ok(Self {
                start_x,
                start_y,
                end_x,
                end_y,
            }),
            _ => Err(CertError::validation(format!(
                "Expected 4 coordinates (sx,sy,ex,ey), got {}",
                values.len()
            ))),
        }
    }

    /// Map the box midpoint onto a template of `width`×`height` pixels.
    pub fn anchor(&self, width: u32, height: u32) -> Anchor {
        let scale_x = f64::from(width) / REFERENCE_WIDTH;
        let scale_y = f64::from(height) / REFERENCE_HEIGHT;
        Anchor {
            x: ((self.start_x + self.end_x) / 2.0) * scale_x,
            y: ((self.start_y + self.end_y) / 2.0) * scale_y,
        }
    }
}

fn hex_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$").unwrap())
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(raw: &str) -> Result<Rgb<u8>, CertError> {
    let caps = hex_color_re()
        .captures(raw.trim())
        .ok_or_else(|| CertError::validation(format!("Invalid font color '{}'", raw)))?;

    let mut channels = [0u8; 3];
    for (slot, channel) in channels.iter_mut().enumerate() {
        // The regex guarantees two hex digits per group.
        *channel = u8::from_str_radix(&caps[slot + 1], 16)
            .map_err(|e| CertError::validation(format!("Invalid font color '{}': {}", raw, e)))?;
    }
    Ok(Rgb(channels))
}
