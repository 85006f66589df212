//! CIE xyY colors as used by MVR fixtures and GDTF wheel slots

use crate::error::{Error, Result};
use crate::transform::format_float;

/// A color in CIE 1931 xyY space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CieColor {
    /// Chromaticity x
    pub x: f64,
    /// Chromaticity y
    pub y: f64,
    /// Luminance (0..100)
    pub big_y: f64,
}

impl CieColor {
    /// Create a color from its components
    pub fn new(x: f64, y: f64, big_y: f64) -> Self {
        Self { x, y, big_y }
    }

    /// Parse `x,y,Y` text
    ///
    /// A missing luminance defaults to 100.
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(Error::parse_error_with_context("color", text, "x,y,Y"));
        }
        let component = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| Error::parse_error_with_context("color", text, "x,y,Y"))
        };
        let x = component(parts[0])?;
        let y = component(parts[1])?;
        let big_y = match parts.get(2) {
            Some(s) => component(s)?,
            None => 100.0,
        };
        Ok(Self { x, y, big_y })
    }

    /// Convert to 8-bit sRGB
    ///
    /// Returns `None` for a color with zero chromaticity y, which has no
    /// defined XYZ value.
    pub fn to_srgb(&self) -> Option<[u8; 3]> {
        if self.y <= 0.0 {
            return None;
        }
        let luminance = self.big_y / 100.0;
        let big_x = self.x * luminance / self.y;
        let big_z = (1.0 - self.x - self.y) * luminance / self.y;

        let r = 3.2406 * big_x - 1.5372 * luminance - 0.4986 * big_z;
        let g = -0.9689 * big_x + 1.8758 * luminance + 0.0415 * big_z;
        let b = 0.0557 * big_x - 0.2040 * luminance + 1.0570 * big_z;

        // Normalize so the brightest channel saturates, keeping the hue
        let max = r.max(g).max(b);
        let (r, g, b) = if max > 1.0 { (r / max, g / max, b / max) } else { (r, g, b) };

        Some([gamma(r), gamma(g), gamma(b)])
    }
}

fn gamma(linear: f64) -> u8 {
    let linear = linear.clamp(0.0, 1.0);
    let encoded = if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

impl std::fmt::Display for CieColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{}",
            format_float(self.x),
            format_float(self.y),
            format_float(self.big_y)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_components() {
        let c = CieColor::parse("0.3127,0.3290,100").unwrap();
        assert_eq!(c.x, 0.3127);
        assert_eq!(c.big_y, 100.0);
        assert_eq!(c.to_string(), "0.3127,0.329,100");
    }

    #[test]
    fn test_parse_defaults_luminance() {
        let c = CieColor::parse("0.64, 0.33").unwrap();
        assert_eq!(c.big_y, 100.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CieColor::parse("red").is_err());
        assert!(CieColor::parse("0.1,0.2,0.3,0.4").is_err());
    }

    #[test]
    fn test_white_point_is_white() {
        let rgb = CieColor::new(0.3127, 0.3290, 100.0).to_srgb().unwrap();
        assert!(rgb.iter().all(|&c| c >= 250));
    }

    #[test]
    fn test_red_primary_is_red() {
        let rgb = CieColor::new(0.64, 0.33, 21.26).to_srgb().unwrap();
        assert!(rgb[0] > 200);
        assert!(rgb[1] < 30);
        assert!(rgb[2] < 30);
    }

    #[test]
    fn test_zero_y_has_no_rgb() {
        assert!(CieColor::new(0.3, 0.0, 100.0).to_srgb().is_none());
    }
}
