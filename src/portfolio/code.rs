use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

use super::pdf::Rgb;

/// Longest profile URL accepted for encoding.
pub const MAX_PAYLOAD_BYTES: usize = 512;

#[derive(Debug, Error)]
pub enum CodeImageError {
    #[error("payload is {len} bytes; the limit is {max}")]
    PayloadTooLong { len: usize, max: usize },
    #[error("invalid code image options: {0}")]
    InvalidOptions(String),
    #[error("qr encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeImageOptions {
    /// Target edge length in pixels. The image is the largest whole-module
    /// multiple not above it, or one pixel per module when the code is wider.
    pub size: u32,
    /// Quiet zone in modules.
    pub margin: u32,
    pub dark: Rgb,
    pub light: Rgb,
}

impl Default for CodeImageOptions {
    fn default() -> Self {
        Self {
            size: 100,
            margin: 1,
            dark: Rgb::BLACK,
            light: Rgb::WHITE,
        }
    }
}

/// 8-bit RGB pixels, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 3) as usize;
        Some(Rgb(self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]))
    }
}

pub trait CodeImageGenerator {
    fn generate(
        &self,
        payload: &str,
        options: &CodeImageOptions,
    ) -> Result<RasterImage, CodeImageError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeGenerator;

impl CodeImageGenerator for QrCodeGenerator {
    fn generate(
        &self,
        payload: &str,
        options: &CodeImageOptions,
    ) -> Result<RasterImage, CodeImageError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(CodeImageError::PayloadTooLong {
                len: payload.len(),
                max: MAX_PAYLOAD_BYTES,
            });
        }
        if options.size == 0 {
            return Err(CodeImageError::InvalidOptions("size must be > 0".into()));
        }

        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
            .map_err(|e| CodeImageError::Encode(e.to_string()))?;
        let modules = code.width() as u32;
        let colors = code.to_colors();

        let margin = options.margin;
        let total = modules + 2 * margin;
        let scale = (options.size / total).max(1);
        let side = total * scale;

        let mut rgb = Vec::with_capacity((side * side * 3) as usize);
        for py in 0..side {
            let my = py / scale;
            for px in 0..side {
                let mx = px / scale;
                let inside = mx >= margin
                    && my >= margin
                    && mx < margin + modules
                    && my < margin + modules;
                let dark = inside
                    && colors[((my - margin) * modules + (mx - margin)) as usize] == Color::Dark;
                let c = if dark { options.dark } else { options.light };
                rgb.extend_from_slice(&[c.0, c.1, c.2]);
            }
        }

        Ok(RasterImage {
            width: side,
            height: side,
            rgb,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_image_fits_requested_size() {
        let img = QrCodeGenerator
            .generate("http://localhost:3000/profile/abc", &CodeImageOptions::default())
            .expect("generate");
        assert_eq!(img.width, img.height);
        assert!(img.width <= 100);
        assert_eq!(img.rgb.len(), (img.width * img.height * 3) as usize);
        // Quiet zone is light, the finder pattern corner is dark.
        assert_eq!(img.pixel(0, 0), Some(Rgb::WHITE));
        let first_dark = (0..img.width)
            .find(|&i| img.pixel(i, i) == Some(Rgb::BLACK))
            .expect("finder pattern");
        assert!(first_dark > 0 && first_dark < img.width / 4);
    }

    #[test]
    fn custom_colors_are_applied() {
        let opts = CodeImageOptions {
            dark: Rgb(0x1F, 0x29, 0x37),
            light: Rgb(0xF9, 0xFA, 0xFB),
            ..CodeImageOptions::default()
        };
        let img = QrCodeGenerator.generate("x", &opts).expect("generate");
        assert_eq!(img.pixel(0, 0), Some(opts.light));
        assert!(img
            .rgb
            .chunks(3)
            .any(|p| p == [0x1F, 0x29, 0x37]));
    }

    #[test]
    fn wide_code_falls_back_to_one_pixel_per_module() {
        let payload = format!("https://records.example.edu/profile/{}", "a".repeat(300));
        let opts = CodeImageOptions {
            size: 64,
            ..CodeImageOptions::default()
        };
        let modules = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
            .expect("encode")
            .width() as u32;
        let total = modules + 2 * opts.margin;
        assert!(total > opts.size);

        let img = QrCodeGenerator.generate(&payload, &opts).expect("generate");
        assert_eq!(img.width, total);
        assert_eq!(img.height, total);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let long = "x".repeat(MAX_PAYLOAD_BYTES + 1);
        let e = QrCodeGenerator
            .generate(&long, &CodeImageOptions::default())
            .unwrap_err();
        assert!(matches!(e, CodeImageError::PayloadTooLong { .. }));
    }
}
