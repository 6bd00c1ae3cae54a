//! Heatmap overlay compositing.
//!
//! Three rendering paths, from best to last resort: a class activation map
//! composited over the original image, a blurred ellipse placeholder when no
//! activation map is available, and a passthrough of the original bytes when
//! even the placeholder cannot be rendered.

use crate::core::config::OverlayConfig;
use crate::core::errors::DermaError;
use crate::domain::Cam;
use crate::processors::preprocess::encode_jpeg;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;

/// An encoded overlay image together with its MIME type.
#[derive(Debug, Clone)]
pub struct HeatmapImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime: &'static str,
}

/// Composites attention overlays onto lesion photographs.
#[derive(Debug, Clone)]
pub struct HeatmapCompositor {
    config: OverlayConfig,
}

impl HeatmapCompositor {
    /// Creates a compositor with the given overlay settings.
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Renders `cam` as a translucent red layer over the original image.
    ///
    /// The activation map is upsampled to the original dimensions and its
    /// normalized intensity drives the per-pixel alpha of the red layer.
    pub fn compose(&self, original: &[u8], cam: &Cam) -> Result<HeatmapImage, DermaError> {
        let base = image::load_from_memory(original)?.to_rgb8();
        let (width, height) = base.dimensions();

        let mut gray = GrayImage::new(cam.width() as u32, cam.height() as u32);
        for (x, y, pixel) in gray.enumerate_pixels_mut() {
            let value = cam.values()[(y as usize, x as usize)];
            pixel.0[0] = (value.clamp(0.0, 1.0) * 255.0) as u8;
        }
        let alpha = image::imageops::resize(&gray, width, height, FilterType::Triangle);

        let mut layer = RgbaImage::new(width, height);
        for (x, y, pixel) in layer.enumerate_pixels_mut() {
            *pixel = Rgba([255, 0, 0, alpha.get_pixel(x, y).0[0]]);
        }

        self.flatten(base, layer)
    }

    /// Renders the blurred-ellipse placeholder overlay centered on the
    /// image. Used when no activation map could be computed.
    pub fn placeholder(&self, original: &[u8]) -> Result<HeatmapImage, DermaError> {
        let base = image::load_from_memory(original)?.to_rgb8();
        let (width, height) = base.dimensions();

        let margin = self.config.ellipse_margin;
        let radius_x = (width as f32 * (0.5 - margin)) as i32;
        let radius_y = (height as f32 * (0.5 - margin)) as i32;
        let center = (width as i32 / 2, height as i32 / 2);

        let mut layer = RgbaImage::new(width, height);
        draw_filled_ellipse_mut(
            &mut layer,
            center,
            radius_x.max(1),
            radius_y.max(1),
            Rgba([255, 0, 0, self.config.overlay_alpha]),
        );
        let sigma = width.min(height) as f32 / self.config.blur_divisor;
        let layer = image::imageops::blur(&layer, sigma.max(0.1));

        self.flatten(base, layer)
    }

    /// Returns the original bytes untouched, guessing their MIME type.
    /// Never fails.
    pub fn passthrough(&self, original: &[u8]) -> HeatmapImage {
        let mime = image::guess_format(original)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/jpeg");
        HeatmapImage {
            bytes: original.to_vec(),
            mime,
        }
    }

    fn flatten(
        &self,
        base: image::RgbImage,
        layer: RgbaImage,
    ) -> Result<HeatmapImage, DermaError> {
        let mut canvas = DynamicImage::ImageRgb8(base).to_rgba8();
        image::imageops::overlay(&mut canvas, &layer, 0, 0);
        let flattened = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let bytes = encode_jpeg(&flattened)?;
        Ok(HeatmapImage {
            bytes,
            mime: "image/jpeg",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use ndarray::Array2;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([80, 160, 240]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn compositor() -> HeatmapCompositor {
        HeatmapCompositor::new(OverlayConfig::default())
    }

    #[test]
    fn compose_preserves_original_dimensions() {
        let cam = Cam::normalized_from(Array2::from_shape_fn((7, 7), |(y, x)| (y + x) as f32));
        let overlay = compositor().compose(&png_bytes(96, 64), &cam).unwrap();
        assert_eq!(overlay.mime, "image/jpeg");
        let decoded = image::load_from_memory(&overlay.bytes).unwrap();
        assert_eq!(decoded.width(), 96);
        assert_eq!(decoded.height(), 64);
    }

    #[test]
    fn placeholder_preserves_original_dimensions() {
        let overlay = compositor().placeholder(&png_bytes(50, 40)).unwrap();
        let decoded = image::load_from_memory(&overlay.bytes).unwrap();
        assert_eq!(decoded.width(), 50);
        assert_eq!(decoded.height(), 40);
    }

    #[test]
    fn placeholder_rejects_undecodable_input() {
        assert!(compositor().placeholder(b"definitely not an image").is_err());
    }

    #[test]
    fn passthrough_detects_png_mime() {
        let overlay = compositor().passthrough(&png_bytes(8, 8));
        assert_eq!(overlay.mime, "image/png");
    }

    #[test]
    fn passthrough_defaults_to_jpeg_mime() {
        let overlay = compositor().passthrough(b"opaque bytes");
        assert_eq!(overlay.mime, "image/jpeg");
        assert_eq!(overlay.bytes, b"opaque bytes");
    }
}
