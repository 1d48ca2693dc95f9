//! Image preprocessing for the OCR adapter.

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use tracing::debug;

use super::Line;

/// Preprocessing mode for a recognition pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessMode {
    /// Printed receipts: downscale and contrast stretch only.
    Printed,
    /// Handwritten notes: additionally binarize and thicken strokes.
    Handwritten,
}

/// Image preprocessor for the recognition pipeline.
pub struct ImagePreprocessor {
    /// Maximum image width; wider pages are downscaled.
    max_width: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self { max_width: 1600 }
    }

    /// Set maximum image width.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = width;
        self
    }

    /// Prepare an image for recognition.
    ///
    /// Returns the prepared image and the downscale factor that was applied,
    /// so recognized coordinates can be mapped back to page coordinates.
    pub fn prepare(&self, image: &DynamicImage, mode: PreprocessMode) -> (DynamicImage, f32) {
        let mut rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut scale = 1.0f32;
        if width > self.max_width {
            scale = self.max_width as f32 / width as f32;
            let new_height = ((height as f32 * scale) as u32).max(1);
            rgb = image::imageops::resize(
                &rgb,
                self.max_width,
                new_height,
                image::imageops::FilterType::Triangle,
            );
            debug!(
                "Downscaled page {}x{} -> {}x{}",
                width, height, self.max_width, new_height
            );
        }

        let rgb = autocontrast(&rgb);

        match mode {
            PreprocessMode::Printed => (DynamicImage::ImageRgb8(rgb), scale),
            PreprocessMode::Handwritten => {
                let gray = DynamicImage::ImageRgb8(rgb).to_luma8();
                let blurred = image::imageops::blur(&gray, 1.0);
                let thresh = adaptive_threshold(&blurred, 25, 15);
                let dilated = dilate_2x2(&thresh);
                (DynamicImage::ImageLuma8(dilated).to_rgb8().into(), scale)
            }
        }
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Stretch each channel to the full 0..255 range.
fn autocontrast(image: &RgbImage) -> RgbImage {
    let mut min = [255u8; 3];
    let mut max = [0u8; 3];

    for pixel in image.pixels() {
        for c in 0..3 {
            min[c] = min[c].min(pixel[c]);
            max[c] = max[c].max(pixel[c]);
        }
    }

    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        for c in 0..3 {
            let range = max[c].saturating_sub(min[c]);
            if range > 0 {
                let value = (pixel[c] - min[c]) as u32 * 255 / range as u32;
                pixel[c] = value as u8;
            }
        }
    }
    result
}

/// Local-mean adaptive threshold (block 25, offset 15 for handwriting).
fn adaptive_threshold(image: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    let half_block = block_size / 2;

    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            let mut count = 0u32;

            let y_start = y.saturating_sub(half_block);
            let y_end = (y + half_block + 1).min(height);
            let x_start = x.saturating_sub(half_block);
            let x_end = (x + half_block + 1).min(width);

            for ly in y_start..y_end {
                for lx in x_start..x_end {
                    sum += image.get_pixel(lx, ly)[0] as u32;
                    count += 1;
                }
            }

            let mean = (sum / count) as i32;
            let threshold = mean - c;
            let pixel_value = image.get_pixel(x, y)[0] as i32;

            let output = if pixel_value > threshold { 255 } else { 0 };
            result.put_pixel(x, y, Luma([output]));
        }
    }

    result
}

/// Dilate with a 2x2 kernel to reconnect broken pen strokes.
fn dilate_2x2(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut value = image.get_pixel(x, y)[0];
            if x + 1 < width {
                value = value.max(image.get_pixel(x + 1, y)[0]);
            }
            if y + 1 < height {
                value = value.max(image.get_pixel(x, y + 1)[0]);
            }
            if x + 1 < width && y + 1 < height {
                value = value.max(image.get_pixel(x + 1, y + 1)[0]);
            }
            result.put_pixel(x, y, Luma([value]));
        }
    }

    result
}

/// Crop the padded hull of a line group.
///
/// Returns the crop and its top-left offset in page coordinates, or `None`
/// when the group is empty or degenerate.
pub fn crop_region(
    image: &DynamicImage,
    group: &[Line],
    padding: u32,
) -> Option<(DynamicImage, f32, f32)> {
    if group.is_empty() {
        return None;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for line in group {
        let (lx, ly, hx, hy) = line.rect();
        min_x = min_x.min(lx);
        min_y = min_y.min(ly);
        max_x = max_x.max(hx);
        max_y = max_y.max(hy);
    }

    let min_x = ((min_x as i64) - padding as i64).max(0) as u32;
    let min_y = ((min_y as i64) - padding as i64).max(0) as u32;
    let max_x = ((max_x as u32) + padding).min(image.width());
    let max_y = ((max_y as u32) + padding).min(image.height());

    if max_x <= min_x || max_y <= min_y {
        return None;
    }

    let cropped = image.crop_imm(min_x, min_y, max_x - min_x, max_y - min_y);
    Some((cropped, min_x as f32, min_y as f32))
}
