//! OCR adapter over an external text recognizer.

mod preprocessing;
mod processor;
mod pure_engine;

pub use preprocessing::{crop_region, ImagePreprocessor, PreprocessMode};
pub use processor::OcrProcessor;
pub use pure_engine::PureOcrBackend;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Raw recognition emitted by a backend: a quadrilateral plus text and
/// confidence, in the coordinates of the image the backend was given.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Corner points, clockwise from top-left.
    pub points: [[f32; 2]; 4],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

/// External text recognizer contract.
///
/// A backend takes an RGB image and returns recognized lines grouped per
/// detected page. Backends that process a single image still wrap their lines
/// in an outer batch; the adapter flattens a single-wrapped batch.
pub trait OcrBackend {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Vec<RawLine>>, OcrError>;
}

/// A recognized text line in page coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Quadrilateral coordinates (x1, y1, x2, y2, x3, y3, x4, y4), clockwise.
    pub bbox: [f32; 8],

    /// The same quadrilateral as corner points, when the backend provides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_points: Option<[[f32; 2]; 4]>,
}

impl Line {
    /// Horizontal centroid of the quadrilateral.
    pub fn x_center(&self) -> f32 {
        (self.bbox[0] + self.bbox[2] + self.bbox[4] + self.bbox[6]) / 4.0
    }

    /// Vertical centroid of the quadrilateral.
    pub fn y_center(&self) -> f32 {
        (self.bbox[1] + self.bbox[3] + self.bbox[5] + self.bbox[7]) / 4.0
    }

    /// Height of the quadrilateral (vertical extent).
    pub fn height(&self) -> f32 {
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];
        let min = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        max - min
    }

    /// Axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    /// Offset all coordinates, used to map crop-local lines back onto the page.
    pub fn translated(mut self, dx: f32, dy: f32) -> Self {
        for i in (0..8).step_by(2) {
            self.bbox[i] += dx;
            self.bbox[i + 1] += dy;
        }
        if let Some(points) = self.box_points.as_mut() {
            for point in points.iter_mut() {
                point[0] += dx;
                point[1] += dy;
            }
        }
        self
    }
}

/// Average recognition confidence over a line set (0.0 when empty).
pub fn avg_confidence(lines: &[Line]) -> f32 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32
}

#[cfg(test)]
pub(crate) fn test_line(text: &str, confidence: f32, bbox: [f32; 8]) -> Line {
    Line {
        text: text.to_string(),
        confidence,
        bbox,
        box_points: None,
    }
}
