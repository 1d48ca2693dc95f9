//! OCR adapter: preprocessing, recognition, and line normalization.

use image::DynamicImage;
use tracing::{debug, warn};

use super::preprocessing::{ImagePreprocessor, PreprocessMode};
use super::{Line, OcrBackend, RawLine};

/// Adapter over an external recognizer backend.
///
/// Prepares the page image, runs the backend, and normalizes its output into
/// [`Line`] records in page coordinates. Backend failures are logged and
/// yield an empty line set so the pipeline can continue with its next stage.
pub struct OcrProcessor<B: OcrBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
}

impl<B: OcrBackend> OcrProcessor<B> {
    /// Create a new adapter around a backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
        }
    }

    /// Set the maximum image width used by preprocessing.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.preprocessor = ImagePreprocessor::new().with_max_width(width);
        self
    }

    /// Recognize lines on an image.
    ///
    /// Lines with empty text or confidence below `confidence_floor` are
    /// dropped. Returned coordinates are in the coordinates of the input
    /// image, regardless of any preprocessing downscale.
    pub fn run(
        &self,
        image: &DynamicImage,
        mode: PreprocessMode,
        confidence_floor: f32,
    ) -> Vec<Line> {
        let (prepared, scale) = self.preprocessor.prepare(image, mode);

        let batches = match self.backend.recognize(&prepared) {
            Ok(batches) => batches,
            Err(e) => {
                warn!("OCR failed: {}", e);
                return Vec::new();
            }
        };

        let raw = flatten_batches(batches);
        debug!("Recognizer returned {} raw lines", raw.len());

        raw.into_iter()
            .filter(|line| !line.text.is_empty() && line.confidence >= confidence_floor)
            .map(|line| normalize_line(line, scale))
            .collect()
    }
}

/// Flatten the backend's batch output.
///
/// A single-wrapped batch (one inner list holding the page's recognitions)
/// becomes that inner list; anything else is concatenated in order.
fn flatten_batches(batches: Vec<Vec<RawLine>>) -> Vec<RawLine> {
    let mut iter = batches.into_iter();
    match (iter.next(), iter.next()) {
        (Some(first), None) => first,
        (Some(first), Some(second)) => {
            let mut lines = first;
            lines.extend(second);
            lines.extend(iter.flatten());
            lines
        }
        (None, _) => Vec::new(),
    }
}

/// Map a raw recognition back to page coordinates.
fn normalize_line(raw: RawLine, scale: f32) -> Line {
    let inv = if scale > 0.0 { 1.0 / scale } else { 1.0 };

    let mut points = raw.points;
    for point in points.iter_mut() {
        point[0] *= inv;
        point[1] *= inv;
    }

    let mut bbox = [0.0f32; 8];
    for (i, point) in points.iter().enumerate() {
        bbox[i * 2] = point[0];
        bbox[i * 2 + 1] = point[1];
    }

    Line {
        text: raw.text,
        confidence: raw.confidence,
        bbox,
        box_points: Some(points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use pretty_assertions::assert_eq;

    struct FixedBackend {
        batches: Vec<Vec<RawLine>>,
    }

    impl OcrBackend for FixedBackend {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<Vec<RawLine>>, OcrError> {
            Ok(self.batches.clone())
        }
    }

    struct FailingBackend;

    impl OcrBackend for FailingBackend {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<Vec<RawLine>>, OcrError> {
            Err(OcrError::Recognition("model crashed".to_string()))
        }
    }

    fn raw(text: &str, confidence: f32) -> RawLine {
        RawLine {
            points: [[0.0, 0.0], [10.0, 0.0], [10.0, 5.0], [0.0, 5.0]],
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_run_filters_by_confidence_and_empty_text() {
        let backend = FixedBackend {
            batches: vec![vec![raw("TOTAL 45.000", 0.9), raw("", 0.9), raw("noise", 0.2)]],
        };
        let processor = OcrProcessor::new(backend);
        let image = DynamicImage::new_rgb8(100, 100);

        let lines = processor.run(&image, PreprocessMode::Printed, 0.6);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "TOTAL 45.000");
    }

    #[test]
    fn test_run_swallows_backend_errors() {
        let processor = OcrProcessor::new(FailingBackend);
        let image = DynamicImage::new_rgb8(100, 100);
        assert!(processor.run(&image, PreprocessMode::Printed, 0.6).is_empty());
    }

    #[test]
    fn test_flatten_single_wrapped_batch() {
        let flat = flatten_batches(vec![vec![raw("a", 0.9), raw("b", 0.9)]]);
        assert_eq!(flat.len(), 2);

        let flat = flatten_batches(vec![vec![raw("a", 0.9)], vec![raw("b", 0.9)]]);
        assert_eq!(flat.len(), 2);

        assert!(flatten_batches(Vec::new()).is_empty());
    }

    #[test]
    fn test_coordinates_mapped_back_to_page_scale() {
        let backend = FixedBackend {
            batches: vec![vec![raw("TOTAL 45.000", 0.9)]],
        };
        // 3200px page is downscaled by half before recognition, so recognized
        // coordinates must be doubled on the way out.
        let processor = OcrProcessor::new(backend);
        let image = DynamicImage::new_rgb8(3200, 1600);

        let lines = processor.run(&image, PreprocessMode::Printed, 0.6);
        assert_eq!(lines[0].bbox[2], 20.0);
        assert_eq!(lines[0].bbox[5], 10.0);
    }
}
