//! Recognizer backend wrapper using `pure-onnx-ocr`.

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::ModelConfig;

use super::{OcrBackend, RawLine};

/// Recognizer backed by `pure-onnx-ocr` (pure Rust, no external ONNX runtime).
pub struct PureOcrBackend {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl PureOcrBackend {
    /// Create a backend from model files in a directory.
    pub fn from_dir(model_dir: &Path, models: &ModelConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }
}

impl OcrBackend for PureOcrBackend {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Vec<RawLine>>, OcrError> {
        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let lines = results
            .iter()
            .map(|r| RawLine {
                points: polygon_points(&r.bounding_box),
                text: r.text.replace("[UNK]", " ").trim().to_string(),
                confidence: r.confidence,
            })
            .collect();

        Ok(vec![lines])
    }
}

/// Extract the first four exterior points of a polygon as a quadrilateral.
fn polygon_points(polygon: &pure_onnx_ocr::Polygon<f64>) -> [[f32; 2]; 4] {
    let mut points = [[0.0f32; 2]; 4];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        points[i] = [coord.x as f32, coord.y as f32];
    }
    points
}
