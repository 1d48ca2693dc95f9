//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable selecting the summary-template gate mode.
pub const SUMMARY_TEMPLATE_MODE_ENV: &str = "OCR_SUMMARY_TEMPLATE_MODE";

/// Main configuration for the nota pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF page loading configuration.
    pub pdf: PdfConfig,

    /// Total extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// OCR adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Confidence floor for the main per-page pass.
    pub page_confidence_floor: f32,

    /// Confidence floor for handwritten crop re-recognition.
    pub handwritten_confidence_floor: f32,

    /// Confidence floor for summary-report page scans.
    pub summary_confidence_floor: f32,

    /// Maximum image width; wider pages are downscaled before recognition.
    pub max_image_width: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            page_confidence_floor: 0.6,
            handwritten_confidence_floor: 0.5,
            summary_confidence_floor: 0.35,
            max_image_width: 1600,
        }
    }
}

/// PDF page loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI hint for hosts that rasterize pages themselves.
    pub render_dpi: u32,

    /// Acceptable DPI for fallback rasterization.
    pub fallback_dpi: u32,

    /// Maximum pages to load (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            fallback_dpi: 200,
            max_pages: 0,
        }
    }
}

/// Total extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Gate mode for the expense-report summary template.
    pub summary_template_mode: SummaryTemplateMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            summary_template_mode: SummaryTemplateMode::from_env(),
        }
    }
}

/// Gate mode for summary-template detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryTemplateMode {
    /// Require the full report vocabulary and table evidence.
    #[default]
    Strict,
    /// Accept partial report context with column evidence.
    Lenient,
}

impl SummaryTemplateMode {
    /// Read the mode from `OCR_SUMMARY_TEMPLATE_MODE`; invalid values fall
    /// back to strict.
    pub fn from_env() -> Self {
        match std::env::var(SUMMARY_TEMPLATE_MODE_ENV) {
            Ok(value) => match value.trim().to_lowercase().as_str() {
                "lenient" => Self::Lenient,
                _ => Self::Strict,
            },
            Err(_) => Self::Strict,
        }
    }
}

/// Model file paths for the external recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl NotaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
