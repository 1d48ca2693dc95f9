//! Core library for Indonesian receipt OCR processing.
//!
//! This crate provides:
//! - Page loading (image files and scanned PDFs)
//! - An adapter over an external text recognizer
//! - Receipt category classification and page segmentation
//! - Grand-total extraction across heterogeneous receipt layouts

pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod receipt;

pub use error::{NotaError, Result};
pub use models::config::{NotaConfig, SummaryTemplateMode};
pub use models::result::{Category, DocumentResult, PageResult, Total};
pub use ocr::{Line, OcrBackend, OcrProcessor, PreprocessMode, PureOcrBackend, RawLine};
pub use pdf::PageLoader;
pub use receipt::service::ReceiptService;
