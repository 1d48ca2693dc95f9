//! PDF page loading.

mod loader;

pub use loader::PageLoader;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;
