//! Result types emitted by the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Receipt layout category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Handwritten note or handwritten kuitansi.
    Handwritten,
    /// Printed retail receipt (supermarket, restaurant).
    RetailPrinted,
    /// Formal kuitansi using the "sebesar" phrasing.
    InstitutionalKuitansi,
    /// Digital payment proof (transfer, QRIS, virtual account).
    DigitalPayment,
    /// Minimal payment proof.
    SimpleProof,
    /// Telecom/utility bill or payment receipt ("tagihan").
    ResiTagihan,
    /// Expense accountability report with a pengeluaran column.
    SaldoPengeluaranSummary,
    /// No category matched.
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Handwritten => "handwritten",
            Category::RetailPrinted => "retail_printed",
            Category::InstitutionalKuitansi => "institutional_kuitansi",
            Category::DigitalPayment => "digital_payment",
            Category::SimpleProof => "simple_proof",
            Category::ResiTagihan => "resi_tagihan",
            Category::SaldoPengeluaranSummary => "saldo_pengeluaran_summary",
            Category::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A single receipt total with its score and source line box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Total {
    /// Total amount in whole rupiah.
    #[serde(rename = "total")]
    pub amount: i64,

    /// Extraction confidence, clamped to 1.0 on emission.
    pub confidence: f32,

    /// Quadrilateral of the line the amount was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 8]>,
}

impl Total {
    /// Build a total with the confidence clamped and rounded for reporting.
    pub fn new(amount: i64, score: f32, bbox: Option<[f32; 8]>) -> Self {
        Self {
            amount,
            confidence: round4(score.min(1.0)),
            bbox,
        }
    }
}

/// Result of processing one rasterized page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Page number (1-indexed).
    pub page: usize,

    /// Sum of the receipt totals found on the page.
    pub page_total: i64,

    /// Number of receipts detected (at most two).
    pub receipt_count: usize,

    /// Per-receipt totals.
    pub receipts: Vec<Total>,

    /// Category per line group.
    pub categories: Vec<Category>,

    /// Average recognition confidence over the page lines.
    pub avg_confidence: f32,

    /// Recognized text, one entry per line.
    pub raw_text: Vec<String>,
}

/// Result of processing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// The detected grand total, or `None` when nothing survived.
    pub grand_total: Option<i64>,

    /// Currency code, always "IDR".
    pub currency: String,

    /// Document confidence, rounded to 4 decimals.
    pub confidence: f32,

    /// Total number of receipts across pages.
    pub receipt_count: usize,

    /// Categories detected across pages.
    pub category_detected: Vec<Category>,

    /// Per-page breakdown.
    pub per_page: Vec<PageResult>,

    /// All recognized text, newline-joined.
    pub raw_text: String,

    /// Populated whenever `grand_total` is `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    /// Error result for inputs that yield no pages.
    pub fn no_pages() -> Self {
        Self {
            grand_total: None,
            currency: "IDR".to_string(),
            confidence: 0.0,
            receipt_count: 0,
            category_detected: Vec::new(),
            per_page: Vec::new(),
            raw_text: String::new(),
            error: Some("No pages to process".to_string()),
        }
    }
}

/// Round to 4 decimals for reporting.
pub fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_serializes_as_snake_case() {
        let json = serde_json::to_string(&Category::SaldoPengeluaranSummary).unwrap();
        assert_eq!(json, "\"saldo_pengeluaran_summary\"");
        assert_eq!(Category::ResiTagihan.to_string(), "resi_tagihan");
    }

    #[test]
    fn test_total_clamps_and_rounds_confidence() {
        let total = Total::new(45_000, 1.2345, None);
        assert_eq!(total.confidence, 1.0);
        let total = Total::new(45_000, 0.87654, None);
        assert_eq!(total.confidence, 0.8765);
    }

    #[test]
    fn test_total_serializes_amount_as_total() {
        let total = Total::new(45_000, 0.7, None);
        let json = serde_json::to_string(&total).unwrap();
        assert_eq!(json, "{\"total\":45000,\"confidence\":0.7}");
    }

    #[test]
    fn test_no_pages_result_carries_error() {
        let result = DocumentResult::no_pages();
        assert!(result.grand_total.is_none());
        assert_eq!(result.error.as_deref(), Some("No pages to process"));
    }
}
