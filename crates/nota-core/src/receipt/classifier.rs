//! Receipt category classification from keyword and geometric signals.

use crate::models::result::Category;
use crate::ocr::{avg_confidence, Line};

use super::patterns::{
    NUMERIC_LINE, INSTITUTIONAL_MARKERS, PAYMENT_MARKERS, RESI_TAGIHAN_MARKERS, RETAIL_MARKERS,
    SIMPLE_MARKERS,
};

/// Classifies a line set into a receipt category.
///
/// Handwriting is detected geometrically (low confidence, uneven box heights,
/// many short fragments); printed layouts by their marker vocabularies.
pub struct ReceiptClassifier;

impl ReceiptClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Label a line set. First matching rule wins.
    pub fn classify(&self, lines: &[Line]) -> Category {
        if lines.is_empty() {
            return Category::Unknown;
        }

        let texts: Vec<String> = lines.iter().map(|l| l.text.to_lowercase()).collect();
        let avg_conf = avg_confidence(lines);

        let heights: Vec<f32> = lines.iter().map(Line::height).collect();
        let variance = variance(&heights);
        let short_boxes = texts.iter().filter(|t| t.chars().count() <= 6).count();
        let numeric_lines = texts.iter().filter(|t| NUMERIC_LINE.is_match(t)).count();
        let density_short = short_boxes as f32 / texts.len() as f32;
        let ratio_numeric = numeric_lines as f32 / texts.len() as f32;

        let combined = texts.join("\n");
        let retail = marker_hits(&combined, RETAIL_MARKERS);
        let institutional = marker_hits(&combined, INSTITUTIONAL_MARKERS);
        let payment = marker_hits(&combined, PAYMENT_MARKERS);
        let simple = marker_hits(&combined, SIMPLE_MARKERS);
        let resi_tagihan = marker_hits(&combined, RESI_TAGIHAN_MARKERS);

        if avg_conf < 0.75 && variance > 200.0 && density_short > 0.25 {
            return Category::Handwritten;
        }

        // Billing fast-path: "tagihan" anywhere marks a bill regardless of
        // how many other markers hit.
        if combined.contains("tagihan") || resi_tagihan >= 3 {
            return Category::ResiTagihan;
        }

        if retail >= 2 {
            return Category::RetailPrinted;
        }

        if institutional >= 1 {
            return Category::InstitutionalKuitansi;
        }

        if payment >= 2 && retail == 0 {
            return Category::DigitalPayment;
        }

        if simple >= 1 && ratio_numeric > 0.3 {
            return Category::SimpleProof;
        }

        Category::Unknown
    }
}

impl Default for ReceiptClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn marker_hits(combined: &str, markers: &[&str]) -> usize {
    markers.iter().filter(|m| combined.contains(*m)).count()
}

/// Population variance.
fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32
}
