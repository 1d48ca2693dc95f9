//! Max-amount strategies for categories whose totals carry no reliable label.

use crate::models::result::Total;
use crate::ocr::Line;

use super::super::amount::{amounts_from_line, max_amount_with_bbox};
use super::super::patterns::MIN_HANDWRITTEN_AMOUNT;
use super::TotalStrategy;

/// Handwritten notes: the largest amount, with a raised floor against noise.
pub struct HandwrittenExtractor;

impl TotalStrategy for HandwrittenExtractor {
    fn extract(&self, lines: &[Line], _page_height: f32) -> Option<Total> {
        let (amount, bbox) = max_amount_with_bbox(lines)?;
        if amount < MIN_HANDWRITTEN_AMOUNT {
            return None;
        }
        Some(Total::new(amount, 0.6, Some(bbox)))
    }
}

/// Digital payment proofs: a single dominant amount.
pub struct DigitalPaymentExtractor;

impl TotalStrategy for DigitalPaymentExtractor {
    fn extract(&self, lines: &[Line], _page_height: f32) -> Option<Total> {
        let (amount, bbox) = max_amount_with_bbox(lines)?;
        Some(Total::new(amount, 0.7, Some(bbox)))
    }
}

/// Minimal payment proofs: same shape as digital, scored lower.
pub struct SimpleProofExtractor;

impl TotalStrategy for SimpleProofExtractor {
    fn extract(&self, lines: &[Line], _page_height: f32) -> Option<Total> {
        let (amount, bbox) = max_amount_with_bbox(lines)?;
        Some(Total::new(amount, 0.6, Some(bbox)))
    }
}

/// Formal kuitansi: the figure follows "sebesar" ("in the amount of").
pub struct KuitansiExtractor;

impl TotalStrategy for KuitansiExtractor {
    fn extract(&self, lines: &[Line], _page_height: f32) -> Option<Total> {
        for line in lines {
            if !line.text.to_lowercase().contains("sebesar") {
                continue;
            }
            if let Some(amount) = amounts_from_line(&line.text).into_iter().max() {
                return Some(Total::new(amount, 0.7, Some(line.bbox)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::test_line;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handwritten_floor() {
        let lines = vec![test_line("jajan 8.500", 0.5, [0.0; 8])];
        assert!(HandwrittenExtractor.extract(&lines, 1000.0).is_none());

        let lines = vec![test_line("Jumlah Rp 85.000", 0.5, [0.0; 8])];
        let total = HandwrittenExtractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 85_000);
        assert_eq!(total.confidence, 0.6);
    }

    #[test]
    fn test_digital_payment_takes_maximum() {
        let lines = vec![
            test_line("Transfer Rp 120.000", 0.9, [0.0; 8]),
            test_line("Biaya admin 2.500", 0.9, [1.0; 8]),
        ];
        let total = DigitalPaymentExtractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 120_000);
        assert_eq!(total.confidence, 0.7);
    }

    #[test]
    fn test_kuitansi_reads_sebesar_line() {
        let lines = vec![
            test_line("Telah terima dari Bendahara", 0.9, [0.0; 8]),
            test_line("uang sebesar Rp 250.000", 0.9, [1.0; 8]),
        ];
        let total = KuitansiExtractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 250_000);
        assert_eq!(total.confidence, 0.7);
    }

    #[test]
    fn test_kuitansi_without_sebesar_yields_none() {
        let lines = vec![test_line("KWITANSI No 12", 0.9, [0.0; 8])];
        assert!(KuitansiExtractor.extract(&lines, 1000.0).is_none());
    }
}
