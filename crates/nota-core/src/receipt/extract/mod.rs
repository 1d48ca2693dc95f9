//! Total-extraction strategies, one per receipt category plus generic
//! ranking and billing-anchored variants.

mod billing;
mod category;
mod generic;
mod retail;

pub use billing::BillingExtractor;
pub use category::{
    DigitalPaymentExtractor, HandwrittenExtractor, KuitansiExtractor, SimpleProofExtractor,
};
pub use generic::GenericExtractor;
pub use retail::RetailRankedExtractor;

use crate::models::result::Total;
use crate::ocr::Line;

/// A strategy that reads one receipt's total from its line group.
pub trait TotalStrategy {
    fn extract(&self, lines: &[Line], page_height: f32) -> Option<Total>;
}

/// A scored amount produced inside an extractor stage.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub amount: i64,
    pub score: f32,
    pub bbox: [f32; 8],
}

/// Rank candidates by (score, amount) descending.
///
/// The sort is stable, so equal keys keep first-encountered order.
pub(crate) fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.amount.cmp(&a.amount))
    });
}

/// Lines sorted by vertical centroid, for neighbor-window scans.
pub(crate) fn ordered_by_y(lines: &[Line]) -> Vec<Line> {
    let mut ordered = lines.to_vec();
    ordered.sort_by(|a, b| {
        a.y_center()
            .partial_cmp(&b.y_center())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ordered
}

/// Confidence clamped to at most 1.0.
pub(crate) fn clamped(confidence: f32) -> f32 {
    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rank_orders_by_score_then_amount() {
        let mut candidates = vec![
            Candidate { amount: 10_000, score: 0.6, bbox: [0.0; 8] },
            Candidate { amount: 30_000, score: 0.8, bbox: [0.0; 8] },
            Candidate { amount: 50_000, score: 0.8, bbox: [0.0; 8] },
        ];
        rank(&mut candidates);
        assert_eq!(candidates[0].amount, 50_000);
        assert_eq!(candidates[1].amount, 30_000);
        assert_eq!(candidates[2].amount, 10_000);
    }
}
