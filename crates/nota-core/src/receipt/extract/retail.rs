//! Ranked extractor for printed retail receipts.

use crate::models::result::Total;
use crate::ocr::Line;

use super::super::amount::amounts_from_line;
use super::super::patterns::{
    contains_any, keyword_normalize, MAX_VALID_AMOUNT, RETAIL_MIN_SCORE_THRESHOLD,
    RETAIL_NEGATIVE_CONTEXT, RETAIL_RANK_KEYWORDS,
};
use super::{clamped, ordered_by_y, rank, Candidate, TotalStrategy};

/// Scores every amount on the receipt in one pass and keeps a separate pool
/// of keyword-anchored candidates, which is strongly preferred so the
/// reported box stays aligned with the TOTAL context.
pub struct RetailRankedExtractor;

impl RetailRankedExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Secondary pass for a page holding two retail stubs: rerun the ranking
    /// with the primary amount excluded and a slightly relaxed floor.
    pub fn extract_secondary(
        &self,
        lines: &[Line],
        page_height: f32,
        primary_amount: i64,
    ) -> Option<Total> {
        let mut candidates = Vec::new();

        for line in lines {
            let text = line.text.to_lowercase();
            let normalized = keyword_normalize(&text);
            let is_bottom = line.y_center() > page_height * 0.55;
            let has_keyword = RETAIL_RANK_KEYWORDS.iter().any(|kw| normalized.contains(kw));
            let has_negative_context = contains_any(&text, RETAIL_NEGATIVE_CONTEXT);

            for amount in amounts_from_line(&text) {
                if amount == primary_amount {
                    continue;
                }
                let mut score = 0.0;
                if has_keyword {
                    score += 0.45;
                }
                if is_bottom {
                    score += 0.15;
                }
                score += clamped(line.confidence) * 0.2;
                score += amount as f32 / MAX_VALID_AMOUNT as f32 * 0.2;
                if has_negative_context {
                    score -= 0.25;
                }
                candidates.push(Candidate {
                    amount,
                    score,
                    bbox: line.bbox,
                });
            }
        }

        // Keyword and amount may be split across nearby lines.
        let ordered = ordered_by_y(lines);
        for (idx, line) in ordered.iter().enumerate() {
            let text = line.text.to_lowercase();
            let normalized = keyword_normalize(&text);
            if !RETAIL_RANK_KEYWORDS.iter().any(|kw| normalized.contains(kw)) {
                continue;
            }
            if contains_any(&text, RETAIL_NEGATIVE_CONTEXT) {
                continue;
            }

            for (distance, next_line) in ordered.iter().skip(idx + 1).take(5).enumerate() {
                let next_text = next_line.text.to_lowercase();
                if contains_any(&next_text, RETAIL_NEGATIVE_CONTEXT) {
                    continue;
                }
                for amount in amounts_from_line(&next_text) {
                    if amount == primary_amount {
                        continue;
                    }
                    let avg_conf = (line.confidence + next_line.confidence) / 2.0;
                    let score = 0.58
                        + clamped(avg_conf) * 0.2
                        + amount as f32 / MAX_VALID_AMOUNT as f32 * 0.2
                        - (distance + 1) as f32 * 0.03;
                    candidates.push(Candidate {
                        amount,
                        score,
                        bbox: next_line.bbox,
                    });
                }
            }
        }

        rank(&mut candidates);
        let best = candidates.first()?;
        if best.score < 0.45 {
            return None;
        }
        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }
}

impl Default for RetailRankedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TotalStrategy for RetailRankedExtractor {
    fn extract(&self, lines: &[Line], page_height: f32) -> Option<Total> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut keyword_candidates: Vec<Candidate> = Vec::new();
        // (y, confidence) of keyword lines, amount-bearing or not.
        let mut keyword_anchors: Vec<(f32, f32)> = Vec::new();
        // (amount, confidence, bbox, y) of every amount line.
        let mut amount_lines: Vec<(i64, f32, [f32; 8], f32)> = Vec::new();

        for line in lines {
            let text = line.text.to_lowercase();
            let normalized = keyword_normalize(&text);
            let y_center = line.y_center();
            let is_bottom = y_center > page_height * 0.6;
            let has_keyword = RETAIL_RANK_KEYWORDS.iter().any(|kw| normalized.contains(kw));
            let has_negative_context = contains_any(&text, RETAIL_NEGATIVE_CONTEXT);

            if has_keyword && !has_negative_context {
                keyword_anchors.push((y_center, line.confidence));
            }

            for amount in amounts_from_line(&text) {
                let mut score = 0.0;
                if has_keyword {
                    score += 0.4;
                }
                if is_bottom {
                    score += 0.2;
                }
                score += clamped(line.confidence) * 0.2;
                score += amount as f32 / MAX_VALID_AMOUNT as f32 * 0.2;
                if has_negative_context {
                    score -= 0.3;
                }
                candidates.push(Candidate {
                    amount,
                    score,
                    bbox: line.bbox,
                });
                amount_lines.push((amount, line.confidence, line.bbox, y_center));
                if has_keyword && !has_negative_context {
                    keyword_candidates.push(Candidate {
                        amount,
                        score: score + 0.1,
                        bbox: line.bbox,
                    });
                }
            }
        }

        // Pair amount-less anchors (a bare "TOTAL") with the nearest amount
        // line beneath them.
        for &(anchor_y, anchor_conf) in &keyword_anchors {
            let mut best_match: Option<(i64, f32, [f32; 8])> = None;
            let mut best_distance = f32::INFINITY;
            for &(amount, amount_conf, bbox, amount_y) in &amount_lines {
                let vertical_distance = amount_y - anchor_y;
                if vertical_distance < 0.0 || vertical_distance > page_height * 0.22 {
                    continue;
                }
                if vertical_distance < best_distance {
                    best_distance = vertical_distance;
                    best_match = Some((amount, amount_conf, bbox));
                }
            }

            if let Some((amount, amount_conf, bbox)) = best_match {
                let proximity_bonus =
                    (0.15 - best_distance / page_height.max(1.0) * 0.6).max(0.0);
                let score = 0.45
                    + clamped((anchor_conf + amount_conf) / 2.0) * 0.2
                    + amount as f32 / MAX_VALID_AMOUNT as f32 * 0.2
                    + proximity_bonus;
                keyword_candidates.push(Candidate {
                    amount,
                    score,
                    bbox,
                });
            }
        }

        if !keyword_candidates.is_empty() {
            rank(&mut keyword_candidates);
            let best = &keyword_candidates[0];
            if best.score >= RETAIL_MIN_SCORE_THRESHOLD - 0.08 {
                return Some(Total::new(best.amount, best.score, Some(best.bbox)));
            }
        }

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut best = candidates[0].clone();

        if best.score < RETAIL_MIN_SCORE_THRESHOLD {
            if keyword_candidates.is_empty() {
                return None;
            }
            best = keyword_candidates[0].clone();
        }

        if best.score < RETAIL_MIN_SCORE_THRESHOLD {
            return None;
        }

        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::test_line;
    use pretty_assertions::assert_eq;

    fn line_at_y(text: &str, confidence: f32, y: f32) -> Line {
        test_line(text, confidence, [0.0, y, 200.0, y, 200.0, y + 20.0, 0.0, y + 20.0])
    }

    #[test]
    fn test_keyword_line_beats_larger_plain_amount() {
        let extractor = RetailRankedExtractor::new();
        let lines = vec![
            line_at_y("Kembalian 100.000", 0.9, 700.0),
            line_at_y("TOTAL 45.000", 0.9, 750.0),
        ];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 45_000);
    }

    #[test]
    fn test_negative_context_cannot_raise_score() {
        let extractor = RetailRankedExtractor::new();
        let clean = vec![line_at_y("TOTAL 45.000", 0.9, 750.0)];
        let tainted = vec![line_at_y("TOTAL saldo 45.000", 0.9, 750.0)];

        let clean_score = extractor.extract(&clean, 1000.0).unwrap().confidence;
        let tainted_total = extractor.extract(&tainted, 1000.0);
        if let Some(t) = tainted_total {
            assert!(t.confidence <= clean_score);
        }
    }

    #[test]
    fn test_bare_anchor_pairs_with_amount_below() {
        let extractor = RetailRankedExtractor::new();
        let lines = vec![
            line_at_y("TOTAL", 0.9, 700.0),
            line_at_y("45.000", 0.9, 740.0),
        ];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 45_000);
    }

    #[test]
    fn test_secondary_excludes_primary_amount() {
        let extractor = RetailRankedExtractor::new();
        let lines = vec![
            line_at_y("TOTAL 30.000", 0.9, 700.0),
            line_at_y("TOTAL 12.500", 0.9, 720.0),
        ];
        let secondary = extractor.extract_secondary(&lines, 1000.0, 30_000).unwrap();
        assert_eq!(secondary.amount, 12_500);
    }

    #[test]
    fn test_secondary_floor() {
        let extractor = RetailRankedExtractor::new();
        let lines = vec![line_at_y("cashback 12.500", 0.2, 100.0)];
        assert!(extractor
            .extract_secondary(&lines, 1000.0, 30_000)
            .is_none());
    }
}
