//! Default three-stage extractor: same-line keyword, keyword neighbor,
//! bottom-of-page position.

use crate::models::result::Total;
use crate::ocr::Line;

use super::super::amount::amounts_from_line;
use super::super::patterns::{
    contains_any, matches_total_keyword, LONG_DIGIT_RUN, MAX_VALID_AMOUNT, MIN_SCORE_THRESHOLD,
    NEGATIVE_NEAR,
};
use super::{clamped, ordered_by_y, rank, Candidate, TotalStrategy};

/// Generic total extractor; the first stage that yields a result wins.
pub struct GenericExtractor;

impl GenericExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Stage 1: a keyword line that carries its own amount.
    fn stage_keyword(&self, lines: &[Line]) -> Option<Total> {
        for line in lines {
            let text = line.text.to_lowercase();
            if !matches_total_keyword(&text) {
                continue;
            }
            let Some(amount) = amounts_from_line(&text).into_iter().max() else {
                continue;
            };
            let score = base_score(true, false, line.confidence);
            if score < MIN_SCORE_THRESHOLD {
                continue;
            }
            return Some(Total::new(amount, score, Some(line.bbox)));
        }
        None
    }

    /// Stage 2: a keyword anchor whose amount sits on one of the next lines.
    fn stage_keyword_neighbor(&self, lines: &[Line]) -> Option<Total> {
        let ordered = ordered_by_y(lines);
        let mut candidates = Vec::new();

        for (idx, line) in ordered.iter().enumerate() {
            let text = line.text.to_lowercase();
            if !matches_total_keyword(&text) {
                continue;
            }

            for (distance, next_line) in ordered.iter().skip(idx + 1).take(5).enumerate() {
                let next_text = next_line.text.to_lowercase();
                if contains_any(&next_text, NEGATIVE_NEAR) {
                    continue;
                }
                for amount in amounts_from_line(&next_text) {
                    let mut score = 0.58;
                    score += clamped(line.confidence) * 0.15;
                    score += clamped(next_line.confidence) * 0.15;
                    score += amount as f32 / MAX_VALID_AMOUNT as f32 * 0.12;
                    score -= (distance + 1) as f32 * 0.03;
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
        if best.score < 0.5 {
            return None;
        }
        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }

    /// Stage 3: amounts in the bottom 40% of the page.
    fn stage_position(&self, lines: &[Line], page_height: f32) -> Option<Total> {
        let bottom_threshold = page_height * 0.6;
        let mut candidates = Vec::new();
        let mut keyword_candidates = Vec::new();

        for line in lines {
            let text = line.text.to_lowercase();
            if contains_any(&text, NEGATIVE_NEAR) {
                continue;
            }
            if LONG_DIGIT_RUN.is_match(&text) {
                continue;
            }
            let has_keyword = matches_total_keyword(&text);
            for amount in amounts_from_line(&text) {
                if line.y_center() < bottom_threshold {
                    continue;
                }
                let mut score = base_score(has_keyword, true, line.confidence);
                if has_keyword {
                    score += 0.12;
                }
                let candidate = Candidate {
                    amount,
                    score,
                    bbox: line.bbox,
                };
                candidates.push(candidate.clone());
                if has_keyword {
                    keyword_candidates.push(candidate);
                }
            }
        }

        let mut ranked = if keyword_candidates.is_empty() {
            candidates
        } else {
            keyword_candidates
        };
        rank(&mut ranked);
        let best = ranked.first()?;
        if best.score < MIN_SCORE_THRESHOLD {
            return None;
        }
        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }
}

impl Default for GenericExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TotalStrategy for GenericExtractor {
    fn extract(&self, lines: &[Line], page_height: f32) -> Option<Total> {
        if lines.is_empty() {
            return None;
        }
        self.stage_keyword(lines)
            .or_else(|| self.stage_keyword_neighbor(lines))
            .or_else(|| self.stage_position(lines, page_height))
    }
}

/// Base score: keyword 0.4, bottom 0.2, highest-amount baseline 0.2,
/// confidence up to 0.2.
fn base_score(keyword: bool, bottom: bool, confidence: f32) -> f32 {
    let mut score = 0.0;
    if keyword {
        score += 0.4;
    }
    if bottom {
        score += 0.2;
    }
    score += 0.2;
    score += clamped(confidence) * 0.2;
    score
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
    fn test_same_line_keyword_total() {
        let extractor = GenericExtractor::new();
        let lines = vec![
            line_at_y("Nasi goreng 25.000", 0.9, 100.0),
            line_at_y("TOTAL BAYAR Rp 45.000", 0.9, 700.0),
        ];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 45_000);
        assert!(total.confidence >= 0.6);
    }

    #[test]
    fn test_misrecognized_keyword_still_matches() {
        let extractor = GenericExtractor::new();
        let lines = vec![line_at_y("T0TAL 45.000", 0.9, 700.0)];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 45_000);
    }

    #[test]
    fn test_neighbor_stage_skips_negative_lines() {
        let extractor = GenericExtractor::new();
        let lines = vec![
            line_at_y("JUMLAH", 0.9, 100.0),
            line_at_y("no ref 1.234.567", 0.9, 130.0),
            line_at_y("Rp 85.000", 0.9, 160.0),
        ];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 85_000);
    }

    #[test]
    fn test_neighbor_stage_ranks_nearer_amounts_higher() {
        let extractor = GenericExtractor::new();
        let lines = vec![
            line_at_y("TOTAL", 0.9, 100.0),
            line_at_y("Rp 85.000", 0.9, 130.0),
            line_at_y("Rp 40.000", 0.9, 160.0),
        ];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 85_000);
    }

    #[test]
    fn test_position_stage_bottom_half_only() {
        let extractor = GenericExtractor::new();
        // Without a keyword the position stage only accepts fully confident
        // lines: 0.2 bottom + 0.2 baseline + 0.2 confidence meets the floor.
        let lines = vec![
            line_at_y("1.000.000", 1.0, 100.0),
            line_at_y("50.000", 1.0, 800.0),
        ];
        let total = extractor.extract(&lines, 1000.0).unwrap();
        assert_eq!(total.amount, 50_000);
    }

    #[test]
    fn test_position_stage_rejects_id_runs() {
        let extractor = GenericExtractor::new();
        let lines = vec![line_at_y("1234567890 50.000", 0.9, 800.0)];
        assert!(extractor.extract(&lines, 1000.0).is_none());
    }

    #[test]
    fn test_empty_lines() {
        let extractor = GenericExtractor::new();
        assert!(extractor.extract(&[], 1000.0).is_none());
    }
}
