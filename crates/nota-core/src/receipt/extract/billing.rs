//! Anchored extractors for billing receipts (telecom/utility "tagihan").
//!
//! Tried in a fixed order: the payable line ("total bayar"), then explicit
//! bill anchors, then any "tagihan" anchor, then a last-resort pass for
//! unlabeled bills. Admin-fee lines are excluded throughout because the fee
//! is always smaller than the bill itself.

use crate::models::result::Total;
use crate::ocr::Line;

use super::super::amount::amounts_from_line;
use super::super::patterns::{
    contains_any, keyword_normalize, BLOCKED_BILLING_TOKENS, MAX_VALID_AMOUNT, MIN_AMOUNT,
};
use super::{clamped, ordered_by_y, rank, Candidate};

/// Tokens that disqualify a neighbor in the payable-line scan.
const PAYABLE_BLOCKED_TOKENS: &[&str] =
    &["npwp", "resi", "telepon", "pelanggan", "tanggal", "jam"];

/// Strong anchors for the last-resort billing pass.
const STRONG_ANCHOR_KEYWORDS: &[&str] = &[
    "jumlah tagihan",
    "total tagihan",
    "total bayar",
    "total pembayaran",
    "grand total",
    "total",
];

/// Weak anchors for the last-resort billing pass.
const WEAK_ANCHOR_KEYWORDS: &[&str] = &["tagihan"];

/// Billing extractor family.
pub struct BillingExtractor;

impl BillingExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Primary billing strategy: anchor on the payable phrasing and scan one
    /// line above through seven below. Also proposes bill+admin as a
    /// composite candidate, since some receipts only print the parts.
    pub fn extract_total_bayar(&self, lines: &[Line]) -> Option<Total> {
        let ordered = ordered_by_y(lines);
        let mut candidates = Vec::new();

        for (idx, line) in ordered.iter().enumerate() {
            let anchor_norm = keyword_normalize(&line.text.to_lowercase());
            let mut has_total_bayar = anchor_norm.contains("total bayar")
                || anchor_norm.contains("total pembayaran")
                || anchor_norm.contains("jumlah pembayaran");
            let has_jumlah_tagihan = anchor_norm.contains("jumlah tagihan");
            let has_total_tagihan = anchor_norm.contains("total tagihan");

            // A bare "total" wrapped onto the next line as "bayar".
            if !has_total_bayar && anchor_norm.contains("total") && idx + 1 < ordered.len() {
                let next_norm = keyword_normalize(&ordered[idx + 1].text.to_lowercase());
                if next_norm.contains("bayar") || next_norm.contains("pembayaran") {
                    has_total_bayar = true;
                }
            }

            if !(has_total_bayar || has_jumlah_tagihan || has_total_tagihan) {
                continue;
            }

            let anchor_conf = clamped(line.confidence);
            for near_idx in idx.saturating_sub(1)..(idx + 8).min(ordered.len()) {
                let near_line = &ordered[near_idx];
                let near_text = near_line.text.to_lowercase();
                let near_norm = keyword_normalize(&near_text);
                if near_norm.contains("total admin") {
                    continue;
                }
                if contains_any(&near_norm, PAYABLE_BLOCKED_TOKENS) {
                    continue;
                }

                let near_conf = clamped(near_line.confidence);
                let distance_penalty = (near_idx as f32 - idx as f32) * 0.03;
                for amount in amounts_from_line(&near_text) {
                    if !(10_000..=MAX_VALID_AMOUNT).contains(&amount) {
                        continue;
                    }
                    let keyword_bonus = if has_total_bayar { 0.18 } else { 0.12 };
                    let mut score = 0.78 + keyword_bonus + (anchor_conf + near_conf) / 2.0 * 0.1
                        - distance_penalty.abs();
                    score += amount as f32 / MAX_VALID_AMOUNT as f32 * 0.12;
                    candidates.push(Candidate {
                        amount,
                        score,
                        bbox: near_line.bbox,
                    });
                }
            }
        }

        if let Some(composite) = self.composite_candidate(&ordered) {
            candidates.push(composite);
        }

        rank(&mut candidates);
        let best = candidates.first()?;
        if best.score < 0.5 {
            return None;
        }
        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }

    /// Bill + admin fee, when both parts are anchored separately.
    fn composite_candidate(&self, ordered: &[Line]) -> Option<Candidate> {
        let tagihan = largest_near_anchor(ordered, &["jumlah tagihan", "total tagihan"], 5)?;
        let admin = largest_near_anchor(ordered, &["total admin"], 4)?;

        let combined = tagihan.0 + admin.0;
        if !(MIN_AMOUNT..=MAX_VALID_AMOUNT).contains(&combined) {
            return None;
        }
        Some(Candidate {
            amount: combined,
            score: 0.95 + (tagihan.2 + admin.2) / 2.0 * 0.04,
            bbox: tagihan.1,
        })
    }

    /// Explicit anchors only, with a high base score.
    pub fn extract_explicit_jumlah_tagihan(&self, lines: &[Line]) -> Option<Total> {
        let ordered = ordered_by_y(lines);
        let mut candidates = Vec::new();

        for (idx, line) in ordered.iter().enumerate() {
            let anchor_text = line.text.to_lowercase();
            let anchor_bonus = if anchor_text.contains("total bayar")
                || anchor_text.contains("total pembayaran")
            {
                0.2
            } else if anchor_text.contains("jumlah tagihan") {
                0.08
            } else {
                continue;
            };

            for near_idx in idx..(idx + 4).min(ordered.len()) {
                let near_line = &ordered[near_idx];
                let near_text = near_line.text.to_lowercase();
                if contains_any(&near_text, BLOCKED_BILLING_TOKENS) {
                    continue;
                }
                let confidence = clamped(near_line.confidence);
                let distance_penalty = (near_idx - idx) as f32 * 0.03;
                for amount in amounts_from_line(&near_text) {
                    if !(MIN_AMOUNT..=MAX_VALID_AMOUNT).contains(&amount) {
                        continue;
                    }
                    candidates.push(Candidate {
                        amount,
                        score: 0.86 + confidence * 0.08 + anchor_bonus - distance_penalty,
                        bbox: near_line.bbox,
                    });
                }
            }
        }

        rank(&mut candidates);
        let best = candidates.first()?;
        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }

    /// Weakest anchored strategy: any line mentioning "tagihan".
    pub fn extract_tagihan_anchor(&self, lines: &[Line]) -> Option<Total> {
        let ordered = ordered_by_y(lines);
        let mut candidates = Vec::new();

        for (idx, line) in ordered.iter().enumerate() {
            let anchor_text = line.text.to_lowercase();
            if !anchor_text.contains("tagihan") {
                continue;
            }

            let anchor_conf = clamped(line.confidence);
            for near_idx in idx..(idx + 4).min(ordered.len()) {
                let near_line = &ordered[near_idx];
                let near_text = near_line.text.to_lowercase();
                if contains_any(&near_text, BLOCKED_BILLING_TOKENS) {
                    continue;
                }

                let near_conf = clamped(near_line.confidence);
                let distance_penalty = (near_idx - idx) as f32 * 0.05;
                let mut keyword_bonus = 0.0;
                if anchor_text.contains("jumlah tagihan") || near_text.contains("jumlah tagihan")
                {
                    keyword_bonus += 0.16;
                }
                if near_text.contains("total bayar") || near_text.contains("total pembayaran") {
                    keyword_bonus += 0.08;
                }

                for amount in amounts_from_line(&near_text) {
                    if !(MIN_AMOUNT..=MAX_VALID_AMOUNT).contains(&amount) {
                        continue;
                    }
                    candidates.push(Candidate {
                        amount,
                        score: 0.76
                            + (anchor_conf + near_conf) / 2.0 * 0.18
                            + keyword_bonus
                            - distance_penalty,
                        bbox: near_line.bbox,
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

    /// Last resort for bills lacking the explicit phrasing.
    ///
    /// Picks the largest in-window amount per anchor rather than the nearest;
    /// admin fees are always smaller than the bill.
    pub fn extract_unknown_billing(&self, lines: &[Line]) -> Option<Total> {
        let ordered = ordered_by_y(lines);

        if let Some(total) = self.extract_total_bayar(&ordered) {
            return Some(total);
        }
        if let Some(total) = self.extract_explicit_jumlah_tagihan(&ordered) {
            return Some(total);
        }
        if let Some(total) = self.extract_tagihan_anchor(&ordered) {
            return Some(total);
        }

        let mut candidates = Vec::new();
        for (idx, line) in ordered.iter().enumerate() {
            let anchor_text = line.text.to_lowercase();
            let is_strong = contains_any(&anchor_text, STRONG_ANCHOR_KEYWORDS);
            let is_weak = contains_any(&anchor_text, WEAK_ANCHOR_KEYWORDS);
            if !(is_strong || is_weak) {
                continue;
            }

            let anchor_conf = clamped(line.confidence);
            let mut local: Vec<(i64, [f32; 8], f32)> = Vec::new();
            for near_idx in idx..(idx + 4).min(ordered.len()) {
                let near_line = &ordered[near_idx];
                let near_text = near_line.text.to_lowercase();
                if contains_any(&near_text, BLOCKED_BILLING_TOKENS) {
                    continue;
                }
                let near_conf = clamped(near_line.confidence);
                for amount in amounts_from_line(&near_text) {
                    if (MIN_AMOUNT..=MAX_VALID_AMOUNT).contains(&amount) {
                        local.push((amount, near_line.bbox, near_conf));
                    }
                }
            }

            let Some(&(amount, bbox, near_conf)) =
                local.iter().max_by_key(|(amount, _, _)| *amount)
            else {
                continue;
            };

            let base = if is_strong { 0.76 } else { 0.66 };
            candidates.push(Candidate {
                amount,
                score: base + (anchor_conf + near_conf) / 2.0 * 0.18,
                bbox,
            });
        }

        rank(&mut candidates);
        let best = candidates.first()?;
        if best.score < 0.5 {
            return None;
        }
        Some(Total::new(best.amount, best.score, Some(best.bbox)))
    }
}

impl Default for BillingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest amount in the window below the first matching anchor lines.
///
/// Returns `(amount, bbox, confidence)` where the confidence is the higher of
/// the anchor's and the amount line's.
fn largest_near_anchor(
    ordered: &[Line],
    anchors: &[&str],
    window: usize,
) -> Option<(i64, [f32; 8], f32)> {
    let mut found: Vec<(i64, [f32; 8], f32)> = Vec::new();

    for (idx, line) in ordered.iter().enumerate() {
        let text_norm = keyword_normalize(&line.text.to_lowercase());
        if !contains_any(&text_norm, anchors) {
            continue;
        }
        let anchor_conf = clamped(line.confidence);

        let mut local: Vec<(i64, [f32; 8], f32)> = Vec::new();
        for near_line in ordered.iter().skip(idx).take(window) {
            let near_text = near_line.text.to_lowercase();
            let near_conf = clamped(near_line.confidence);
            for amount in amounts_from_line(&near_text) {
                if (MIN_AMOUNT..=MAX_VALID_AMOUNT).contains(&amount) {
                    local.push((amount, near_line.bbox, near_conf));
                }
            }
        }

        if let Some(&(amount, bbox, near_conf)) = local.iter().max_by_key(|(a, _, _)| *a) {
            found.push((amount, bbox, anchor_conf.max(near_conf)));
        }
    }

    found.into_iter().max_by_key(|(amount, _, _)| *amount)
}
