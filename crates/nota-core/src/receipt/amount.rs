//! Rupiah amount parsing from OCR text.

use super::patterns::{
    AMOUNT_PATTERN, DECIMAL_TAIL, MALFORMED_GROUP, MAX_AMOUNT, MAX_DIGITS, MAX_VALID_AMOUNT,
    MIN_AMOUNT, NOISY_AMOUNT_PATTERN,
};
use crate::ocr::Line;

/// Parse a raw digit-punctuation token into whole rupiah.
///
/// Handles `Rp`/`IDR` prefixes, Indonesian (`1.250.000,00`) and western
/// (`1,234,567.00`) separator conventions, and the OCR habit of mis-grouping
/// thousands (`168.00,00` for `168.000,00`). Receipts carry no effective
/// sub-unit, so decimal tails are dropped.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let lowered = raw
        .to_lowercase()
        .replace("rp", "")
        .replace("idr", "")
        .replace(' ', "");
    let mut text: String = lowered
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if text.is_empty() {
        return None;
    }

    if MALFORMED_GROUP.is_match(&text) {
        let parts: Vec<&str> = text.split(['.', ',']).collect();
        if parts.len() == 3 {
            text = format!("{}{}0,00", parts[0], parts[1]);
        }
    }

    let decimal_tail = DECIMAL_TAIL
        .captures(&text)
        .map(|caps| caps.get(2).unwrap().as_str().to_string());

    let has_comma = text.contains(',');
    let has_dot = text.contains('.');

    if has_comma && has_dot {
        // The rightmost separator is the decimal one.
        let last_comma = text.rfind(',').unwrap();
        let last_dot = text.rfind('.').unwrap();
        if last_comma > last_dot {
            text = text.replace('.', "").replace(',', ".");
        } else {
            text = text.replace(',', "");
        }
    } else if has_dot {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() > 2 || (parts.len() == 2 && parts[1].len() == 3) {
            text = text.replace('.', "");
        }
    } else if has_comma {
        let parts: Vec<&str> = text.split(',').collect();
        if parts.len() > 2 {
            text = text.replace(',', "");
        } else if parts.len() == 2 {
            if parts[1].len() <= 2 {
                text = text.replace(',', ".");
            } else {
                text = text.replace(',', "");
            }
        }
    }

    if decimal_tail.as_deref() == Some("00") {
        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= 3 && digits.ends_with("00") {
            text = digits[..digits.len() - 2].to_string();
        }
    }

    // Any remaining fraction is sub-rupiah noise.
    if let Some(pos) = text.find('.') {
        text.truncate(pos);
    }
    text.retain(|c| c.is_ascii_digit());
    if text.is_empty() {
        return None;
    }

    let value: i64 = text.parse().ok()?;
    if value <= 0 || value > MAX_AMOUNT {
        return None;
    }
    Some(value)
}

/// In-range check shared by all extractors.
fn plausible(value: i64) -> bool {
    (MIN_AMOUNT..=MAX_VALID_AMOUNT).contains(&value) && value.to_string().len() <= MAX_DIGITS
}

/// Extract all plausible amounts from one recognized line.
///
/// Each distinct value appears at most once, in first-seen order. A noisy
/// fallback pattern catches digit runs the primary pattern misses.
pub fn amounts_from_line(text: &str) -> Vec<i64> {
    let mut values: Vec<i64> = Vec::new();

    for caps in AMOUNT_PATTERN.captures_iter(text) {
        if let Some(value) = parse_amount(caps.get(1).unwrap().as_str()) {
            if plausible(value) && !values.contains(&value) {
                values.push(value);
            }
        }
    }

    for token in NOISY_AMOUNT_PATTERN.find_iter(text) {
        if let Some(value) = parse_amount(token.as_str()) {
            if plausible(value) && !values.contains(&value) {
                values.push(value);
            }
        }
    }

    values
}

/// The largest amount across a line group with its source box.
pub fn max_amount_with_bbox(lines: &[Line]) -> Option<(i64, [f32; 8])> {
    let mut best: Option<(i64, [f32; 8])> = None;
    for line in lines {
        if let Some(line_max) = amounts_from_line(&line.text).into_iter().max() {
            if best.is_none_or(|(amount, _)| line_max > amount) {
                best = Some((line_max, line.bbox));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_indonesian_grouping() {
        assert_eq!(parse_amount("Rp 1.250.000,00"), Some(1_250_000));
        assert_eq!(parse_amount("1.250.000"), Some(1_250_000));
        assert_eq!(parse_amount("Rp45.000"), Some(45_000));
    }

    #[test]
    fn test_parse_western_grouping() {
        assert_eq!(parse_amount("1,234,567"), Some(1_234_567));
        assert_eq!(parse_amount("1,234.56"), Some(1_234));
    }

    #[test]
    fn test_parse_malformed_thousand_grouping() {
        // OCR reads 168.000,00 as 168.00,00; the repair restores the group.
        assert_eq!(parse_amount("Rp168.00,00"), Some(168_000));
    }

    #[test]
    fn test_parse_decimal_tails() {
        assert_eq!(parse_amount("10,50"), Some(10));
        assert_eq!(parse_amount("150.000,00"), Some(150_000));
        assert_eq!(parse_amount("2.500,00"), Some(2_500));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("999999999999"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_parse_idempotent_on_digit_string() {
        for raw in ["Rp 1.250.000,00", "45.000", "1,234,567"] {
            let value = parse_amount(raw).unwrap();
            assert_eq!(parse_amount(&value.to_string()), Some(value));
        }
    }

    #[test]
    fn test_amounts_from_line_dedup_and_order() {
        let amounts = amounts_from_line("Rp 30.000 admin 2.500 Rp 30.000");
        assert_eq!(amounts, vec![30_000, 2_500]);
    }

    #[test]
    fn test_amounts_from_line_filters_range() {
        // 500 is below MIN_AMOUNT.
        assert_eq!(amounts_from_line("bayar 500"), Vec::<i64>::new());
        assert_eq!(amounts_from_line("bayar 1.000"), vec![1_000]);
    }

    #[test]
    fn test_amounts_from_line_noisy_fallback() {
        // Joined amounts as emitted by column OCR.
        let amounts = amounts_from_line("Rp2.000.000,00Rp");
        assert_eq!(amounts, vec![2_000_000]);
    }

    #[test]
    fn test_max_amount_with_bbox() {
        use crate::ocr::test_line;
        let lines = vec![
            test_line("Rp 30.000", 0.9, [0.0; 8]),
            test_line("Rp 85.000", 0.9, [1.0; 8]),
        ];
        let (amount, bbox) = max_amount_with_bbox(&lines).unwrap();
        assert_eq!(amount, 85_000);
        assert_eq!(bbox, [1.0; 8]);
    }
}
