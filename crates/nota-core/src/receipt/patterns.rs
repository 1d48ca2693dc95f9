//! Regex patterns, keyword vocabularies, and calibrated thresholds.
//!
//! Score bonuses and penalties were tuned against an observed receipt corpus
//! to break ties; treat them as calibrated constants rather than a derived
//! weighting.

use lazy_static::lazy_static;
use regex::Regex;

/// Smallest amount accepted as a plausible total.
pub const MIN_AMOUNT: i64 = 1_000;

/// Largest amount accepted by the parser.
pub const MAX_AMOUNT: i64 = 100_000_000;

/// Largest amount accepted as a plausible total.
pub const MAX_VALID_AMOUNT: i64 = 100_000_000;

/// Floor for handwritten totals, which are noisier.
pub const MIN_HANDWRITTEN_AMOUNT: i64 = 10_000;

/// Maximum digit count for any candidate value.
pub const MAX_DIGITS: usize = 12;

/// Score floor for the generic extractor stages.
pub const MIN_SCORE_THRESHOLD: f32 = 0.6;

/// Score floor for the ranked retail extractor.
pub const RETAIL_MIN_SCORE_THRESHOLD: f32 = 0.5;

lazy_static! {
    /// Rupiah amount with optional prefix, grouped thousands, and decimals.
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(
        r"(?i)(?:(?:rp|idr)\s*)?(\d{1,3}(?:[.,\s]\d{3})+(?:[.,]\d{2})?|\d+(?:[.,]\d{2})?)"
    )
    .unwrap();

    /// Fallback for OCR-noisy numeric runs the primary pattern may miss.
    pub static ref NOISY_AMOUNT_PATTERN: Regex = Regex::new(r"\d[\d.,\s]{3,}\d").unwrap();

    /// A line made up entirely of digits, separators, and whitespace.
    pub static ref NUMERIC_LINE: Regex = Regex::new(r"^[\d.,\s]+$").unwrap();

    /// Opaque identifier runs (transaction ids, phone numbers).
    pub static ref LONG_DIGIT_RUN: Regex = Regex::new(r"\b\d{9}\d*\b").unwrap();

    /// OCR mis-grouped thousands, e.g. `168.00,00` instead of `168.000,00`.
    pub static ref MALFORMED_GROUP: Regex = Regex::new(r"^\d{1,3}[.,]\d{2}[.,]00$").unwrap();

    /// Trailing two-digit decimal tail with its separator.
    pub static ref DECIMAL_TAIL: Regex = Regex::new(r"([.,])(\d{2})$").unwrap();

    /// Collapse punctuation for summary-report keyword matching.
    pub static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();

    /// Title keywords of an accountability report page.
    pub static ref SUMMARY_TITLE: Regex = Regex::new(r"(?i)lapor|rekap|pertanggung|jawab").unwrap();
}

/// Keywords marking a total on the same or a nearby line.
pub const TOTAL_KEYWORDS: &[&str] = &[
    "total",
    "t0tal",
    "sub total",
    "subtotal",
    "grand total",
    "jumlah",
    "jumlah tagihan",
    "tagihan",
    "total bayar",
    "total pembayaran",
];

/// Keywords accepted by the ranked retail extractor.
pub const RETAIL_RANK_KEYWORDS: &[&str] = &[
    "total",
    "t0tal",
    "grand total",
    "jumlah",
    "total bayar",
    "total pembayaran",
];

/// Tokens disqualifying a neighbor line as an amount source.
pub const NEGATIVE_NEAR: &[&str] = &[
    "trx",
    "id",
    "no",
    "ref",
    "npwp",
    "resi",
    "nomor telepon",
    "telepon",
    "pelanggan",
    "tanggal",
    "jam",
];

/// Negative context for the ranked retail extractor.
pub const RETAIL_NEGATIVE_CONTEXT: &[&str] = &[
    "trx",
    "id",
    "ref",
    "no ",
    "npwp",
    "resi",
    "nomor telepon",
    "telepon",
    "pelanggan",
    "tanggal",
    "saldo",
    "cashback",
    "admin",
    "biaya",
    "fee",
    "subtotal",
    "service",
    "charge",
    "ppn",
    "pb1",
    "tax",
];

/// Markers of a printed retail receipt.
pub const RETAIL_MARKERS: &[&str] = &["subtotal", "diskon", "discount", "service", "ppn", "tax"];

/// Markers of a formal institutional kuitansi.
pub const INSTITUTIONAL_MARKERS: &[&str] =
    &["kwitansi", "invoice", "faktur", "sebesar", "terbilang"];

/// Markers of a digital payment proof.
pub const PAYMENT_MARKERS: &[&str] = &[
    "transfer",
    "bank",
    "rekening",
    "va",
    "virtual account",
    "qris",
    "qr",
    "merchant",
];

/// Markers of a minimal payment proof.
pub const SIMPLE_MARKERS: &[&str] = &["paid", "bukti", "proof"];

/// Markers of a billing receipt ("resi tagihan").
pub const RESI_TAGIHAN_MARKERS: &[&str] = &[
    "jumlah tagihan",
    "tagihan",
    "no.resi",
    "nomor telepon",
    "pelanggan",
    "admin",
    "pospay",
];

/// Tokens blocking a neighbor line in the billing extractors.
pub const BLOCKED_BILLING_TOKENS: &[&str] = &[
    "npwp",
    "resi",
    "nomor telepon",
    "telepon",
    "pelanggan",
    "tanggal",
    "jam",
    "admin",
    "service",
    "charge",
    "ppn",
    "pb1",
    "tax",
    "subtotal",
];

/// Page keywords of an expense accountability report.
pub const SUMMARY_PAGE_KEYWORDS: &[&str] = &[
    "laporan",
    "pertanggung jawaban",
    "pertanggungjawaban",
    "rekap",
    "rekapitulasi",
];

/// Normalize a line for keyword matching.
///
/// Repairs the `0`/`o` OCR confusion ("t0tal" for "total"). Applied only when
/// comparing against keyword tables, never to text reported back to the user.
pub fn keyword_normalize(text: &str) -> String {
    text.replace('0', "o")
}

/// True when any keyword occurs in the `0`-normalized lowercased text.
pub fn matches_total_keyword(text: &str) -> bool {
    let normalized = keyword_normalize(text);
    TOTAL_KEYWORDS.iter().any(|kw| normalized.contains(kw))
}

/// True when any of `tokens` occurs in `text`.
pub fn contains_any(text: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| text.contains(token))
}
