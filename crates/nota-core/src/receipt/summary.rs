//! Expense accountability report detection.
//!
//! Multi-page expense reports end with a three-column table
//! (Pemasukan / Pengeluaran / Saldo) whose "Total" row carries the payable
//! amount in the middle column. The detector recognizes such pages and reads
//! the pengeluaran column of the Total row.

use tracing::debug;

use crate::models::config::SummaryTemplateMode;
use crate::ocr::Line;

use super::amount::amounts_from_line;
use super::extract::ordered_by_y;
use super::patterns::{NON_ALNUM, SUMMARY_PAGE_KEYWORDS, SUMMARY_TITLE};

/// Table vocabulary accepted as evidence of a summary table.
const TABLE_TERMS: &[&str] = &["saldo", "debet", "kredit", "jumlah", "total"];

/// A summary total read from a report page.
#[derive(Debug, Clone)]
pub struct SummaryTotal {
    pub amount: i64,
    pub confidence: f32,
    pub bbox: [f32; 8],
}

/// Detector for the saldo/pengeluaran summary template.
pub struct SummaryTableDetector {
    mode: SummaryTemplateMode,
}

impl SummaryTableDetector {
    pub fn new(mode: SummaryTemplateMode) -> Self {
        Self { mode }
    }

    /// Whether a page's text mentions the report vocabulary at all.
    pub fn has_focus_keyword(&self, lines: &[Line]) -> bool {
        let normalized = normalized_text(lines);
        if SUMMARY_PAGE_KEYWORDS.iter().any(|kw| normalized.contains(kw)) {
            return true;
        }
        normalized.contains("pertanggung") && normalized.contains("jawab")
    }

    /// Score a candidate report page by vocabulary and table geometry.
    pub fn score_focus_page(&self, lines: &[Line], page_width: f32, page_height: f32) -> f32 {
        if lines.is_empty() {
            return 0.0;
        }

        let normalized = normalized_text(lines);
        let has_laporan = normalized.contains("laporan");
        let has_rekap = normalized.contains("rekap");
        let has_pengeluaran = normalized.contains("pengeluaran");
        let has_pertanggungjawaban = normalized.contains("pertanggungjawaban")
            || normalized.contains("pertanggung jawaban")
            || (normalized.contains("pertanggung") && normalized.contains("jawab"));
        let has_generic_total = normalized.contains("jumlah") || normalized.contains("total");

        let mut score = 0.0;
        if has_laporan || has_rekap {
            score += 0.35;
        }
        if has_pertanggungjawaban {
            score += 0.25;
        }
        if has_pengeluaran {
            score += 0.2;
        }
        if has_generic_total
            && !(has_laporan || has_rekap || has_pengeluaran || has_pertanggungjawaban)
        {
            score -= 0.2;
        }

        let title_line = lines
            .iter()
            .filter(|l| SUMMARY_TITLE.is_match(&l.text))
            .min_by(|a, b| cmp_f32(a.y_center(), b.y_center()));
        let header_line = pengeluaran_lines(lines)
            .into_iter()
            .min_by(|a, b| cmp_f32(a.y_center(), b.y_center()));

        if let (Some(title), Some(header)) = (&title_line, &header_line) {
            let title_y = title.y_center();
            let header_y = header.y_center();
            if title_y < page_height * 0.45
                && title_y + 20.0 < header_y
                && header_y < page_height * 0.75
            {
                score += 0.25;
            }
        }

        if let Some(header) = &header_line {
            let header_x = header.x_center();
            let header_y = header.y_center();
            let x_tolerance = (page_width * 0.2).max(90.0);

            let column_hits = lines
                .iter()
                .filter(|l| l.y_center() > header_y)
                .filter(|l| (l.x_center() - header_x).abs() <= x_tolerance)
                .filter(|l| !amounts_from_line(&l.text.to_lowercase()).is_empty())
                .count();

            if column_hits >= 2 {
                score += (0.18 + (column_hits - 2) as f32 * 0.04).min(0.3);
            }
        }

        score
    }

    /// Read the pengeluaran total from a report page.
    ///
    /// `header_hint_x` carries the pengeluaran column position seen on an
    /// earlier candidate page, for continuation pages whose header did not
    /// survive recognition.
    pub fn extract_total(
        &self,
        lines: &[Line],
        page_width: f32,
        header_hint_x: Option<f32>,
    ) -> Option<SummaryTotal> {
        if !self.gate(lines, page_width, header_hint_x) {
            return None;
        }

        // The "Total" label is usually separated from the numeric columns;
        // read the next rows and pick by column order.
        let ordered = ordered_by_y(lines);
        // (amount, bbox, label y)
        let mut row_candidates: Vec<(i64, [f32; 8], f32)> = Vec::new();

        for (idx, line) in ordered.iter().enumerate() {
            if !line.text.to_lowercase().contains("total") {
                continue;
            }

            let base_y = line.y_center();
            let mut collected: Vec<i64> = Vec::new();
            let mut chosen_bbox = line.bbox;

            for next_line in ordered.iter().skip(idx + 1).take(3) {
                let next_y = next_line.y_center();
                if next_y + 5.0 < base_y {
                    continue;
                }
                // The Total row is compact; further lines belong to other
                // table sections.
                if next_y - base_y > 120.0 {
                    break;
                }

                let amounts = amounts_from_line(&next_line.text.to_lowercase());
                if !amounts.is_empty() {
                    collected.extend(amounts);
                    chosen_bbox = next_line.bbox;
                }
            }

            // Column order is [pemasukan, pengeluaran, saldo]: with all three
            // take the middle; with two the pengeluaran is the smaller; a
            // lone amount stands for itself.
            let chosen = match collected.len() {
                0 => None,
                1 => Some(collected[0]),
                2 => collected.iter().copied().min(),
                _ => Some(collected[1]),
            };

            if let Some(amount) = chosen {
                if amount >= 10_000 {
                    row_candidates.push((amount, chosen_bbox, base_y));
                }
            }
        }

        // The latest "Total" row on the page wins.
        let (amount, bbox, _) = row_candidates
            .into_iter()
            .max_by(|a, b| cmp_f32(a.2, b.2))?;

        debug!("Summary template matched: pengeluaran total {}", amount);
        Some(SummaryTotal {
            amount,
            confidence: 0.97,
            bbox,
        })
    }

    /// Template gate: only fire on genuine report table pages.
    fn gate(&self, lines: &[Line], page_width: f32, header_hint_x: Option<f32>) -> bool {
        let text_joined = lines
            .iter()
            .map(|l| l.text.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");
        let normalized = normalized_text(lines);

        let has_pengeluaran = normalized.contains("pengeluaran");
        let has_saldo = normalized.contains("saldo");
        let has_laporan = normalized.contains("laporan");
        let has_rekap = normalized.contains("rekap");
        let has_pertanggungjawaban = normalized.contains("pertanggungjawaban")
            || normalized.contains("pertanggung jawaban")
            || (normalized.contains("pertanggung") && normalized.contains("jawab"));

        let has_table_terms = TABLE_TERMS.iter().any(|t| text_joined.contains(t));
        let amount_density: usize = lines
            .iter()
            .map(|l| amounts_from_line(&l.text.to_lowercase()).len())
            .sum();

        let header_lines = pengeluaran_lines(lines);
        let has_header_context = !header_lines.is_empty() || header_hint_x.is_some();

        let mut column_amount_hits = 0usize;
        if has_header_context {
            let (gate_header_x, gate_header_y) = if let Some(header) = header_lines.first() {
                (header.x_center(), header.y_center())
            } else {
                let min_y = lines
                    .iter()
                    .map(Line::y_center)
                    .fold(f32::INFINITY, f32::min);
                (header_hint_x.unwrap_or(0.0), min_y)
            };
            let x_tolerance = (page_width * 0.22).max(90.0);

            for line in lines {
                if line.y_center() <= gate_header_y {
                    continue;
                }
                if (line.x_center() - gate_header_x).abs() > x_tolerance {
                    continue;
                }
                column_amount_hits += amounts_from_line(&line.text.to_lowercase()).len();
            }
        }

        match self.mode {
            SummaryTemplateMode::Strict => {
                has_pengeluaran
                    && has_saldo
                    && has_laporan
                    && has_pertanggungjawaban
                    && has_table_terms
                    && amount_density >= 2
            }
            SummaryTemplateMode::Lenient => {
                let has_reference_context = has_laporan || has_pertanggungjawaban || has_rekap;
                let has_column_context = has_header_context && column_amount_hits >= 1;
                let qualifies = (has_pengeluaran
                    && has_reference_context
                    && (amount_density >= 1 || has_column_context))
                    || (has_reference_context && has_column_context)
                    || (has_header_context && has_table_terms && amount_density >= 1);
                qualifies && (amount_density >= 1 || column_amount_hits >= 1)
            }
        }
    }
}

/// Lowercase, strip punctuation, and collapse whitespace for keyword checks.
fn normalized_text(lines: &[Line]) -> String {
    let joined = lines
        .iter()
        .map(|l| l.text.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    NON_ALNUM
        .replace_all(&joined, " ")
        .trim()
        .to_string()
}

fn pengeluaran_lines(lines: &[Line]) -> Vec<&Line> {
    lines
        .iter()
        .filter(|l| l.text.to_lowercase().contains("pengeluaran"))
        .collect()
}

fn cmp_f32(a: f32, b: f32) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}
