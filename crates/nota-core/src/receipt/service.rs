//! Document-level orchestration.

use std::path::Path;

use image::DynamicImage;
use tracing::{info, warn};

use crate::models::config::NotaConfig;
use crate::models::result::{round4, Category, DocumentResult, PageResult, Total};
use crate::ocr::{avg_confidence, Line, OcrBackend, OcrProcessor, PreprocessMode};
use crate::pdf::PageLoader;

use super::page::PageProcessor;
use super::summary::SummaryTableDetector;

/// End-to-end receipt pipeline for one document.
pub struct ReceiptService<B: OcrBackend> {
    ocr: OcrProcessor<B>,
    loader: PageLoader,
    page_processor: PageProcessor,
    summary: SummaryTableDetector,
    config: NotaConfig,
}

impl<B: OcrBackend> ReceiptService<B> {
    /// Create a service around a recognizer backend.
    pub fn new(backend: B, config: NotaConfig) -> Self {
        Self {
            ocr: OcrProcessor::new(backend).with_max_width(config.ocr.max_image_width),
            loader: PageLoader::new(config.pdf.clone()),
            page_processor: PageProcessor::new(config.ocr.clone()),
            summary: SummaryTableDetector::new(config.extraction.summary_template_mode),
            config,
        }
    }

    /// Process an image or PDF file.
    pub fn process(&self, path: &Path) -> DocumentResult {
        let pages = match self.loader.load(path) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Failed to load pages from {}: {}", path.display(), e);
                return DocumentResult::no_pages();
            }
        };
        self.process_pages(&pages)
    }

    /// Process already-rasterized pages.
    pub fn process_pages(&self, pages: &[DynamicImage]) -> DocumentResult {
        if pages.is_empty() {
            return DocumentResult::no_pages();
        }

        // One low-floor pass per page, shared by focus scoring and template
        // detection.
        let summary_lines: Vec<Vec<Line>> = pages
            .iter()
            .map(|page| {
                self.ocr.run(
                    page,
                    PreprocessMode::Printed,
                    self.config.ocr.summary_confidence_floor,
                )
            })
            .collect();

        let focus_indexes = self.focus_page_indexes(pages, &summary_lines);
        if let Some(result) = self.detect_summary_template(pages, &summary_lines, &focus_indexes)
        {
            info!("Summary template short-circuit");
            return result;
        }

        // A report document without a readable summary table: only the focus
        // page is meaningful, the rest are supporting receipts.
        if let Some(&focus_idx) = focus_indexes.first() {
            let page = self
                .page_processor
                .process(&self.ocr, &pages[focus_idx], focus_idx + 1);
            return document_from_single_page(page);
        }

        self.process_all_pages(pages)
    }

    /// Indexes of report-vocabulary pages, best candidate first.
    fn focus_page_indexes(&self, pages: &[DynamicImage], summary_lines: &[Vec<Line>]) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = Vec::new();
        for (idx, lines) in summary_lines.iter().enumerate() {
            if self.summary.has_focus_keyword(lines) {
                let score = self.summary.score_focus_page(
                    lines,
                    pages[idx].width() as f32,
                    pages[idx].height() as f32,
                );
                scored.push((idx, score));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Summary tables live on later pages; prefer non-first pages
                // and higher indexes on score ties.
                .then_with(|| (a.0 == 0).cmp(&(b.0 == 0)))
                .then_with(|| b.0.cmp(&a.0))
        });
        scored.into_iter().map(|(idx, _)| idx).collect()
    }

    /// Try the summary template on the candidate pages; first hit wins.
    fn detect_summary_template(
        &self,
        pages: &[DynamicImage],
        summary_lines: &[Vec<Line>],
        focus_indexes: &[usize],
    ) -> Option<DocumentResult> {
        let candidate_indexes: Vec<usize> = if focus_indexes.is_empty() {
            (0..pages.len()).collect()
        } else {
            focus_indexes.to_vec()
        };

        let header_hint_x = candidate_indexes.iter().find_map(|&idx| {
            summary_lines[idx]
                .iter()
                .find(|line| line.text.to_lowercase().contains("pengeluaran"))
                .map(Line::x_center)
        });

        for &idx in &candidate_indexes {
            let lines = &summary_lines[idx];
            if lines.is_empty() {
                continue;
            }

            let Some(summary) =
                self.summary
                    .extract_total(lines, pages[idx].width() as f32, header_hint_x)
            else {
                continue;
            };

            let raw_text: Vec<String> = lines.iter().map(|l| l.text.clone()).collect();
            let page = PageResult {
                page: idx + 1,
                page_total: summary.amount,
                receipt_count: 1,
                receipts: vec![Total::new(
                    summary.amount,
                    summary.confidence,
                    Some(summary.bbox),
                )],
                categories: vec![Category::SaldoPengeluaranSummary],
                avg_confidence: avg_confidence(lines),
                raw_text: raw_text.clone(),
            };

            return Some(DocumentResult {
                grand_total: Some(summary.amount),
                currency: "IDR".to_string(),
                confidence: round4(summary.confidence),
                receipt_count: 1,
                category_detected: vec![Category::SaldoPengeluaranSummary],
                per_page: vec![page],
                raw_text: raw_text.join("\n"),
                error: None,
            });
        }

        None
    }

    /// Default path: process every page and sum the page totals.
    fn process_all_pages(&self, pages: &[DynamicImage]) -> DocumentResult {
        let mut grand_total = 0i64;
        let mut receipt_count = 0usize;
        let mut category_detected: Vec<Category> = Vec::new();
        let mut per_page: Vec<PageResult> = Vec::new();
        let mut all_text: Vec<String> = Vec::new();
        let mut page_confidences: Vec<f32> = Vec::new();

        for (idx, image) in pages.iter().enumerate() {
            let page = self.page_processor.process(&self.ocr, image, idx + 1);

            all_text.extend(page.raw_text.iter().cloned());
            page_confidences.push(page.avg_confidence);

            if page.page_total > 0 {
                grand_total += page.page_total;
                receipt_count += page.receipt_count;
                category_detected.extend(page.categories.iter().copied());
            }

            per_page.push(page);
        }

        let avg_conf = if page_confidences.is_empty() {
            0.0
        } else {
            page_confidences.iter().sum::<f32>() / page_confidences.len() as f32
        };

        if grand_total == 0 {
            return DocumentResult {
                grand_total: None,
                currency: "IDR".to_string(),
                confidence: round4(avg_conf),
                receipt_count: 0,
                category_detected,
                per_page,
                raw_text: all_text.join("\n"),
                error: Some("No valid total detected".to_string()),
            };
        }

        DocumentResult {
            grand_total: Some(grand_total),
            currency: "IDR".to_string(),
            confidence: round4(avg_conf),
            receipt_count,
            category_detected,
            per_page,
            raw_text: all_text.join("\n"),
            error: None,
        }
    }
}

/// Document result when only one (focus) page is processed.
fn document_from_single_page(page: PageResult) -> DocumentResult {
    let grand_total = page.page_total;
    let mut result = DocumentResult {
        grand_total: None,
        currency: "IDR".to_string(),
        confidence: round4(page.avg_confidence),
        receipt_count: page.receipt_count,
        category_detected: page.categories.clone(),
        raw_text: page.raw_text.join("\n"),
        per_page: vec![page],
        error: None,
    };

    if grand_total > 0 {
        result.grand_total = Some(grand_total);
    } else {
        result.error = Some("No valid total detected".to_string());
    }
    result
}
