//! Per-page orchestration: recognize, classify, segment, extract.

use image::DynamicImage;
use tracing::debug;

use crate::models::config::OcrConfig;
use crate::models::result::{Category, PageResult, Total};
use crate::ocr::{avg_confidence, crop_region, Line, OcrBackend, OcrProcessor, PreprocessMode};

use super::classifier::ReceiptClassifier;
use super::extract::{
    BillingExtractor, DigitalPaymentExtractor, GenericExtractor, HandwrittenExtractor,
    KuitansiExtractor, RetailRankedExtractor, SimpleProofExtractor, TotalStrategy,
};
use super::segmenter::ReceiptSegmenter;

/// Padding around a handwritten group's hull before re-recognition.
const HANDWRITTEN_CROP_PADDING: u32 = 20;

/// Orchestrates one page: classification, segmentation, and the category
/// decision tree over the extractor family.
pub struct PageProcessor {
    classifier: ReceiptClassifier,
    segmenter: ReceiptSegmenter,
    generic: GenericExtractor,
    retail: RetailRankedExtractor,
    billing: BillingExtractor,
    config: OcrConfig,
}

impl PageProcessor {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            classifier: ReceiptClassifier::new(),
            segmenter: ReceiptSegmenter::new(),
            generic: GenericExtractor::new(),
            retail: RetailRankedExtractor::new(),
            billing: BillingExtractor::new(),
            config,
        }
    }

    /// Process one page image into a `PageResult`.
    pub fn process<B: OcrBackend>(
        &self,
        ocr: &OcrProcessor<B>,
        image: &DynamicImage,
        page_number: usize,
    ) -> PageResult {
        let lines = ocr.run(
            image,
            PreprocessMode::Printed,
            self.config.page_confidence_floor,
        );
        let page_height = image.height() as f32;
        let page_width = image.width() as f32;

        let page_category = self.classifier.classify(&lines);
        let groups = self.segmenter.segment(&lines, page_width, page_height);

        if groups.is_empty() {
            return PageResult {
                page: page_number,
                page_total: 0,
                receipt_count: 0,
                receipts: Vec::new(),
                categories: vec![page_category],
                avg_confidence: avg_confidence(&lines),
                raw_text: lines.iter().map(|l| l.text.clone()).collect(),
            };
        }

        let mut totals: Vec<Total> = Vec::new();
        let mut group_categories: Vec<Category> = Vec::new();

        for group in groups.iter().take(2) {
            let group_category = self.classifier.classify(group);
            group_categories.push(group_category);

            let mut group_lines = group.clone();
            if group_category == Category::Handwritten {
                group_lines = self.reocr_handwritten(ocr, image, group).unwrap_or(group_lines);
            }

            if let Some(total) = self.extract_total_for_group(&group_lines, page_height) {
                totals.push(total);
            }
        }

        // A lone retail total on a two-stub page misses the second receipt.
        if totals.len() == 1 && group_categories.contains(&Category::RetailPrinted) {
            if let Some(secondary) =
                self.retail
                    .extract_secondary(&lines, page_height, totals[0].amount)
            {
                totals.push(secondary);
            }
        }

        // Billing overrides run on the full page; the first that fires
        // replaces whatever the per-group extractors found.
        let billing_override = self
            .billing
            .extract_total_bayar(&lines)
            .or_else(|| self.billing.extract_explicit_jumlah_tagihan(&lines))
            .or_else(|| self.billing.extract_tagihan_anchor(&lines));
        if let Some(total) = billing_override {
            debug!("Billing override replaced {} group totals", totals.len());
            totals = vec![total];
            group_categories = vec![Category::ResiTagihan];
        }

        let page_total = totals.iter().map(|t| t.amount).sum();

        PageResult {
            page: page_number,
            page_total,
            receipt_count: totals.len(),
            receipts: totals,
            categories: group_categories,
            avg_confidence: avg_confidence(&lines),
            raw_text: lines.iter().map(|l| l.text.clone()).collect(),
        }
    }

    /// Re-recognize a handwritten group from its padded crop.
    ///
    /// Returns lines translated back to page coordinates, or `None` when the
    /// crop pass produced nothing (the group's lines stay in effect).
    fn reocr_handwritten<B: OcrBackend>(
        &self,
        ocr: &OcrProcessor<B>,
        image: &DynamicImage,
        group: &[Line],
    ) -> Option<Vec<Line>> {
        let (crop, offset_x, offset_y) = crop_region(image, group, HANDWRITTEN_CROP_PADDING)?;
        let recognized = ocr.run(
            &crop,
            PreprocessMode::Handwritten,
            self.config.handwritten_confidence_floor,
        );
        if recognized.is_empty() {
            return None;
        }
        Some(
            recognized
                .into_iter()
                .map(|line| line.translated(offset_x, offset_y))
                .collect(),
        )
    }

    /// Category decision tree over the extractor family.
    fn extract_total_for_group(&self, group: &[Line], page_height: f32) -> Option<Total> {
        match self.classifier.classify(group) {
            Category::Handwritten => HandwrittenExtractor.extract(group, page_height),
            Category::RetailPrinted => self.retail.extract(group, page_height),
            Category::DigitalPayment => DigitalPaymentExtractor.extract(group, page_height),
            Category::SimpleProof => SimpleProofExtractor.extract(group, page_height),
            Category::InstitutionalKuitansi => KuitansiExtractor
                .extract(group, page_height)
                .or_else(|| self.generic.extract(group, page_height)),
            Category::ResiTagihan => self
                .billing
                .extract_total_bayar(group)
                .or_else(|| self.billing.extract_explicit_jumlah_tagihan(group))
                .or_else(|| self.billing.extract_tagihan_anchor(group))
                .or_else(|| self.billing.extract_unknown_billing(group)),
            _ => self
                .billing
                .extract_unknown_billing(group)
                .or_else(|| self.generic.extract(group, page_height)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::{OcrBackend, RawLine};
    use pretty_assertions::assert_eq;

    /// Backend that replays scripted lines for every call.
    struct ScriptedBackend {
        lines: Vec<RawLine>,
    }

    impl ScriptedBackend {
        fn new(lines: &[(&str, f32, f32, f32)]) -> Self {
            // (text, confidence, x, y)
            let lines = lines
                .iter()
                .map(|(text, confidence, x, y)| RawLine {
                    points: [
                        [*x, *y],
                        [*x + 200.0, *y],
                        [*x + 200.0, *y + 20.0],
                        [*x, *y + 20.0],
                    ],
                    text: text.to_string(),
                    confidence: *confidence,
                })
                .collect();
            Self { lines }
        }
    }

    impl OcrBackend for ScriptedBackend {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<Vec<RawLine>>, OcrError> {
            Ok(vec![self.lines.clone()])
        }
    }

    fn process(lines: &[(&str, f32, f32, f32)]) -> PageResult {
        let backend = ScriptedBackend::new(lines);
        let ocr = OcrProcessor::new(backend);
        let processor = PageProcessor::new(OcrConfig::default());
        let image = DynamicImage::new_rgb8(1000, 1000);
        processor.process(&ocr, &image, 1)
    }

    #[test]
    fn test_retail_page_single_total() {
        let result = process(&[
            ("Subtotal 40.000", 0.95, 100.0, 500.0),
            ("PPN 10% 4.000", 0.95, 100.0, 540.0),
            ("TOTAL Rp 44.000", 0.95, 100.0, 580.0),
        ]);
        assert_eq!(result.page_total, 44_000);
        assert_eq!(result.receipt_count, 1);
        assert_eq!(result.categories, vec![Category::RetailPrinted]);
    }

    #[test]
    fn test_total_bayar_page_is_reported_as_billing() {
        // "Total bayar" phrasing routes through the billing override even on
        // an otherwise unremarkable page.
        let result = process(&[("TOTAL BAYAR Rp 45.000", 0.95, 100.0, 700.0)]);
        assert_eq!(result.page_total, 45_000);
        assert_eq!(result.categories, vec![Category::ResiTagihan]);
        assert!(result.receipts[0].confidence >= 0.6);
    }

    #[test]
    fn test_two_side_by_side_retail_stubs() {
        // Stubs around x=100 and x=700: the x-gap forces a split and each
        // stub contributes its own total.
        let result = process(&[
            ("Subtotal 28.000", 0.95, 50.0, 500.0),
            ("PPN 2.000", 0.95, 50.0, 540.0),
            ("TOTAL Rp 30.000", 0.95, 50.0, 700.0),
            ("Subtotal 11.000", 0.95, 700.0, 500.0),
            ("PPN 1.500", 0.95, 700.0, 540.0),
            ("TOTAL Rp 12.500", 0.95, 700.0, 700.0),
        ]);
        assert_eq!(result.receipt_count, 2);
        assert_eq!(result.page_total, 42_500);
    }

    #[test]
    fn test_billing_override_replaces_group_totals() {
        let result = process(&[
            ("Jumlah Tagihan Rp 150.000", 0.9, 100.0, 300.0),
            ("Total Admin Rp 2.500", 0.9, 100.0, 340.0),
            ("Total Bayar Rp 152.500", 0.9, 100.0, 380.0),
        ]);
        assert_eq!(result.page_total, 152_500);
        assert_eq!(result.receipt_count, 1);
        assert_eq!(result.categories, vec![Category::ResiTagihan]);
    }

    #[test]
    fn test_empty_page() {
        let result = process(&[]);
        assert_eq!(result.page_total, 0);
        assert_eq!(result.receipt_count, 0);
        assert_eq!(result.categories, vec![Category::Unknown]);
    }

    #[test]
    fn test_raw_text_and_confidence_reported() {
        let result = process(&[
            ("KWITANSI", 0.8, 100.0, 100.0),
            ("sebesar Rp 250.000", 0.9, 100.0, 200.0),
        ]);
        assert_eq!(result.raw_text.len(), 2);
        assert!((result.avg_confidence - 0.85).abs() < 1e-4);
        assert_eq!(result.page_total, 250_000);
    }
}
