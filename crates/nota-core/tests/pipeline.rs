//! End-to-end pipeline tests driving the service with a scripted recognizer.

use std::collections::HashMap;

use image::DynamicImage;
use nota_core::error::OcrError;
use nota_core::{
    Category, NotaConfig, OcrBackend, RawLine, ReceiptService, SummaryTemplateMode,
};

/// Replays scripted lines per page, keyed by image width.
///
/// Pages stay under the preprocessing width cap so the key survives
/// preprocessing untouched.
struct ScriptedBackend {
    pages: HashMap<u32, Vec<RawLine>>,
}

impl OcrBackend for ScriptedBackend {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Vec<RawLine>>, OcrError> {
        Ok(vec![self.pages.get(&image.width()).cloned().unwrap_or_default()])
    }
}

fn raw_line(text: &str, confidence: f32, x: f32, y: f32) -> RawLine {
    RawLine {
        points: [
            [x, y],
            [x + 150.0, y],
            [x + 150.0, y + 20.0],
            [x, y + 20.0],
        ],
        text: text.to_string(),
        confidence,
    }
}

fn strict_config() -> NotaConfig {
    let mut config = NotaConfig::default();
    config.extraction.summary_template_mode = SummaryTemplateMode::Strict;
    config
}

fn service(pages: HashMap<u32, Vec<RawLine>>) -> ReceiptService<ScriptedBackend> {
    ReceiptService::new(ScriptedBackend { pages }, strict_config())
}

fn retail_stub(total_text: &str) -> Vec<RawLine> {
    vec![
        raw_line("Indomaret", 0.95, 100.0, 100.0),
        raw_line("Subtotal 28.000", 0.95, 100.0, 500.0),
        raw_line("PPN 2.000", 0.95, 100.0, 540.0),
        raw_line(total_text, 0.95, 100.0, 580.0),
    ]
}

fn report_page() -> Vec<RawLine> {
    vec![
        raw_line("LAPORAN PERTANGGUNGJAWABAN KEUANGAN", 0.9, 300.0, 50.0),
        raw_line("Pemasukan", 0.9, 200.0, 300.0),
        raw_line("Pengeluaran", 0.9, 500.0, 300.0),
        raw_line("Saldo", 0.9, 800.0, 300.0),
        raw_line("Rp 1.000.000", 0.9, 500.0, 350.0),
        raw_line("Rp 1.082.202", 0.9, 500.0, 400.0),
        raw_line("Total", 0.9, 100.0, 500.0),
        raw_line("Rp 4.082.202,00", 0.9, 200.0, 505.0),
        raw_line("Rp 2.000.000,00", 0.9, 500.0, 505.0),
        raw_line("Rp 2.082.202,00", 0.9, 800.0, 505.0),
    ]
}

#[test]
fn test_no_pages_is_an_error_result() {
    let service = service(HashMap::new());
    let result = service.process_pages(&[]);
    assert_eq!(result.grand_total, None);
    assert_eq!(result.error.as_deref(), Some("No pages to process"));
}

#[test]
fn test_single_retail_page() {
    let mut pages = HashMap::new();
    pages.insert(1000, retail_stub("TOTAL Rp 30.000"));
    let service = service(pages);

    let result = service.process_pages(&[DynamicImage::new_rgb8(1000, 1000)]);
    assert_eq!(result.grand_total, Some(30_000));
    assert_eq!(result.currency, "IDR");
    assert_eq!(result.receipt_count, 1);
    assert!(result.error.is_none());
    assert!(result.raw_text.contains("Indomaret"));
}

#[test]
fn test_multi_page_totals_are_summed() {
    let mut pages = HashMap::new();
    pages.insert(1000, retail_stub("TOTAL Rp 30.000"));
    pages.insert(1001, retail_stub("TOTAL Rp 12.500"));
    let service = service(pages);

    let result = service.process_pages(&[
        DynamicImage::new_rgb8(1000, 1000),
        DynamicImage::new_rgb8(1001, 1000),
    ]);
    assert_eq!(result.grand_total, Some(42_500));
    assert_eq!(result.receipt_count, 2);
    assert_eq!(result.per_page.len(), 2);
    assert_eq!(result.per_page[0].page, 1);
    assert_eq!(result.per_page[1].page, 2);
}

#[test]
fn test_summary_template_short_circuits_document() {
    let mut pages = HashMap::new();
    pages.insert(1000, retail_stub("TOTAL Rp 30.000"));
    pages.insert(801, report_page());
    let service = service(pages);

    let result = service.process_pages(&[
        DynamicImage::new_rgb8(1000, 1000),
        DynamicImage::new_rgb8(801, 1000),
    ]);

    // The pengeluaran column of the Total row, not the sum of pages.
    assert_eq!(result.grand_total, Some(2_000_000));
    assert_eq!(
        result.category_detected,
        vec![Category::SaldoPengeluaranSummary]
    );
    assert_eq!(result.per_page.len(), 1);
    assert_eq!(result.per_page[0].page, 2);
    assert_eq!(result.confidence, 0.97);
}

#[test]
fn test_summary_result_is_stable_under_page_order() {
    let mut pages = HashMap::new();
    pages.insert(1000, retail_stub("TOTAL Rp 30.000"));
    pages.insert(801, report_page());

    let forward = service(pages.clone());
    let reversed = service(pages);

    let a = forward.process_pages(&[
        DynamicImage::new_rgb8(1000, 1000),
        DynamicImage::new_rgb8(801, 1000),
    ]);
    let b = reversed.process_pages(&[
        DynamicImage::new_rgb8(801, 1000),
        DynamicImage::new_rgb8(1000, 1000),
    ]);

    assert_eq!(a.grand_total, b.grand_total);
    assert_eq!(a.category_detected, b.category_detected);
}

#[test]
fn test_focus_page_without_template_processes_only_that_page() {
    let mut pages = HashMap::new();
    pages.insert(1000, retail_stub("TOTAL Rp 30.000"));
    pages.insert(900, vec![
        raw_line("LAPORAN PERTANGGUNGJAWABAN KEGIATAN", 0.9, 100.0, 50.0),
        raw_line("TOTAL Rp 50.000", 0.9, 100.0, 500.0),
    ]);
    let service = service(pages);

    let result = service.process_pages(&[
        DynamicImage::new_rgb8(1000, 1000),
        DynamicImage::new_rgb8(900, 1000),
    ]);

    assert_eq!(result.grand_total, Some(50_000));
    assert_eq!(result.per_page.len(), 1);
    assert_eq!(result.per_page[0].page, 2);
}

#[test]
fn test_no_valid_total_detected() {
    let mut pages = HashMap::new();
    pages.insert(1000, vec![raw_line("terima kasih", 0.95, 100.0, 500.0)]);
    let service = service(pages);

    let result = service.process_pages(&[DynamicImage::new_rgb8(1000, 1000)]);
    assert_eq!(result.grand_total, None);
    assert_eq!(result.receipt_count, 0);
    assert_eq!(result.error.as_deref(), Some("No valid total detected"));
}

#[test]
fn test_document_json_shape() {
    let mut pages = HashMap::new();
    pages.insert(1000, retail_stub("TOTAL Rp 30.000"));
    let service = service(pages);

    let result = service.process_pages(&[DynamicImage::new_rgb8(1000, 1000)]);
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert_eq!(json["grand_total"], 30_000);
    assert_eq!(json["currency"], "IDR");
    assert!(json["confidence"].is_number());
    assert!(json["per_page"].is_array());
    assert_eq!(json["per_page"][0]["receipts"][0]["total"], 30_000);
    assert!(json["per_page"][0]["receipts"][0]["bbox"].is_array());
    assert!(json.get("error").is_none());
}
