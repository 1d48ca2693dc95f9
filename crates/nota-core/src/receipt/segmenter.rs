//! Page segmentation into at most two receipt groups.

use crate::ocr::Line;

/// Splits a page's lines into up to two spatial groups.
///
/// Side-by-side receipt stubs are the common layout, so a horizontal split is
/// tried first; stacked receipts fall back to a vertical split.
pub struct ReceiptSegmenter;

impl ReceiptSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Segment lines by the largest centroid gap.
    ///
    /// The groups are disjoint and their union equals the input. The first
    /// encountered largest gap wins ties.
    pub fn segment(&self, lines: &[Line], page_width: f32, page_height: f32) -> Vec<Vec<Line>> {
        if lines.is_empty() {
            return Vec::new();
        }

        let mut by_x: Vec<Line> = lines.to_vec();
        by_x.sort_by(|a, b| {
            a.x_center()
                .partial_cmp(&b.x_center())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut groups = if let Some(split) = largest_gap(&by_x, Line::x_center, page_width * 0.2)
        {
            let right = by_x.split_off(split);
            vec![by_x, right]
        } else {
            let mut by_y: Vec<Line> = lines.to_vec();
            by_y.sort_by(|a, b| {
                a.y_center()
                    .partial_cmp(&b.y_center())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            if let Some(split) = largest_gap(&by_y, Line::y_center, page_height * 0.12) {
                let bottom = by_y.split_off(split);
                vec![by_y, bottom]
            } else {
                vec![by_x]
            }
        };

        // Unreachable with a single split, kept as a guard.
        while groups.len() > 2 {
            groups.sort_by_key(Vec::len);
            let smallest = groups.remove(0);
            groups[0].extend(smallest);
        }

        groups
    }
}

impl Default for ReceiptSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the largest adjacent-centroid gap above `threshold`, if any.
fn largest_gap(sorted: &[Line], centroid: fn(&Line) -> f32, threshold: f32) -> Option<usize> {
    let mut max_gap = 0.0f32;
    let mut split = None;
    for i in 1..sorted.len() {
        let gap = centroid(&sorted[i]) - centroid(&sorted[i - 1]);
        if gap > max_gap {
            max_gap = gap;
            split = Some(i);
        }
    }
    if max_gap > threshold { split } else { None }
}
