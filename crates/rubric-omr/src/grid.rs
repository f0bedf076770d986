//! Vertical grid line discovery
//!
//! Table borders are tall, nearly continuous runs of ink in a single column,
//! so they dominate a per-column ink profile of the vertical structures. Peaks
//! are picked relative to the profile maximum, which keeps the locator stable
//! across scan exposure.

use crate::binarize::{binarize_inverted, BACKGROUND};
use crate::lines::{long_runs, RunDirection};
use image::GrayImage;
use rubric_core::FormLayout;
use tracing::debug;

/// Ink pixels per column
#[must_use]
pub fn column_profile(mask: &GrayImage) -> Vec<u32> {
    let mut profile = vec![0u32; mask.width() as usize];
    for (x, _, pixel) in mask.enumerate_pixels() {
        if pixel[0] != BACKGROUND {
            profile[x as usize] += 1;
        }
    }
    profile
}

/// Collapse candidate columns into one x per cluster.
///
/// `columns` must be ascending. A column joins the current cluster when it is
/// less than `merge_distance` from the previous candidate; each cluster
/// reports its rounded mean position.
#[must_use]
pub fn cluster_columns(columns: &[u32], merge_distance: u32) -> Vec<u32> {
    let mut lines = Vec::new();
    let mut cluster: Vec<u32> = Vec::new();

    for &x in columns {
        if let Some(&last) = cluster.last() {
            if x - last >= merge_distance {
                lines.push(mean(&cluster));
                cluster.clear();
            }
        }
        cluster.push(x);
    }
    if !cluster.is_empty() {
        lines.push(mean(&cluster));
    }
    lines
}

fn mean(values: &[u32]) -> u32 {
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    (sum as f64 / values.len() as f64).round() as u32
}

/// Keep lines right of the question-text column, ascending
#[must_use]
pub fn filter_grid_lines(lines: &[u32], width: u32, layout: &FormLayout) -> Vec<u32> {
    let min_x = layout.grid_min_x(width);
    let mut kept: Vec<u32> = lines
        .iter()
        .copied()
        .filter(|&x| x as f32 > min_x)
        .collect();
    kept.sort_unstable();
    kept.dedup();
    kept
}

/// Locate the vertical answer-grid boundaries of an uncleaned page
#[must_use]
pub fn locate_grid_lines(gray: &GrayImage, layout: &FormLayout) -> Vec<u32> {
    let binary = binarize_inverted(gray, layout.threshold_block_radius, layout.threshold_offset);
    grid_lines_from_binary(&binary, layout)
}

/// [`locate_grid_lines`] on an inverted binarization of the uncleaned page
#[must_use]
pub fn grid_lines_from_binary(binary: &GrayImage, layout: &FormLayout) -> Vec<u32> {
    let vertical = long_runs(binary, RunDirection::Vertical, layout.line_kernel_length);
    let profile = column_profile(&vertical);

    let peak = profile.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        debug!("No vertical structure found");
        return Vec::new();
    }

    let threshold = peak as f32 * layout.column_peak_ratio;
    let candidates: Vec<u32> = profile
        .iter()
        .enumerate()
        .filter(|&(_, &sum)| sum as f32 > threshold)
        .map(|(x, _)| x as u32)
        .collect();

    let lines = cluster_columns(&candidates, layout.line_merge_distance);
    let grid = filter_grid_lines(&lines, binary.width(), layout);
    debug!(
        "Grid lines: {} raw clusters, {} kept {:?}",
        lines.len(),
        grid.len(),
        grid
    );
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ruled_page(width: u32, height: u32, columns: &[u32]) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));
        for &cx in columns {
            for x in cx..cx + 2 {
                for y in 20..height - 20 {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }

    #[test]
    fn test_cluster_columns_merges_close_detections() {
        assert_eq!(cluster_columns(&[100, 101, 102, 200, 201], 15), vec![101, 201]);
        assert_eq!(cluster_columns(&[100, 114, 130], 15), vec![107, 130]);
        assert!(cluster_columns(&[], 15).is_empty());
    }

    #[test]
    fn test_filter_excludes_question_column() {
        let layout = FormLayout::default();
        let kept = filter_grid_lines(&[800, 100, 450, 451, 600], 1000, &layout);
        assert_eq!(kept, vec![451, 600, 800]);
        assert!(kept.iter().all(|&x| x as f32 > 0.45 * 1000.0));
    }

    #[test]
    fn test_locates_ruled_columns() {
        let page = ruled_page(1000, 300, &[100, 500, 600, 700, 800, 900]);
        let lines = locate_grid_lines(&page, &FormLayout::default());
        assert_eq!(lines.len(), 5);
        for (found, expected) in lines.iter().zip([500u32, 600, 700, 800, 900]) {
            assert!(found.abs_diff(expected) <= 2, "{found} vs {expected}");
        }
    }

    #[test]
    fn test_blank_page_has_no_grid() {
        let page = GrayImage::from_pixel(400, 300, Luma([255]));
        assert!(locate_grid_lines(&page, &FormLayout::default()).is_empty());
    }
}
