//! results.csv and zip bundle
//!
//! One row per page. Rejected pages carry only the filename, page number and
//! comments image; scored pages leave the comments column empty.

use anyhow::{Context, Result};
use rubric_core::{PageOutcome, PageResult, QUESTION_COUNT};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const RESULTS_FILE: &str = "results.csv";

/// Marker written for questions the scorer could not resolve
pub const UNSCORED: &str = "UNSCORED";

/// Column names, in order
#[must_use]
pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = [
        "Filename",
        "Page_Num",
        "Advisor",
        "Advisor_Image_Path",
        "Group_Name",
        "Group_Name_Image_Path",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    for q in 1..=QUESTION_COUNT {
        columns.push(format!("Q{q}_Score"));
        columns.push(format!("Q{q}_Text"));
    }
    columns.push("Total_Score".to_string());
    columns.push("Comments_Image_Path".to_string());
    columns
}

fn path_cell(path: Option<&PathBuf>) -> String {
    path.map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

/// Cells of one page, aligned with [`header`]
#[must_use]
pub fn page_row(result: &PageResult) -> Vec<String> {
    let mut row = vec![result.page.filename.clone(), result.page.page_num.to_string()];
    match &result.outcome {
        PageOutcome::Scored(page) => {
            row.push(page.advisor.text.clone());
            row.push(path_cell(page.advisor.crop_path.as_ref()));
            row.push(page.group.text.clone());
            row.push(path_cell(page.group.crop_path.as_ref()));
            for score in &page.scores {
                row.push(
                    score
                        .score
                        .map_or_else(|| UNSCORED.to_string(), |s| s.value().to_string()),
                );
                row.push(score.description.clone());
            }
            row.push(page.total.to_string());
            row.push(String::new());
        }
        PageOutcome::Rejected { comments_image, .. } => {
            row.extend(std::iter::repeat(String::new()).take(4 + 2 * QUESTION_COUNT + 1));
            row.push(path_cell(Some(comments_image)));
        }
    }
    row
}

/// Write every page to `path`
pub fn write_results<'a>(
    path: &Path,
    pages: impl IntoIterator<Item = &'a PageResult>,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(header())?;
    let mut rows = 0;
    for page in pages {
        writer.write_record(page_row(page))?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// Zip `results.csv` and `images` (paths relative to `output_dir`) into `bundle`
pub fn write_bundle(output_dir: &Path, images: &[PathBuf], bundle: &Path) -> Result<()> {
    let file = File::create(bundle)
        .with_context(|| format!("Failed to create bundle {}", bundle.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries =
        std::iter::once(Path::new(RESULTS_FILE)).chain(images.iter().map(PathBuf::as_path));
    let mut buffer = Vec::new();
    for relative in entries {
        buffer.clear();
        File::open(output_dir.join(relative))
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .with_context(|| format!("Failed to read {}", relative.display()))?;
        zip.start_file(relative.to_string_lossy().replace('\\', "/"), options)?;
        zip.write_all(&buffer)?;
    }
    zip.finish()?;
    Ok(())
}
