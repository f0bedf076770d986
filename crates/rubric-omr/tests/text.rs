//! Plain-text extraction against scripted collaborators

mod common;

use common::{text_pdf, FakeRasterizer, FakeRecognizer, RubricPage, PAGE_HEIGHT, PAGE_WIDTH};
use rubric_core::{FormLayout, PageRef, PipelineConfig, ToolConfig};
use rubric_omr::{read_text_layers, ArtifactDir, Document, PagePipeline, TextExtractor};
use std::sync::Arc;

fn tools() -> ToolConfig {
    // below the page height, so pages reach the recognizer unscaled
    ToolConfig {
        ocr_target_height: 100,
        ..Default::default()
    }
}

fn extractor(rasterizer: FakeRasterizer, recognizer: Arc<FakeRecognizer>) -> TextExtractor {
    let config = PipelineConfig {
        workers: Some(2),
        ..Default::default()
    };
    TextExtractor::new(Arc::new(rasterizer), recognizer, &tools(), &config).unwrap()
}

fn blank_pages(count: usize) -> FakeRasterizer {
    FakeRasterizer::Pages(vec![RubricPage::new([None; 11]).render(); count])
}

fn note_taker(text: &str) -> Arc<FakeRecognizer> {
    Arc::new(FakeRecognizer {
        page_text: text.to_string(),
        ..FakeRecognizer::rubric(Vec::new())
    })
}

#[test]
fn test_pages_are_joined_with_newlines() {
    let extractor = extractor(blank_pages(3), note_taker("Strong delivery"));
    let results = extractor.run(&[Document::new("notes.pdf", b"%PDF".to_vec())]);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "notes.pdf");
    assert_eq!(
        results[0].text,
        "Strong delivery\nStrong delivery\nStrong delivery"
    );
}

#[test]
fn test_results_keep_document_order() {
    let extractor = extractor(blank_pages(1), note_taker("text"));
    let names: Vec<String> = (0..8).map(|i| format!("doc-{i}.pdf")).collect();
    let documents: Vec<Document> = names
        .iter()
        .map(|n| Document::new(n.as_str(), b"%PDF".to_vec()))
        .collect();

    let results = extractor.run(&documents);
    let filenames: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(filenames, names.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn test_runs_on_configured_workers() {
    let recognizer = note_taker("text");
    let extractor = extractor(blank_pages(2), recognizer.clone());
    let documents: Vec<Document> = (0..4)
        .map(|i| Document::new(format!("doc-{i}.pdf"), b"%PDF".to_vec()))
        .collect();
    assert_eq!(extractor.run(&documents).len(), 4);

    let threads = recognizer.text_threads.lock().unwrap().clone();
    assert_eq!(threads.len(), 8);
    for name in &threads {
        assert!(
            name == "rubric-text-0" || name == "rubric-text-1",
            "unexpected thread {name:?}"
        );
    }
}

#[test]
fn test_rasterizer_failure_falls_back_to_text_layer() {
    let extractor = extractor(FakeRasterizer::Broken, note_taker("never used"));
    let results = extractor.run(&[Document::new("typed.pdf", text_pdf("Typed feedback"))]);
    assert!(results[0].text.contains("Typed feedback"), "{:?}", results[0].text);
}

#[test]
fn test_missing_rasterizer_falls_back_to_text_layer() {
    let extractor = extractor(FakeRasterizer::Missing, note_taker("never used"));
    let results = extractor.run(&[Document::new("typed.pdf", text_pdf("Typed feedback"))]);
    assert!(results[0].text.contains("Typed feedback"), "{:?}", results[0].text);
}

#[test]
fn test_recognizer_failure_falls_back_to_text_layer() {
    let recognizer = Arc::new(FakeRecognizer {
        text_fails: true,
        ..FakeRecognizer::rubric(Vec::new())
    });
    let extractor = extractor(blank_pages(2), recognizer);
    let text = extractor
        .extract(&Document::new("typed.pdf", text_pdf("Typed feedback")))
        .unwrap();
    assert!(text.contains("Typed feedback"), "{text:?}");
}

#[test]
fn test_unreadable_document_yields_empty_text() {
    let extractor = extractor(FakeRasterizer::Broken, note_taker("never used"));
    let results = extractor.run(&[Document::new("junk.pdf", b"junk".to_vec())]);
    assert_eq!(results[0].text, "");
}

#[test]
fn test_text_layers_without_tools() {
    let results = read_text_layers(&[
        Document::new("typed.pdf", text_pdf("Typed feedback")),
        Document::new("junk.pdf", b"junk".to_vec()),
    ]);
    assert!(results[0].text.contains("Typed feedback"));
    assert_eq!(results[1].filename, "junk.pdf");
    assert!(results[1].text.is_empty());
}

#[test]
fn test_sideways_page_is_turned_in_text_mode_only() {
    let sideways = || {
        Arc::new(FakeRecognizer {
            rotate: Some(90.0),
            ..FakeRecognizer::rubric(Vec::new())
        })
    };

    let text_recognizer = sideways();
    let results = extractor(blank_pages(1), text_recognizer.clone())
        .run(&[Document::new("sideways.pdf", b"%PDF".to_vec())]);
    assert_eq!(results.len(), 1);
    let seen = text_recognizer.text_images.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    let (width, height) = seen[0];
    assert!(height > PAGE_HEIGHT, "{width}x{height}");

    // the same report exceeds the skew ceiling when scoring rubric pages
    let dir = tempfile::tempdir().unwrap();
    let rubric_recognizer = sideways();
    PagePipeline::new(
        rubric_recognizer.clone(),
        Arc::new(FormLayout::default()),
        ArtifactDir::create(dir.path()).unwrap(),
    )
    .process(
        &PageRef::new("sideways.pdf", 1),
        &image::DynamicImage::ImageLuma8(RubricPage::new([None; 11]).render()),
    )
    .unwrap();
    assert_eq!(
        *rubric_recognizer.word_images.lock().unwrap(),
        vec![(PAGE_WIDTH, PAGE_HEIGHT)]
    );
}
