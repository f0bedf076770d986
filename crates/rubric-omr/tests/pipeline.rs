//! End-to-end page and batch processing against scripted collaborators

mod common;

use common::{FakeRasterizer, FakeRecognizer, RubricPage, PAGE_HEIGHT, PAGE_WIDTH};
use image::DynamicImage;
use rubric_core::{
    ExtractError, FormLayout, PageOutcome, PageRef, PipelineConfig, QUESTION_COUNT,
};
use rubric_omr::{ArtifactDir, BatchExtractor, Document, PagePipeline};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const MARKS: [Option<usize>; 11] = [
    Some(4),
    Some(3),
    Some(0),
    None,
    Some(2),
    Some(1),
    Some(4),
    Some(4),
    Some(3),
    Some(2),
    Some(1),
];

fn pipeline(recognizer: FakeRecognizer, root: &Path) -> PagePipeline {
    PagePipeline::new(
        Arc::new(recognizer),
        Arc::new(FormLayout::default()),
        ArtifactDir::create(root).unwrap(),
    )
}

fn page_image(marks: [Option<usize>; 11]) -> DynamicImage {
    DynamicImage::ImageLuma8(RubricPage::new(marks).render())
}

#[test]
fn test_scores_marked_rubric_page() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = RubricPage::new(MARKS);
    let pipeline = pipeline(FakeRecognizer::rubric(sheet.words()), dir.path());

    let result = pipeline
        .process(&PageRef::new("team-7.pdf", 1), &page_image(MARKS))
        .unwrap();
    let scored = result.scored().expect("rubric page is scored");

    let values: Vec<Option<u8>> = scored
        .scores
        .iter()
        .map(|s| s.score.map(|v| v.value()))
        .collect();
    assert_eq!(
        values,
        vec![
            Some(5),
            Some(4),
            Some(0),
            None,
            Some(3),
            Some(2),
            Some(5),
            Some(5),
            Some(4),
            Some(3),
            Some(2)
        ]
    );
    assert_eq!(scored.total, 33);
    assert_eq!(scored.unscored(), vec![4]);
    assert!(scored.scores[3].description.is_empty());
    assert!(!scored.scores[0].description.is_empty());

    assert_eq!(scored.advisor.text, "Jane Doe");
    for field in [&scored.advisor, &scored.group] {
        let crop = field.crop_path.as_ref().expect("crop saved");
        assert!(dir.path().join(crop).is_file());
    }
    assert!(result.comments_image().is_none());
}

#[test]
fn test_missing_anchor_leaves_question_unscored() {
    let dir = tempfile::tempdir().unwrap();
    let words: Vec<_> = RubricPage::new(MARKS)
        .words()
        .into_iter()
        .filter(|w| w.text != "2.")
        .collect();
    let pipeline = pipeline(FakeRecognizer::rubric(words), dir.path());

    let result = pipeline
        .process(&PageRef::new("team-7.pdf", 1), &page_image(MARKS))
        .unwrap();
    let scored = result.scored().unwrap();
    assert_eq!(scored.unscored(), vec![2, 4]);
    assert_eq!(scored.total, 29);
}

#[test]
fn test_comment_page_is_rejected_whole() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(FakeRecognizer::comments(), dir.path());

    let result = pipeline
        .process(&PageRef::new("team-7.pdf", 2), &page_image([None; 11]))
        .unwrap();

    assert!(result.scored().is_none());
    match &result.outcome {
        PageOutcome::Rejected { comments_image, .. } => {
            assert_eq!(comments_image, Path::new("images/team-7_d1_p2_comments.png"));
            let saved = image::open(dir.path().join(comments_image)).unwrap();
            assert_eq!((saved.width(), saved.height()), (PAGE_WIDTH, PAGE_HEIGHT));
        }
        PageOutcome::Scored(_) => panic!("comment page must not be scored"),
    }
}

#[test]
fn test_skewed_page_is_straightened_before_recognition() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = Arc::new(FakeRecognizer {
        rotate: Some(6.0),
        ..FakeRecognizer::rubric(Vec::new())
    });
    let pipeline = PagePipeline::new(
        recognizer.clone(),
        Arc::new(FormLayout::default()),
        ArtifactDir::create(dir.path()).unwrap(),
    );

    pipeline
        .process(&PageRef::new("skewed.pdf", 1), &page_image([None; 11]))
        .unwrap();

    let seen = recognizer.word_images.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    let (width, height) = seen[0];
    assert!(width > PAGE_WIDTH && height > PAGE_HEIGHT, "{width}x{height}");
}

#[test]
fn test_upright_page_reaches_recognition_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let recognizer = Arc::new(FakeRecognizer::rubric(Vec::new()));
    let pipeline = PagePipeline::new(
        recognizer.clone(),
        Arc::new(FormLayout::default()),
        ArtifactDir::create(dir.path()).unwrap(),
    );

    pipeline
        .process(&PageRef::new("upright.pdf", 1), &page_image([None; 11]))
        .unwrap();
    assert_eq!(
        *recognizer.word_images.lock().unwrap(),
        vec![(PAGE_WIDTH, PAGE_HEIGHT)]
    );
}

#[test]
fn test_debug_images_saved_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = RubricPage::new(MARKS);
    let pipeline =
        pipeline(FakeRecognizer::rubric(sheet.words()), dir.path()).with_debug_images(true);

    pipeline
        .process(&PageRef::new("dbg.pdf", 1), &page_image(MARKS))
        .unwrap();
    let saved = pipeline.artifacts().list().unwrap();
    assert!(saved.contains(&Path::new("images/dbg_d1_p1_binary.png").to_path_buf()));
    assert!(saved.contains(&Path::new("images/dbg_d1_p1_cleaned.png").to_path_buf()));
}

fn batch(
    rasterizer: FakeRasterizer,
    recognizer: FakeRecognizer,
    root: &Path,
    config: &PipelineConfig,
) -> BatchExtractor {
    BatchExtractor::new(Arc::new(rasterizer), pipeline(recognizer, root), 300, config).unwrap()
}

#[test]
fn test_batch_skips_failed_document() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = RubricPage::new(MARKS);
    let extractor = batch(
        FakeRasterizer::Pages(vec![sheet.render(), sheet.render()]),
        FakeRecognizer::rubric(sheet.words()),
        dir.path(),
        &PipelineConfig {
            workers: Some(2),
            ..Default::default()
        },
    );

    let report = extractor
        .run(&[
            Document::new("good.pdf", b"%PDF-1.7".to_vec()),
            Document::new("bad.pdf", b"corrupt".to_vec()),
        ])
        .unwrap();

    assert_eq!(report.documents[0].filename, "good.pdf");
    assert_eq!(report.documents[0].pages.len(), 2);
    assert_eq!(report.documents[0].pages[1].page.page_num, 2);
    assert!(report.documents[1].error.is_some());

    let summary = report.summary();
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.documents_failed, 1);
    assert_eq!(summary.pages_scored, 2);
    assert_eq!(summary.pages_rejected, 0);
    assert_eq!(summary.questions_unscored, 2);
    assert_eq!(report.pages().count(), 2);
    assert!(report
        .pages()
        .all(|p| p.scored().map(|s| s.scores.len()) == Some(QUESTION_COUNT)));
}

#[test]
fn test_missing_rasterizer_aborts_batch() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = batch(
        FakeRasterizer::Missing,
        FakeRecognizer::comments(),
        dir.path(),
        &PipelineConfig::default(),
    );
    let err = extractor
        .run(&[Document::new("a.pdf", b"%PDF".to_vec())])
        .unwrap_err();
    assert!(matches!(err, ExtractError::Rasterize(_)));
}

#[test]
fn test_nothing_extracted_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = batch(
        FakeRasterizer::Broken,
        FakeRecognizer::comments(),
        dir.path(),
        &PipelineConfig::default(),
    );
    let err = extractor
        .run(&[
            Document::new("a.pdf", b"%PDF".to_vec()),
            Document::new("b.pdf", b"%PDF".to_vec()),
        ])
        .unwrap_err();
    assert!(matches!(err, ExtractError::NoDataExtracted));
}

#[test]
fn test_batch_keeps_artifacts_of_similar_names_apart() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = RubricPage::new(MARKS);
    let extractor = batch(
        FakeRasterizer::Pages(vec![sheet.render()]),
        FakeRecognizer::rubric(sheet.words()),
        dir.path(),
        &PipelineConfig {
            workers: Some(2),
            ..Default::default()
        },
    );

    let report = extractor
        .run(&[
            Document::new("team A.pdf", b"%PDF".to_vec()),
            Document::new("team_A.pdf", b"%PDF".to_vec()),
        ])
        .unwrap();

    let crops: Vec<_> = report
        .pages()
        .map(|p| p.scored().unwrap().advisor.crop_path.clone().unwrap())
        .collect();
    assert_eq!(crops.len(), 2);
    assert_ne!(crops[0], crops[1]);
    assert_eq!(crops[0], Path::new("images/team_A_d1_p1_advisor.png"));
    assert_eq!(crops[1], Path::new("images/team_A_d2_p1_advisor.png"));
    for crop in &crops {
        assert!(dir.path().join(crop).is_file());
    }
    assert_eq!(report.documents[1].pages[0].page.document, 2);
}

#[test]
fn test_slow_page_is_rejected_after_budget() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = RubricPage::new(MARKS);
    let pipeline = pipeline(
        FakeRecognizer {
            word_delay: Some(Duration::from_secs(2)),
            ..FakeRecognizer::rubric(sheet.words())
        },
        dir.path(),
    )
    .with_debug_images(true);
    let artifacts = pipeline.artifacts().clone();
    let extractor = BatchExtractor::new(
        Arc::new(FakeRasterizer::Pages(vec![sheet.render()])),
        pipeline,
        300,
        &PipelineConfig {
            workers: Some(1),
            page_timeout_secs: Some(1),
            ..Default::default()
        },
    )
    .unwrap();

    let report = extractor
        .run(&[Document::new("slow.pdf", b"%PDF".to_vec())])
        .unwrap();
    let page = &report.documents[0].pages[0];
    let comments = match &page.outcome {
        PageOutcome::Rejected { reason, comments_image } => {
            assert!(reason.contains("timed out"), "{reason}");
            assert!(dir.path().join(comments_image).is_file());
            comments_image.clone()
        }
        PageOutcome::Scored(_) => panic!("slow page must be rejected"),
    };

    // let the abandoned worker run past its word recognition
    std::thread::sleep(Duration::from_secs(2));
    assert_eq!(artifacts.list().unwrap(), vec![comments.clone()]);
    assert_eq!(artifacts.saved(), vec![comments]);
}
