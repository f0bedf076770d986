//! results.csv rows and zip bundle contents

use rubric_cli::export::{self, RESULTS_FILE, UNSCORED};
use rubric_core::{
    describe, FieldExtraction, PageOutcome, PageRef, PageResult, Score, ScoreResult, ScoredPage,
};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

fn scored_page() -> PageResult {
    let scores = (1..=11)
        .map(|q| {
            let score = if q == 4 { None } else { Score::from_value(3) };
            ScoreResult::new(q, score)
        })
        .collect();
    let advisor = FieldExtraction {
        label: "Advisor".to_string(),
        text: "Jane Doe".to_string(),
        crop_path: Some(PathBuf::from("images/team_p1_advisor.png")),
    };
    PageResult {
        page: PageRef::new("team.pdf", 1),
        outcome: PageOutcome::Scored(ScoredPage::new(
            scores,
            advisor,
            FieldExtraction::absent("Group"),
        )),
    }
}

fn rejected_page() -> PageResult {
    PageResult {
        page: PageRef::new("team.pdf", 2),
        outcome: PageOutcome::Rejected {
            comments_image: PathBuf::from("images/team_p2_comments.png"),
            reason: "no rubric keywords".to_string(),
        },
    }
}

#[test]
fn test_scored_row() {
    let row = export::page_row(&scored_page());
    let header = export::header();
    assert_eq!(row.len(), header.len());

    let cell = |name: &str| row[header.iter().position(|h| h == name).unwrap()].as_str();
    assert_eq!(cell("Filename"), "team.pdf");
    assert_eq!(cell("Page_Num"), "1");
    assert_eq!(cell("Advisor"), "Jane Doe");
    assert_eq!(cell("Advisor_Image_Path"), "images/team_p1_advisor.png");
    assert_eq!(cell("Group_Name"), "");
    assert_eq!(cell("Group_Name_Image_Path"), "");
    assert_eq!(cell("Q1_Score"), "3");
    assert_eq!(cell("Q1_Text"), describe(1, Score::from_value(3)));
    assert_eq!(cell("Q4_Score"), UNSCORED);
    assert_eq!(cell("Q4_Text"), "");
    assert_eq!(cell("Total_Score"), "30");
    assert_eq!(cell("Comments_Image_Path"), "");
}

#[test]
fn test_rejected_row() {
    let row = export::page_row(&rejected_page());
    assert_eq!(row.len(), export::header().len());
    assert_eq!(row[0], "team.pdf");
    assert_eq!(row[1], "2");
    assert!(row[2..row.len() - 1].iter().all(String::is_empty));
    assert_eq!(row.last().unwrap(), "images/team_p2_comments.png");
}

#[test]
fn test_results_file_and_bundle() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("images")).unwrap();
    fs::write(dir.path().join("images/team_p2_comments.png"), b"png").unwrap();

    let pages = [scored_page(), rejected_page()];
    let rows = export::write_results(&dir.path().join(RESULTS_FILE), &pages).unwrap();
    assert_eq!(rows, 2);

    let mut reader = csv::Reader::from_path(dir.path().join(RESULTS_FILE)).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, export::header());
    assert_eq!(reader.records().count(), 2);

    let bundle = dir.path().join("out.zip");
    let images = vec![PathBuf::from("images/team_p2_comments.png")];
    export::write_bundle(dir.path(), &images, &bundle).unwrap();

    let mut archive = zip::ZipArchive::new(fs::File::open(&bundle).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(names, vec!["images/team_p2_comments.png", "results.csv"]);

    let mut csv_text = String::new();
    archive
        .by_name("results.csv")
        .unwrap()
        .read_to_string(&mut csv_text)
        .unwrap();
    assert!(csv_text.starts_with("Filename,Page_Num,Advisor"));
}
