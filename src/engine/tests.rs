use super::*;
use crate::progress::progress_channel;
use crate::testutil::pdf_with_pages;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn write_pdf(dir: &Path, name: &str, body: &str) {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.extend_from_slice(body.as_bytes());
    fs::write(dir.join(name), bytes).unwrap();
}

fn spec_document(pages: &[&str]) -> SpecificationDocument {
    SpecificationDocument::from_bytes(pdf_with_pages(pages), "tender.pdf")
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

#[tokio::test]
async fn scenario_certificate_matched_license_unmatched() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root.path(), "ISO_Certificate.pdf", "certificate body");
    write_pdf(root.path(), "irrelevant.pdf", "nothing of note");

    let report = engine()
        .run(
            spec_document(&["1. Certificate", "2. License"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.categories.len(), 2);
    assert_eq!(report.categories[0].label, "certificate");
    assert_eq!(report.categories[1].label, "license");

    let certificate = report
        .matches
        .iter()
        .find(|m| m.category == "certificate")
        .unwrap();
    assert_eq!(certificate.files.len(), 1);
    assert_eq!(certificate.files[0].file.file_name, "ISO_Certificate.pdf");
    assert!(certificate.files[0].score > engine().config().score_threshold);

    assert_eq!(report.unmatched, vec!["license".to_string()]);
    assert_eq!(report.copied_count, 1);
    assert!(out.path().join("certificate/ISO_Certificate.pdf").is_file());
}

#[tokio::test]
async fn scenario_duplicate_content_across_roots_copies_once() {
    init_tracing();
    let root_a = TempDir::new().unwrap();
    let root_b = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root_a.path(), "License_2023.pdf", "identical license body");
    write_pdf(root_b.path(), "License_2023.pdf", "identical license body");

    let report = engine()
        .run(
            spec_document(&["1. License"]),
            vec![root_a.path().to_path_buf(), root_b.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await
        .unwrap();

    let license = report
        .matches
        .iter()
        .find(|m| m.category == "license")
        .unwrap();
    assert_eq!(license.files.len(), 1);
    assert_eq!(report.copied_count, 1);
    assert!(out.path().join("license/License_2023.pdf").is_file());
    assert!(!out.path().join("license/License_2023(1).pdf").exists());
}

#[tokio::test]
async fn scenario_rerun_suffixes_instead_of_overwriting() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root.path(), "ISO_Certificate.pdf", "fresh copy");

    let dest_dir = out.path().join("certificate");
    fs::create_dir_all(&dest_dir).unwrap();
    fs::write(dest_dir.join("ISO_Certificate.pdf"), b"previous run").unwrap();

    let report = engine()
        .run(
            spec_document(&["1. Certificate"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.copied_count, 1);
    assert_eq!(
        fs::read(dest_dir.join("ISO_Certificate.pdf")).unwrap(),
        b"previous run"
    );
    assert!(dest_dir.join("ISO_Certificate(1).pdf").is_file());
}

#[tokio::test]
async fn progress_events_arrive_in_stage_order() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root.path(), "Profile.pdf", "company profile");

    let (sender, mut events) = progress_channel();
    let report = engine()
        .run_with_progress(
            spec_document(&["1. Profile"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
            Some(sender),
        )
        .await
        .unwrap();
    assert_eq!(report.status, RunStatus::Complete);

    let mut stages = Vec::new();
    while let Some(event) = events.next_event().await {
        stages.push(event.stage);
    }
    assert_eq!(
        stages,
        vec![
            Stage::ExtractingText,
            Stage::ParsingRequirements,
            Stage::IndexingFolders,
            Stage::Matching,
            Stage::Materializing,
            Stage::Complete,
        ]
    );
}

#[tokio::test]
async fn no_requirements_degrades_to_empty_report() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root.path(), "Whatever.pdf", "candidate body");

    let report = engine()
        .run(
            spec_document(&["lorem ipsum dolor", "sit amet"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::CompletedWithWarnings);
    assert!(report.categories.is_empty());
    assert!(report.matches.is_empty());
    assert_eq!(report.copied_count, 0);
}

#[tokio::test]
async fn non_pdf_media_type_is_unreadable() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let document = SpecificationDocument::from_bytes(b"plain text".to_vec(), "notes.txt");
    let result = engine()
        .run(
            document,
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await;

    assert!(matches!(result, Err(EngineError::UnreadableDocument(_))));
}

#[tokio::test]
async fn garbage_pdf_bytes_are_unreadable() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let document =
        SpecificationDocument::from_bytes(b"%PDF-1.4\nbroken beyond repair".to_vec(), "bad.pdf");
    let result = engine()
        .run(
            document,
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await;

    assert!(matches!(result, Err(EngineError::UnreadableDocument(_))));
}

#[tokio::test]
async fn oversized_specification_is_rejected() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let config = EngineConfig::default().with_max_document_bytes(16);
    let result = Engine::new(config)
        .run(
            spec_document(&["1. Certificate"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await;

    assert!(matches!(result, Err(EngineError::UnreadableDocument(_))));
}

#[tokio::test]
async fn missing_roots_abort_the_run() {
    init_tracing();
    let somewhere = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let result = engine()
        .run(
            spec_document(&["1. Certificate"]),
            vec![somewhere.path().join("gone"), somewhere.path().join("also-gone")],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await;

    assert!(matches!(result, Err(EngineError::NoSearchRoots(_))));
}

#[tokio::test]
async fn cancellation_before_start_reports_cancelled() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root.path(), "Certificate.pdf", "body");

    let cancel = CancelHandle::new();
    cancel.cancel();

    let result = engine()
        .run(
            spec_document(&["1. Certificate"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            cancel,
        )
        .await;

    assert!(matches!(
        result,
        Err(EngineError::Cancelled {
            stage: Stage::ExtractingText
        })
    ));
    assert!(fs::read_dir(out.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn report_persists_as_json() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(root.path(), "Datasheet.pdf", "datasheet body");

    let report = engine()
        .run(
            spec_document(&["1. Datasheet"]),
            vec![root.path().to_path_buf()],
            out.path().to_path_buf(),
            CancelHandle::new(),
        )
        .await
        .unwrap();

    let path = out.path().join("report.json");
    report.write_json(&path).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed["copiedCount"], 1);
    assert_eq!(parsed["specification"], "tender.pdf");
}
