mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use common::{Fixture, LineFixture, wrapped_invoice, write_file, zip_bytes, zip_part};
use efatura::{Engine, EngineConfig, NoopListener, ProgressEvent};

fn portal_batch(fixtures: &[Fixture]) -> Vec<u8> {
    let entries: Vec<(String, Vec<u8>)> = fixtures
        .iter()
        .map(|f| (format!("{}.zip", f.number), wrapped_invoice(f)))
        .collect();
    let refs: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.clone()))
        .collect();
    zip_bytes(&refs)
}

#[test]
fn nested_invoice_ends_up_in_its_year_report() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_file(
        &input.join("mart.zip"),
        &portal_batch(&[Fixture::new("INV-1", "2024-03-01")
            .order("SIP-1", "2024-02-28")
            .line(LineFixture::default())]),
    );

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(summary.total_archives, 1);
    assert_eq!(summary.processed_archives, 1);
    assert_eq!(summary.invoices_found, 1);
    assert_eq!(summary.reports, vec![output.join("2024_report.xlsx")]);
    assert!(summary.failed_archives.is_empty());
    assert!(summary.failed_years.is_empty());
    assert!(!summary.cancelled);

    let report = output.join("2024_report.xlsx");
    let invoices = zip_part(&report, "xl/worksheets/sheet1.xml");
    assert!(invoices.contains("<t>INV-1</t>"));
    assert!(invoices.contains(r#"<c r="I2"><v>100.00</v></c>"#));
    assert!(!invoices.contains(r#"r="A3""#));

    let lines = zip_part(&report, "xl/worksheets/sheet2.xml");
    assert!(lines.contains(r#"<c r="A2" t="inlineStr"><is><t>SIP-1</t></is></c>"#));

    let totals = zip_part(&report, "xl/worksheets/sheet3.xml");
    assert!(totals.contains(r#"<c r="B2"><v>1</v></c>"#));
    assert!(totals.contains("<t>100.00 TL</t>"));

    assert!(!output.join("temp").exists());
}

#[test]
fn years_are_split_across_reports() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_file(
        &input.join("a.zip"),
        &portal_batch(&[Fixture::new("INV-2023", "2023-05-10")]),
    );
    write_file(
        &input.join("sub/b.zip"),
        &portal_batch(&[Fixture::new("INV-2024", "2024-01-02")]),
    );

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(
        summary.reports,
        vec![output.join("2023_report.xlsx"), output.join("2024_report.xlsx")]
    );

    let y2023 = zip_part(&output.join("2023_report.xlsx"), "xl/worksheets/sheet1.xml");
    assert!(y2023.contains("INV-2023"));
    assert!(!y2023.contains("INV-2024"));
    let y2024 = zip_part(&output.join("2024_report.xlsx"), "xl/worksheets/sheet1.xml");
    assert!(y2024.contains("INV-2024"));
    assert!(!y2024.contains("INV-2023"));
}

#[test]
fn failed_report_leaves_other_years_written() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_file(
        &input.join("a.zip"),
        &portal_batch(&[Fixture::new("INV-2023", "2023-05-10")]),
    );
    write_file(
        &input.join("b.zip"),
        &portal_batch(&[Fixture::new("INV-2024", "2024-01-02")]),
    );
    // A directory squatting on the 2023 report name makes that write fail.
    std::fs::create_dir_all(output.join("2023_report.xlsx")).unwrap();

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(summary.reports, vec![output.join("2024_report.xlsx")]);
    assert_eq!(summary.failed_years, vec![2023]);
    assert!(output.join("2024_report.xlsx").is_file());
    assert!(output.join("2023_report.xlsx").is_dir());
    assert!(!output.join("temp").exists());
}

#[test]
fn overflowing_year_total_fails_only_that_year() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    let huge = "50000000000000000000000000000";
    write_file(
        &input.join("a.zip"),
        &portal_batch(&[
            Fixture::new("BIG-1", "2023-03-01").total(huge, "TRY"),
            Fixture::new("BIG-2", "2023-04-01").total(huge, "TRY"),
        ]),
    );
    write_file(
        &input.join("b.zip"),
        &portal_batch(&[Fixture::new("INV-2024", "2024-01-02")]),
    );

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(summary.invoices_found, 3);
    assert_eq!(summary.failed_years, vec![2023]);
    assert_eq!(summary.reports, vec![output.join("2024_report.xlsx")]);
    assert!(!output.join("2023_report.xlsx").exists());
    assert!(!output.join("temp").exists());
}

#[test]
fn corrupt_archive_does_not_stop_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_file(&input.join("1.zip"), &portal_batch(&[Fixture::new("A", "2024-01-01")]));
    write_file(&input.join("2.zip"), b"this is not a zip archive");
    write_file(&input.join("3.zip"), &portal_batch(&[Fixture::new("B", "2024-02-01")]));

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(summary.total_archives, 3);
    assert_eq!(summary.processed_archives, 3);
    assert_eq!(summary.invoices_found, 2);
    assert_eq!(summary.failed_archives, vec!["2.zip".to_string()]);

    let sheet = zip_part(&output.join("2024_report.xlsx"), "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<t>A</t>") && sheet.contains("<t>B</t>"));
}

#[test]
fn bad_document_is_skipped_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    let good = Fixture::new("OK", "2023-05-10").xml();
    let bad = good.replace("<cbc:ID>OK</cbc:ID>", "");
    write_file(
        &input.join("karma.zip"),
        &zip_bytes(&[
            ("good.xml", good.into_bytes()),
            ("bad.xml", bad.into_bytes()),
            ("broken.xml", b"<Invoice>".to_vec()),
        ]),
    );

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(summary.invoices_found, 1);
    assert_eq!(summary.skipped_documents, 2);
    assert!(summary.failed_archives.is_empty());
    assert!(output.join("2023_report.xlsx").is_file());
}

#[test]
fn progress_events_arrive_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    write_file(
        &input.join("a.zip"),
        &portal_batch(&[
            Fixture::new("A1", "2023-01-01"),
            Fixture::new("A2", "2023-06-01"),
            Fixture::new("A3", "2024-01-01"),
        ]),
    );
    write_file(&input.join("b.zip"), &portal_batch(&[Fixture::new("B1", "2024-02-01")]));

    let events = Mutex::new(Vec::new());
    let listener = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());
    Engine::new(&input, tmp.path().join("out"))
        .run(&listener)
        .unwrap();
    let events = events.into_inner().unwrap();

    assert_eq!(events.len(), 4);
    match &events[0] {
        ProgressEvent::RunStarted(s) => {
            assert_eq!(s.total_archives, 2);
            assert_eq!(s.processed_archives, 0);
        }
        other => panic!("unexpected first event: {other:?}"),
    }
    match &events[1] {
        ProgressEvent::ArchiveCompleted { snapshot, detail } => {
            assert_eq!(snapshot.processed_archives, 1);
            assert_eq!(snapshot.invoices_found, 3);
            assert_eq!(detail.filename, "a.zip");
            assert_eq!(detail.invoice_count, 3);
            assert_eq!(detail.year_distribution, "2023: 2, 2024: 1");
        }
        other => panic!("unexpected second event: {other:?}"),
    }
    match &events[2] {
        ProgressEvent::ArchiveCompleted { snapshot, detail } => {
            assert_eq!(snapshot.processed_archives, 2);
            assert_eq!(snapshot.invoices_found, 4);
            assert_eq!(detail.year_distribution, "2024: 1");
        }
        other => panic!("unexpected third event: {other:?}"),
    }
    match &events[3] {
        ProgressEvent::RunCompleted { snapshot, cancelled } => {
            assert!(!cancelled);
            assert_eq!(snapshot.year_distribution.as_deref(), Some("2023: 2, 2024: 2"));
            assert_eq!(events[3].message(), "Processing completed: 4 invoices (2023: 2, 2024: 2)");
        }
        other => panic!("unexpected last event: {other:?}"),
    }
}

#[test]
fn events_can_go_through_a_channel() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    write_file(&input.join("a.zip"), &portal_batch(&[Fixture::new("A", "2023-01-01")]));

    let (tx, rx) = mpsc::channel();
    Engine::new(&input, tmp.path().join("out")).run(&tx).unwrap();
    drop(tx);
    let received: Vec<ProgressEvent> = rx.iter().collect();
    assert_eq!(received.len(), 3);
    assert!(matches!(received.last(), Some(ProgressEvent::RunCompleted { .. })));
}

#[test]
fn cancellation_keeps_committed_years() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_file(&input.join("a.zip"), &portal_batch(&[Fixture::new("A", "2023-01-01")]));
    write_file(&input.join("b.zip"), &portal_batch(&[Fixture::new("B", "2024-01-01")]));

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let listener = move |e: &ProgressEvent| {
        if matches!(e, ProgressEvent::ArchiveCompleted { .. }) {
            flag.store(true, Ordering::SeqCst);
        }
    };

    let summary = Engine::new(&input, &output)
        .with_cancel_flag(cancel)
        .run(&listener)
        .unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.processed_archives, 1);
    assert_eq!(summary.reports, vec![output.join("2023_report.xlsx")]);
    assert!(!output.join("2024_report.xlsx").exists());
    assert!(!output.join("temp").exists());
}

#[test]
fn no_archives_no_reports() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir_all(&input).unwrap();
    let output = tmp.path().join("out");

    let summary = Engine::new(&input, &output).run(&NoopListener).unwrap();
    assert_eq!(summary.total_archives, 0);
    assert!(summary.reports.is_empty());
    assert!(output.is_dir());
    assert!(!output.join("temp").exists());
}

#[test]
fn config_changes_names_and_label() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_file(&input.join("a.zip"), &portal_batch(&[Fixture::new("A", "2024-01-01")]));

    let config = EngineConfig {
        currency_label: "₺".into(),
        scratch_dir_name: ".work".into(),
        report_suffix: "-faturalar.xlsx".into(),
        ..EngineConfig::default()
    };
    let summary = Engine::new(&input, &output)
        .with_config(config)
        .run(&NoopListener)
        .unwrap();
    let report = output.join("2024-faturalar.xlsx");
    assert_eq!(summary.reports, vec![report.clone()]);
    assert!(zip_part(&report, "xl/worksheets/sheet3.xml").contains("100.00 ₺"));
    assert!(!output.join(".work").exists());
}

#[test]
fn config_round_trips_through_json() {
    let json = r#"{"currency_label":"TRY","max_nesting_depth":3}"#;
    let config: EngineConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.currency_label, "TRY");
    assert_eq!(config.max_nesting_depth, 3);
    assert_eq!(config.home_currency, "TRY");
    assert_eq!(config.scratch_dir_name, "temp");

    let back: EngineConfig = serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
    assert_eq!(back, config);
}
