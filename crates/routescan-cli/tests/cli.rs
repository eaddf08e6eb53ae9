use std::fs;

use std::path::Path;

use assert_cmd::Command;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;
use tempfile::TempDir;

fn routescan(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("routescan").unwrap();
    cmd.current_dir(workdir.path())
        .env_remove("RUST_LOG")
        // Any OCR attempt would fail loudly instead of finding a real engine.
        .env("ROUTESCAN_TESSERACT", "/nonexistent/tesseract")
        .env("ROUTESCAN_PDFTOPPM", "/nonexistent/pdftoppm");
    cmd
}

#[test]
fn missing_pdf_dir_fails_before_extraction() {
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("queries.csv"), "RouteID,LocationNumber\n12345678,1234\n").unwrap();

    routescan(&work)
        .args(["run", "no_such_dir", "queries.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    assert!(!work.path().join("route_id_mapping.csv").exists());
}

#[test]
fn missing_query_csv_fails_before_extraction() {
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("pdfs")).unwrap();

    routescan(&work)
        .args(["run", "pdfs", "queries.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    assert!(!work.path().join("route_id_mapping.csv").exists());
}

#[test]
fn no_valid_queries_fails_before_extraction() {
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("pdfs")).unwrap();
    fs::write(
        work.path().join("queries.csv"),
        "RouteID,LocationNumber\n1234567,1234\nabcdefgh,12345\n,\n",
    )
    .unwrap();

    routescan(&work)
        .args(["run", "pdfs", "queries.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No valid queries"));

    assert!(!work.path().join("route_id_mapping.csv").exists());
}

#[test]
fn run_on_empty_directory_writes_header_only_table() {
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("pdfs")).unwrap();
    fs::write(work.path().join("queries.csv"), "RouteID,LocationNumber\n12345678,1234\n").unwrap();

    routescan(&work)
        .args(["run", "pdfs", "queries.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found in any PDF"));

    let table = fs::read_to_string(work.path().join("route_id_mapping.csv")).unwrap();
    assert_eq!(table.trim(), "RouteID,LocationNumber,StoreName,PDF,PageNumber");
}

/// A text-only PDF with one labelled page per entry.
fn write_pdf(path: &Path, labels: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for label in labels {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

#[test]
fn query_exports_matched_page_without_overwriting() {
    let work = TempDir::new().unwrap();
    fs::create_dir_all(work.path().join("scans/north")).unwrap();
    write_pdf(&work.path().join("scans/north/manifest.pdf"), &["cover", "Route 12345678"]);
    fs::write(
        work.path().join("table.csv"),
        "RouteID,LocationNumber,StoreName,PDF,PageNumber\n12345678,1234,Depot,north/manifest.pdf,2\n",
    )
    .unwrap();
    // The same query twice exports the page twice.
    fs::write(
        work.path().join("queries.csv"),
        "RouteID,LocationNumber\n12345678,1234\n12345678,1234\n",
    )
    .unwrap();

    routescan(&work)
        .args(["query", "table.csv", "queries.csv", "--pdf-dir", "scans"])
        .assert()
        .success()
        .stdout(predicate::str::contains("found in the following locations"))
        .stdout(predicate::str::contains("2 pages exported"));

    let matched = work.path().join("matched_pages");
    let first = matched.join("12345678 - 1234.pdf");
    let second = matched.join("12345678 - 1234 (1).pdf");
    assert_eq!(page_count(&first), 1);
    assert_eq!(page_count(&second), 1);
    assert_eq!(fs::read_dir(&matched).unwrap().count(), 2);
    assert_eq!(page_count(&work.path().join("scans/north/manifest.pdf")), 2);
}

#[test]
fn extract_writes_spreadsheet_table() {
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("pdfs")).unwrap();

    routescan(&work)
        .args(["extract", "pdfs", "-o", "route_id_mapping.xlsx"])
        .assert()
        .success();

    let table = work.path().join("route_id_mapping.xlsx");
    // XLSX workbooks are zip archives.
    assert_eq!(&fs::read(&table).unwrap()[..2], b"PK");

    fs::write(work.path().join("queries.csv"), "RouteID,LocationNumber\n12345678,1234\n").unwrap();
    routescan(&work)
        .args(["query", "route_id_mapping.xlsx", "queries.csv", "--pdf-dir", "pdfs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 0 records"));
}

#[test]
fn query_exports_nothing_for_unmatched_table() {
    let work = TempDir::new().unwrap();
    fs::write(
        work.path().join("table.csv"),
        "RouteID,LocationNumber,StoreName,PDF,PageNumber\n11112222,0001,Depot,a.pdf,1\n",
    )
    .unwrap();
    fs::write(work.path().join("queries.csv"), "RouteID,LocationNumber\n12345678,1234\n").unwrap();

    routescan(&work)
        .args(["query", "table.csv", "queries.csv", "--pdf-dir", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 1 records"))
        .stdout(predicate::str::contains("not found in any PDF"));
}

#[test]
fn log_file_is_appended() {
    let work = TempDir::new().unwrap();

    for _ in 0..2 {
        routescan(&work)
            .args(["run", "missing", "missing.csv"])
            .assert()
            .failure();
    }

    let log = fs::read_to_string(work.path().join("routescan.log")).unwrap();
    assert_eq!(log.matches("does not exist").count(), 2);
}

#[test]
fn config_show_reflects_flags() {
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("config.json"), r#"{"batch": {"max_workers": 2}}"#).unwrap();

    routescan(&work)
        .args(["-c", "config.json", "--pdftoppm", "/opt/poppler/pdftoppm", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_workers\": 2"))
        .stdout(predicate::str::contains("/opt/poppler/pdftoppm"))
        .stdout(predicate::str::contains("/nonexistent/tesseract"));
}
