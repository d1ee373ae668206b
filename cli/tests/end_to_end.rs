use search_cli::{build_index, discover_documents, index_documents, read_documents, render_json, render_stats, render_text};
use search_core::persist::{load, save};
use search_core::{query, IndexFormat, SearchOutcome};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_fixture(dir: &Path) {
    fs::write(dir.join("f1.txt"), "apple banana apple").unwrap();
    fs::write(dir.join("f2.txt"), "banana cherry").unwrap();
}

#[test]
fn two_file_scenario() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let run = build_index(dir.path(), 1).unwrap();
    assert_eq!(run.index.doc_count(), 2);
    assert!(run.index.doc_path(0).ends_with("f1.txt"));

    let index_file = dir.path().join("index.dat");
    save(&run.index, &index_file, IndexFormat::Text).unwrap();
    let (loaded, _) = load(&index_file).unwrap();

    // N = 2, df(apple) = 1: idf = ln(2 / 2) = 0
    let hits = query(&loaded, "apple").into_hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, 0);
    assert_eq!(hits[0].score, 0.0);

    // df(banana) = 2: both documents score ln(2 / 3), tie broken by id
    let hits = query(&loaded, "banana").into_hits();
    let expected = (2.0f64 / 3.0).ln();
    assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![0, 1]);
    assert!(hits.iter().all(|h| (h.score - expected).abs() < 1e-12));
}

#[test]
fn discovery_is_recursive_and_filters_extension() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();
    fs::write(dir.path().join("a.md"), "not indexed").unwrap();
    fs::write(dir.path().join("nested/deeper/c.txt"), "c").unwrap();
    fs::create_dir_all(dir.path().join("folder.txt")).unwrap();

    let files = discover_documents(dir.path());
    let names: Vec<String> = files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, vec!["b.txt", "c.txt"]);
}

#[test]
fn unreadable_documents_are_skipped_without_gaps() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let paths = vec![dir.path().join("f1.txt"), dir.path().join("missing.txt"), dir.path().join("f2.txt")];
    let docs = read_documents(&paths);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].doc_id, 1);
    assert!(docs[1].path.ends_with("f2.txt"));
}

#[test]
fn worker_count_does_not_change_the_index() {
    let dir = tempdir().unwrap();
    for i in 0..25 {
        fs::write(dir.path().join(format!("doc{i:02}.txt")), format!("shared word{i} {}", "rare ".repeat(i % 4))).unwrap();
    }
    let docs = read_documents(&discover_documents(dir.path()));
    let single = index_documents(&docs, 1).unwrap();
    for workers in [2, 3, 8, 64] {
        assert_eq!(index_documents(&docs, workers).unwrap(), single);
    }
    assert_eq!(single.lookup("shared").len(), 25);
}

#[test]
fn build_index_rejects_missing_folder() {
    let dir = tempdir().unwrap();
    assert!(build_index(&dir.path().join("absent"), 2).is_err());
}

#[test]
fn renders_json_and_text() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("quote \"me\".txt"), "kiwi kiwi").unwrap();
    fs::write(dir.path().join("x.txt"), "plum").unwrap();
    fs::write(dir.path().join("y.txt"), "plum").unwrap();
    let run = build_index(dir.path(), 2).unwrap();
    let outcome = query(&run.index, "Kiwi");

    let json: Value = serde_json::from_str(&render_json("Kiwi", &outcome).unwrap()).unwrap();
    assert_eq!(json["query"], "Kiwi");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["docid"], 0);
    assert!(results[0]["path"].as_str().unwrap().ends_with("quote \"me\".txt"));
    assert!((results[0]["score"].as_f64().unwrap() - 2.0 * (3.0f64 / 2.0).ln()).abs() < 1e-12);
    assert!(json.get("empty_index").is_none());

    let text = render_text(&outcome);
    assert!(text.starts_with("doc 0 score="));
    assert_eq!(render_text(&query(&run.index, "durian")), "No results.\n");
    assert_eq!(render_text(&SearchOutcome::EmptyIndex), "Index is empty.\n");
    let empty: Value = serde_json::from_str(&render_json("x", &SearchOutcome::EmptyIndex).unwrap()).unwrap();
    assert_eq!(empty["empty_index"], true);
    assert_eq!(empty["results"].as_array().unwrap().len(), 0);
}

#[test]
fn stats_report_document_lengths() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let run = build_index(dir.path(), 1).unwrap();
    let index_file = dir.path().join("index.dat");
    save(&run.index, &index_file, IndexFormat::Text).unwrap();
    let (loaded, report) = load(&index_file).unwrap();

    let summary = render_stats(&loaded, &report, false);
    assert!(summary.contains("documents: 2\n"));
    assert!(summary.contains("terms: 3\n"));
    assert!(summary.contains("postings: 4\n"));
    assert!(summary.contains("tokens: 5\n"));
    assert!(summary.contains("doc length: avg 2.50, max 3\n"));

    let detailed = render_stats(&loaded, &report, true);
    let rows: Vec<&str> = detailed.lines().skip(summary.lines().count()).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("0 3 ") && rows[0].ends_with("f1.txt"));
    assert!(rows[1].starts_with("1 2 ") && rows[1].ends_with("f2.txt"));
}

fn bin() -> Command { Command::new(env!("CARGO_BIN_EXE_search_engine")) }

#[test]
fn binary_indexes_and_queries() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    write_fixture(&corpus);
    let index_file = dir.path().join("index.dat");

    let out = bin().arg("index").arg(&corpus).arg(&index_file).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("Indexed 2 documents"));

    let out = bin().arg("query").arg(&index_file).args(["cherry", "apple"]).output().unwrap();
    assert!(out.status.success());
    let json: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["query"], "cherry apple");
    assert_eq!(json["results"].as_array().unwrap().len(), 2);

    let out = bin().arg("query").arg(&index_file).arg("cherry").args(["--output", "text"]).output().unwrap();
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("doc 1 score=0 path="));
}

#[test]
fn binary_usage_errors_exit_with_one() {
    let out = bin().output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());

    assert_eq!(bin().arg("frobnicate").output().unwrap().status.code(), Some(1));
    assert_eq!(bin().args(["query", "index.dat"]).output().unwrap().status.code(), Some(1));
    assert_eq!(bin().args(["index", "folder"]).output().unwrap().status.code(), Some(1));
}

#[test]
fn binary_reports_missing_index_file() {
    let dir = tempdir().unwrap();
    let out = bin().arg("query").arg(dir.path().join("nope.dat")).arg("apple").output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.dat"));
}
