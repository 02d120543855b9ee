use chrono::{Duration, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn fedreg_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fedreg"))
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/fedreg.sqlite"

[server]
bind = "127.0.0.1:8765"

[logging]
level = "warn"
ansi = false
"#,
        root.display()
    );
    let config_path = config_dir.join("fedreg.toml");
    fs::write(&config_path, config_content).unwrap();

    let recent_eo_date = (Local::now().date_naive() - Duration::days(3)).to_string();
    let documents = serde_json::json!([
        {
            "document_number": "2024-00101",
            "type": "Rule",
            "title": "Air Quality Standards for Ozone",
            "publication_date": "2024-01-10",
            "abstract": "Revises the ozone standard.",
            "html_url": "https://example.gov/2024-00101",
            "agencies": ["Environmental Protection Agency"],
            "topics": ["Air Quality", "Ozone"]
        },
        {
            "document_number": "2024-00102",
            "type": "Notice",
            "title": "Energy Efficiency Program",
            "publication_date": "2024-01-20",
            "agencies": ["Department of Energy"],
            "topics": ["Energy Efficiency"]
        },
        {
            "document_number": "2024-00103",
            "type": "Executive Order",
            "title": "Advancing Climate Resilience",
            "publication_date": recent_eo_date,
            "presidential_document_type": "Executive Order",
            "executive_order_number": "14100",
            "agencies": ["Executive Office of the President"]
        },
        {
            "document_number": "2023-00999",
            "type": "Executive Order",
            "title": "An Older Order",
            "publication_date": "2023-06-01",
            "presidential_document_type": "Executive Order",
            "executive_order_number": "14000",
            "agencies": ["Executive Office of the President"]
        }
    ]);
    let data_path = root.join("documents.json");
    fs::write(&data_path, serde_json::to_string_pretty(&documents).unwrap()).unwrap();

    (tmp, config_path, data_path)
}

fn run_fedreg(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = fedreg_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run fedreg binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn setup_loaded_env() -> (TempDir, PathBuf) {
    let (tmp, config_path, data_path) = setup_test_env();
    let (_, stderr, success) = run_fedreg(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    let (_, stderr, success) = run_fedreg(&config_path, &["import", data_path.to_str().unwrap()]);
    assert!(success, "import failed: {}", stderr);
    (tmp, config_path)
}

#[test]
fn test_init_is_idempotent() {
    let (tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_fedreg(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data/fedreg.sqlite").exists());

    let (_, stderr, success) = run_fedreg(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_import_twice_inserts_nothing_new() {
    let (_tmp, config_path, data_path) = setup_test_env();
    let file = data_path.to_str().unwrap();

    let (stdout, stderr, success) = run_fedreg(&config_path, &["import", file]);
    assert!(success, "import failed: {}", stderr);
    assert!(stdout.contains("Imported 4 documents (4 new)"), "{}", stdout);

    let (stdout, _, success) = run_fedreg(&config_path, &["import", file]);
    assert!(success);
    assert!(stdout.contains("Imported 4 documents (0 new)"), "{}", stdout);
}

#[test]
fn test_import_skips_malformed_records() {
    let (tmp, config_path, _) = setup_test_env();
    let mixed = tmp.path().join("mixed.json");
    fs::write(
        &mixed,
        r#"{"results": [
            {"document_number": "2024-00201", "type": "Rule", "publication_date": "2024-02-01"},
            {"document_number": "2024-00202", "publication_date": ""}
        ]}"#,
    )
    .unwrap();

    let (stdout, stderr, success) = run_fedreg(&config_path, &["import", mixed.to_str().unwrap()]);
    assert!(success, "import failed: {}", stderr);
    assert!(stdout.contains("Imported 1 documents (1 new)"), "{}", stdout);
    assert!(stdout.contains("Skipped 1 malformed documents"), "{}", stdout);
}

#[test]
fn test_search_by_agency() {
    let (_tmp, config_path) = setup_loaded_env();

    let (stdout, stderr, success) = run_fedreg(&config_path, &["search", "--agency", "protection"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("Air Quality Standards for Ozone"));
    assert!(!stdout.contains("Energy Efficiency Program"));
    assert!(stdout.contains("agencies: Environmental Protection Agency"));
}

#[test]
fn test_search_by_date_range_and_keywords() {
    let (_tmp, config_path) = setup_loaded_env();

    let (stdout, _, success) = run_fedreg(
        &config_path,
        &["search", "--from", "2024-01-15", "--to", "2024-01-31"],
    );
    assert!(success);
    assert!(stdout.contains("Energy Efficiency Program"));
    assert!(!stdout.contains("Ozone"));

    let (stdout, _, success) = run_fedreg(&config_path, &["search", "--keywords", "OZONE"]);
    assert!(success);
    assert!(stdout.contains("1. [2024-01-10] Rule / Air Quality Standards for Ozone"));
}

#[test]
fn test_search_without_matches() {
    let (_tmp, config_path) = setup_loaded_env();
    let (stdout, _, success) = run_fedreg(&config_path, &["search", "--topic", "Fisheries"]);
    assert!(success);
    assert!(stdout.contains("No documents found."));
}

#[test]
fn test_bad_date_is_rejected_by_cli() {
    let (_tmp, config_path) = setup_loaded_env();
    let (_, stderr, success) = run_fedreg(&config_path, &["search", "--from", "last week"]);
    assert!(!success);
    assert!(stderr.contains("--from"));
}

#[test]
fn test_recent_returns_newest_first() {
    let (_tmp, config_path) = setup_loaded_env();
    let (stdout, _, success) = run_fedreg(&config_path, &["recent", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("Advancing Climate Resilience"));
    assert!(!stdout.contains("2. ["));
}

#[test]
fn test_executive_orders_window() {
    let (_tmp, config_path) = setup_loaded_env();
    let (stdout, stderr, success) = run_fedreg(&config_path, &["executive-orders", "--days", "30"]);
    assert!(success, "executive-orders failed: {}", stderr);
    assert!(stdout.contains("Advancing Climate Resilience"));
    assert!(stdout.contains("executive order: 14100"));
    assert!(!stdout.contains("An Older Order"));
}

#[test]
fn test_get_document() {
    let (_tmp, config_path) = setup_loaded_env();

    let (stdout, _, success) = run_fedreg(&config_path, &["get", "1"]);
    assert!(success);
    assert!(stdout.contains("--- Document ---"));
    assert!(stdout.contains("2024-00101"));
    assert!(stdout.contains("Revises the ozone standard."));

    let (_, stderr, success) = run_fedreg(&config_path, &["get", "999"]);
    assert!(!success);
    assert!(stderr.contains("document 999 not found"));
}

#[test]
fn test_list_catalogs() {
    let (_tmp, config_path) = setup_loaded_env();

    let (stdout, _, success) = run_fedreg(&config_path, &["list", "agencies"]);
    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Department of Energy",
            "Environmental Protection Agency",
            "Executive Office of the President",
        ]
    );

    let (stdout, _, success) = run_fedreg(&config_path, &["list", "presidential-types"]);
    assert!(success);
    assert_eq!(stdout.trim(), "Executive Order");

    let (stdout, _, success) = run_fedreg(&config_path, &["list", "document-types"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_fedreg(&tmp.path().join("absent.toml"), &["recent"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
