use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PAGE: &str = r#"<!DOCTYPE html><html><body>
<a href="/search?q=Joe%27s+Pizza&amp;ludocid=12345">
  <span aria-label="Rated 4.5 out of 5">4.5</span> · $ · Pizza
  <img src="https://lh3.googleusercontent.com/p/joes">
</a>
<a href="/search?q=Lucali&amp;ludocid=678">
  <span aria-label="Rated 4.7 out of 5">4.7</span> · $$ · Pizza, Italian
  <img src="https://lh3.googleusercontent.com/p/lucali">
</a>
<a href="/search?q=Ghost+Kitchen&amp;ludocid=9">no picture</a>
</body></html>"#;

const CARDS: &str = r#"<!DOCTYPE html><html><body>
<div role="article" aria-label="Lucali">
  <a href="https://www.google.com/maps/place/Lucali/data=!3d40.6818!4d-73.9997">Lucali</a>
  <span role="img" aria-label="4.7 stars 2,100 Reviews"></span>
  <span>Pizza · $$</span>
  <img src="https://lh3.googleusercontent.com/p/lucali">
</div>
</body></html>"#;

fn dinemap_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dinemap"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("page.html"), PAGE).unwrap();
    fs::write(root.join("cards.html"), CARDS).unwrap();

    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:0"

[store]
backend = "filesystem"
path = "{}/data"
"#,
        root.display()
    );

    let config_path = config_dir.join("dinemap.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dinemap(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dinemap_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dinemap binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn page(tmp: &TempDir, name: &str) -> String {
    tmp.path().join(name).to_string_lossy().into_owned()
}

#[test]
fn test_extract_prints_records_and_drops() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dinemap(&config_path, &["extract", &page(&tmp, "page.html")]);
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("strategy: search_anchors"));
    assert!(stdout.contains("records: 2"));
    assert!(stdout.contains("Joe's Pizza"));
    assert!(stdout.contains("dropped: 1"));
    assert!(stdout.contains("Ghost Kitchen: no image on the provider CDN"));
    assert!(stdout.contains("ok"));

    // Dry run: nothing written.
    assert!(!tmp.path().join("data").join("restaurants_list.json").exists());
}

#[test]
fn test_extract_with_strategy_override() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dinemap(
        &config_path,
        &["extract", &page(&tmp, "cards.html"), "--strategy", "place_cards"],
    );
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("strategy: place_cards"));
    assert!(stdout.contains("records: 1"));
    assert!(stdout.contains("Lucali | 4.7 | $$"));
}

#[test]
fn test_extract_rejects_unknown_strategy() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_dinemap(
        &config_path,
        &["extract", &page(&tmp, "page.html"), "--strategy", "guess"],
    );
    assert!(!success);
    assert!(stderr.contains("Unknown extraction strategy"), "stderr={}", stderr);
}

#[test]
fn test_extract_works_without_config_file() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("nope.toml");

    let (stdout, _, success) = run_dinemap(&missing, &["extract", &page(&tmp, "page.html")]);
    assert!(success);
    assert!(stdout.contains("records: 2"));
}

#[test]
fn test_import_then_list() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dinemap(&config_path, &["import", &page(&tmp, "page.html")]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("added: 2"));
    assert!(stdout.contains("total: 2"));
    assert!(tmp.path().join("data").join("restaurants_list.json").exists());

    let (stdout, stderr, success) = run_dinemap(&config_path, &["list"]);
    assert!(success, "list failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("records: 2"));
    assert!(stdout.contains("rejected: 0"));
    assert!(stdout.contains("Lucali | Pizza | 4.7"));
    assert!(!stdout.contains("updated: never"));
}

#[test]
fn test_reimport_reports_nothing_new() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_dinemap(&config_path, &["import", &page(&tmp, "page.html")]);
    assert!(success);

    let (_, stderr, success) = run_dinemap(&config_path, &["import", &page(&tmp, "page.html")]);
    assert!(!success, "second import should fail");
    assert!(stderr.contains("No new restaurants found."), "stderr={}", stderr);

    let (stdout, _, _) = run_dinemap(&config_path, &["list"]);
    assert!(stdout.contains("records: 2"));
}

#[test]
fn test_list_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_dinemap(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("records: 0"));
    assert!(stdout.contains("updated: never"));
}

#[test]
fn test_list_requires_valid_config() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[auth]\ntoken_ttl_secs = 0\n").unwrap();

    let (_, stderr, success) = run_dinemap(&bad, &["list"]);
    assert!(!success);
    assert!(stderr.contains("token_ttl_secs"), "stderr={}", stderr);
}
