//! End-to-end tests for the tagtree CLI
//!
//! Every test runs in its own temporary directory, which also stands in for
//! the home directory so no user configuration is picked up.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEMPLATE: &str = "\
Ambient
    Ambient::genre
    Dark Ambient
        Dark Ambient::genre
        Ritual Ambient::genre
    Tribal Ambient::genre
Electronic
    Electronic::genre
    Space Ambient::genre
";

/// Get a Command for the tagtree binary, isolated in `dir`
#[allow(deprecated)]
fn tagtree(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tagtree").expect("Failed to find tagtree binary");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("TAGTREE_DATABASE")
        .env_remove("TAGTREE_CONFIG");
    cmd
}

/// Create `genres.thdb` in a fresh directory, seeded from `TEMPLATE`
fn setup_database() -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let template = temp.path().join("hierarchy.txt");
    std::fs::write(&template, TEMPLATE).unwrap();
    let db = temp.path().join("genres.thdb");

    tagtree(temp.path())
        .args(["create", "genres.thdb", "--template", "hierarchy.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Created 'genres' with 6 tags"));

    (temp, db)
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    let temp = TempDir::new().unwrap();
    tagtree(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("tags"))
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("--db"));
}

// ============================================================================
// Create / export / import
// ============================================================================

#[test]
fn test_create_then_export_round_trips() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "export"])
        .assert()
        .success()
        .stdout(TEMPLATE);
}

#[test]
fn test_export_to_file() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["-q", "--db", "genres.thdb", "export", "--output", "out.txt"])
        .assert()
        .success();

    let written = std::fs::read_to_string(temp.path().join("out.txt")).unwrap();
    assert_eq!(written, TEMPLATE);
}

#[test]
fn test_create_refuses_existing_file() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["create", "genres.thdb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tagtree(temp.path())
        .args(["create", "genres.thdb", "--overwrite"])
        .assert()
        .success()
        .stderr(predicate::str::contains("with 0 tags"));
}

#[test]
fn test_import_rejects_tabs() {
    let (temp, db) = setup_database();
    std::fs::write(temp.path().join("bad.txt"), "Drone\n\tDrone::genre\n").unwrap();

    tagtree(temp.path())
        .env("TAGTREE_DATABASE", &db)
        .args(["import", "bad.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tab characters"));
}

#[test]
fn test_import_adds_tags() {
    let (temp, _) = setup_database();
    std::fs::write(
        temp.path().join("more.txt"),
        "Scenes & Movements\n    Demoscene::movement\n",
    )
    .unwrap();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "import", "more.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported 2 new tags"));

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "list", "--top-level"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenes & Movements"));
}

// ============================================================================
// Info / search
// ============================================================================

#[test]
fn test_info_json() {
    let (temp, _) = setup_database();

    let output = tagtree(temp.path())
        .args(["--db", "genres.thdb", "info", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["name"], "genres");
    assert_eq!(info["tag_count"], 6);
    assert_eq!(info["top_level_count"], 2);
    assert_eq!(info["relationship_count"], 4);
    assert_eq!(info["default_tag_bindings"], serde_json::json!(["genre"]));
}

#[test]
fn test_search_modes_and_aliases() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args([
            "--db", "genres.thdb", "tags", "edit", "Tribal Ambient", "--alias", "Ethnic Ambient",
        ])
        .assert()
        .success();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "search", "ETHN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tribal Ambient"));

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "search", "ethn", "--no-aliases"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No results found"));

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "search", "ambient", "--mode", "starts-with"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ambient (#"))
        .stdout(predicate::str::contains("Dark Ambient").not());
}

#[test]
fn test_search_json_output() {
    let (temp, _) = setup_database();

    let output = tagtree(temp.path())
        .args(["--db", "genres.thdb", "search", "ambient", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tags: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = tags.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Ambient",
            "Dark Ambient",
            "Ritual Ambient",
            "Space Ambient",
            "Tribal Ambient"
        ]
    );
}

// ============================================================================
// Tag editing
// ============================================================================

#[test]
fn test_add_show_delete() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args([
            "--db", "genres.thdb", "tags", "add", "Cosmic Drone", "-p", "Ambient", "-p",
            "Electronic", "-b", "genre", "-b", "style",
        ])
        .assert()
        .success();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "show", "Cosmic Drone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parents:   Ambient, Electronic"))
        .stdout(predicate::str::contains("bindings:  genre; style"));

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "children", "Electronic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cosmic Drone"));

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "delete", "Cosmic Drone"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Deleted 'Cosmic Drone'"));
}

#[test]
fn test_delete_with_children_fails() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "delete", "Dark Ambient"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("child tag"));
}

#[test]
fn test_add_orphan_fails() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "add", "Drone"])
        .assert()
        .failure();
}

#[test]
fn test_add_uses_default_bindings() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "settings", "set", "default_tag_bind", "genre;mood"])
        .assert()
        .success();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "add", "Drone", "-p", "Ambient"])
        .assert()
        .success();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "tags", "show", "Drone", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mood\""));
}

// ============================================================================
// Settings / config
// ============================================================================

#[test]
fn test_settings_list_and_required_keys() {
    let (temp, _) = setup_database();

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "settings", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_tag_bind = genre"))
        .stdout(predicate::str::contains("version = 2"));

    tagtree(temp.path())
        .args(["--db", "genres.thdb", "settings", "delete", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_missing_database_argument() {
    let temp = TempDir::new().unwrap();

    tagtree(temp.path())
        .args(["tags", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No database given"));
}

#[test]
fn test_config_default_database_and_bindings() {
    let (temp, _) = setup_database();
    let config_dir = temp.path().join(".tagtree");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[storage]\ndefault_database = \"genres.thdb\"\n\n[tags]\ndefault_bindings = [\"style\"]\n",
    )
    .unwrap();

    tagtree(temp.path())
        .args(["info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tags:           6"));

    tagtree(temp.path())
        .args(["-q", "create", "fresh.thdb"])
        .assert()
        .success();

    tagtree(temp.path())
        .args(["--db", "fresh.thdb", "settings", "get", "default_tag_bind"])
        .assert()
        .success()
        .stdout("style\n");
}

#[test]
fn test_config_init_and_show() {
    let temp = TempDir::new().unwrap();

    tagtree(temp.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(temp.path().join(".tagtree/config.toml").exists());

    tagtree(temp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[search]"))
        .stdout(predicate::str::contains("mode = \"fuzzy\""));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

    tagtree(temp.path())
        .args(["--config", "broken.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("logging.level: unknown level 'loud'"));
}

#[test]
fn test_global_flags_override_config() {
    let temp = TempDir::new().unwrap();

    tagtree(temp.path())
        .args(["--journal-mode", "wal", "-v", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("journal_mode = \"wal\""))
        .stdout(predicate::str::contains("level = \"debug\""));

    tagtree(temp.path())
        .args(["--quiet", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("level = \"error\""));

    tagtree(temp.path())
        .args(["--journal-mode", "truncate", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown journal mode"));
}
