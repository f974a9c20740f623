//! Integration tests for REX CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use rex::cli::{
    cmd_export, cmd_fork, cmd_import, cmd_init, cmd_publish, cmd_save, cmd_show, cmd_status,
};
use rex::config::Config;
use rex::error::AppError;
use rex_core::{PostId, PostStatus, RexError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn test_config() -> Config {
    Config::from_json(
        r#"{
            "users": [
                {"id": 1, "login": "admin", "roles": ["administrator"]},
                {"id": 2, "login": "editor", "roles": ["editor"]},
                {"id": 3, "login": "contributor", "roles": ["contributor"]}
            ]
        }"#,
    )
    .unwrap()
}

/// Write a Save `data` file.
fn write_data(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Create a published post as admin; returns its id.
fn seed_published(dir: &TempDir, db: &Path, backend: &str) -> u64 {
    let data = write_data(
        dir,
        "seed.json",
        r#"{"post_title": "v1", "post_content": "body", "post_status": "publish"}"#,
    );
    let outcome = cmd_save(db, backend, &test_config(), "admin", None, "post", &data).unwrap();
    assert_eq!(outcome.status, PostStatus::Publish);
    outcome.id.0
}

// =============================================================================
// INIT COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_file_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    let result = cmd_init(&db_path, "file", false);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_init_creates_redb_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.redb");

    let result = cmd_init(&db_path, "redb", false);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    cmd_init(&db_path, "file", false).unwrap();

    let result = cmd_init(&db_path, "file", false);
    assert!(result.is_err());
}

#[test]
fn test_init_succeeds_with_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    cmd_init(&db_path, "file", false).unwrap();

    let result = cmd_init(&db_path, "file", true);
    assert!(result.is_ok());
}

#[test]
fn test_init_rejects_unknown_backend() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    let result = cmd_init(&db_path, "sqlite", false);
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

// =============================================================================
// STATUS COMMAND TESTS
// =============================================================================

#[test]
fn test_status_empty_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    cmd_init(&db_path, "file", false).unwrap();

    let report = cmd_status(&db_path, "file", false).unwrap();
    assert_eq!(report.items, 0);
    assert!(report.by_status.is_empty());
}

#[test]
fn test_status_counts_staging_items() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.redb");
    cmd_init(&db_path, "redb", false).unwrap();
    let original = seed_published(&temp, &db_path, "redb");
    cmd_fork(&db_path, "redb", &test_config(), "editor", original, "draft").unwrap();

    let report = cmd_status(&db_path, "redb", true).unwrap();
    assert_eq!(report.items, 2);
    assert_eq!(report.by_status.get("publish"), Some(&1));
    assert_eq!(report.by_status.get("draft"), Some(&1));
    assert_eq!(report.staging_items, 1);
}

// =============================================================================
// ENGINE COMMAND TESTS
// =============================================================================

#[test]
fn test_fork_save_publish_file_backend() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    let config = test_config();
    cmd_init(&db_path, "file", false).unwrap();
    let original = seed_published(&temp, &db_path, "file");

    let fork = cmd_fork(&db_path, "file", &config, "editor", original, "draft").unwrap();
    assert_eq!(fork.original_post_id, Some(PostId(original)));

    let data = write_data(
        &temp,
        "v2.json",
        &format!(
            r#"{{"post_title": "v2", "expected_modified_gmt": "{}"}}"#,
            fork.modified_gmt
        ),
    );
    let saved = cmd_save(
        &db_path,
        "file",
        &config,
        "editor",
        Some(fork.id.0),
        "post",
        &data,
    )
    .unwrap();
    assert!(!saved.forked);
    assert_eq!(saved.id, fork.id);

    let published = cmd_publish(&db_path, "file", &config, "editor", fork.id.0).unwrap();
    assert_eq!(published.published_id, PostId(original));
    assert!(published.used_original);

    let view = cmd_show(&db_path, "file", &config, "editor", original).unwrap();
    assert_eq!(view.title, "v2");
    assert_eq!(view.status, PostStatus::Publish);
}

#[test]
fn test_unknown_user_rejected() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    cmd_init(&db_path, "file", false).unwrap();

    let result = cmd_fork(&db_path, "file", &test_config(), "nobody", 1, "draft");
    assert!(matches!(result, Err(AppError::UnknownUser(login)) if login == "nobody"));
}

#[test]
fn test_contributor_publish_forbidden() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    let config = test_config();
    cmd_init(&db_path, "file", false).unwrap();

    let data = write_data(&temp, "draft.json", r#"{"post_title": "mine"}"#);
    let draft = cmd_save(&db_path, "file", &config, "contributor", None, "post", &data).unwrap();

    let result = cmd_publish(&db_path, "file", &config, "contributor", draft.id.0);
    assert!(matches!(result, Err(AppError::Rex(RexError::Forbidden(_)))));
}

#[test]
fn test_save_invalid_json() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    cmd_init(&db_path, "file", false).unwrap();

    let bad = write_data(&temp, "bad.json", "not valid json");
    let result = cmd_save(&db_path, "file", &test_config(), "admin", None, "post", &bad);
    assert!(matches!(result, Err(AppError::Json(_))));
}

#[test]
fn test_show_missing_item() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    cmd_init(&db_path, "file", false).unwrap();

    let result = cmd_show(&db_path, "file", &test_config(), "admin", 999);
    assert!(matches!(
        result,
        Err(AppError::Rex(RexError::NotFound(PostId(999))))
    ));
}

// =============================================================================
// EXPORT / IMPORT COMMAND TESTS
// =============================================================================

#[test]
fn test_export_import_canonical_across_backends() {
    let temp = create_temp_dir();
    let source = temp.path().join("source.db");
    let target = temp.path().join("target.redb");
    let export = temp.path().join("export.rex");
    cmd_init(&source, "file", false).unwrap();
    let original = seed_published(&temp, &source, "file");

    cmd_export(&source, "file", &export, "canonical").unwrap();
    cmd_import(&target, "redb", &export).unwrap();

    let view = cmd_show(&target, "redb", &test_config(), "admin", original).unwrap();
    assert_eq!(view.title, "v1");
}

#[test]
fn test_export_import_json() {
    let temp = create_temp_dir();
    let source = temp.path().join("source.redb");
    let target = temp.path().join("target.db");
    let export = temp.path().join("export.json");
    cmd_init(&source, "redb", false).unwrap();
    let original = seed_published(&temp, &source, "redb");

    cmd_export(&source, "redb", &export, "json").unwrap();
    cmd_import(&target, "file", &export).unwrap();

    let report = cmd_status(&target, "file", false).unwrap();
    assert_eq!(report.items, 1);

    // Counters travel with the export: the next item gets a fresh id
    let data = write_data(&temp, "next.json", r#"{"post_title": "next"}"#);
    let next = cmd_save(&target, "file", &test_config(), "admin", None, "post", &data).unwrap();
    assert!(next.id.0 > original);
}

#[test]
fn test_export_is_deterministic() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    let first = temp.path().join("first.rex");
    let second = temp.path().join("second.rex");
    cmd_init(&db_path, "file", false).unwrap();
    seed_published(&temp, &db_path, "file");

    cmd_export(&db_path, "file", &first, "canonical").unwrap();
    cmd_export(&db_path, "file", &second, "canonical").unwrap();
    assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
}

#[test]
fn test_export_invalid_format() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    cmd_init(&db_path, "file", false).unwrap();

    let result = cmd_export(&db_path, "file", &temp.path().join("out"), "xml");
    assert!(result.is_err());
}

#[test]
fn test_import_refuses_non_empty_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");
    let export = temp.path().join("export.rex");
    cmd_init(&db_path, "file", false).unwrap();
    seed_published(&temp, &db_path, "file");
    cmd_export(&db_path, "file", &export, "canonical").unwrap();

    let result = cmd_import(&db_path, "file", &export);
    assert!(result.is_err());
}
