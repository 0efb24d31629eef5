mod common;

use std::fs::{create_dir_all, write};

use apkeep::documents::DocumentSet;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn loads_fixture_archive() {
    let documents = common::load_testdata();

    let alice = documents
        .iter()
        .find(|doc| doc.get("id") == Some(&json!("https://localhost/Alice")))
        .expect("Alice should be among the loaded documents");
    assert_eq!(alice["type"], "Person");
    assert_eq!(documents.len(), 3);
}

#[test]
fn find_by_id_returns_matching_document() {
    let documents = common::load_testdata();

    let alice = documents
        .find_by_id("https://localhost/Alice")
        .expect("Alice exists");
    assert_eq!(alice["id"], "https://localhost/Alice");
    assert_eq!(alice["name"], "Alice");

    // Aliased ids are found as well.
    let bt = documents
        .find_by_id("https://localhost/bt_mcexample")
        .expect("aliased id should resolve");
    assert_eq!(bt["name"], "Bt McExample");
}

#[test]
fn find_by_id_missing_returns_none() {
    let documents = common::load_testdata();
    assert!(documents.find_by_id("nosuchid").is_none());
    assert!(DocumentSet::default().find_by_id("nosuchid").is_none());
}

#[test]
fn find_by_id_first_match_wins() {
    let documents = DocumentSet::new(vec![
        json!({"id": "dup", "name": "first"}),
        json!({"@id": "dup", "name": "second"}),
    ]);
    assert_eq!(documents.find_by_id("dup").unwrap()["name"], "first");
}

#[test]
fn find_persons_is_restartable_and_ordered() {
    let documents = DocumentSet::new(vec![
        json!({"id": "https://a.example/p1", "type": "Person"}),
        json!({"id": "https://a.example/n1", "type": "Note"}),
        json!({"type": "Person", "name": "no id"}),
        json!({"@id": "https://a.example/p2", "@type": "Person"}),
    ]);

    let first: Vec<&str> = documents.find_persons().collect();
    assert_eq!(first, vec!["https://a.example/p1", "https://a.example/p2"]);

    let second: Vec<&str> = documents.find_persons().collect();
    assert_eq!(first, second, "each call should start a fresh pass");
}

#[test]
fn invalid_file_is_skipped_and_logged() {
    let tmp = tempdir().unwrap();
    let nested = tmp.path().join("nested/deeper");
    create_dir_all(&nested).unwrap();
    write(
        nested.join("good.json"),
        r#"{"id": "https://localhost/good", "type": "Note"}"#,
    )
    .unwrap();
    write(tmp.path().join("bad.json"), "{ this is not json").unwrap();
    write(tmp.path().join("notes.txt"), r#"{"id": "ignored"}"#).unwrap();

    let (documents, event_msgs) =
        common::collect_events(|| DocumentSet::load_from_dir(Some(tmp.path())));

    assert_eq!(documents.len(), 1);
    assert!(documents.find_by_id("https://localhost/good").is_some());
    assert!(documents.find_by_id("ignored").is_none());

    assert!(
        event_msgs
            .iter()
            .any(|msg| msg.contains("Problem decoding file as JSON") && msg.contains("bad.json")),
        "Expected a diagnostic for bad.json, got: {:?}",
        event_msgs
    );
}

#[test]
fn empty_directory_yields_empty_set() {
    let tmp = tempdir().unwrap();
    let documents = DocumentSet::load_from_dir(Some(tmp.path()));
    assert!(documents.is_empty());
    assert_eq!(documents.find_persons().count(), 0);
}

#[test]
fn missing_directory_yields_empty_set() {
    let tmp = tempdir().unwrap();
    let documents = DocumentSet::load_from_dir(Some(&tmp.path().join("does-not-exist")));
    assert!(documents.is_empty());
}
