use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn record(id: &str, headline: &str, content: &str) -> Value {
    json!({
        "id": id,
        "lead": format!("{headline}, reports say."),
        "content": content,
        "date": "Tue, 04 Jun 2024 09:30:00 +1000",
        "image": "https://img.example.com/a.jpg",
        "dot_points": [headline, "Second point"],
        "sources": [
            {"title": "Wire", "url": "https://news.example.com/story"},
            {"title": "Short", "url": "https://t.co/abc"}
        ],
        "quotes": [{"text": "We are pleased.", "speaker": "Chief executive"}]
    })
}

fn truncated_payload() -> String {
    let first = record(
        "1",
        "Airline adds four international routes",
        "The airline added four international routes to meet holiday demand.",
    );
    let second = record(
        "2",
        "Bank lifts deposit rates",
        "The bank lifted deposit rates across its savings products on Monday.",
    );
    format!(r#"[{first},{second},{{"id":"3","content":"partial tex"#)
}

fn write_input(home: &Path, inner: &str) {
    fs::create_dir_all(home).expect("mkdir home");
    let outer = json!({ "ai_response": inner });
    fs::write(home.join("ai-output.json"), outer.to_string()).expect("write input");
}

fn read_store(home: &Path) -> Value {
    let raw = fs::read_to_string(home.join("DB.json")).expect("read store");
    serde_json::from_str(&raw).expect("store json")
}

fn store_ids(store: &Value) -> Vec<String> {
    store["articles"]
        .as_array()
        .expect("articles")
        .iter()
        .map(|a| a["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn ingest_salvages_truncated_payload_into_a_new_store() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .success()
        .stdout(predicate::str::contains("input.repaired=true"))
        .stdout(predicate::str::contains("records.seen=3"))
        .stdout(predicate::str::contains("records.invalid=1"))
        .stdout(predicate::str::contains("records.merged=2"));

    let store = read_store(&home);
    assert_eq!(store_ids(&store), vec!["1", "2"]);
    let first = &store["articles"][0];
    assert_eq!(first["title"], "Airline adds four international routes");
    assert_eq!(first["category"], "Business");
    assert_eq!(first["date"], "2024-06-04");
    assert_eq!(first["sources"].as_array().expect("sources").len(), 1);
    assert_eq!(store["articles"][1]["category"], "Financial");

    let audit = fs::read_to_string(home.join("logs/audit.log")).expect("audit log");
    assert!(audit.contains("\"command\":\"ingest\""));
    assert!(audit.contains("\"status\":\"ok\""));
}

#[test]
fn second_ingest_of_the_same_payload_leaves_store_bytes_identical() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .success();
    let before = fs::read(home.join("DB.json")).expect("store bytes");

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .success()
        .stdout(predicate::str::contains("records.duplicate=2"))
        .stdout(predicate::str::contains("store.changed=false"));

    let after = fs::read(home.join("DB.json")).expect("store bytes");
    assert_eq!(before, after);
}

#[test]
fn new_articles_are_prepended_and_unknown_store_keys_survive() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());
    fs::write(
        home.join("DB.json"),
        json!({
            "updated": "2024-06-01",
            "articles": [
                {"id": "C", "title": "Retailer opens flagship store", "content": "The retailer opened a flagship store in the city centre."},
                {"id": "D", "title": "Miner posts record output", "content": "Iron ore output hit a record in the June quarter."}
            ]
        })
        .to_string(),
    )
    .expect("seed store");

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .success();

    let store = read_store(&home);
    assert_eq!(store_ids(&store), vec!["1", "2", "C", "D"]);
    assert_eq!(store["updated"], "2024-06-01");
    let raw = fs::read_to_string(home.join("DB.json")).expect("read store");
    assert!(raw.starts_with("{\n    \"articles\": ["));
    assert!(raw.ends_with("}\n"));
}

#[test]
fn unrecoverable_payload_fails_and_leaves_store_untouched() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, r#"[{"id":"1","content":tru},{"id":"2","content":"x"}]"#);
    let seeded = "{\"articles\": []}\n";
    fs::write(home.join("DB.json"), seeded).expect("seed store");

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("stage=repair"))
        .stderr(predicate::str::contains("unrecoverable JSON"));

    let after = fs::read_to_string(home.join("DB.json")).expect("store");
    assert_eq!(after, seeded);
    let audit = fs::read_to_string(home.join("logs/audit.log")).expect("audit log");
    assert!(audit.contains("\"status\":\"failed\""));
}

#[test]
fn corrupt_store_is_never_overwritten() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());
    fs::write(home.join("DB.json"), "{\"articles\": [").expect("seed store");

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("stage=load"));

    let after = fs::read_to_string(home.join("DB.json")).expect("store");
    assert_eq!(after, "{\"articles\": [");
}

#[test]
fn dry_run_reports_without_writing() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .args(["ingest", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("records.merged=2"))
        .stdout(predicate::str::contains("dry_run=true"));

    assert!(!home.join("DB.json").exists());
}

#[test]
fn out_of_range_threshold_is_rejected_before_any_work() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .env("APODICTIC_TITLE_THRESHOLD", "1.5")
        .arg("ingest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid title threshold"));

    assert!(!home.join("DB.json").exists());
}

#[test]
fn missing_input_is_reported_as_a_load_failure() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    fs::create_dir_all(&home).expect("mkdir home");

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .arg("ingest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("stage=load"))
        .stderr(predicate::str::contains("stage=repair").not());
}

#[test]
fn malformed_threshold_override_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("apodictic");
    write_input(&home, &truncated_payload());

    assert_cmd::cargo::cargo_bin_cmd!("apodictic")
        .current_dir(tmp.path())
        .env("APODICTIC_HOME", &home)
        .env("APODICTIC_TITLE_THRESHOLD", "0,9")
        .arg("ingest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("APODICTIC_TITLE_THRESHOLD"));

    assert!(!home.join("DB.json").exists());
}
