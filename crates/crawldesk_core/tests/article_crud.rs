use crawldesk_core::db::open_db_in_memory;
use crawldesk_core::{
    Article, ArticleRepository, ErrorKind, IntegrityKind, PageRequest, QueryConfig, Record,
    RepoError, SourceRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn repo(conn: &Connection) -> ArticleRepository<'_> {
    ArticleRepository::attach(conn, QueryConfig::default())
}

fn stored_row(conn: &Connection, id: i64) -> (String, String, i64) {
    conn.query_row(
        "SELECT title, link, updated_at FROM articles WHERE id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .unwrap()
}

#[test]
fn title_link_scenario() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    let err = repo
        .create(&record(json!({"title": "", "link": "https://x"})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("title"));

    let created = repo
        .create(&record(json!({"title": "T", "link": "https://x"})))
        .unwrap();
    assert!(created.id > 0);

    let err = repo
        .update(created.id, &record(json!({"link": "https://y"})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("link"));
    assert_eq!(repo.get_or_fail(created.id).unwrap().link, "https://x");

    for n in 2..=5 {
        repo.create(&record(json!({"title": format!("T{n}"), "link": format!("https://x/{n}")})))
            .unwrap();
    }
    let page = repo
        .find_paginated(&Record::new(), &PageRequest::new(4, 2))
        .unwrap();
    assert_eq!(page.page, 3);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_next);
    assert!(page.has_prev);
}

#[test]
fn create_applies_defaults_and_normalizes_fields() {
    let conn = open_db_in_memory().unwrap();
    let article = repo(&conn)
        .create(&record(json!({
            "title": "Rust 2024",
            "link": "  https://blog.example/rust  ",
            "tags": "Rust, LLM,rust",
            "published_at": "2024-03-15T08:00:00Z",
            "unknown_key": "dropped"
        })))
        .unwrap();

    assert_eq!(article.link, "https://blog.example/rust");
    assert_eq!(article.tags, vec!["llm", "rust"]);
    assert!(!article.is_ai_related);
    assert_eq!(article.published_at, Some(1_710_489_600_000));
    assert!(article.created_at > 0);
}

#[test]
fn create_reports_every_missing_required_field() {
    let conn = open_db_in_memory().unwrap();
    let err = repo(&conn)
        .create(&record(json!({"summary": "only a summary"})))
        .unwrap_err();

    let validation = err.as_validation().unwrap();
    assert_eq!(validation.fields(), vec!["title", "link"]);
    let message = err.to_string();
    assert!(message.contains("title") && message.contains("link"));
}

#[test]
fn duplicate_link_is_an_integrity_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let payload = record(json!({"title": "T", "link": "https://dup"}));
    repo.create(&payload).unwrap();

    let err = repo.create(&payload).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Integrity {
            kind: IntegrityKind::Unique,
            ..
        }
    ));
}

#[test]
fn unknown_source_reference_is_an_integrity_error() {
    let conn = open_db_in_memory().unwrap();
    let err = repo(&conn)
        .create(&record(json!({"title": "T", "link": "https://x", "source_id": 77})))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Integrity {
            kind: IntegrityKind::ForeignKey,
            ..
        }
    ));
}

#[test]
fn read_misses_return_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    assert!(repo.get_by_id(404).unwrap().is_none());
    assert!(repo.get_by_link("https://nowhere").unwrap().is_none());
    assert_eq!(repo.get_or_fail(404).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn update_changes_only_provided_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({"title": "T", "link": "https://x", "author": "kim"})))
        .unwrap();

    let updated = repo
        .update(
            created.id,
            &record(json!({"summary": "short", "is_ai_related": 1})),
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.summary.as_deref(), Some("short"));
    assert!(updated.is_ai_related);
    assert_eq!(updated.title, "T");
    assert_eq!(updated.author.as_deref(), Some("kim"));
}

#[test]
fn update_with_null_required_field_keeps_existing_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({"title": "Kept", "link": "https://x"})))
        .unwrap();

    let updated = repo
        .update(created.id, &record(json!({"title": null, "summary": "s"})))
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Kept");
    assert_eq!(updated.summary.as_deref(), Some("s"));
}

#[test]
fn update_rejects_immutable_field_without_partial_application() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({"title": "Original", "link": "https://x"})))
        .unwrap();

    let err = repo
        .update(
            created.id,
            &record(json!({"title": "Changed", "link": "https://y"})),
        )
        .unwrap_err();
    assert!(err.as_validation().unwrap().mentions("link"));

    let (title, link, _) = stored_row(&conn, created.id);
    assert_eq!(title, "Original");
    assert_eq!(link, "https://x");
}

#[test]
fn update_with_empty_payload_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({"title": "T", "link": "https://x"})))
        .unwrap();

    assert!(repo.update(created.id, &Record::new()).unwrap().is_none());
}

#[test]
fn update_of_missing_id_is_entity_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = repo(&conn)
        .update(999, &record(json!({"title": "T"})))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DatabaseOperation);
    assert!(err.is_entity_not_found());
    assert!(err.to_string().contains("not found"));
}

#[test]
fn repeating_current_values_never_writes() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({
            "title": "T",
            "link": "https://x",
            "tags": ["b", "a"],
            "published_at": 1_700_000_000_000_i64
        })))
        .unwrap();

    conn.execute("UPDATE articles SET updated_at = 1 WHERE id = ?1", [created.id])
        .unwrap();
    let current = record(json!({
        "title": "T",
        "tags": "a,b",
        "published_at": 1_700_000_000_000_i64,
        "is_ai_related": false
    }));

    let first: Article = repo.update(created.id, &current).unwrap().unwrap();
    let second: Article = repo.update(created.id, &current).unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(second.updated_at, 1);
    assert_eq!(stored_row(&conn, created.id).2, 1);
}

#[test]
fn updates_refresh_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({"title": "T", "link": "https://x"})))
        .unwrap();
    conn.execute("UPDATE articles SET updated_at = 1 WHERE id = ?1", [created.id])
        .unwrap();

    let updated = repo
        .update(created.id, &record(json!({"title": "T2"})))
        .unwrap()
        .unwrap();
    assert!(updated.updated_at > 1);
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);
    let created = repo
        .create(&record(json!({"title": "T", "link": "https://x"})))
        .unwrap();

    assert!(repo.delete(created.id).unwrap());
    assert!(!repo.delete(created.id).unwrap());
    assert!(repo.get_by_id(created.id).unwrap().is_none());
}

#[test]
fn deleting_a_referenced_source_is_an_integrity_error() {
    let conn = open_db_in_memory().unwrap();
    let sources = SourceRepository::attach(&conn, QueryConfig::default());
    let source = sources
        .create(&record(json!({"name": "Wire", "url": "https://wire.example"})))
        .unwrap();
    repo(&conn)
        .create(&record(json!({
            "title": "T",
            "link": "https://x",
            "source_id": source.id
        })))
        .unwrap();

    let err = sources.delete(source.id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Integrity {
            kind: IntegrityKind::ForeignKey,
            ..
        }
    ));
    assert!(sources.get_by_id(source.id).unwrap().is_some());
}

#[test]
fn source_helpers_use_natural_key_and_update_path() {
    let conn = open_db_in_memory().unwrap();
    let sources = SourceRepository::attach(&conn, QueryConfig::default());
    let created = sources
        .create(&record(json!({"name": "Wire", "url": "https://wire.example"})))
        .unwrap();
    assert!(created.enabled);
    assert_eq!(created.crawl_interval_minutes, 60);

    let found = sources.get_by_url("https://wire.example").unwrap().unwrap();
    assert_eq!(found.id, created.id);

    let crawled = sources
        .mark_crawled(created.id, 1_710_000_000_000)
        .unwrap()
        .unwrap();
    assert_eq!(crawled.last_crawled_at, Some(1_710_000_000_000));
    assert!(sources.mark_crawled(999, 1).unwrap_err().is_entity_not_found());

    sources
        .create(&record(json!({"name": "Off", "url": "https://off.example", "enabled": false})))
        .unwrap();
    let enabled = sources.list_enabled().unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].name, "Wire");
}
