use crawldesk_core::db::open_db_in_memory;
use crawldesk_core::{ArticleService, PageRequest, QueryConfig, Record};
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn create_then_get_returns_successful_envelopes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ArticleService::new(&mut conn, QueryConfig::default());

    let created = service.create_article(&record(json!({"title": "T", "link": "https://x"})));
    assert!(created.success, "{}", created.message);
    let article = created.data.unwrap();

    let fetched = service.get_article(article.id);
    assert!(fetched.success);
    let json = fetched.to_json("article").unwrap();
    assert_eq!(json["success"], json!(true));
    assert_eq!(json["article"]["link"], json!("https://x"));
    assert_eq!(json["article"]["tags"], json!([]));
}

#[test]
fn failures_carry_message_and_null_payload() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ArticleService::new(&mut conn, QueryConfig::default());

    let invalid = service.create_article(&record(json!({"link": "https://x"})));
    assert!(!invalid.success);
    assert!(invalid.message.contains("title"));
    assert_eq!(invalid.to_json("article").unwrap()["article"], Value::Null);

    let missing = service.get_article(12);
    assert!(!missing.success);
    assert!(missing.message.contains("not found"));

    let by_link = service.get_article_by_link("https://nowhere");
    assert!(!by_link.success);
}

#[test]
fn failed_write_is_rolled_back() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut service = ArticleService::new(&mut conn, QueryConfig::default());
        service.create_article(&record(json!({"title": "T", "link": "https://x"})));
        let duplicate = service.create_article(&record(json!({"title": "T2", "link": "https://x"})));
        assert!(!duplicate.success);
        assert!(duplicate.message.contains("duplicate"));
    }

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert!(conn.is_autocommit());
}

#[test]
fn update_delete_and_list_round_trip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ArticleService::new(&mut conn, QueryConfig::default());
    let id = service
        .create_article(&record(json!({"title": "T", "link": "https://x"})))
        .data
        .unwrap()
        .id;

    let updated = service.update_article(id, &record(json!({"title": "T2"})));
    assert_eq!(updated.data.unwrap().title, "T2");

    let noop = service.update_article(id, &Record::new());
    assert!(noop.success);
    assert!(noop.data.is_none());

    let page = service.list_articles(&Record::new(), &PageRequest::new(1, 10));
    assert_eq!(page.data.as_ref().unwrap().total, 1);
    let listed = page.to_json("articles").unwrap();
    assert_eq!(listed["articles"]["items"][0]["title"], json!("T2"));

    let deleted = service.delete_article(id);
    assert_eq!(deleted.data, Some(true));
    let again = service.delete_article(id);
    assert!(again.success);
    assert_eq!(again.data, Some(false));

    assert_eq!(service.list_recent(&Record::new()).data.unwrap().total, 0);
}

#[test]
fn batch_calls_commit_successful_items() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ArticleService::new(&mut conn, QueryConfig::default());

    let created = service.batch_create_articles(&[
        record(json!({"title": "a", "link": "https://s/1"})),
        record(json!({"title": "", "link": "https://s/2"})),
    ]);
    assert!(created.success);
    assert_eq!(created.message, "1 succeeded, 1 failed");
    let ids = created.data.unwrap().succeeded;

    let updated = service.batch_update_articles(&ids, &record(json!({"author": "kim"})));
    assert_eq!(updated.data.unwrap().success_count, 1);

    let by_link = service.batch_update_by_link(&[record(json!({
        "link": "https://s/1",
        "tags": ["rust"]
    }))]);
    assert_eq!(by_link.data.unwrap().succeeded, vec!["https://s/1".to_string()]);

    let article = service.get_article_by_link("https://s/1").data.unwrap();
    assert_eq!(article.author.as_deref(), Some("kim"));
    assert_eq!(article.tags, vec!["rust"]);
}
