use shardtext::{
    CommandBatch, CommandStatus, Config, DocId, ErrorKind, FieldValue, IndexCommand, SearchContext,
    Status, TenantKey, TextIndexer,
};
use uuid::Uuid;

fn indexer() -> TextIndexer {
    TextIndexer::in_memory(Config::default())
}

fn ids(hits: &[DocId]) -> Vec<&str> {
    hits.iter().map(|id| id.as_str()).collect()
}

fn published(doc_id: &str, schema: &str, title: &str) -> IndexCommand {
    IndexCommand::upsert(doc_id, schema, Status::Published, "en").with_field("title", title)
}

#[tokio::test]
async fn blue_whale_end_to_end() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    let outcome = indexer
        .index(&app, vec![published("docA", "S1", "Blue Whale"), published("docB", "S1", "Blue Sky")])
        .await
        .unwrap();
    assert_eq!(outcome.status_of(0), Some(&CommandStatus::Created));
    assert_eq!(outcome.status_of(1), Some(&CommandStatus::Created));

    let blue = indexer
        .search(&app, "blue", SearchContext::new().with_schemas(["S1"]))
        .await
        .unwrap();
    assert_eq!(ids(&blue), vec!["docA", "docB"]);

    let whale = indexer.search(&app, "whale", SearchContext::new()).await.unwrap();
    assert_eq!(ids(&whale), vec!["docA"]);

    indexer.index(&app, vec![IndexCommand::delete("docA")]).await.unwrap();
    assert!(indexer.search(&app, "whale", SearchContext::new()).await.unwrap().is_empty());
    assert_eq!(ids(&indexer.search(&app, "blue", SearchContext::new()).await.unwrap()), vec!["docB"]);
}

#[tokio::test]
async fn repeated_upsert_is_idempotent() {
    let indexer = indexer();
    let app = TenantKey::from("app");
    let command = published("doc", "S1", "Grey Heron");

    indexer.index(&app, vec![command.clone()]).await.unwrap();
    indexer.flush(&app).await.unwrap();

    let outcome = indexer.index(&app, vec![command]).await.unwrap();
    assert_eq!(outcome.status_of(0), Some(&CommandStatus::Unchanged));

    let stats = indexer.stats(&app).await.unwrap();
    assert_eq!(stats.document_count, 1);
    assert_eq!(stats.term_count, 2);
    assert!(!stats.dirty);
}

#[tokio::test]
async fn update_replaces_vanished_terms() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    indexer.index(&app, vec![published("doc", "S1", "Red Fox")]).await.unwrap();
    let outcome = indexer.index(&app, vec![published("doc", "S1", "Red Wolf")]).await.unwrap();
    assert_eq!(outcome.status_of(0), Some(&CommandStatus::Updated));

    assert!(indexer.search(&app, "fox", SearchContext::new()).await.unwrap().is_empty());
    assert_eq!(ids(&indexer.search(&app, "wolf", SearchContext::new()).await.unwrap()), vec!["doc"]);
    assert_eq!(indexer.stats(&app).await.unwrap().term_count, 2);
}

#[tokio::test]
async fn deleted_documents_never_match() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    indexer
        .index(&app, vec![
            published("a", "S1", "Northern Lights Tour"),
            published("b", "S1", "Northern Sea Route"),
        ])
        .await
        .unwrap();
    let outcome = indexer
        .index(&app, vec![IndexCommand::delete("a"), IndexCommand::delete("a")])
        .await
        .unwrap();
    assert_eq!(outcome.status_of(0), Some(&CommandStatus::Deleted));
    assert_eq!(outcome.status_of(1), Some(&CommandStatus::NotFound));
    assert!(outcome.is_success());

    for query in ["northern", "lights", "tour", "northern lights"] {
        let hits = indexer.search(&app, query, SearchContext::new()).await.unwrap();
        assert!(!hits.contains(&DocId::from("a")), "{} still matched a", query);
    }
    assert_eq!(indexer.stats(&app).await.unwrap().term_count, 3);
}

#[tokio::test]
async fn invalid_command_does_not_block_the_batch() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    let outcome = indexer
        .index(&app, vec![
            published("good", "S1", "Quiet Harbour"),
            IndexCommand::upsert("bad", "S1", Status::Published, "en")
                .with_field("price", FieldValue::Number(f64::NAN)),
            published("also-good", "S1", "Harbour Lights"),
        ])
        .await
        .unwrap();

    assert!(!outcome.is_success());
    let failures = outcome.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 1);

    let hits = indexer.search(&app, "harbour", SearchContext::new()).await.unwrap();
    assert_eq!(ids(&hits), vec!["also-good", "good"]);
    assert_eq!(indexer.stats(&app).await.unwrap().document_count, 2);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let err = indexer().index(&TenantKey::from("app"), Vec::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn redelivered_batch_applies_once() {
    let indexer = indexer();
    let app = TenantKey::from("app");
    let id = Uuid::new_v4();

    let batch = CommandBatch::new(vec![published("doc", "S1", "Lighthouse")]).unwrap().with_id(id);
    let first = indexer.index_batch(&app, batch.clone()).await.unwrap();
    assert!(!first.duplicate);

    indexer.index(&app, vec![IndexCommand::delete("doc")]).await.unwrap();

    let again = indexer.index_batch(&app, batch).await.unwrap();
    assert!(again.duplicate);
    assert!(again.results.is_empty());
    assert!(indexer.search(&app, "lighthouse", SearchContext::new()).await.unwrap().is_empty());
    assert_eq!(indexer.stats(&app).await.unwrap().batches_applied, 2);
}

#[tokio::test]
async fn context_filters_restrict_matches() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    indexer
        .index(&app, vec![
            published("post", "blog", "Spring Garden"),
            published("page", "pages", "Spring Garden"),
            IndexCommand::upsert("draft", "blog", Status::Draft, "de").with_field("title", "Spring Garden"),
        ])
        .await
        .unwrap();

    let blog = indexer
        .search(&app, "garden", SearchContext::new().with_schemas(["blog"]))
        .await
        .unwrap();
    assert_eq!(ids(&blog), vec!["draft", "post"]);

    let live_blog = indexer
        .search(
            &app,
            "garden",
            SearchContext::new().with_schemas(["blog"]).with_statuses([Status::Published]),
        )
        .await
        .unwrap();
    assert_eq!(ids(&live_blog), vec!["post"]);

    let german = indexer
        .search(&app, "garden", SearchContext::new().with_languages(["de"]))
        .await
        .unwrap();
    assert_eq!(ids(&german), vec!["draft"]);
}

#[tokio::test]
async fn status_updates_change_filtering_only() {
    let indexer = indexer();
    let app = TenantKey::from("app");
    let live = SearchContext::new().with_statuses([Status::Published]);

    indexer.index(&app, vec![published("doc", "S1", "Evening News")]).await.unwrap();
    let outcome = indexer
        .index(&app, vec![
            IndexCommand::update_status("doc", Status::Draft),
            IndexCommand::update_status("missing", Status::Draft),
        ])
        .await
        .unwrap();
    assert_eq!(outcome.status_of(0), Some(&CommandStatus::StatusChanged));
    assert_eq!(outcome.status_of(1), Some(&CommandStatus::NotFound));

    assert!(indexer.search(&app, "news", live.clone()).await.unwrap().is_empty());
    assert_eq!(ids(&indexer.search(&app, "news", SearchContext::new()).await.unwrap()), vec!["doc"]);
}

#[tokio::test]
async fn ranking_is_deterministic_with_id_tie_break() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    indexer
        .index(&app, vec![
            published("c", "S1", "river"),
            published("a", "S1", "river"),
            published("b", "S1", "river river delta"),
            published("d", "S1", "delta"),
        ])
        .await
        .unwrap();

    let first = indexer.search(&app, "river", SearchContext::new()).await.unwrap();
    assert_eq!(ids(&first), vec!["b", "a", "c"]);
    for _ in 0..5 {
        assert_eq!(indexer.search(&app, "river", SearchContext::new()).await.unwrap(), first);
    }

    let page = indexer
        .search(&app, "river", SearchContext::new().with_offset(1).with_limit(1))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec!["a"]);
    assert!(indexer
        .search(&app, "river", SearchContext::new().with_offset(10))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn query_and_index_analysis_agree() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    indexer.index(&app, vec![published("cafe", "S1", "Café Crème, São-Paulo!")]).await.unwrap();

    for query in ["CAFE", "creme", "sao paulo", "São  PAULO café"] {
        let hits = indexer.search(&app, query, SearchContext::new()).await.unwrap();
        assert_eq!(ids(&hits), vec!["cafe"], "query {:?}", query);
    }
    assert!(indexer.search(&app, "  ,;  ", SearchContext::new()).await.unwrap().is_empty());
    assert!(indexer.search(&app, "cafe tea", SearchContext::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn stroke_letters_fold_to_ascii() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    indexer.index(&app, vec![published("names", "S1", "Łódź Søren Đorđe")]).await.unwrap();

    for query in ["lodz", "soren", "dorde", "ŁÓDŹ"] {
        let hits = indexer.search(&app, query, SearchContext::new()).await.unwrap();
        assert_eq!(ids(&hits), vec!["names"], "query {:?}", query);
    }
}

#[tokio::test]
async fn invalid_context_is_a_query_error() {
    let indexer = indexer();
    let app = TenantKey::from("app");

    let zero = indexer.search(&app, "x", SearchContext::new().with_limit(0)).await.unwrap_err();
    assert_eq!(zero.kind, ErrorKind::Query);

    let no_schemas = indexer
        .search(&app, "x", SearchContext::new().with_schemas(Vec::<&str>::new()))
        .await
        .unwrap_err();
    assert_eq!(no_schemas.kind, ErrorKind::Query);

    // Rejected before any shard was woken
    assert!(indexer.active_tenants().is_empty());
}

#[tokio::test]
async fn oversized_limit_is_clamped_to_the_page_size() {
    let indexer = TextIndexer::in_memory(Config { max_page_size: 2, ..Config::default() });
    let app = TenantKey::from("app");

    indexer
        .index(&app, vec![published("a", "S1", "Tide"), published("b", "S1", "Tide"), published("c", "S1", "Tide")])
        .await
        .unwrap();

    let hits = indexer.search(&app, "tide", SearchContext::new().with_limit(1_000_000)).await.unwrap();
    assert_eq!(ids(&hits), vec!["a", "b"]);
}

#[tokio::test]
async fn tenants_are_isolated() {
    let indexer = indexer();
    let left = TenantKey::from("left");
    let right = TenantKey::from(Uuid::new_v4());

    indexer.index(&left, vec![published("doc", "S1", "shared words")]).await.unwrap();
    indexer.index(&right, vec![published("other", "S1", "shared words")]).await.unwrap();

    assert_eq!(ids(&indexer.search(&left, "shared", SearchContext::new()).await.unwrap()), vec!["doc"]);
    assert_eq!(ids(&indexer.search(&right, "shared", SearchContext::new()).await.unwrap()), vec!["other"]);

    indexer.clear(&left).await.unwrap();
    assert!(indexer.search(&left, "shared", SearchContext::new()).await.unwrap().is_empty());
    assert_eq!(indexer.stats(&right).await.unwrap().document_count, 1);

    let mut active = indexer.active_tenants();
    active.sort();
    let mut expected = vec![left, right];
    expected.sort();
    assert_eq!(active, expected);
}
