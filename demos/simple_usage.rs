/// shardtext API Demo
///
/// Walks one tenant through its whole life:
/// - Indexing batches (upserts, status updates, deletes)
/// - Searching with filters and paging
/// - Flushing, statistics and health
/// - Deactivation and reactivation from the snapshot

use shardtext::{Config, IndexCommand, SearchContext, Status, TenantKey, TextIndexer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔═══════════════════════════════════════════════╗");
    println!("║        shardtext - Tenant Lifecycle Demo      ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    // Step 1: Open an indexer over a scratch directory
    println!("Step 1: Opening indexer...");
    let dir = tempfile::tempdir()?;
    let indexer = TextIndexer::open(Config::in_dir(dir.path()))?;
    let app = TenantKey::from("docs-site");
    println!("  ✓ Storage at {}\n", dir.path().display());

    // Step 2: Index a batch
    println!("Step 2: Indexing documents...");
    let outcome = indexer
        .index(
            &app,
            vec![
                article("rust-intro", "Learning Rust", Status::Published, "en"),
                article("rust-async", "Async Rust in Practice", Status::Published, "en"),
                article("rust-draft", "Rust Macros", Status::Draft, "en"),
                article("crepe", "Crêpes à la française", Status::Published, "fr"),
                IndexCommand::upsert("broken", "", Status::Published, "en"),
            ],
        )
        .await?;
    println!("  ✓ {} changed", outcome.changed_count());
    for (position, reason) in outcome.failures() {
        println!("  ✗ command {}: {}", position, reason);
    }
    println!();

    // Step 3: Search
    println!("Step 3: Searching...");
    let all = indexer.search(&app, "rust", SearchContext::new()).await?;
    println!("  'rust': {:?}", all);

    let published = SearchContext::new().with_statuses([Status::Published]);
    let live = indexer.search(&app, "rust", published.clone()).await?;
    println!("  'rust' (published): {:?}", live);

    let french = indexer
        .search(&app, "crepes francaise", SearchContext::new().with_languages(["fr"]))
        .await?;
    println!("  'crepes francaise' (fr): {:?}", french);

    let page = indexer.search(&app, "rust", SearchContext::new().with_limit(1)).await?;
    println!("  'rust' (first page of 1): {:?}\n", page);

    // Step 4: Update status and delete
    println!("Step 4: Publishing the draft, deleting the crêpes...");
    indexer
        .index(
            &app,
            vec![
                IndexCommand::update_status("rust-draft", Status::Published),
                IndexCommand::delete("crepe"),
            ],
        )
        .await?;
    let live = indexer.search(&app, "rust", published.clone()).await?;
    println!("  ✓ 'rust' (published): {:?}", live);
    let gone = indexer.search(&app, "crepes", SearchContext::new()).await?;
    println!("  ✓ 'crepes': {} results\n", gone.len());

    // Step 5: Flush and statistics
    println!("Step 5: Flushing...");
    indexer.flush(&app).await?;
    let stats = indexer.stats(&app).await?;
    println!("  ✓ Documents: {}", stats.document_count);
    println!("  ✓ Terms: {}", stats.term_count);
    println!("  ✓ Batches applied: {}", stats.batches_applied);
    println!("  ✓ Health: {:?}\n", stats.health);

    // Step 6: Deactivate, then wake the tenant again
    println!("Step 6: Deactivating and reactivating...");
    indexer.deactivate(&app).await?;
    println!("  ✓ Active tenants: {:?}", indexer.active_tenants());
    let again = indexer.search(&app, "async", SearchContext::new()).await?;
    let stats = indexer.stats(&app).await?;
    println!(
        "  ✓ 'async': {:?} (generation {}, restored: {})\n",
        again, stats.generation, stats.restored_from_snapshot
    );

    // Step 7: Shutdown
    println!("Step 7: Shutting down...");
    indexer.shutdown().await?;
    println!("  ✓ All shards flushed\n");

    Ok(())
}

fn article(id: &str, title: &str, status: Status, language: &str) -> IndexCommand {
    IndexCommand::upsert(id, "article", status, language).with_field("title", title)
}
