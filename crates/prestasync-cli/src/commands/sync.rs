use anyhow::Context;

use prestasync_client::PrestashopClient;
use prestasync_core::AppConfig;
use prestasync_store::postgres::{
    complete_sync_run, create_sync_run, fail_sync_run, start_sync_run,
};
use prestasync_store::{LocalFiles, MemoryCatalog, MemoryFiles, PgCatalog, PoolConfig};
use prestasync_sync::{Importer, SyncOptions, SyncSummary};

pub async fn run(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let client = PrestashopClient::new(
        &config.prestashop_url,
        &config.prestashop_ws_key,
        config.request_timeout_secs,
        config.max_retries,
        config.retry_backoff_base_ms,
    )?;

    let options = SyncOptions {
        generate_new_handles: config.generate_new_handles,
    };

    if dry_run {
        let store = MemoryCatalog::with_default_store();
        let files = MemoryFiles::new();
        let importer = Importer::new(&client, &store, &files, options);
        let summary = importer.run_full_sync().await?;
        print_summary(&summary);
        println!("dry run — nothing was persisted");
        return Ok(());
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to sync into Postgres (or pass --dry-run)")?;

    let pool = prestasync_store::connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .context("connecting to the catalog database")?;
    prestasync_store::run_migrations(&pool)
        .await
        .context("running catalog migrations")?;

    let store = PgCatalog::new(pool.clone());
    let files = LocalFiles::new(&config.upload_dir);
    let importer = Importer::new(&client, &store, &files, options);

    let sync_run = create_sync_run(&pool, "cli").await?;
    start_sync_run(&pool, sync_run.id).await?;

    match importer.run_full_sync().await {
        Ok(summary) => {
            complete_sync_run(
                &pool,
                sync_run.id,
                i32::try_from(summary.categories_processed).unwrap_or(i32::MAX),
                i32::try_from(summary.products_processed).unwrap_or(i32::MAX),
            )
            .await?;
            print_summary(&summary);
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            if let Err(mark_err) = fail_sync_run(&pool, sync_run.id, &message).await {
                tracing::error!(
                    sync_run_id = sync_run.id,
                    error = %mark_err,
                    "could not mark sync run as failed"
                );
            }
            Err(err.into())
        }
    }
}

fn print_summary(summary: &SyncSummary) {
    let report = &summary.report;
    println!(
        "categories processed: {} ({} created, {} updated, {} failed)",
        summary.categories_processed,
        report.collections_created,
        report.collections_updated,
        report.category_failures.len(),
    );
    println!(
        "products processed: {} ({} created, {} updated, {} absorbed, {} failed)",
        summary.products_processed,
        report.products_created,
        report.products_updated,
        report.variants_absorbed,
        report.product_failures.len(),
    );

    for failure in &report.category_failures {
        println!("  category {} failed: {}", failure.source_id, failure.error);
    }
    for failure in &report.product_failures {
        println!("  product {} failed: {}", failure.source_id, failure.error);
    }
    if !report.write_failures.is_empty() {
        println!("partial write failures: {}", report.write_failures.len());
        for failure in &report.write_failures {
            println!(
                "  {:?} (source id {}): {}",
                failure.entity, failure.source_id, failure.error
            );
        }
    }
}
