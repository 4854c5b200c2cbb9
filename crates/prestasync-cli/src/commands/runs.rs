use anyhow::Context;

use prestasync_core::AppConfig;
use prestasync_store::postgres::list_sync_runs;
use prestasync_store::PoolConfig;

pub async fn run(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to list sync runs")?;

    let pool = prestasync_store::connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .context("connecting to the catalog database")?;

    let runs = list_sync_runs(&pool, limit).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }

    for sync_run in runs {
        let finished = sync_run
            .completed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        print!(
            "#{} [{}] started {} finished {} categories={} products={}",
            sync_run.id,
            sync_run.status,
            sync_run
                .started_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            finished,
            sync_run.categories_processed,
            sync_run.products_processed,
        );
        if let Some(message) = &sync_run.error_message {
            print!(" error: {message}");
        }
        println!();
    }

    Ok(())
}
