//! The discovery + extraction batch.

use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;

use super::RunArgs;
use crate::cli::helpers::{ai_extractor, http_client};
use crate::cli::progress::RunProgress;
use crate::config::Settings;
use crate::discovery::{create_source, DiscoveryQuery, KeywordFilter};
use crate::fetch::ContentFetcher;
use crate::pipeline::{Pipeline, PipelineEvent, PipelineOptions};
use crate::rate_limit::RateLimiter;
use crate::repository::{
    run_migrations, DieselFilingRepository, DieselProjectRepository, SqlitePool,
};

/// Run one batch. Individual filings never fail the command.
pub async fn cmd_run(mut settings: Settings, args: &RunArgs) -> anyhow::Result<()> {
    args.apply(&mut settings);
    settings.validate()?;

    let database_url = settings.database_url();
    run_migrations(&database_url).await?;
    let pool = SqlitePool::new(&database_url);

    let rate_limiter = RateLimiter::with_config(settings.http.rate_limit_config());
    let client = http_client(&settings, rate_limiter.clone())?;

    let mut sources = Vec::new();
    for source in &settings.discovery.sources {
        sources.push(create_source(*source, client.clone(), &settings.filings_api)?);
    }

    let fetcher = ContentFetcher::new(client, settings.pipeline.max_document_chars);
    let mut pipeline = Pipeline::new(
        sources,
        fetcher,
        Arc::new(DieselProjectRepository::new(pool.clone())),
        DieselFilingRepository::new(pool),
        PipelineOptions::from_settings(&settings),
    )
    .with_keywords(KeywordFilter::new(&settings.discovery.keywords));
    if let Some(ai) = ai_extractor(&settings, rate_limiter.clone())? {
        pipeline = pipeline.with_ai(ai);
    }

    let query = DiscoveryQuery::from_settings(&settings.discovery, settings.pipeline.limit);

    if !args.json {
        println!(
            "{} Running {} source(s) with {} workers",
            style("→").cyan(),
            settings.discovery.sources.len(),
            settings.pipeline.concurrency
        );
    }

    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(100);
    let show_progress = !args.json;
    let event_handler = tokio::spawn(async move {
        let mut progress = RunProgress::new(show_progress);
        while let Some(event) = event_rx.recv().await {
            progress.handle(event);
        }
        progress.finish();
    });

    let report = pipeline.run(&query, event_tx).await;

    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }
    for (domain, stats) in rate_limiter.get_stats().await {
        tracing::info!(
            "{}: {} requests, {} rate limited, delay {:?}{}",
            domain,
            stats.total_requests,
            stats.rate_limit_hits,
            stats.current_delay,
            if stats.in_backoff { " (backing off)" } else { "" }
        );
    }
    let report = report?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
        let mark = if report.failures.is_empty() {
            style("✓").green()
        } else {
            style("!").yellow()
        };
        println!(
            "{} Persisted {} of {} discovered filings",
            mark, report.persisted, report.discovered
        );
    }
    Ok(())
}
