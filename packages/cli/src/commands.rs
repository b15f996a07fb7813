use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;

use research::analysis_store;
use research::scanner;
use research::{
    ArxivFetcher, OpenAiSynthesizer, RivalryPipeline, ScholarFetcher, Settings, SourceAggregator,
    SourceCatalog, SqliteCatalog, StorageLayout, WikidataClient, WikipediaFetcher,
};

#[derive(Subcommand)]
pub enum SourcesCommand {
    /// Catalog statistics: totals, by type, primary/secondary split
    Stats,
    /// Scan the raw-sources tree and report unprocessed directories
    Scan {
        /// Restrict to one entity ID (e.g. Q9021)
        #[arg(long)]
        entity: Option<String>,
    },
    /// Register sources found on disk but missing from the catalog
    Process {
        /// Restrict to one entity ID (e.g. Q9021)
        #[arg(long)]
        entity: Option<String>,
    },
}

async fn open_catalog(settings: &Settings) -> Result<SqliteCatalog> {
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("creating data dir {}", settings.data_dir.display()))?;
    SqliteCatalog::new(&settings.sources_db_url())
        .await
        .context("opening source catalog")
}

pub async fn analyze(entity1: &str, entity2: &str, no_save: bool, json: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let catalog: Arc<dyn SourceCatalog> = Arc::new(open_catalog(&settings).await?);
    let layout = StorageLayout::new(&settings.data_dir);

    let aggregator = SourceAggregator::new(catalog, layout)
        .with_fetcher(Box::new(WikipediaFetcher::new(
            WikipediaFetcher::default_pacer(),
        )))
        .with_fetcher(Box::new(ScholarFetcher::new(ScholarFetcher::default_pacer())))
        .with_fetcher(Box::new(ArxivFetcher::new(ArxivFetcher::default_pacer())))
        .with_max_results(settings.max_results_per_family);

    let synthesizer = OpenAiSynthesizer::new(&settings.openai_api_key)
        .with_model(&settings.rivalry_model);

    let pipeline = RivalryPipeline::new(
        Arc::new(WikidataClient::new()),
        aggregator,
        Arc::new(synthesizer),
    )
        .with_model_name(&settings.rivalry_model)
        .with_save_output(!no_save);

    let analysis = pipeline.analyze(entity1, entity2).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!(
        "{} vs {}",
        analysis.entity1.label, analysis.entity2.label
    );
    println!(
        "Rivalry: {} (score {:.2})",
        if analysis.rivalry_exists { "YES" } else { "NO" },
        analysis.rivalry_score
    );
    if let (Some(start), end) = (
        &analysis.rivalry_period_start,
        analysis.rivalry_period_end.as_deref(),
    ) {
        println!("Period:  {} - {}", start, end.unwrap_or("ongoing"));
    }
    println!("\n{}\n", analysis.summary);

    println!("Timeline ({} events):", analysis.timeline.len());
    for event in &analysis.timeline {
        println!(
            "  [{}] {} ({}; confidence {:.2}, {} source{})",
            event.date,
            event.description,
            event.event_type,
            event.confidence,
            event.source_count,
            if event.source_count == 1 { "" } else { "s" },
        );
    }

    let summary = &analysis.sources_summary;
    println!(
        "\nSources: {} total, {} primary / {} secondary, mean credibility {:.2}",
        summary.total_sources,
        summary.primary_sources,
        summary.secondary_sources,
        summary.average_credibility
    );

    Ok(())
}

pub async fn search(name: &str, limit: usize, json: bool) -> Result<()> {
    let client = WikidataClient::new();
    let results = client.search_entities(name, limit).await?;

    if json {
        let value: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "label": r.label,
                    "description": r.description,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matches for \"{name}\"");
        return Ok(());
    }
    for result in results {
        println!(
            "{:<10} {} - {}",
            result.id,
            result.label,
            result.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn sources(command: SourcesCommand, json: bool) -> Result<()> {
    let settings = Settings::local_only();
    let catalog = open_catalog(&settings).await?;
    let layout = StorageLayout::new(&settings.data_dir);

    match command {
        SourcesCommand::Stats => {
            let stats = catalog.stats().await?;
            if json {
                let value = serde_json::json!({
                    "total_sources": stats.total_sources,
                    "by_type": stats.by_type,
                    "primary_sources": stats.primary_sources,
                    "secondary_sources": stats.secondary_sources,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Total sources: {}", stats.total_sources);
                println!(
                    "Primary/secondary: {} / {}",
                    stats.primary_sources, stats.secondary_sources
                );
                for (source_type, count) in &stats.by_type {
                    println!("  {source_type}: {count}");
                }
            }
        }
        SourcesCommand::Scan { entity } => {
            let report = scanner::scan_raw_sources(&layout, &catalog, entity.as_deref()).await?;
            if json {
                let value = serde_json::json!({
                    "cataloged": report.cataloged.len(),
                    "unprocessed": report
                        .unprocessed
                        .iter()
                        .map(|u| u.source_dir.display().to_string())
                        .collect::<Vec<_>>(),
                    "invalid": report
                        .invalid
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "{} cataloged, {} unprocessed, {} invalid",
                    report.cataloged.len(),
                    report.unprocessed.len(),
                    report.invalid.len()
                );
                for unprocessed in &report.unprocessed {
                    println!("  unprocessed: {}", unprocessed.source_dir.display());
                }
                for invalid in &report.invalid {
                    println!("  invalid:     {}", invalid.display());
                }
            }
        }
        SourcesCommand::Process { entity } => {
            let processed =
                scanner::process_existing_sources(&layout, &catalog, entity.as_deref()).await?;
            if json {
                let value: Vec<serde_json::Value> = processed
                    .iter()
                    .map(|(s, _)| {
                        serde_json::json!({
                            "source_id": s.source_id,
                            "type": s.source_type.as_str(),
                            "url": s.url,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Registered {} source(s)", processed.len());
                for (source, _) in &processed {
                    println!("  {} ({})", source.source_id, source.url);
                }
            }
        }
    }
    Ok(())
}

pub fn list_analyses(json: bool) -> Result<()> {
    let settings = Settings::local_only();
    let layout = StorageLayout::new(&settings.data_dir);
    let listings = analysis_store::list_analyses(&layout)?;

    if json {
        let value: Vec<serde_json::Value> = listings
            .iter()
            .map(|l| {
                serde_json::json!({
                    "analysis_id": l.analysis_id,
                    "entity1_id": l.entity1_id,
                    "entity2_id": l.entity2_id,
                    "analyzed_at": l.analyzed_at,
                    "path": l.path.display().to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if listings.is_empty() {
        println!("No saved analyses");
        return Ok(());
    }
    for listing in listings {
        println!(
            "{:<20} {}",
            listing.analysis_id,
            listing.analyzed_at.as_deref().unwrap_or("unknown time")
        );
    }
    Ok(())
}

pub fn clean(yes: bool) -> Result<()> {
    let settings = Settings::local_only();

    if !yes {
        println!(
            "Would delete {} (pass --yes to confirm)",
            settings.data_dir.display()
        );
        return Ok(());
    }

    if settings.data_dir.exists() {
        std::fs::remove_dir_all(&settings.data_dir)
            .with_context(|| format!("deleting {}", settings.data_dir.display()))?;
        println!("Deleted {}", settings.data_dir.display());
    } else {
        println!("Nothing to delete at {}", settings.data_dir.display());
    }
    Ok(())
}
