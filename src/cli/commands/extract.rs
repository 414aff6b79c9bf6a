//! Single-document extraction for checking patterns by hand.

use console::style;

use crate::cli::helpers::{ai_extractor, http_client};
use crate::config::Settings;
use crate::extract::Extraction;
use crate::fetch::ContentFetcher;
use crate::models::{MetricField, CHECKLIST};
use crate::rate_limit::RateLimiter;

/// Fetch, extract and score `location` (path, `file://` or `http(s)://`).
/// Nothing is written to the database.
pub async fn cmd_extract(settings: &Settings, location: &str, json: bool) -> anyhow::Result<()> {
    let rate_limiter = RateLimiter::with_config(settings.http.rate_limit_config());
    let fetcher = ContentFetcher::new(
        http_client(settings, rate_limiter.clone())?,
        settings.pipeline.max_document_chars,
    );
    let document = fetcher.load(location).await?;
    let min_ratio = settings.pipeline.min_confidence_ratio;
    let mut extraction = Extraction::from_text(&document.text, min_ratio);

    if extraction.accepted() {
        if let Some(ai) = ai_extractor(settings, rate_limiter)? {
            let title = document.title.as_deref().unwrap_or(location);
            match ai.extract(title, &document.text).await {
                Ok(answer) => extraction.merge_ai(&answer, min_ratio),
                Err(e) => eprintln!("{} AI extraction failed: {}", style("!").yellow(), e),
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
        return Ok(());
    }

    if let Some(title) = &document.title {
        println!("{}", style(title).bold());
    }
    if document.was_truncated() {
        println!(
            "  {} text truncated to {} of {} characters",
            style("!").yellow(),
            document.text.chars().count(),
            document.original_chars
        );
    }

    let fields = &extraction.descriptive;
    println!(
        "  project:    {}",
        fields.project_name.as_deref().unwrap_or("-")
    );
    println!(
        "  location:   {}",
        match (&fields.jurisdiction, &fields.country) {
            (Some(j), Some(c)) => format!("{}, {}", j, c),
            (None, Some(c)) => c.clone(),
            (Some(j), None) => j.clone(),
            (None, None) => "-".to_string(),
        }
    );
    println!("  commodity:  {}", fields.commodity.as_str());
    println!(
        "  stage:      {}",
        fields.stage.map(|s| s.as_str()).unwrap_or("-")
    );
    println!();

    for field in CHECKLIST {
        match extraction.metrics.get(field) {
            Some(value) => {
                let unit = if field == MetricField::ResourceGrade {
                    extraction
                        .metrics
                        .resource_grade_unit
                        .map(|u| u.as_str())
                        .unwrap_or("")
                } else {
                    ""
                };
                println!("  {} {:<26} {}{}", style("✓").green(), field.as_str(), value, unit);
            }
            None => println!("  {} {}", style("·").dim(), style(field.as_str()).dim()),
        }
    }

    let score = extraction.score;
    let verdict = if score.accepted {
        style("accepted").green()
    } else {
        style("rejected").red()
    };
    println!();
    println!(
        "{}/{} fields, confidence {:.1}/10, {}{}",
        score.found,
        score.total,
        score.confidence,
        verdict,
        if extraction.ai_enriched { " (AI-enriched)" } else { "" }
    );
    Ok(())
}
