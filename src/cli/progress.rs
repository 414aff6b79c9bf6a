//! Terminal progress for a pipeline run.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::pipeline::{PipelineEvent, SkipReason, StageOutcome};

/// Spinner during discovery, then a bar over the queued filings.
pub struct RunProgress {
    bar: ProgressBar,
    persisted: usize,
    rejected: usize,
    failed: usize,
}

impl RunProgress {
    pub fn new(visible: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if !visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self {
            bar,
            persisted: 0,
            rejected: 0,
            failed: 0,
        }
    }

    pub fn handle(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::DiscoveryStarted { source } => {
                self.bar.set_message(format!("Discovering via {}...", source));
            }
            PipelineEvent::DiscoveryFinished {
                source,
                found,
                skipped_seen,
                failures,
            } => {
                let mut line = format!(
                    "{} {}: {} new filings, {} already ingested",
                    style("→").cyan(),
                    source,
                    found,
                    skipped_seen
                );
                if failures > 0 {
                    line.push_str(&format!(", {} failed requests", style(failures).yellow()));
                }
                self.bar.println(line);
            }
            PipelineEvent::Queued { total } => {
                self.bar.disable_steady_tick();
                self.bar.set_length(total as u64);
                self.bar.set_position(0);
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=>-"),
                );
                self.set_summary();
            }
            PipelineEvent::FilingStarted { company_name, .. } => {
                self.bar.set_message(company_name);
            }
            PipelineEvent::FilingFinished {
                accession_number,
                outcome,
            } => {
                match &outcome {
                    StageOutcome::Persisted {
                        project_name,
                        confidence,
                        ..
                    } => {
                        self.persisted += 1;
                        self.bar.println(format!(
                            "  {} {} ({:.1}/10)",
                            style("✓").green(),
                            project_name,
                            confidence
                        ));
                    }
                    StageOutcome::Skipped(SkipReason::ProtectedHigherConfidence { .. }) => {}
                    StageOutcome::Skipped(_) => self.rejected += 1,
                    StageOutcome::Failed { category, error } => {
                        self.failed += 1;
                        self.bar.println(format!(
                            "  {} {} [{}]: {}",
                            style("✗").red(),
                            accession_number,
                            category.as_str(),
                            error
                        ));
                    }
                }
                self.bar.inc(1);
                self.set_summary();
            }
        }
    }

    fn set_summary(&self) {
        self.bar.set_message(format!(
            "{} persisted, {} rejected, {} failed",
            self.persisted, self.rejected, self.failed
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
