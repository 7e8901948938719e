//! Rendering of validation runs as JSON, YAML or console text

use anyhow::{Context, Result};

use crate::config::VerifactConfig;
use crate::pipeline::{ExecutionResult, StepResult};
use crate::store::ValidationPage;
use crate::validation::{ValidationOutcome, ValidationStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_outcome(&self, outcome: &ValidationOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome)
                .context("Failed to serialize validation to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(outcome).context("Failed to serialize validation to YAML")
            }
            OutputFormat::Human => Ok(human_outcome(outcome)),
        }
    }

    pub fn format_page(&self, page: &ValidationPage) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(page)
                .context("Failed to serialize validation list to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(page).context("Failed to serialize validation list to YAML")
            }
            OutputFormat::Human => Ok(human_page(page)),
        }
    }

    pub fn format_config(&self, config: &VerifactConfig) -> Result<String> {
        let map = config.to_display_map();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&map).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }
}

fn confidence_bar(confidence: f64) -> String {
    let clamped = confidence.clamp(0.0, 1.0);
    let filled = (clamped * 10.0).round() as usize;
    "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled)
}

fn human_outcome(outcome: &ValidationOutcome) -> String {
    let mut output = String::new();

    match outcome.status {
        ValidationStatus::Completed => output.push_str("\u{2713} Validation Completed\n"),
        ValidationStatus::Failed => output.push_str("\u{2717} Validation Failed\n"),
        status => output.push_str(&format!("\u{2026} Validation {}\n", status)),
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Run:         {}\n", outcome.id));
    output.push_str(&format!("Article:     {}\n", outcome.article_id));
    output.push_str(&format!(
        "Type:        {} (priority {})\n",
        outcome.validation_type, outcome.priority
    ));
    if let Some(previous) = outcome.retry_of {
        output.push_str(&format!("Retry of:    {}\n", previous));
    }

    if let Some(confidence) = outcome.overall_confidence {
        output.push_str(&format!(
            "Confidence:  {} {:.1}%\n",
            confidence_bar(confidence),
            confidence * 100.0
        ));
    }
    if let Some(credible) = outcome.is_credible {
        output.push_str(&format!(
            "Credible:    {}\n",
            if credible { "yes" } else { "no" }
        ));
    }
    if let Some(error) = &outcome.error {
        output.push_str(&format!("Error:       {}\n", error));
    }

    if let Some(summary) = &outcome.summary {
        output.push_str("\nSummary:\n");
        for line in summary.lines() {
            output.push_str(&format!("  {}\n", line));
        }
    }

    if let Some(execution) = &outcome.execution {
        output.push_str(&human_steps(execution));
    }

    output
}

fn human_step_line(step: &StepResult) -> String {
    let mut line = format!(
        "{:<22} {:<10} {:>6}ms",
        step.step_id,
        step.status.as_str(),
        step.duration.as_millis()
    );
    if !step.is_required() {
        line.push_str("  (optional)");
    }
    if let Some(error) = &step.error {
        line.push_str(&format!("  {}", error));
    }
    line
}

fn human_steps(execution: &ExecutionResult) -> String {
    let steps = execution.steps();
    if steps.is_empty() {
        return String::new();
    }

    let mut output = String::from("\nSteps:\n");
    for (i, step) in steps.iter().enumerate() {
        let connector = if i == steps.len() - 1 {
            "\u{2514}"
        } else {
            "\u{251C}"
        };
        output.push_str(&format!("{}\u{2500} {}\n", connector, human_step_line(step)));
    }
    output
}

fn human_page(page: &ValidationPage) -> String {
    if page.items.is_empty() {
        return "No validations found.\n".to_string();
    }

    let mut output = format!("{} of {} validations\n", page.items.len(), page.total);
    output.push_str(RULE);
    output.push('\n');
    for outcome in &page.items {
        let confidence = outcome
            .overall_confidence
            .map(|c| format!("{:.1}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{}  {:<20} {:<12} {:>6}  {}\n",
            outcome.id,
            outcome.validation_type.as_str(),
            outcome.status.as_str(),
            confidence,
            outcome.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    output
}
