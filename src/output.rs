use crate::models::FinalResults;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print evaluation results in the specified format
pub fn print_results(results: &[FinalResults], format: OutputFormat) {
    match format {
        OutputFormat::Plain => match render_plain(results) {
            Ok(report) => print!("{}", report),
            Err(e) => eprintln!("Error rendering results: {}", e),
        },
        OutputFormat::Json => print_json(results),
    }
}

impl OutputFormat {
    /// JSON output keeps stdout parseable, so notices go to stderr
    pub fn notices_on_stdout(self) -> bool {
        matches!(self, OutputFormat::Plain)
    }
}

/// Print notices about skipped evaluations
pub fn print_notices(notices: &[String], format: OutputFormat) {
    for notice in notices {
        if format.notices_on_stdout() {
            print!("{}", notice);
        } else {
            eprint!("{}", notice);
        }
    }
}

/// Render results as the plain text report
pub fn render_plain(results: &[FinalResults]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        render_result(&mut out, result)?;

        if i < results.len() - 1 {
            writeln!(out, "{}", "=".repeat(50))?;
        }
    }
    Ok(out)
}

fn render_result(out: &mut String, result: &FinalResults) -> fmt::Result {
    let summary = &result.summary;
    let width = result.vanilla_label.len().max(result.ppo_label.len()) + " wins:".len();

    writeln!(out)?;
    writeln!(out, "Evaluation Results: {} ({})", result.title, result.strategy)?;
    writeln!(out, "{}", "-".repeat(18))?;
    writeln!(out, "Total comparisons: {}", summary.total)?;
    writeln!(
        out,
        "{:<width$} {}",
        format!("{} wins:", result.vanilla_label),
        summary.wins_a
    )?;
    writeln!(
        out,
        "{:<width$} {}",
        format!("{} wins:", result.ppo_label),
        summary.wins_b
    )?;
    writeln!(out, "{:<width$} {}", "Ties:", summary.ties)?;

    if !summary.categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "Category-wise Average Scores")?;
        let label_width = width.max(" avg score:".len() + result.vanilla_label.len());
        for category in &summary.categories {
            writeln!(
                out,
                "{} ({} prompts):",
                category.category.as_str().to_uppercase(),
                category.count
            )?;
            writeln!(
                out,
                "  {:<label_width$} {:.3}",
                format!("{} avg score:", result.vanilla_label),
                category.mean_a
            )?;
            writeln!(
                out,
                "  {:<label_width$} {:.3}",
                format!("{} avg score:", result.ppo_label),
                category.mean_b
            )?;
        }
    }
    writeln!(out)
}

/// Print results in JSON format
fn print_json(results: &[FinalResults]) {
    match serde_json::to_string_pretty(results) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}
