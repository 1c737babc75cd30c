//! Output formatting utilities

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::ValueEnum;
use colored::Colorize;
use forecast_lib::{FeatureRanking, PerformanceReport, Prediction};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for forecast tables
#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Predicted")]
    predicted: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// Row for importance tables
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Print an hourly forecast for one metric
pub fn print_forecast(metric: &str, predictions: &[Prediction], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(predictions),
        OutputFormat::Table => {
            println!("{} {}", "Forecast:".bold(), metric.cyan());
            println!("{}", forecast_table(predictions));
            println!("\nTotal: {} hours", predictions.len());
            Ok(())
        }
    }
}

/// Print features ranked by importance
pub fn print_importance(metric: &str, ranking: &FeatureRanking, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(ranking),
        OutputFormat::Table => {
            println!("{} {}", "Feature importance:".bold(), metric.cyan());
            println!("{}", importance_table(ranking));
            Ok(())
        }
    }
}

/// Print the multi-metric report
pub fn print_report(report: &PerformanceReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let sections = [
                ("rating", &report.predictions.rating),
                ("onTimePercentage", &report.predictions.on_time_percentage),
                ("totalPoints", &report.predictions.total_points),
            ];
            for (metric, predictions) in sections {
                println!("{} {}", "Forecast:".bold(), metric.cyan());
                println!("{}", forecast_table(predictions));
                println!();
            }
            println!("{} {}", "Feature importance:".bold(), "rating".cyan());
            println!("{}", importance_table(&report.feature_importance));
            print_info(&format!(
                "Trained on {} historical records",
                report.historical_data.len()
            ));
            Ok(())
        }
    }
}

fn forecast_table(predictions: &[Prediction]) -> String {
    let rows: Vec<ForecastRow> = predictions
        .iter()
        .map(|p| ForecastRow {
            timestamp: format_timestamp(&p.timestamp),
            predicted: format!("{:.3}", p.predicted_value),
            confidence: color_confidence(p.confidence),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

fn importance_table(ranking: &FeatureRanking) -> String {
    let rows: Vec<ImportanceRow> = ranking
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| ImportanceRow {
            rank: i + 1,
            feature: entry.feature.clone(),
            importance: format!("{:.4}", entry.importance),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Shorten an RFC 3339 timestamp for display; unparseable input is kept as is
pub fn format_timestamp(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M %:z").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
