// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rekha::data::ColumnData;
use rekha::feedback::{CsvFeedbackStore, FeedbackRecord, FeedbackSink};
use rekha::{AppConfig, ChartControls, DatasetNormalizer, Notice, ReportSession};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Recommend, render and export charts for a CSV or XLSX file.
    Report {
        file: PathBuf,
        #[arg(long)]
        charts: Option<usize>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Global filter as COLUMN=VALUE1,VALUE2 (repeatable).
        #[arg(long = "filter", value_name = "COLUMN=VALUES")]
        filters: Vec<String>,
        /// JSON object mapping chart numbers to overrides.
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Chart number whose insight should be regenerated (repeatable).
        #[arg(long = "regenerate", value_name = "N")]
        regenerate: Vec<usize>,
    },

    /// Print the first rows and column types of a file.
    Preview {
        file: PathBuf,
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },

    Feedback {
        #[arg(long)]
        email: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        charts: Option<usize>,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "rekha")]
#[command(about = "AI chart recommendations, rendering and report export")]
struct Cli {
    #[arg(long, default_value_t = false)]
    debug: bool,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let filter = if args.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug,reqwest=info,hyper=info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = AppConfig::load(args.config.as_deref()).context("loading configuration")?;

    match args.command {
        Commands::Report {
            file,
            charts,
            out,
            filters,
            overrides,
            regenerate,
        } => run_report(settings, &file, charts, &out, &filters, overrides.as_deref(), &regenerate).await,
        Commands::Preview { file, rows } => preview(&file, rows),
        Commands::Feedback { email, text, charts } => {
            let store = CsvFeedbackStore::new(settings.feedback.path.clone());
            let record = FeedbackRecord::new(
                &email,
                charts.unwrap_or(settings.charts.default_count),
                text.as_deref(),
            )?;
            store.append(&record)?;
            println!("Thank you for your feedback!");
            Ok(())
        }
    }
}

async fn run_report(
    settings: AppConfig,
    file: &Path,
    charts: Option<usize>,
    out: &Path,
    filters: &[String],
    overrides: Option<&Path>,
    regenerate: &[usize],
) -> Result<()> {
    let mut session = ReportSession::connect(settings)?;
    info!(session = %session.id(), file = %file.display(), "starting report");

    let loaded = session.load_path(file).map(|_| ());
    print_notices(session.take_notices());
    loaded?;

    if let Some(count) = charts {
        session.set_chart_count(count)?;
    }
    for raw in filters {
        let (column, values) = parse_filter(raw)?;
        session.set_global_filter(&column, values);
    }
    if let Some(path) = overrides {
        for (number, controls) in read_overrides(path)? {
            if number == 0 {
                bail!("chart numbers in {} start at 1", path.display());
            }
            session.set_controls(number - 1, controls);
        }
    }

    if regenerate.contains(&0) {
        bail!("--regenerate takes a chart number starting at 1");
    }
    let indices: Vec<usize> = regenerate.iter().map(|number| number - 1).collect();
    session.regenerate_insights(&indices).await?;

    let rendered = session.render_all().await?;
    let files = session.export(&rendered, out)?;
    print_notices(session.take_notices());

    for chart in &rendered {
        println!("Chart {} ({}): {}", chart.number(), chart.rendered_kind, chart.prepared.title);
        println!("{}\n", chart.insight_text);
    }
    println!("{}", serde_json::to_string_pretty(&files)?);
    Ok(())
}

fn parse_filter(raw: &str) -> Result<(String, Vec<String>)> {
    let Some((column, values)) = raw.split_once('=') else {
        bail!("filter '{raw}' must look like COLUMN=VALUE1,VALUE2");
    };
    let values = values
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    Ok((column.trim().to_string(), values))
}

fn read_overrides(path: &Path) -> Result<BTreeMap<usize, ChartControls>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: BTreeMap<String, ChartControls> = serde_json::from_str(&text)?;
    raw.into_iter()
        .map(|(key, controls)| {
            let number = key
                .trim()
                .parse::<usize>()
                .with_context(|| format!("'{key}' is not a chart number"))?;
            Ok((number, controls))
        })
        .collect()
}

fn preview(file: &Path, rows: usize) -> Result<()> {
    let dataset = DatasetNormalizer::new().load_path(file)?;
    println!("{} rows x {} columns", dataset.row_count(), dataset.column_count());
    for name in dataset.column_names() {
        if let Some(column) = dataset.column(name) {
            let kind = if column.kind().is_numeric() { "numeric" } else { "text" };
            println!("  {name}: {kind} ({} missing)", column.null_count());
        }
    }
    println!();
    print!("{}", dataset.format_sample(rows));
    Ok(())
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let (column, values) = parse_filter("Region = North, South").unwrap();
        assert_eq!(column, "Region");
        assert_eq!(values, vec!["North", "South"]);
        assert!(parse_filter("Region").is_err());
    }
}
