use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use insightboard::canvas::{Canvas, Tile};
use insightboard::chart::ChartConfig;
use insightboard::config::Settings;
use insightboard::data::Dataset;
use insightboard::parser::parse_chart_config;
use insightboard::prepare::{filter_outliers, remove_duplicates, OutlierMethod};
use insightboard::suggest::suggest_charts;
use insightboard::transform::transform_with_reason;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "insightboard")]
#[command(about = "Aggregate tabular data into chart-ready records and lay out dashboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a dataset on stdin and print the plotting records for one chart
    Plot(PlotArgs),
    /// Read a dataset on stdin and print suggested chart configs
    Suggest {
        #[arg(long, value_enum, default_value_t = InputFormat::Csv)]
        input_format: InputFormat,
    },
    /// Read a JSON array of chart configs on stdin and print the laid-out tiles
    Layout {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false, id = "source")]
struct ChartSource {
    /// Chart DSL (e.g., 'bar(x: region, y: sales, agg: sum) | filter(year: [2024])')
    #[arg(long)]
    chart: Option<String>,
    /// Path to a chart config JSON file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PlotArgs {
    #[command(flatten)]
    source: ChartSource,
    #[arg(long, value_enum, default_value_t = InputFormat::Csv)]
    input_format: InputFormat,
    /// Drop repeated rows before charting
    #[arg(long)]
    dedupe: bool,
    /// Drop rows that are outliers in this numeric column
    #[arg(long, value_name = "COLUMN")]
    drop_outliers: Option<String>,
    #[arg(long, default_value_t = OutlierMethod::Iqr)]
    outlier_method: OutlierMethod,
    #[arg(long, default_value_t = 1.5)]
    outlier_threshold: f64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum InputFormat {
    Csv,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plot(args) => plot(args),
        Command::Suggest { input_format } => {
            let dataset = read_dataset(input_format)?;
            write_json(&suggest_charts(&dataset))
        }
        Command::Layout { settings } => layout(settings.as_deref()),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path),
        None => Ok(Settings::default()),
    }
}

fn load_chart(source: &ChartSource) -> Result<ChartConfig> {
    if let Some(dsl) = &source.chart {
        return parse_chart_config(dsl).context("Failed to parse chart DSL");
    }
    let Some(path) = &source.config else {
        bail!("Either --chart or --config is required");
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chart config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid chart config in {}", path.display()))
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    Ok(input)
}

fn read_dataset(format: InputFormat) -> Result<Dataset> {
    let input = read_stdin()?;
    let dataset = match format {
        InputFormat::Csv => Dataset::from_csv(input.as_bytes()),
        InputFormat::Json => Dataset::from_json_str(&input),
    }
    .context("Failed to load dataset from stdin")?;
    tracing::debug!(rows = dataset.len(), columns = dataset.columns.len(), "dataset loaded");
    Ok(dataset)
}

fn plot(args: PlotArgs) -> Result<()> {
    let config = load_chart(&args.source)?;
    let mut dataset = read_dataset(args.input_format)?;

    if args.dedupe {
        dataset = remove_duplicates(&dataset, None);
    }
    if let Some(column) = &args.drop_outliers {
        dataset = filter_outliers(&dataset, column, args.outlier_method, args.outlier_threshold);
    }

    let result = transform_with_reason(&dataset.rows, &config);
    if let Some(reason) = result.reason {
        tracing::warn!(?reason, kind = %config.kind, "chart produced no records");
    }
    write_json(&result.records)
}

fn layout(settings: Option<&Path>) -> Result<()> {
    let settings = load_settings(settings)?;
    let configs: Vec<ChartConfig> =
        serde_json::from_str(&read_stdin()?).context("Expected a JSON array of chart configs")?;

    let mut canvas = Canvas::new(settings.layout);
    for config in configs {
        canvas.pin(config);
    }
    canvas.auto_layout();

    let tiles: Vec<&Tile> = canvas.tiles().collect();
    write_json(&tiles)
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("Failed to write JSON to stdout")?;
    writeln!(handle).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
