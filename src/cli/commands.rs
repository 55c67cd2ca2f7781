//! Command implementations for the popdata CLI
//!
//! Each subcommand loads configuration, applies its overrides, calls into
//! the library, and reports the outcome on stdout. Failures propagate to
//! `main`, which is the only place the process exits.

use crate::cli::{
    Args, Commands, DispatchArgs, ExtractArgs, SeriesArgs, StatsArgs, ToolsArgs, TrendArgs,
};
use crate::client::GenerateClient;
use crate::config::AppConfig;
use crate::models::ProcessingStats;
use crate::processor::discovery::{discover_sources, stats_output_path};
use crate::processor::{BatchProcessor, print_summary, series, stats};
use crate::registry::{
    GenerateRequest, GenerateResponse, OperationOutcome, OperationRegistry, parse_tool_calls,
};

use anyhow::{Context, Result, bail};
use colored::*;
use std::io::Read;
use tracing::{debug, info};

/// Dispatch to the selected subcommand
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    let config = args.load_config().context("Failed to load configuration")?;

    let Some(command) = args.command else {
        bail!("no command given");
    };

    match command {
        Commands::Extract(extract_args) => run_extract(extract_args, config),
        Commands::Stats(stats_args) => run_stats(stats_args, config),
        Commands::Distribution(series_args) => run_distribution(series_args, config),
        Commands::Trend(trend_args) => run_trend(trend_args, config),
        Commands::Tools(tools_args) => run_tools(tools_args, config),
        Commands::Dispatch(dispatch_args) => run_dispatch(dispatch_args, config),
    }
}

/// Set up structured logging on stderr
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("popdata_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn run_extract(args: ExtractArgs, mut config: AppConfig) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("Invalid extractor settings")?;

    let sources = discover_sources(&args.sources).context("Failed to collect sources")?;
    if sources.is_empty() {
        bail!("no source files found in {:?}", args.sources);
    }
    info!(
        "Extracting {} source(s) with {} policy",
        sources.len(),
        config.extractor.policy
    );

    let processor = BatchProcessor::new(config.extractor)?.with_progress(true);
    let (stats, outcomes) = processor.process(&sources, args.output.as_deref())?;

    if sources.len() == 1 {
        // A single source reports its own condition instead of a summary
        if let Some(outcome) = outcomes.into_iter().next() {
            let extraction = outcome.result.with_context(|| {
                format!("Failed to extract {}", outcome.source.display())
            })?;
            println!(
                "{} {} ({} rows)",
                "Cleaned data saved to".bright_green(),
                extraction.output_path.display(),
                extraction.rows_written
            );
        }
        return Ok(());
    }

    print_summary(&stats);
    ensure_batch_succeeded(&stats)
}

fn ensure_batch_succeeded(stats: &ProcessingStats) -> Result<()> {
    if stats.files_processed == 0 {
        bail!(
            "no source produced output ({} empty, {} failed)",
            stats.empty_sources,
            stats.files_failed
        );
    }
    if stats.files_failed > 0 {
        bail!("{} source(s) failed", stats.files_failed);
    }
    Ok(())
}

fn run_stats(args: StatsArgs, mut config: AppConfig) -> Result<()> {
    if args.no_bom {
        config.statistics = config.statistics.with_bom(false);
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| stats_output_path(&args.input));

    let result = stats::calculate_statistics(&args.input, &output, &config.statistics)
        .with_context(|| format!("Failed to compute statistics for {}", args.input.display()))?;

    println!(
        "{} {} ({} rows, {} value columns)",
        "Statistics saved to".bright_green(),
        result.output_path.display(),
        result.rows,
        result.value_columns
    );
    Ok(())
}

fn series_config(args: &SeriesArgs, config: &mut AppConfig) {
    if let Some(window) = args.window {
        config.statistics = config.statistics.clone().with_series_window(window);
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn run_distribution(args: SeriesArgs, mut config: AppConfig) -> Result<()> {
    series_config(&args, &mut config);
    let slices = series::distribution(&args.input, &config.statistics)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&slices)?);
        return Ok(());
    }

    println!("{}", "Average over window, share of total".bright_green().bold());
    for slice in &slices {
        println!(
            "  {:<12} {:>12} {:>8}",
            slice.label,
            format_value(slice.mean),
            slice
                .share
                .map_or_else(|| "-".to_string(), |s| format!("{:.1}%", s * 100.0))
        );
    }
    Ok(())
}

fn run_trend(args: TrendArgs, mut config: AppConfig) -> Result<()> {
    series_config(&args.series, &mut config);
    let points = series::trend(&args.series.input, &args.label, &config.statistics)
        .with_context(|| format!("Failed to read {}", args.series.input.display()))?;

    if args.series.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!("{} {}", "Trend for".bright_green().bold(), args.label);
    for point in &points {
        println!("  {:<12} {:>12}", point.column, format_value(point.value));
    }
    Ok(())
}

fn run_tools(args: ToolsArgs, config: AppConfig) -> Result<()> {
    let registry = OperationRegistry::with_defaults(config);
    match args.query {
        Some(query) => println!("{}", registry.render_prompt(&query)),
        None => println!("{}", registry.catalog()),
    }
    Ok(())
}

fn run_dispatch(args: DispatchArgs, mut config: AppConfig) -> Result<()> {
    let mut dispatch = config.dispatch.clone();
    if let Some(dir) = args.assets_dir {
        dispatch = dispatch.with_assets_dir(dir);
    }
    if let Some(endpoint) = args.endpoint {
        dispatch = dispatch.with_endpoint(endpoint);
    }
    if let Some(model) = args.model {
        dispatch = dispatch.with_model(model);
    }
    config.dispatch = dispatch;

    let registry = OperationRegistry::with_defaults(config);

    let text = match (&args.query, &args.response) {
        (Some(query), _) => {
            let dispatch = &registry.config().dispatch;
            let client = GenerateClient::new(dispatch)?;
            let request = GenerateRequest::new(dispatch, registry.render_prompt(query));
            client
                .generate(&request)
                .with_context(|| format!("Failed to query {}", client.endpoint()))?
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read response {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read response from stdin")?;
            buffer
        }
    };

    let calls = parse_tool_calls(&text);
    if calls.is_empty() {
        println!("{}", "No tools found.".bright_yellow());
    }

    let report = registry.dispatch_all(&calls);
    for (name, result) in &report.results {
        match result {
            Ok(outcome) => println!("{} {}", "✓".bright_green(), describe(name, outcome)),
            // The call ran but the data had nothing for it
            Err(e) if e.is_data_condition() => {
                println!("{} {}: {}", "!".bright_yellow(), name, e)
            }
            Err(e) => println!("{} {}: {}", "✗".bright_red(), name, e),
        }
    }

    if let Some(secs) = serde_json::from_str::<GenerateResponse>(&text)
        .ok()
        .and_then(|r| r.total_duration_secs())
    {
        println!("Total duration: {} seconds", secs);
    }

    Ok(())
}

fn describe(name: &str, outcome: &OperationOutcome) -> String {
    match outcome {
        OperationOutcome::Extracted(stats) => format!(
            "{}: cleaned data saved to {}",
            name,
            stats.output_path.display()
        ),
        OperationOutcome::Statistics(stats) => format!(
            "{}: statistics saved to {}",
            name,
            stats.output_path.display()
        ),
        OperationOutcome::Distribution { slices } => {
            let parts: Vec<String> = slices
                .iter()
                .map(|s| {
                    format!(
                        "{} {}",
                        s.label,
                        s.share
                            .map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v * 100.0))
                    )
                })
                .collect();
            format!("{}: {}", name, parts.join(", "))
        }
        OperationOutcome::Trend { label, points } => {
            let parts: Vec<String> = points
                .iter()
                .map(|p| format!("{}={}", p.column, format_value(p.value)))
                .collect();
            format!("{}: {} {}", name, label, parts.join(", "))
        }
    }
}
