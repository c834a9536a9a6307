use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use csv::WriterBuilder;
use fpa_lib::{
    align::SearchStrategy,
    deinterleave::{deinterleave, ChannelOrder, Deinterleaved},
    io::{
        recording::{read_recording, read_recording_with_layout},
        results::{append_results, ResultRecord},
        text as text_io,
    },
    metrics::RaggedPolicy,
    normalize::normalize_by_exponential,
    pipeline::{
        analyze_behavior, analyze_behaviors, analyze_behaviors_parallel, AnalysisConfig,
        BehaviorSummary,
    },
    signal::{Behavior, ChannelKind, EventTimeUnit, Subject},
    window::BaselineAnchor,
};
use log::{info, warn};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

mod config;

#[derive(Parser)]
#[command(
    name = "fpa",
    version,
    about = "FPA: fiber-photometry behavior analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum UnitArg {
    #[value(name = "ms")]
    Milliseconds,
    Minutes,
}

impl From<UnitArg> for EventTimeUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Milliseconds => EventTimeUnit::Milliseconds,
            UnitArg::Minutes => EventTimeUnit::Minutes,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SearchArg {
    Linear,
    Sorted,
}

impl From<SearchArg> for SearchStrategy {
    fn from(search: SearchArg) -> Self {
        match search {
            SearchArg::Linear => SearchStrategy::Linear,
            SearchArg::Sorted => SearchStrategy::Sorted,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AnchorArg {
    Start,
    Stop,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RaggedArg {
    #[value(name = "common-prefix")]
    CommonPrefix,
    #[value(name = "available-events")]
    AvailableEvents,
}

/// Flags shared by every command that scores behaviors.
#[derive(Args, Debug)]
struct AnalysisArgs {
    #[arg(long, default_value_t = 300)]
    baseline_samples: usize,
    #[arg(long, default_value_t = 60.0)]
    sample_rate_hz: f64,
    #[arg(long, value_enum, default_value = "stop")]
    baseline_anchor: AnchorArg,
    #[arg(long, value_enum, default_value = "common-prefix")]
    ragged: RaggedArg,
    #[arg(long, value_enum, default_value = "ms")]
    unit: UnitArg,
    #[arg(long, value_enum, default_value = "linear")]
    search: SearchArg,
    /// Keep events whose behavior or baseline window is empty.
    #[arg(long)]
    keep_degenerate: bool,
}

impl AnalysisArgs {
    fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            baseline_samples: self.baseline_samples,
            sample_rate_hz: self.sample_rate_hz,
            baseline_anchor: match self.baseline_anchor {
                AnchorArg::Start => BaselineAnchor::Start,
                AnchorArg::Stop => BaselineAnchor::Stop,
            },
            ragged: match self.ragged {
                RaggedArg::CommonPrefix => RaggedPolicy::CommonPrefix,
                RaggedArg::AvailableEvents => RaggedPolicy::AvailableEvents,
            },
            event_unit: self.unit.into(),
            search: self.search.into(),
            exclude_degenerate: !self.keep_degenerate,
        }
    }
}

/// Raw indices at which the red, isosbestic and green phases start.
#[derive(Args, Debug)]
struct OrderArgs {
    #[arg(long, default_value_t = ChannelOrder::STANDARD.red)]
    red: usize,
    #[arg(long, default_value_t = ChannelOrder::STANDARD.isosbestic)]
    isosbestic: usize,
    #[arg(long, default_value_t = ChannelOrder::STANDARD.green)]
    green: usize,
}

impl OrderArgs {
    fn order(&self) -> ChannelOrder {
        ChannelOrder {
            red: self.red,
            isosbestic: self.isosbestic,
            green: self.green,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Split a raw recording into per-subject red/isosbestic/green series
    Deinterleave {
        #[arg(long)]
        input: PathBuf,
        /// Field separator; whitespace when omitted
        #[arg(long)]
        delimiter: Option<char>,
        /// Write one `subject<N>_<kind>.csv` per series into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        order: OrderArgs,
    },
    /// Find the nearest reference sample for each query time
    Align {
        /// Reference time base in minutes
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        times: PathBuf,
        #[arg(long, value_enum, default_value = "ms")]
        unit: UnitArg,
        #[arg(long, value_enum, default_value = "linear")]
        search: SearchArg,
    },
    /// Print a subject's green channel divided by its exponential bleaching fit
    Normalize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        subject: u8,
        #[arg(long)]
        delimiter: Option<char>,
        #[command(flatten)]
        order: OrderArgs,
    },
    /// Score one behavior against a normalized signal
    Analyze {
        /// Reference time base in minutes
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        normalized: PathBuf,
        #[arg(long)]
        start: PathBuf,
        #[arg(long)]
        stop: PathBuf,
        #[arg(long)]
        name: String,
        /// Append the result line to this file
        #[arg(long)]
        results: Option<PathBuf>,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Score every behavior listed in a TOML run config
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Analyze behaviors on separate threads
        #[arg(long)]
        parallel: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Deinterleave {
            input,
            delimiter,
            out_dir,
            order,
        } => cmd_deinterleave(&input, delimiter, &order.order(), out_dir.as_deref())?,
        Commands::Align {
            reference,
            times,
            unit,
            search,
        } => cmd_align(&reference, &times, unit.into(), search.into())?,
        Commands::Normalize {
            input,
            subject,
            delimiter,
            order,
        } => cmd_normalize(&input, subject, delimiter, &order.order())?,
        Commands::Analyze {
            reference,
            normalized,
            start,
            stop,
            name,
            results,
            analysis,
        } => cmd_analyze(
            &reference,
            &normalized,
            &start,
            &stop,
            name,
            results.as_deref(),
            &analysis.config(),
        )?,
        Commands::Run { config, parallel } => cmd_run(&config, parallel)?,
    }
    Ok(())
}

fn delimiter_byte(delimiter: Option<char>) -> Result<Option<u8>> {
    match delimiter {
        Some(c) if c.is_ascii() => Ok(Some(c as u8)),
        Some(c) => anyhow::bail!("delimiter must be a single ASCII character, got {:?}", c),
        None => Ok(None),
    }
}

fn subject_from_number(n: u8) -> Result<Subject> {
    Subject::from_number(n).with_context(|| format!("subject must be 1 or 2, got {}", n))
}

fn load_deinterleaved(
    input: &Path,
    delimiter: Option<char>,
    order: &ChannelOrder,
) -> Result<Deinterleaved> {
    let raw = read_recording(input, delimiter_byte(delimiter)?)?;
    Ok(deinterleave(&raw, order)?)
}

#[derive(Serialize)]
struct ChannelReport {
    subject: u8,
    kind: &'static str,
    len: usize,
    first_min: Option<f64>,
    last_min: Option<f64>,
    mean: Option<f64>,
}

#[derive(Serialize)]
struct DeinterleaveReport {
    len: usize,
    order: ChannelOrder,
    channels: Vec<ChannelReport>,
}

fn cmd_deinterleave(
    input: &Path,
    delimiter: Option<char>,
    order: &ChannelOrder,
    out_dir: Option<&Path>,
) -> Result<()> {
    let data = load_deinterleaved(input, delimiter, order)?;
    let channels = data
        .channels()
        .iter()
        .map(|series| ChannelReport {
            subject: series.subject.number(),
            kind: series.kind.name(),
            len: series.len(),
            first_min: series.timestamps.first().copied(),
            last_min: series.timestamps.last().copied(),
            mean: (!series.is_empty())
                .then(|| series.values.iter().sum::<f64>() / series.len() as f64),
        })
        .collect();
    if let Some(dir) = out_dir {
        write_channel_csvs(dir, &data)?;
    }
    let report = DeinterleaveReport {
        len: data.len(),
        order: *data.order(),
        channels,
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn write_channel_csvs(dir: &Path, data: &Deinterleaved) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for series in data.channels() {
        let path = dir.join(format!(
            "subject{}_{}.csv",
            series.subject.number(),
            series.kind.name()
        ));
        let mut writer = WriterBuilder::new()
            .from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(["time_min", "value"])?;
        for (t, v) in series.iter() {
            writer.write_record(&[t.to_string(), v.to_string()])?;
        }
        writer.flush()?;
    }
    Ok(())
}

#[derive(Serialize)]
struct AlignReport {
    indices: Vec<usize>,
    values: Vec<f64>,
}

fn cmd_align(
    reference: &Path,
    times: &Path,
    unit: EventTimeUnit,
    search: SearchStrategy,
) -> Result<()> {
    let reference = text_io::read_f64_series(reference)?;
    let queries = text_io::read_f64_series(times)?;
    let mut report = AlignReport {
        indices: Vec::with_capacity(queries.len()),
        values: Vec::with_capacity(queries.len()),
    };
    for q in queries {
        let idx = search.nearest_index(&reference, unit.to_minutes(q))?;
        report.indices.push(idx);
        report.values.push(reference[idx]);
    }
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_normalize(
    input: &Path,
    subject: u8,
    delimiter: Option<char>,
    order: &ChannelOrder,
) -> Result<()> {
    let subject = subject_from_number(subject)?;
    let data = load_deinterleaved(input, delimiter, order)?;
    let green = data.series(subject, ChannelKind::Green);
    let normalized = normalize_by_exponential(&green.timestamps, &green.values)?;
    for v in normalized {
        println!("{}", v);
    }
    Ok(())
}

fn cmd_analyze(
    reference: &Path,
    normalized: &Path,
    start: &Path,
    stop: &Path,
    name: String,
    results: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<()> {
    let reference = text_io::read_f64_series(reference)?;
    let signal = text_io::read_f64_series(normalized)?;
    let behavior = Behavior::new(name, text_io::read_behavior_events(start, stop)?);
    let summary = analyze_behavior(&reference, &signal, &behavior, config)
        .with_context(|| format!("analyzing {}", behavior.name))?;
    if let Some(path) = results {
        append_results(path, &[summary.record()])?;
    }
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

#[derive(Serialize)]
struct BehaviorReport {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BehaviorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BehaviorReport {
    fn failed(name: &str, error: String) -> Self {
        warn!("{}: {}", name, error);
        Self {
            name: name.to_string(),
            summary: None,
            error: Some(error),
        }
    }
}

fn cmd_run(config_path: &Path, parallel: bool) -> Result<()> {
    let run = config::read_run_config(config_path)?;
    let subject = run.recording.subject()?;
    let layout = run.recording.layout;
    let raw = read_recording_with_layout(
        &run.recording.path,
        delimiter_byte(run.recording.delimiter)?,
        &layout,
    )?;
    let data = deinterleave(&raw, &run.recording.channels)?;
    let green = data.series(subject, ChannelKind::Green);
    let reference = &green.timestamps;
    let signal = match &run.recording.normalized {
        Some(path) => text_io::read_f64_series(path)?,
        None => normalize_by_exponential(&green.timestamps, &green.values)
            .context("normalizing green channel")?,
    };
    info!(
        "subject {}: {} sample(s) per channel, {} behavior(s)",
        subject.number(),
        data.len(),
        run.behaviors.len()
    );

    let mut reports: Vec<Option<BehaviorReport>> = Vec::new();
    let mut slots = Vec::new();
    let mut behaviors = Vec::new();
    for entry in &run.behaviors {
        match text_io::read_behavior_events(&entry.start, &entry.stop) {
            Ok(events) => {
                slots.push(reports.len());
                reports.push(None);
                behaviors.push(Behavior::new(entry.name.clone(), events));
            }
            Err(err) => {
                let report = BehaviorReport::failed(&entry.name, format!("{:#}", err));
                reports.push(Some(report));
            }
        }
    }

    let outcomes = if parallel {
        analyze_behaviors_parallel(reference, &signal, &behaviors, &run.analysis)
    } else {
        analyze_behaviors(reference, &signal, &behaviors, &run.analysis)
    };

    let mut records: Vec<ResultRecord> = Vec::new();
    for (slot, outcome) in slots.into_iter().zip(outcomes) {
        let report = match outcome.result {
            Ok(summary) => {
                info!(
                    "{}: {} of {} event(s), auc {:.6}, peak z {:.4} at {:.3} s",
                    summary.name,
                    summary.analyzed_events,
                    summary.events,
                    summary.auc,
                    summary.peak.value,
                    summary.peak.seconds
                );
                records.push(summary.record());
                BehaviorReport {
                    name: outcome.name,
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(err) => BehaviorReport::failed(&outcome.name, err.to_string()),
        };
        reports[slot] = Some(report);
    }

    if let Some(path) = &run.output.results {
        append_results(path, &records)?;
    }
    let reports: Vec<BehaviorReport> = reports.into_iter().flatten().collect();
    println!("{}", serde_json::to_string(&reports)?);

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} behavior(s) failed", failed, reports.len());
    }
    Ok(())
}
