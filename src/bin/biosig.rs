//! Biosig CLI - Command-line interface for the biosignature engine
//!
//! Commands:
//! - score: Score aggregated metrics (health synergy score, band, pattern)
//! - weekly: Group dated samples into weeks and score each week
//! - snapshot: Evaluate the weekly snapshot gate for one user
//! - week-start: Print the Monday week key for a date
//! - doctor: Diagnose configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use biosignature_engine::config::EngineConfig;
use biosignature_engine::encoder::ReportEncoder;
use biosignature_engine::period::{format_date, parse_date, week_start};
use biosignature_engine::scoring::validate_weight_tables;
use biosignature_engine::types::{EnvironmentReading, MetricSample, MetricValues};
use biosignature_engine::{ComputeError, SynergyEngine, ENGINE_VERSION, PRODUCER_NAME};

/// Biosig - Deterministic health synergy and biosignature scoring
#[derive(Parser)]
#[command(name = "biosig")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score biometric samples into health bands and snapshots", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score aggregated metrics
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Group dated samples into weeks and score each week
    Weekly {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Evaluate the weekly snapshot gate
    Snapshot {
        /// Aggregated metrics file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Owner of the snapshot
        #[arg(long)]
        user_id: String,

        /// Creation time of the latest snapshot (RFC 3339)
        #[arg(long)]
        latest: Option<String>,

        /// Evaluation time (RFC 3339, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Latest environmental AQI reading
        #[arg(long)]
        env_aqi: Option<f64>,
    },

    /// Print the Monday (UTC) week key for a date
    WeekStart {
        /// Date (YYYY-MM-DD) or RFC 3339 timestamp
        date: String,
    },

    /// Diagnose configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// A single JSON document (object or array)
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `BIOSIG_LOG` (default `biosignature_engine=info`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("BIOSIG_LOG")
        .unwrap_or_else(|_| EnvFilter::new("biosignature_engine=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), BiosigCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Score {
            input,
            input_format,
            output_format,
        } => cmd_score(&config, &input, input_format, output_format),

        Commands::Weekly {
            input,
            input_format,
            output_format,
        } => cmd_weekly(&config, &input, input_format, output_format),

        Commands::Snapshot {
            input,
            user_id,
            latest,
            now,
            env_aqi,
        } => cmd_snapshot(
            &config,
            &input,
            &user_id,
            latest.as_deref(),
            now.as_deref(),
            env_aqi,
        ),

        Commands::WeekStart { date } => {
            let date = parse_date(&date)?;
            let monday = week_start(date).ok_or_else(|| {
                ComputeError::DateOutOfRange(format!("no representable week around {date}"))
            })?;
            println!("{}", format_date(monday));
            Ok(())
        }

        Commands::Doctor { json } => cmd_doctor(cli.config.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, BiosigCliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(EngineConfig::from_json(&json)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, BiosigCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

/// Parse NDJSON lines or a JSON document that is either one record or an array
fn parse_records<T: serde::de::DeserializeOwned>(
    data: &str,
    format: &InputFormat,
) -> Result<Vec<T>, BiosigCliError> {
    match format {
        InputFormat::Ndjson => data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    BiosigCliError::ParseError(format!("line {}: {}", index + 1, e))
                })
            })
            .collect(),
        InputFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(data)?;
            match value {
                serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
                other => Ok(vec![serde_json::from_value(other)?]),
            }
        }
    }
}

fn cmd_score(
    config: &EngineConfig,
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), BiosigCliError> {
    let engine = SynergyEngine::new(config.clone())?;
    let records: Vec<MetricValues> = parse_records(&read_input(input)?, &input_format)?;

    if records.is_empty() {
        return Err(BiosigCliError::NoRecords);
    }

    let reports: Vec<_> = records.iter().map(|values| engine.evaluate(values)).collect();
    print!("{}", format_output(&reports, &output_format)?);
    Ok(())
}

fn cmd_weekly(
    config: &EngineConfig,
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), BiosigCliError> {
    let engine = SynergyEngine::new(config.clone())?;
    let samples: Vec<MetricSample> = parse_records(&read_input(input)?, &input_format)?;

    if samples.is_empty() {
        return Err(BiosigCliError::NoRecords);
    }

    let outcomes = engine.score_samples(&samples)?;
    tracing::info!(
        samples = samples.len(),
        weeks = outcomes.len(),
        "weekly scoring complete"
    );
    print!("{}", format_output(&outcomes, &output_format)?);
    Ok(())
}

fn cmd_snapshot(
    config: &EngineConfig,
    input: &Path,
    user_id: &str,
    latest: Option<&str>,
    now: Option<&str>,
    env_aqi: Option<f64>,
) -> Result<(), BiosigCliError> {
    let engine = SynergyEngine::new(config.clone())?;
    let values: MetricValues = serde_json::from_str(&read_input(input)?)?;

    let latest = latest.map(parse_instant).transpose()?;
    let now = match now {
        Some(now) => parse_instant(now)?,
        None => Utc::now(),
    };
    let env = env_aqi.map(|aqi| EnvironmentReading {
        aqi,
        captured_at: now,
    });

    let decision = engine.snapshot(latest, &values, env.as_ref(), user_id, now);
    println!("{}", ReportEncoder::new().encode_to_json(&decision)?);
    Ok(())
}

fn parse_instant(input: &str) -> Result<DateTime<Utc>, BiosigCliError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ComputeError::DateParseError(format!("{input}: {e}")).into())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), BiosigCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    checks.push(match validate_weight_tables() {
        Ok(()) => DoctorCheck {
            name: "weight_tables".to_string(),
            status: CheckStatus::Ok,
            message: "Health synergy and biosignature quality weights sum to 100%".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "weight_tables".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    checks.push(match config_path {
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in configuration".to_string(),
        },
        Some(path) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        },
        Some(path) => match load_config(Some(path)) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (bands {}/{}, {} samples/week, {}-day cadence)",
                    config.band_thresholds.transitional_min,
                    config.band_thresholds.optimal_min,
                    config.min_samples_per_week,
                    config.snapshot_cadence_days
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", CliError::from(e).message),
            },
        },
    });

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a terminal (pass files with --input)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is piped (use --input -)".to_string(),
        }
    });

    let failed = checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {}", report.producer, report.version);
        for check in &report.checks {
            let marker = match check.status {
                CheckStatus::Ok => "ok",
                CheckStatus::Warning => "warn",
                CheckStatus::Error => "error",
            };
            println!("  [{:>5}] {}: {}", marker, check.name, check.message);
        }
    }

    if failed {
        Err(BiosigCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output<T: Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, BiosigCliError> {
    let encoder = ReportEncoder::new();
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(encoder.encode_to_line(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(encoder.encode_to_line(&records)? + "\n"),
        OutputFormat::JsonPretty => Ok(encoder.encode_to_json(&records)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum BiosigCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    ParseError(String),
    NoRecords,
    DoctorFailed,
}

impl From<io::Error> for BiosigCliError {
    fn from(e: io::Error) -> Self {
        BiosigCliError::Io(e)
    }
}

impl From<ComputeError> for BiosigCliError {
    fn from(e: ComputeError) -> Self {
        BiosigCliError::Compute(e)
    }
}

impl From<serde_json::Error> for BiosigCliError {
    fn from(e: serde_json::Error) -> Self {
        BiosigCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BiosigCliError> for CliError {
    fn from(e: BiosigCliError) -> Self {
        match e {
            BiosigCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BiosigCliError::Compute(e @ ComputeError::InvalidConfig(_))
            | BiosigCliError::Compute(e @ ComputeError::InvalidWeights { .. }) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'biosig doctor --config <file>' for details".to_string()),
            },
            BiosigCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check input values and dates".to_string()),
            },
            BiosigCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BiosigCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
            BiosigCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            BiosigCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
