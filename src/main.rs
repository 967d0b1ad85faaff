//! CLI entry point for the grade analytics engine.
//!
//! Loads a CSV of course records, grades it against the configured scale,
//! and prints or exports the requested view.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use grade_analytics::{
    config::{AnalysisConfig, load_scale_spec},
    diagnostics::Diagnostics,
    loader::load_csv,
    output::{print_json, print_pretty, write_json, write_student_csv},
    scale::{GradeScale, ScalePreset, Thresholds},
    session::AnalysisSession,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "grade_analytics")]
#[command(about = "Grade course records and report GPA analytics", long_about = None)]
struct Cli {
    #[command(flatten)]
    input: InputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// CSV file of course records
    #[arg(long, global = true, value_name = "FILE")]
    csv: Option<String>,

    /// Grade scale preset (4.0, percentage, percentage-raw)
    #[arg(long, global = true, value_name = "PRESET")]
    scale: Option<ScalePreset>,

    /// JSON scale spec; takes precedence over --scale
    #[arg(long, global = true, value_name = "JSON")]
    scale_file: Option<String>,

    /// GPA a student needs to pass
    #[arg(long, global = true)]
    passing_threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print each student's GPA
    Gpa {
        /// Also write the GPA table to this CSV file
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Cohort-wide GPA statistics
    Summary,
    /// Per-course leaderboard
    Subjects {
        /// Show only the first N courses
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Per-department GPA statistics
    Departments,
    /// Term GPA per semester, in chronological order
    Trend,
    /// Highest-GPA students
    Top {
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
    /// Record counts per letter grade
    Distribution,
    /// Write every view to a JSON file
    Report {
        #[arg(short, long)]
        out: String,
    },
    /// Print the resolved grade scale
    Scale,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/grade_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("grade_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let (scale, thresholds) = resolve_config(&cli.input)?;

    if let Commands::Scale = cli.command {
        print_json(&scale)?;
        return Ok(());
    }

    let csv = cli
        .input
        .csv
        .as_deref()
        .context("--csv <FILE> is required for this command")?;
    let records = load_csv(csv)?;
    for row in records.rejected() {
        warn!(line = ?row.line, reason = %row.reason, "Rejected CSV row");
    }
    let session = AnalysisSession::new(records, scale, thresholds);

    match cli.command {
        Commands::Gpa { out } => {
            let report = session.gpa();
            for student in &report.students {
                info!(
                    student_id = %student.student_id,
                    name = %student.name,
                    gpa = %student.gpa,
                    credit_hours = student.total_credit_hours,
                    "Student GPA"
                );
            }
            report_diagnostics(&report.diagnostics);
            if let Some(path) = out {
                write_student_csv(&path, &report)?;
                info!(path = %path, "GPA table written");
            }
        }
        Commands::Summary => {
            let analysis = session.cohort_summary();
            print_json(&analysis.result)?;
            report_diagnostics(&analysis.diagnostics);
        }
        Commands::Subjects { limit } => {
            let mut analysis = session.subject_summaries();
            if let Some(limit) = limit {
                analysis.result.truncate(limit);
            }
            print_json(&analysis.result)?;
            report_diagnostics(&analysis.diagnostics);
        }
        Commands::Departments => {
            let analysis = session.department_summaries();
            print_json(&analysis.result)?;
            report_diagnostics(&analysis.diagnostics);
        }
        Commands::Trend => {
            let analysis = session.semester_trend();
            print_json(&analysis.result)?;
            report_diagnostics(&analysis.diagnostics);
        }
        Commands::Top { n } => {
            print_json(&session.top_students(n))?;
        }
        Commands::Distribution => {
            print_json(&session.grade_distribution())?;
        }
        Commands::Report { out } => {
            let bundle = session.bundle();
            write_json(&out, &bundle)?;
            report_diagnostics(&bundle.gpa.diagnostics);
        }
        Commands::Scale => {}
    }

    info!(cache = ?session.cache().stats(), "Done");
    Ok(())
}

/// Environment first, then CLI flags on top.
fn resolve_config(input: &InputArgs) -> Result<(GradeScale, Thresholds)> {
    let mut config = AnalysisConfig::from_env()?;
    if let Some(path) = &input.scale_file {
        config = config.with_scale(load_scale_spec(path)?);
    } else if let Some(preset) = input.scale {
        config = config.with_scale(preset.into());
    }
    if let Some(threshold) = input.passing_threshold {
        config = config.with_passing_gpa(threshold);
    }

    let (scale, thresholds) = config.resolve()?;
    info!(
        scale = scale.name(),
        passing_gpa = thresholds.passing_gpa,
        passing_grade_point = thresholds.passing_grade_point,
        "Configuration resolved"
    );
    Ok((scale, thresholds))
}

fn report_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_clean() {
        return;
    }
    warn!(
        skipped = diagnostics.skipped.len(),
        data_quality = diagnostics.data_quality.len(),
        undefined = diagnostics.undefined.len(),
        "Completed with warnings"
    );
    print_pretty(diagnostics);
}
