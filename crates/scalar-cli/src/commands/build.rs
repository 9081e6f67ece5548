//! Build command - run Scala compile tasks and report their outcomes

use anyhow::{bail, Context, Result};
use colored::Colorize;
use scalar_build::{BuildReport, BuildStats, Builder, TaskOutcome, TaskResult};
use std::path::PathBuf;

/// Build command arguments
#[derive(Default)]
pub struct BuildArgs {
    /// Tasks to run; empty runs every task
    pub tasks: Vec<String>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
    /// Ignore stored fingerprints
    pub rerun: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
    /// JSON output
    pub json: bool,
    /// Project directory
    pub project_dir: PathBuf,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let mut builder =
        Builder::new(&args.project_dir).context("Failed to load project configuration")?;
    if let Some(jobs) = args.jobs {
        builder = builder.with_jobs(jobs);
    }
    builder = builder.with_rerun(args.rerun);
    tracing::debug!(tasks = ?args.tasks, rerun = args.rerun, "build requested");

    let report = builder.build(&args.tasks).context("Build failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        if !args.quiet {
            print!("{}", render(report.results(), report.stats(), report.success()));
        }
        // Compile failures carry the compiler output verbatim in their message
        for failure in report.failures() {
            eprintln!("{} {}", "error:".red().bold(), failure.error.to_string().trim_end());
        }
    }

    if let Some(failure) = report.first_failure() {
        bail!("Task '{}' failed ({})", failure.task, failure.error.kind());
    }
    if !report.success() {
        bail!(
            "{} task(s) were not attempted",
            report.not_attempted().len()
        );
    }
    Ok(())
}

/// One line per task followed by a summary line
fn render(results: &[TaskResult], stats: &BuildStats, success: bool) -> String {
    let mut out = String::new();
    for result in results {
        let label = result.outcome.to_string();
        let status = match result.outcome {
            TaskOutcome::Success => String::new(),
            TaskOutcome::UpToDate | TaskOutcome::NoSource => {
                format!(" {}", label.as_str().dimmed())
            }
            TaskOutcome::Failed => format!(" {}", label.as_str().red().bold()),
            TaskOutcome::NotAttempted => format!(" {}", label.as_str().yellow()),
        };
        out.push_str(&format!("> Task :{}{}\n", result.name, status));
    }

    let headline = if success {
        "BUILD SUCCESSFUL".green().bold()
    } else {
        "BUILD FAILED".red().bold()
    };
    out.push_str(&format!(
        "\n{} in {:.2}s\n{} tasks: {} executed, {} up-to-date, {} no-source, {} failed, {} not attempted\n",
        headline,
        stats.total_time.as_secs_f64(),
        stats.total_tasks,
        stats.executed,
        stats.up_to_date,
        stats.no_source,
        stats.failed,
        stats.not_attempted,
    ));
    out
}

fn report_json(report: &BuildReport) -> serde_json::Value {
    let failures: Vec<_> = report
        .failures()
        .iter()
        .map(|f| {
            serde_json::json!({
                "task": f.task,
                "kind": f.error.kind().to_string(),
                "message": f.error.to_string(),
                "diagnostics": f.error.diagnostics(),
            })
        })
        .collect();

    serde_json::json!({
        "success": report.success(),
        "tasks": report.results(),
        "failures": failures,
        "stats": report.stats(),
    })
}
