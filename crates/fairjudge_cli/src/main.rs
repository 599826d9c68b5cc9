//! `fairjudge` command-line entry point.
//!
//! # Responsibility
//! - Open a fair database and run one rebalance entry point.
//! - Print the resulting report as a summary line or JSON.

use clap::{Parser, Subcommand};
use fairjudge_core::config::{
    DEFAULT_MINIMUM_JUDGES_PER_PROJECT, DEFAULT_MINIMUM_PROJECTS_PER_JUDGE, DEFAULT_RUBRIC_ID,
};
use fairjudge_core::{
    default_log_level, init_logging, open_db, JudgeId, JudgingConfig, JudgingService, ProjectId,
    RebalanceReport, RubricId,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

/// Keep science fair judge assignments covered and balanced
#[derive(Parser, Debug)]
#[command(name = "fairjudge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Fair database file (created and migrated when missing)
    #[arg(long, env = "FAIRJUDGE_DB")]
    db: PathBuf,

    /// Rubric new assignments are created under
    #[arg(long, env = "FAIRJUDGE_RUBRIC", default_value_t = DEFAULT_RUBRIC_ID)]
    rubric: RubricId,

    /// Minimum judges per project
    #[arg(long, env = "FAIRJUDGE_MIN_JUDGES", default_value_t = DEFAULT_MINIMUM_JUDGES_PER_PROJECT)]
    min_judges: u32,

    /// Minimum projects per active judge
    #[arg(long, env = "FAIRJUDGE_MIN_PROJECTS", default_value_t = DEFAULT_MINIMUM_PROJECTS_PER_JUDGE)]
    min_projects: u32,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, env = "FAIRJUDGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "FAIRJUDGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, fill and balance every assignment
    Full,
    /// Rebalance after a project was added or re-categorized
    Project { id: ProjectId },
    /// Rebalance after a judge was added or changed eligibility
    Judge { id: JudgeId },
    /// Deactivate a judge and rebalance its assignments away
    Deactivate { id: JudgeId },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("fairjudge: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(|err| err.to_string())?;
    }

    let config = JudgingConfig::new(cli.rubric, cli.min_judges, cli.min_projects);
    config.validate().map_err(|err| err.to_string())?;

    let conn = open_db(&cli.db).map_err(|err| err.to_string())?;
    let service = JudgingService::new(&conn, config);
    let report = match cli.command {
        Command::Full => service.run_full_rebalance(),
        Command::Project { id } => service.run_for_changed_project(id),
        Command::Judge { id } => service.run_for_changed_judge(id),
        Command::Deactivate { id } => service.deactivate_judge(id),
    }
    .map_err(|err| {
        if err.is_busy() {
            format!("another rebalance holds the database; retry shortly ({err})")
        } else {
            err.to_string()
        }
    })?;

    info!(
        "event=cli_run module=cli status=ok trigger={} {}",
        report.trigger,
        report.summary()
    );
    print_report(&report, cli.json)
}

fn print_report(report: &RebalanceReport, json: bool) -> Result<(), String> {
    if json {
        let rendered = serde_json::to_string_pretty(report).map_err(|err| err.to_string())?;
        println!("{rendered}");
        return Ok(());
    }

    println!("trigger={} {}", report.trigger, report.summary());
    if let Some(direction) = report.direction {
        println!("direction={direction}");
    }
    for gap in &report.gaps {
        println!(
            "gap {:?} assigned={} target={}",
            gap.subject, gap.assigned, gap.target
        );
    }
    for failure in &report.failures {
        println!(
            "failed {} judge={} project={}: {}",
            failure.operation, failure.judge, failure.project, failure.message
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_scoped_subcommand_with_knobs() {
        let cli = Cli::try_parse_from([
            "fairjudge",
            "--db",
            "/tmp/fair.sqlite3",
            "--min-judges",
            "3",
            "project",
            "12",
        ])
        .expect("valid arguments");
        assert_eq!(cli.min_judges, 3);
        assert!(matches!(cli.command, Command::Project { id: 12 }));
    }

    #[test]
    fn rejects_missing_subcommand() {
        assert!(Cli::try_parse_from(["fairjudge", "--db", "/tmp/fair.sqlite3"]).is_err());
    }
}
