use crate::cancel::Cancellation;
use crate::git::GitRepo;
use crate::model::{CommitterSummary, ReportSummary, SCHEMA_VERSION};
use crate::report::{daily_query, render_to_file, ReportAssembler, ReportConfig, TemplateSet};
use crate::util::parse_report_window;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use console::style;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "vcsreport")]
#[command(about = "Render a day of repository history as an HTML report, one tab per committer")]
#[command(version)]
pub struct Cli {
    #[arg(short = 'r', long = "repository", value_name = "DIR", default_value = ".", help = "Path to the repository")]
    pub repository: PathBuf,

    #[arg(short = 'f', long = "file", value_name = "FILE", default_value = "vcs_report.html", help = "Write report to FILE")]
    pub file: PathBuf,

    #[arg(short = 'd', long = "date", value_name = "DATE", help = "Report date (YYYY-MM-DD), or \"START END\" for a window; defaults to today")]
    pub date: Option<String>,

    #[arg(short = 'u', long = "url-prefix", value_name = "PREFIX", default_value = "", help = "Prefix for commit links in the report")]
    pub url_prefix: String,

    #[arg(short = 'b', long = "branch", value_name = "NAME", help = "Only follow history reachable from this branch")]
    pub branch: Option<String>,

    #[arg(long, value_name = "DIR", help = "Directory with template files overriding the built-in ones")]
    pub templates: Option<PathBuf>,

    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, help = "Abort if the report takes longer than this (e.g. 90s, 5m)")]
    pub timeout: Option<Duration>,

    #[arg(long, help = "Print per-committer totals as JSON")]
    pub json: bool,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, help = "More log output (repeat for debug)")]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn execute(self) -> Result<()> {
        let cancel = self.timeout.map(Cancellation::with_timeout).unwrap_or_default();
        let repo = GitRepo::open(Some(&self.repository))
            .context("Failed to open git repository")?
            .with_cancellation(cancel.clone());

        let date = self
            .date
            .clone()
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
        let (start, end) = parse_report_window(&date).context("Failed to resolve report date")?;

        let mut template_set = TemplateSet::builtin();
        if let Some(dir) = &self.templates {
            template_set = template_set.with_overrides(dir);
        }
        let templates = template_set.load().context("Failed to load templates")?;

        let query = daily_query(&repo, start, Some(end), self.branch.as_deref())
            .context("Failed to build changeset query")?;
        let config = ReportConfig {
            title: format!("Changes from {} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
            url_prefix: if self.url_prefix.is_empty() {
                "#".to_string()
            } else {
                self.url_prefix.clone()
            },
        };
        let assembler = ReportAssembler::new(query, templates, config).with_cancellation(cancel);
        let committers = render_to_file(assembler, &self.file)
            .with_context(|| format!("Failed to write report to {}", self.file.display()))?;

        if self.json {
            let summary = ReportSummary {
                version: SCHEMA_VERSION,
                generated_at: Utc::now(),
                repository_path: repo.path().to_string_lossy().to_string(),
                output_path: self.file.to_string_lossy().to_string(),
                since: start,
                until: end,
                committers,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            output_summary(&committers, &self.file, start, end);
        }

        Ok(())
    }
}

fn output_summary(committers: &[CommitterSummary], file: &std::path::Path, start: DateTime<Utc>, end: DateTime<Utc>) {
    println!(
        "{} {} ({} to {})",
        style("Report written to").bold(),
        file.display(),
        style(start.format("%Y-%m-%d")).dim(),
        style(end.format("%Y-%m-%d")).dim()
    );
    if committers.is_empty() {
        println!("No changesets in this window.");
        return;
    }

    println!(
        "{:<30} {:>10} {:>6} {:>8} {:>8}",
        style("Committer").bold(),
        style("Changesets").bold(),
        style("Files").bold(),
        style("Added").bold(),
        style("Removed").bold()
    );
    println!("{}", "─".repeat(66));
    for c in committers {
        println!(
            "{:<30} {:>10} {:>6} {:>8} {:>8}",
            c.committer,
            c.changesets,
            c.files,
            style(format!("+{}", c.added)).green(),
            style(format!("-{}", c.removed)).red()
        );
    }
}
