//! HTML report assembly and output.

pub mod assemble;
pub mod stream;
pub mod templates;

pub use assemble::{ReportAssembler, ReportConfig};
pub use stream::FragmentStream;
pub use templates::{Template, TemplateSet, TemplateSource, Templates};

use crate::backend::Backend;
use crate::error::Result;
use crate::model::CommitterSummary;
use crate::query::{ChangesetQuery, FilterSpec, OrderBy};
use chrono::{DateTime, Duration, Utc};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Query for the daily report: one window, grouped by committer.
/// Without `end` the window is the 24 hours from `start`.
pub fn daily_query<B: Backend>(
    backend: B,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    branch: Option<&str>,
) -> Result<ChangesetQuery<B>> {
    let end = end.unwrap_or(start + Duration::days(1));
    let mut specs = vec![FilterSpec::date_range(start, end)?];
    specs.extend(branch.map(|name| FilterSpec::BranchName(name.to_string())));
    Ok(ChangesetQuery::new(backend)
        .filters(specs)
        .order_by(OrderBy::CommitterName))
}

/// Stream the whole report into `writer`.
pub fn render_to<B: Backend, W: Write>(
    assembler: ReportAssembler<B>,
    writer: &mut W,
) -> Result<Vec<CommitterSummary>> {
    let mut fragments = FragmentStream::new(assembler);
    io::copy(&mut fragments, writer).map_err(stream::from_io)?;
    Ok(fragments.into_inner().summary())
}

/// Write the report to `path`.
///
/// Output goes to a sibling `.partial` file that is renamed into place only
/// after the last fragment is written, so a failed run leaves no report.
pub fn render_to_file<B: Backend>(
    assembler: ReportAssembler<B>,
    path: &Path,
) -> Result<Vec<CommitterSummary>> {
    let partial = partial_path(path);
    let result = (|| -> Result<Vec<CommitterSummary>> {
        let mut writer = BufWriter::new(File::create(&partial)?);
        let summary = render_to(assembler, &mut writer)?;
        writer.flush()?;
        Ok(summary)
    })();

    match result {
        Ok(summary) => {
            fs::rename(&partial, path)?;
            log::info!("Report written to {}", path.display());
            Ok(summary)
        }
        Err(err) => {
            if let Err(rm) = fs::remove_file(&partial) {
                log::debug!("Could not remove {}: {rm}", partial.display());
            }
            Err(err)
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Convenience for callers that want the report in memory.
pub fn render_to_string<B: Backend>(assembler: ReportAssembler<B>) -> Result<(String, Vec<CommitterSummary>)> {
    let mut buf = Vec::new();
    let summary = render_to(assembler, &mut buf)?;
    let html = String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok((html, summary))
}
