use super::templates::Templates;
use crate::backend::Backend;
use crate::cancel::Cancellation;
use crate::diff::FileDiff;
use crate::error::{ReportError, Result};
use crate::model::{Changeset, CommitterSummary, CommitterTab, FileRevision};
use crate::query::ChangesetQuery;
use crate::util::html_escape;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub title: String,
    /// Prepended to changeset ids to build commit links.
    pub url_prefix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Version control report".to_string(),
            url_prefix: "#".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Fetch,
    Changesets,
    Summary,
    Done,
}

/// Files are only ever pulled from an open tab.
enum TabState {
    NoTabOpen,
    TabOpen {
        tab: CommitterTab,
        files: std::vec::IntoIter<FileRevision>,
    },
}

struct CommitterEntry {
    summary: CommitterSummary,
    first_tab: u32,
}

/// Produces the report as a lazy sequence of UTF-8 fragments.
///
/// Changesets are grouped into one tab per contiguous run of a committer.
/// Each changed file gets a diff summary and a side-by-side table, keyed by a
/// report-wide file-link id that starts at 0.
pub struct ReportAssembler<B> {
    query: ChangesetQuery<B>,
    templates: Templates,
    config: ReportConfig,
    cancel: Cancellation,
    stage: Stage,
    pending: VecDeque<Vec<u8>>,
    changesets: std::vec::IntoIter<Changeset>,
    tab: TabState,
    next_tab: u32,
    next_filelink: u64,
    committers: Vec<CommitterEntry>,
    committer_index: HashMap<String, usize>,
}

impl<B: Backend> ReportAssembler<B> {
    pub fn new(query: ChangesetQuery<B>, templates: Templates, config: ReportConfig) -> Self {
        Self {
            query,
            templates,
            config,
            cancel: Cancellation::default(),
            stage: Stage::Header,
            pending: VecDeque::new(),
            changesets: Vec::new().into_iter(),
            tab: TabState::NoTabOpen,
            next_tab: 0,
            next_filelink: 0,
            committers: Vec::new(),
            committer_index: HashMap::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Per-committer totals in order of first appearance.
    pub fn summary(&self) -> Vec<CommitterSummary> {
        self.committers.iter().map(|c| c.summary.clone()).collect()
    }

    /// Number of file-link ids handed out so far.
    pub fn files_rendered(&self) -> u64 {
        self.next_filelink
    }

    fn emit(&mut self, fragment: String) {
        self.pending.push_back(fragment.into_bytes());
    }

    /// Run one step of the state machine. Returns `false` once finished.
    fn advance(&mut self) -> Result<bool> {
        match self.stage {
            Stage::Header => {
                let header = self.templates.header.substitute(&[
                    ("title", &html_escape(&self.config.title)),
                    ("tabs_js", &self.templates.tabs_js),
                    ("tabs_css", &self.templates.tabs_css),
                    ("style_css", &self.templates.style_css),
                ])?;
                self.emit(header);
                self.stage = Stage::Fetch;
            }
            Stage::Fetch => {
                self.cancel.check()?;
                self.changesets = self.query.all()?.into_iter();
                log::info!("Building report from {} changesets", self.changesets.len());
                self.stage = Stage::Changesets;
            }
            Stage::Changesets => {
                self.cancel.check()?;
                if self.render_next_file()? {
                    return Ok(true);
                }
                if let Some(changeset) = self.changesets.next() {
                    self.begin_changeset(changeset)?;
                } else {
                    self.close_tab()?;
                    self.stage = Stage::Summary;
                }
            }
            Stage::Summary => {
                self.render_summary()?;
                self.stage = Stage::Done;
            }
            Stage::Done => return Ok(false),
        }
        Ok(true)
    }

    fn begin_changeset(&mut self, changeset: Changeset) -> Result<()> {
        let mut tab = match std::mem::replace(&mut self.tab, TabState::NoTabOpen) {
            TabState::TabOpen { tab, .. } if tab.committer == changeset.committer_name => tab,
            previous => {
                self.tab = previous;
                self.close_tab()?;
                self.open_tab(&changeset.committer_name)?
            }
        };

        let desc = self.templates.diffstat_desc.substitute(&[
            ("message", &html_escape(&changeset.message)),
            ("url_prefix", &html_escape(&self.config.url_prefix)),
            ("cid", &html_escape(&changeset.id)),
            ("short_cid", &html_escape(&changeset.short_id())),
        ])?;
        tab.changed_files.push_str(&desc);
        self.committer_mut(&changeset.committer_name).summary.changesets += 1;

        let files = self.query.backend().changed(&changeset)?.into_iter();
        self.tab = TabState::TabOpen { tab, files };
        Ok(())
    }

    /// Emit the top of a new tab and register the committer on first sight.
    fn open_tab(&mut self, committer: &str) -> Result<CommitterTab> {
        let id = self.next_tab;
        self.next_tab += 1;

        let top = self.templates.changeset_top.substitute(&[
            ("committer", &html_escape(committer)),
            ("tab_id", &id.to_string()),
        ])?;
        self.emit(top);

        if !self.committer_index.contains_key(committer) {
            self.committer_index.insert(committer.to_string(), self.committers.len());
            self.committers.push(CommitterEntry {
                summary: CommitterSummary {
                    committer: committer.to_string(),
                    added: 0,
                    removed: 0,
                    changesets: 0,
                    files: 0,
                },
                first_tab: id,
            });
        }
        log::debug!("Opened tab {id} for {committer}");
        Ok(CommitterTab::open(committer))
    }

    fn close_tab(&mut self) -> Result<()> {
        let TabState::TabOpen { tab, .. } = std::mem::replace(&mut self.tab, TabState::NoTabOpen) else {
            return Ok(());
        };
        let bottom = self.templates.changeset_bottom.substitute(&[
            ("changedfiles", &tab.changed_files),
            ("added", &tab.totals.added.to_string()),
            ("removed", &tab.totals.removed.to_string()),
        ])?;
        self.emit(bottom);
        Ok(())
    }

    /// Diff the next file of the open tab. Returns `false` when there is none.
    fn render_next_file(&mut self) -> Result<bool> {
        let TabState::TabOpen { tab, files } = &mut self.tab else {
            return Ok(false);
        };
        let Some(file) = files.next() else {
            return Ok(false);
        };

        let path = file.path.clone();
        let diff = match FileDiff::new(self.query.backend(), file, None) {
            Ok(diff) => diff,
            Err(ReportError::NotFound { path, changeset }) => {
                log::warn!("Skipping {path} in {changeset}: no previous revision");
                return Ok(true);
            }
            Err(err) => return Err(err),
        };

        let stat = diff.stats();
        let filelink = self.next_filelink;
        self.next_filelink += 1;

        let diffstat = self.templates.diffstat.substitute(&[
            ("path", &html_escape(&path)),
            ("added", &stat.added.to_string()),
            ("removed", &stat.removed.to_string()),
            ("filelink", &filelink.to_string()),
        ])?;
        let table = format!(
            "<div class=\"filediff\" id=\"file-{filelink}\">\n{}</div>\n",
            diff.as_html()
        );

        tab.totals += stat;
        tab.changed_files.push_str(&diffstat);

        let entry = &mut self.committers[self.committer_index[tab.committer.as_str()]];
        entry.summary.added += stat.added;
        entry.summary.removed += stat.removed;
        entry.summary.files += 1;

        self.pending.push_back(diffstat.into_bytes());
        self.pending.push_back(table.into_bytes());
        Ok(true)
    }

    fn render_summary(&mut self) -> Result<()> {
        let mut tabs = String::new();
        for entry in &self.committers {
            tabs.push_str(&self.templates.committer_tab.substitute(&[
                ("committer", &html_escape(&entry.summary.committer)),
                ("added", &entry.summary.added.to_string()),
                ("removed", &entry.summary.removed.to_string()),
                ("tab_id", &entry.first_tab.to_string()),
            ])?);
        }
        let footer = self.templates.footer.substitute(&[
            ("committers_tabs", &tabs),
            ("generated_at", &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ])?;
        self.emit(footer);
        Ok(())
    }

    fn committer_mut(&mut self, committer: &str) -> &mut CommitterEntry {
        let idx = self.committer_index[committer];
        &mut self.committers[idx]
    }
}

impl<B: Backend> Iterator for ReportAssembler<B> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(Ok(fragment));
            }
            match self.advance() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    self.stage = Stage::Done;
                    return Some(Err(err));
                }
            }
        }
    }
}
