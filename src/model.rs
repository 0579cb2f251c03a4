use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

pub const SCHEMA_VERSION: u32 = 1;

/// One recorded change in the repository history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub id: String,
    pub message: String,
    pub committer_name: String,
    pub committer_email: String,
    pub timestamp: DateTime<Utc>,
    pub parent_ids: Vec<String>,
    pub branch: Option<String>,
}

impl Changeset {
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    pub fn short_id(&self) -> String {
        self.id.chars().take(12).collect()
    }
}

/// Content of one path as of a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRevision {
    pub path: String,
    pub content: String,
    pub changeset: Changeset,
}

impl FileRevision {
    pub fn new(path: impl Into<String>, content: impl Into<String>, changeset: Changeset) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            changeset,
        }
    }

    /// Revision with no content, standing in for a file that did not exist yet.
    pub fn empty(path: impl Into<String>, changeset: Changeset) -> Self {
        Self::new(path, String::new(), changeset)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStat {
    pub added: u64,
    pub removed: u64,
}

impl DiffStat {
    pub fn new(added: u64, removed: u64) -> Self {
        Self { added, removed }
    }
}

impl AddAssign for DiffStat {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.removed += rhs.removed;
    }
}

/// A contiguous run of changesets by one committer while the report is being built.
#[derive(Debug, Clone)]
pub struct CommitterTab {
    pub committer: String,
    pub totals: DiffStat,
    pub changed_files: String,
}

impl CommitterTab {
    pub fn open(committer: impl Into<String>) -> Self {
        Self {
            committer: committer.into(),
            totals: DiffStat::default(),
            changed_files: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitterSummary {
    pub committer: String,
    pub added: u64,
    pub removed: u64,
    pub changesets: u32,
    pub files: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub output_path: String,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub committers: Vec<CommitterSummary>,
}

/// Half-open `[since, until)` window over changeset timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp >= &until {
                return false;
            }
        }
        true
    }
}
