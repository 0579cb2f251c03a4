//! Line diffs between two revisions of one file.

mod html;

use crate::backend::Backend;
use crate::error::{ReportError, Result};
use crate::model::{DiffStat, FileRevision};
use similar::{capture_diff_slices, Algorithm, ChangeTag, DiffOp};
use std::cell::OnceCell;

/// Lines of unchanged context kept around each change in the HTML table.
pub const CONTEXT_LINES: usize = 5;
pub const TAB_SIZE: usize = 4;
pub const WRAP_COLUMN: usize = 80;

pub struct FileDiff {
    current: FileRevision,
    previous: FileRevision,
    stats: OnceCell<DiffStat>,
}

impl FileDiff {
    /// Diff `current` against `previous`, or against the revision resolved
    /// from the backend when `previous` is `None`.
    pub fn new<B: Backend>(
        backend: &B,
        current: FileRevision,
        previous: Option<FileRevision>,
    ) -> Result<Self> {
        let previous = match previous {
            Some(prev) => prev,
            None => resolve_previous(backend, &current)?,
        };
        Ok(Self::between(previous, current))
    }

    pub fn between(previous: FileRevision, current: FileRevision) -> Self {
        Self {
            current,
            previous,
            stats: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.current.path
    }

    pub fn current(&self) -> &FileRevision {
        &self.current
    }

    pub fn previous(&self) -> &FileRevision {
        &self.previous
    }

    /// Added and removed line counts, computed on first call.
    pub fn stats(&self) -> DiffStat {
        *self.stats.get_or_init(|| {
            let mut stat = DiffStat::default();
            for line in self.as_plain() {
                if line.starts_with('+') {
                    stat.added += 1;
                } else if line.starts_with('-') {
                    stat.removed += 1;
                }
            }
            stat
        })
    }

    /// Every line of both revisions, prefixed `+ `, `- ` or two spaces.
    pub fn as_plain(&self) -> impl Iterator<Item = String> + '_ {
        let old = split_lines(&self.previous.content);
        let new = split_lines(&self.current.content);
        let ops = capture_diff_slices(Algorithm::Myers, &old, &new);

        ops.into_iter().flat_map(move |op| {
            op.iter_changes(&old, &new)
                .map(|change| {
                    let marker = match change.tag() {
                        ChangeTag::Insert => "+ ",
                        ChangeTag::Delete => "- ",
                        ChangeTag::Equal => "  ",
                    };
                    format!("{marker}{}", change.value())
                })
                .collect::<Vec<_>>()
        })
    }

    /// Side-by-side table of the changed regions with surrounding context.
    pub fn as_html(&self) -> String {
        let old = split_lines(&self.previous.content);
        let new = split_lines(&self.current.content);
        let ops: Vec<DiffOp> = capture_diff_slices(Algorithm::Myers, &old, &new);

        html::render_table(&self.previous.path, &self.current.path, &old, &new, ops)
    }
}

fn split_lines(content: &str) -> Vec<&str> {
    content.split('\n').collect()
}

/// Find the revision `current` should be compared against.
///
/// The owning changeset is looked up in the file's own history and the next
/// older entry is used. When the changeset is the oldest entry the file was
/// created there and an empty revision is returned. When it is missing from
/// the history altogether, the repository-wide predecessor is used instead.
pub fn resolve_previous<B: Backend>(backend: &B, current: &FileRevision) -> Result<FileRevision> {
    let changeset = &current.changeset;
    let history = backend.history(current)?;

    if let Some(pos) = history.iter().position(|cs| cs.id == changeset.id) {
        return match history.get(pos + 1) {
            Some(older) => Ok(backend
                .node(older, &current.path)?
                .unwrap_or_else(|| FileRevision::empty(current.path.clone(), older.clone()))),
            None => Ok(FileRevision::empty(current.path.clone(), changeset.clone())),
        };
    }

    log::error!(
        "Could not find {} for {} in its history, falling back to the parent changeset",
        changeset.short_id(),
        current.path
    );

    let not_found = || ReportError::NotFound {
        path: current.path.clone(),
        changeset: changeset.id.clone(),
    };
    let parent = backend.predecessor(changeset)?.ok_or_else(not_found)?;
    backend.node(&parent, &current.path)?.ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryRepo;
    use crate::model::Changeset;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 4, 24, hour, 0, 0).unwrap()
    }

    fn changeset(id: &str) -> Changeset {
        Changeset {
            id: id.to_string(),
            message: String::new(),
            committer_name: "alice".into(),
            committer_email: "alice@example.com".into(),
            timestamp: at(0),
            parent_ids: vec![],
            branch: None,
        }
    }

    fn diff(old: &str, new: &str) -> FileDiff {
        FileDiff::between(
            FileRevision::new("a.txt", old, changeset("1")),
            FileRevision::new("a.txt", new, changeset("2")),
        )
    }

    #[test]
    fn plain_diff_marks_lines() {
        let d = diff("one\ntwo\nthree", "one\n2\nthree");
        let lines: Vec<String> = d.as_plain().collect();
        assert_eq!(lines, vec!["  one", "- two", "+ 2", "  three"]);
    }

    #[test]
    fn stats_count_added_and_removed() {
        let d = diff("one\ntwo\nthree\n", "one\n2\nthree\nfour\n");
        assert_eq!(d.stats(), DiffStat::new(2, 1));
        assert_eq!(d.stats(), DiffStat::new(2, 1));
    }

    #[test]
    fn content_starting_with_markers_is_context() {
        let d = diff("+x\n-y\n", "+x\n-y\n");
        assert_eq!(d.stats(), DiffStat::default());
    }

    #[test]
    fn zero_diff_is_cached_too() {
        let d = diff("same\n", "same\n");
        assert_eq!(d.stats(), DiffStat::default());
        assert!(d.stats.get().is_some());
    }

    #[test]
    fn previous_comes_from_file_history() {
        let mut repo = MemoryRepo::new();
        repo.commit("alice", at(1), "init", &[("a.txt", Some("one\n"))]);
        repo.commit("bob", at(2), "other", &[("b.txt", Some("b\n"))]);
        let c3 = repo.commit("alice", at(3), "edit", &[("a.txt", Some("one\ntwo\n"))]);

        let current = repo.changed(repo.changeset(&c3).unwrap()).unwrap().remove(0);
        let d = FileDiff::new(&repo, current, None).unwrap();
        assert_eq!(d.previous().content, "one\n");
        assert_eq!(d.stats(), DiffStat::new(1, 0));
    }

    #[test]
    fn created_file_diffs_against_empty() {
        let mut repo = MemoryRepo::new();
        let c1 = repo.commit("alice", at(1), "init", &[("a.txt", Some("one\ntwo\n"))]);

        let current = repo.changed(repo.changeset(&c1).unwrap()).unwrap().remove(0);
        let d = FileDiff::new(&repo, current, None).unwrap();
        assert_eq!(d.previous().content, "");
        assert_eq!(d.stats(), DiffStat::new(2, 0));
    }

    #[test]
    fn missing_history_entry_falls_back_to_parent() {
        let mut repo = MemoryRepo::new();
        repo.commit("alice", at(1), "init", &[("a.txt", Some("one\n"))]);
        let c2 = repo.commit("alice", at(2), "edit", &[("a.txt", Some("uno\n"))]);
        repo.hide_from_history(&c2, "a.txt");

        let current = repo.changed(repo.changeset(&c2).unwrap()).unwrap().remove(0);
        let d = FileDiff::new(&repo, current, None).unwrap();
        assert_eq!(d.previous().content, "one\n");
        assert_eq!(d.stats(), DiffStat::new(1, 1));
    }

    #[test]
    fn unresolvable_previous_is_not_found() {
        let mut repo = MemoryRepo::new();
        let c1 = repo.commit("alice", at(1), "init", &[("a.txt", Some("one\n"))]);
        repo.hide_from_history(&c1, "a.txt");

        let current = repo.changed(repo.changeset(&c1).unwrap()).unwrap().remove(0);
        let err = FileDiff::new(&repo, current, None).err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn explicit_previous_skips_resolution() {
        let repo = MemoryRepo::new();
        let d = FileDiff::new(
            &repo,
            FileRevision::new("a.txt", "b\n", changeset("2")),
            Some(FileRevision::new("a.txt", "a\n", changeset("1"))),
        )
        .unwrap();
        assert_eq!(d.stats(), DiffStat::new(1, 1));
    }
}
