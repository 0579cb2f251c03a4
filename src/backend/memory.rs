use super::Backend;
use crate::error::{ReportError, Result};
use crate::model::{Changeset, FileRevision};
use crate::query::NativeFilter;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

struct MemoryCommit {
    changeset: Changeset,
    /// `None` content marks a deletion.
    changes: Vec<(String, Option<String>)>,
}

/// Linear, scripted history held in memory.
///
/// Each call to [`MemoryRepo::commit`] appends a changeset whose first parent
/// is the previous one. [`MemoryRepo::merge`] appends one with a second
/// parent.
#[derive(Default)]
pub struct MemoryRepo {
    commits: Vec<MemoryCommit>,
    index: HashMap<String, usize>,
    branch: Option<String>,
    hidden: HashSet<(String, String)>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every following changeset with `branch`.
    pub fn set_branch(&mut self, branch: Option<&str>) {
        self.branch = branch.map(str::to_string);
    }

    pub fn commit(
        &mut self,
        committer: &str,
        timestamp: DateTime<Utc>,
        message: &str,
        changes: &[(&str, Option<&str>)],
    ) -> String {
        self.push(committer, timestamp, message, changes, None)
    }

    pub fn merge(
        &mut self,
        committer: &str,
        timestamp: DateTime<Utc>,
        message: &str,
        other_parent: &str,
        changes: &[(&str, Option<&str>)],
    ) -> String {
        self.push(committer, timestamp, message, changes, Some(other_parent))
    }

    /// Leave `changeset_id` out of the history reported for `path`, the way
    /// some backends do around window boundaries.
    pub fn hide_from_history(&mut self, changeset_id: &str, path: &str) {
        self.hidden.insert((changeset_id.to_string(), path.to_string()));
    }

    pub fn changeset(&self, id: &str) -> Option<&Changeset> {
        self.index.get(id).map(|&i| &self.commits[i].changeset)
    }

    fn push(
        &mut self,
        committer: &str,
        timestamp: DateTime<Utc>,
        message: &str,
        changes: &[(&str, Option<&str>)],
        other_parent: Option<&str>,
    ) -> String {
        let id = format!("{:040x}", self.commits.len() + 1);
        let mut parent_ids: Vec<String> = self
            .commits
            .last()
            .map(|c| vec![c.changeset.id.clone()])
            .unwrap_or_default();
        if let Some(other) = other_parent {
            parent_ids.push(other.to_string());
        }

        let changeset = Changeset {
            id: id.clone(),
            message: message.to_string(),
            committer_name: committer.to_string(),
            committer_email: format!("{}@example.com", committer.to_lowercase()),
            timestamp,
            parent_ids,
            branch: self.branch.clone(),
        };
        let changes = changes
            .iter()
            .map(|(path, content)| (path.to_string(), content.map(str::to_string)))
            .collect();

        self.index.insert(id.clone(), self.commits.len());
        self.commits.push(MemoryCommit { changeset, changes });
        id
    }

    fn lookup(&self, id: &str) -> Result<&MemoryCommit> {
        self.index
            .get(id)
            .map(|&i| &self.commits[i])
            .ok_or_else(|| ReportError::Backend(format!("Unknown changeset {id}")))
    }

    /// First-parent chain starting at (and including) `id`.
    fn first_parents<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a MemoryCommit> + 'a {
        let mut next = self.index.get(id).copied();
        std::iter::from_fn(move || {
            let commit = &self.commits[next?];
            next = commit
                .changeset
                .parent_ids
                .first()
                .and_then(|p| self.index.get(p).copied());
            Some(commit)
        })
    }
}

impl Backend for MemoryRepo {
    fn changesets(&self, filter: &NativeFilter) -> Result<Vec<Changeset>> {
        Ok(self
            .commits
            .iter()
            .map(|c| &c.changeset)
            .filter(|cs| filter.matches(cs))
            .cloned()
            .collect())
    }

    fn changed(&self, changeset: &Changeset) -> Result<Vec<FileRevision>> {
        let commit = self.lookup(&changeset.id)?;
        Ok(commit
            .changes
            .iter()
            .filter_map(|(path, content)| {
                content
                    .as_ref()
                    .map(|c| FileRevision::new(path.clone(), c.clone(), commit.changeset.clone()))
            })
            .collect())
    }

    fn history(&self, file: &FileRevision) -> Result<Vec<Changeset>> {
        self.lookup(&file.changeset.id)?;
        Ok(self
            .first_parents(&file.changeset.id)
            .filter(|c| c.changes.iter().any(|(p, _)| p == &file.path))
            .filter(|c| !self.hidden.contains(&(c.changeset.id.clone(), file.path.clone())))
            .map(|c| c.changeset.clone())
            .collect())
    }

    fn node(&self, changeset: &Changeset, path: &str) -> Result<Option<FileRevision>> {
        self.lookup(&changeset.id)?;
        let latest = self
            .first_parents(&changeset.id)
            .find_map(|c| c.changes.iter().find(|(p, _)| p == path).map(|(_, content)| content));

        Ok(latest
            .and_then(|content| content.as_ref())
            .map(|content| FileRevision::new(path, content.clone(), changeset.clone())))
    }

    fn predecessor(&self, changeset: &Changeset) -> Result<Option<Changeset>> {
        let commit = self.lookup(&changeset.id)?;
        Ok(commit
            .changeset
            .parent_ids
            .first()
            .and_then(|p| self.changeset(p))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 4, 24, hour, 0, 0).unwrap()
    }

    #[test]
    fn history_is_most_recent_first_and_per_path() {
        let mut repo = MemoryRepo::new();
        let c1 = repo.commit("alice", at(1), "init", &[("a.txt", Some("1")), ("b.txt", Some("x"))]);
        let _c2 = repo.commit("bob", at(2), "b only", &[("b.txt", Some("y"))]);
        let c3 = repo.commit("alice", at(3), "a again", &[("a.txt", Some("2"))]);

        let rev = repo.changed(repo.changeset(&c3).unwrap()).unwrap().remove(0);
        let ids: Vec<String> = repo.history(&rev).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c3, c1]);
    }

    #[test]
    fn node_sees_latest_content_and_deletions() {
        let mut repo = MemoryRepo::new();
        repo.commit("alice", at(1), "init", &[("a.txt", Some("one"))]);
        let c2 = repo.commit("alice", at(2), "other", &[("b.txt", Some("b"))]);
        let c3 = repo.commit("alice", at(3), "rm", &[("a.txt", None)]);

        let cs2 = repo.changeset(&c2).unwrap().clone();
        let node = repo.node(&cs2, "a.txt").unwrap().unwrap();
        assert_eq!(node.content, "one");
        assert_eq!(node.changeset.id, c2);

        let cs3 = repo.changeset(&c3).unwrap().clone();
        assert!(repo.node(&cs3, "a.txt").unwrap().is_none());
        assert!(repo.changed(&cs3).unwrap().is_empty());
    }

    #[test]
    fn merge_has_two_parents() {
        let mut repo = MemoryRepo::new();
        let c1 = repo.commit("alice", at(1), "init", &[("a.txt", Some("1"))]);
        let c2 = repo.commit("bob", at(2), "work", &[("a.txt", Some("2"))]);
        let m = repo.merge("bob", at(3), "merge", &c1, &[]);

        let merge = repo.changeset(&m).unwrap();
        assert!(merge.is_merge());
        assert_eq!(merge.parent_ids, vec![c2.clone(), c1]);
        assert_eq!(repo.predecessor(merge).unwrap().unwrap().id, c2);
    }
}
