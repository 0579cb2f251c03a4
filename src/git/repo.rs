use crate::backend::Backend;
use crate::cancel::Cancellation;
use crate::error::{ReportError, Result};
use crate::model::{Changeset, FileRevision};
use crate::query::NativeFilter;
use chrono::DateTime;
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One path touched by a commit relative to its first parent.
#[derive(Debug, Clone)]
struct PathChange {
    path: String,
    /// Blob after the change; `None` when the path was removed.
    blob: Option<ObjectId>,
}

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
    changes: RefCell<HashMap<ObjectId, Rc<Vec<PathChange>>>>,
    cancel: Cancellation,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self {
            repo,
            path,
            changes: RefCell::new(HashMap::new()),
            cancel: Cancellation::default(),
        })
    }

    /// Abort history walks once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tip(&self, branch: Option<&str>) -> Result<ObjectId> {
        match branch {
            Some(name) => {
                let id = self
                    .repo
                    .rev_parse_single(name)
                    .map_err(|e| ReportError::GitRepo(format!("Unknown branch '{name}': {e}")))?;
                let commit = id
                    .object()?
                    .try_into_commit()
                    .map_err(|_| ReportError::GitRepo(format!("Not a commit: {name}")))?;
                Ok(commit.id)
            }
            None => {
                let mut head = self.repo.head()?;
                Ok(head.peel_to_commit_in_place()?.id)
            }
        }
    }

    fn parse_id(id: &str) -> Result<ObjectId> {
        ObjectId::from_hex(id.as_bytes())
            .map_err(|e| ReportError::Parse(format!("Invalid commit ID {id}: {e}")))
    }

    fn first_parent(&self, id: ObjectId) -> Result<Option<ObjectId>> {
        let commit = self.repo.find_commit(id)?;
        let parent = commit.parent_ids().next().map(|p| p.detach());
        Ok(parent)
    }

    fn to_changeset(&self, id: ObjectId, branch: Option<&str>) -> Result<Changeset> {
        let commit = self.repo.find_commit(id)?;
        let secs = commit.time()?.seconds;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| ReportError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

        let committer = commit.committer()?;
        let message = commit.message()?;
        let mut text = message.title.to_string();
        if let Some(body) = message.body {
            text.push_str("\n\n");
            text.push_str(&body.to_string());
        }

        Ok(Changeset {
            id: id.to_string(),
            message: text.trim_end().to_string(),
            committer_name: committer.name.to_string(),
            committer_email: committer.email.to_string(),
            timestamp,
            parent_ids: commit.parent_ids().map(|p| p.to_string()).collect(),
            branch: branch.map(str::to_string),
        })
    }

    /// Paths touched by `id` against its first parent, cached per commit.
    fn path_changes(&self, id: ObjectId) -> Result<Rc<Vec<PathChange>>> {
        if let Some(hit) = self.changes.borrow().get(&id) {
            return Ok(Rc::clone(hit));
        }

        let commit = self.repo.find_commit(id)?;
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_ids().next() {
            Some(pid) => Some(self.repo.find_commit(pid.detach())?.tree()?),
            None => None,
        };
        let diff: Vec<ChangeDetached> =
            self.repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let mut changes = Vec::new();
        for change in diff {
            match change {
                ChangeDetached::Addition { entry_mode, .. }
                | ChangeDetached::Modification { entry_mode, .. }
                | ChangeDetached::Deletion { entry_mode, .. }
                    if entry_mode.is_tree() => {}
                ChangeDetached::Addition { id, location, .. }
                | ChangeDetached::Modification { id, location, .. } => changes.push(PathChange {
                    path: location.to_string(),
                    blob: Some(id),
                }),
                ChangeDetached::Deletion { location, .. } => changes.push(PathChange {
                    path: location.to_string(),
                    blob: None,
                }),
                ChangeDetached::Rewrite {
                    id,
                    source_location,
                    location,
                    copy,
                    ..
                } => {
                    if !copy {
                        changes.push(PathChange {
                            path: source_location.to_string(),
                            blob: None,
                        });
                    }
                    changes.push(PathChange {
                        path: location.to_string(),
                        blob: Some(id),
                    });
                }
            }
        }

        let changes = Rc::new(changes);
        self.changes.borrow_mut().insert(id, Rc::clone(&changes));
        Ok(changes)
    }

    /// Walk the first-parent chain starting at `id`, inclusive.
    fn walk_first_parents<F>(&self, id: ObjectId, mut visit: F) -> Result<()>
    where
        F: FnMut(ObjectId, &[PathChange]) -> Result<bool>,
    {
        let mut next = Some(id);
        while let Some(current) = next {
            self.cancel.check()?;
            let changes = self.path_changes(current)?;
            if !visit(current, &changes)? {
                break;
            }
            next = self.first_parent(current)?;
        }
        Ok(())
    }

    fn read_blob(&self, id: ObjectId) -> Result<Option<String>> {
        let obj = self.repo.find_object(id)?;
        if is_binary(obj.data.as_slice()) {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(obj.data.as_slice()).into_owned()))
    }
}

const HISTORY_DEPTH: usize = 2;

fn is_binary(data: &[u8]) -> bool {
    data.iter().take(8192).any(|&b| b == 0)
}

impl Backend for GitRepo {
    fn changesets(&self, filter: &NativeFilter) -> Result<Vec<Changeset>> {
        let tip = self.tip(filter.branch_name.as_deref())?;
        let range = filter.window();

        let mut changesets = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack: VecDeque<ObjectId> = VecDeque::from([tip]);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Collecting changesets...");

        while let Some(commit_id) = stack.pop_back() {
            if !seen.insert(commit_id) {
                continue;
            }
            if let Err(err) = self.cancel.check() {
                pb.finish_and_clear();
                return Err(err);
            }

            let commit = self.repo.find_commit(commit_id)?;
            let secs = commit.time()?.seconds;
            let timestamp = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| ReportError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

            for pid in commit.parent_ids() {
                stack.push_back(pid.detach());
            }

            if range.contains(&timestamp) {
                changesets.push(self.to_changeset(commit_id, filter.branch_name.as_deref())?);
                pb.inc(1);
            }
        }

        pb.finish_and_clear();
        changesets.sort_by_key(|cs| cs.timestamp);
        log::debug!("Collected {} changesets from {}", changesets.len(), self.path.display());
        Ok(changesets)
    }

    fn changed(&self, changeset: &Changeset) -> Result<Vec<FileRevision>> {
        let id = Self::parse_id(&changeset.id)?;
        let mut files = Vec::new();

        for change in self.path_changes(id)?.iter() {
            let Some(blob) = change.blob else {
                continue;
            };
            match self.read_blob(blob)? {
                Some(content) => files.push(FileRevision::new(
                    change.path.clone(),
                    content,
                    changeset.clone(),
                )),
                None => log::debug!("Skipping binary file {}", change.path),
            }
        }
        Ok(files)
    }

    /// Stops after the revision's own changeset and the one before it; the
    /// diff never looks further back.
    fn history(&self, file: &FileRevision) -> Result<Vec<Changeset>> {
        let start = Self::parse_id(&file.changeset.id)?;
        let mut touched = Vec::new();
        self.walk_first_parents(start, |id, changes| {
            if changes.iter().any(|c| c.path == file.path) {
                touched.push(id);
            }
            Ok(touched.len() < HISTORY_DEPTH)
        })?;

        touched
            .into_iter()
            .map(|id| self.to_changeset(id, file.changeset.branch.as_deref()))
            .collect()
    }

    fn node(&self, changeset: &Changeset, path: &str) -> Result<Option<FileRevision>> {
        let start = Self::parse_id(&changeset.id)?;
        let mut found: Option<Option<ObjectId>> = None;
        self.walk_first_parents(start, |_, changes| {
            match changes.iter().find(|c| c.path == path) {
                Some(change) => {
                    found = Some(change.blob);
                    Ok(false)
                }
                None => Ok(true),
            }
        })?;

        let Some(Some(blob)) = found else {
            return Ok(None);
        };
        Ok(self
            .read_blob(blob)?
            .map(|content| FileRevision::new(path, content, changeset.clone())))
    }

    fn predecessor(&self, changeset: &Changeset) -> Result<Option<Changeset>> {
        let id = Self::parse_id(&changeset.id)?;
        self.first_parent(id)?
            .map(|parent| self.to_changeset(parent, changeset.branch.as_deref()))
            .transpose()
    }
}
