//! The version-control capability the report is built on.
//!
//! Everything the query, diff and report layers know about a repository goes
//! through [`Backend`]. [`crate::git::GitRepo`] implements it over a git
//! repository; [`MemoryRepo`] keeps a scripted history in memory.

pub mod memory;

pub use memory::MemoryRepo;

use crate::error::Result;
use crate::model::{Changeset, FileRevision};
use crate::query::NativeFilter;

pub trait Backend {
    /// Changesets matching the native filter, oldest first.
    fn changesets(&self, filter: &NativeFilter) -> Result<Vec<Changeset>>;

    /// Files whose content changed in `changeset`. Deleted paths are not listed.
    fn changed(&self, changeset: &Changeset) -> Result<Vec<FileRevision>>;

    /// Changesets that touched `file.path`, most recent first, starting from
    /// the revision's own changeset. A backend may stop once it has the entry
    /// preceding that changeset.
    fn history(&self, file: &FileRevision) -> Result<Vec<Changeset>>;

    /// The file at `path` as of `changeset`, or `None` if it did not exist.
    fn node(&self, changeset: &Changeset, path: &str) -> Result<Option<FileRevision>>;

    /// Immediate predecessor in repository-wide history (first parent).
    fn predecessor(&self, changeset: &Changeset) -> Result<Option<Changeset>>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn changesets(&self, filter: &NativeFilter) -> Result<Vec<Changeset>> {
        (**self).changesets(filter)
    }

    fn changed(&self, changeset: &Changeset) -> Result<Vec<FileRevision>> {
        (**self).changed(changeset)
    }

    fn history(&self, file: &FileRevision) -> Result<Vec<Changeset>> {
        (**self).history(file)
    }

    fn node(&self, changeset: &Changeset, path: &str) -> Result<Option<FileRevision>> {
        (**self).node(changeset, path)
    }

    fn predecessor(&self, changeset: &Changeset) -> Result<Option<Changeset>> {
        (**self).predecessor(changeset)
    }
}
