use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Git repository error: {0}")]
    GitRepo(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("No previous revision of {path} found for changeset {changeset}")]
    NotFound { path: String, changeset: String },
    #[error("Template {template} references unknown placeholder ${placeholder}")]
    Template { template: String, placeholder: String },
    #[error("Report generation cancelled")]
    Cancelled,
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
}

impl ReportError {
    /// Whether the error only means a single file cannot be diffed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReportError::NotFound { .. })
    }
}

// gix errors are large; keep them boxed so `Result<T>` stays small.
impl From<gix::object::find::existing::Error> for ReportError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        ReportError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for ReportError {
    fn from(err: gix::object::commit::Error) -> Self {
        ReportError::Commit(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for ReportError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        ReportError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for ReportError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        ReportError::HeadPeel(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for ReportError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        ReportError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for ReportError {
    fn from(err: gix::objs::decode::Error) -> Self {
        ReportError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for ReportError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        ReportError::DiffTreeToTree(Box::new(err))
    }
}

impl From<gix::discover::Error> for ReportError {
    fn from(err: gix::discover::Error) -> Self {
        ReportError::GitDiscover(Box::new(err))
    }
}
