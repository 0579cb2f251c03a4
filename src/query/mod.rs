pub mod changesets;
pub mod filter;

pub use changesets::{ChangesetQuery, OrderBy};
pub use filter::{FilterSpec, NativeFilter, Operator, SequentialField, SequentialFilters};
