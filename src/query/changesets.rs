use super::filter::{FilterSpec, NativeFilter, SequentialFilters};
use crate::backend::Backend;
use crate::error::Result;
use crate::model::Changeset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Ascending by committer name; ties keep backend order.
    CommitterName,
}

/// Lazily evaluated set of changesets.
///
/// Nothing is fetched until the query is first iterated. The fetched list is
/// cached until `filter` or `order_by` changes the query. Merge changesets
/// are never yielded.
pub struct ChangesetQuery<B> {
    backend: B,
    native: NativeFilter,
    sequential: SequentialFilters,
    order: Option<OrderBy>,
    cached: Option<Vec<Changeset>>,
}

impl<B: Backend> ChangesetQuery<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            native: NativeFilter::default(),
            sequential: SequentialFilters::new(),
            order: None,
            cached: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn filter(mut self, spec: FilterSpec) -> Self {
        spec.translate(&mut self.native, &mut self.sequential);
        self.cached = None;
        self
    }

    pub fn filters<I: IntoIterator<Item = FilterSpec>>(self, specs: I) -> Self {
        specs.into_iter().fold(self, |query, spec| query.filter(spec))
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self.cached = None;
        self
    }

    pub fn native_filter(&self) -> &NativeFilter {
        &self.native
    }

    /// Committer predicates that were requested but are not evaluated.
    pub fn sequential_filters(&self) -> &SequentialFilters {
        &self.sequential
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Iterate non-merge changesets, fetching on first use.
    pub fn iter(&mut self) -> Result<impl Iterator<Item = &Changeset> + '_> {
        let fetched = self.fetch()?;
        Ok(fetched.iter().filter(|cs| !cs.is_merge()))
    }

    pub fn all(&mut self) -> Result<Vec<Changeset>> {
        Ok(self.iter()?.cloned().collect())
    }

    fn fetch(&mut self) -> Result<&[Changeset]> {
        if self.cached.is_none() {
            if !self.sequential.is_empty() {
                let fields: Vec<String> = self
                    .sequential
                    .keys()
                    .map(|(field, _)| field.to_string())
                    .collect();
                log::warn!(
                    "Filters on {} are recorded but not applied",
                    fields.join(", ")
                );
            }

            let mut changesets = self.backend.changesets(&self.native)?;
            log::debug!("Fetched {} changesets with {:?}", changesets.len(), self.native);

            if let Some(OrderBy::CommitterName) = self.order {
                changesets.sort_by(|a, b| a.committer_name.cmp(&b.committer_name));
            }
            self.cached = Some(changesets);
        }
        Ok(self.cached.as_deref().unwrap_or_default())
    }
}
