use crate::dataset::Dataset;
use crate::model::*;

/// A diff between two states of a dataset: the quads that were added and the ones that were removed.
///
/// A well-formed diff never has the same quad on both sides. The `record_*`
/// builders and [`merge`](Self::merge) keep that invariant.
///
/// ```
/// use oxdelta::DatasetChanges;
/// use oxdelta::model::*;
///
/// let ex = NamedNodeRef::new("http://example.com")?;
/// let quad = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
///
/// let mut changes = DatasetChanges::default();
/// changes.record_added(quad);
/// changes.record_removed(quad);
/// assert!(changes.is_empty());
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DatasetChanges {
    /// Quads that were added.
    pub added: Dataset,
    /// Quads that were removed.
    pub removed: Dataset,
}

impl DatasetChanges {
    #[inline]
    pub fn new(added: Dataset, removed: Dataset) -> Self {
        Self { added, removed }
    }

    /// A diff only adding quads.
    #[inline]
    pub fn from_added(added: Dataset) -> Self {
        Self {
            added,
            removed: Dataset::new(),
        }
    }

    /// A diff only removing quads.
    #[inline]
    pub fn from_removed(removed: Dataset) -> Self {
        Self {
            added: Dataset::new(),
            removed,
        }
    }

    /// Checks if neither side contains a quad.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The number of changed quads, both sides included.
    #[inline]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Records an addition. Cancels a pending removal of the same quad.
    pub fn record_added<'a>(&mut self, quad: impl Into<QuadRef<'a>>) {
        let quad = quad.into();
        if !self.removed.remove(quad) {
            self.added.insert(quad);
        }
    }

    /// Records a removal. Cancels a pending addition of the same quad.
    pub fn record_removed<'a>(&mut self, quad: impl Into<QuadRef<'a>>) {
        let quad = quad.into();
        if !self.added.remove(quad) {
            self.removed.insert(quad);
        }
    }

    /// The diff undoing this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            added: self.removed.clone(),
            removed: self.added.clone(),
        }
    }

    /// Composes this diff with one applied after it.
    ///
    /// Assuming both diffs were effective (only adding absent quads and removing present ones),
    /// the result is the diff between the state before `self` and the state after `later`.
    pub fn merge(&mut self, later: &Self) {
        for quad in &later.removed {
            self.record_removed(quad);
        }
        for quad in &later.added {
            self.record_added(quad);
        }
    }

    /// Checks that no quad is both added and removed.
    pub fn is_well_formed(&self) -> bool {
        let (small, large) = if self.added.len() <= self.removed.len() {
            (&self.added, &self.removed)
        } else {
            (&self.removed, &self.added)
        };
        small.iter().all(|quad| !large.contains(quad))
    }
}
