//! Staged changes against a parent dataset, committed atomically.

use crate::changes::DatasetChanges;
use crate::dataset::{self, Dataset};
use crate::error::TransactionError;
use crate::model::*;
use crate::pattern::QuadPattern;
use crate::updatable_dataset::{ReadableDataset, UpdatableDataset, replay};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// A set of additions and removals staged against a parent dataset.
///
/// The transaction reads through to its parent and never writes to it before [`commit`](Self::commit).
/// While it is open, it maintains:
/// * no quad is both in `added` and in `removed`,
/// * no quad of `added` is in the parent,
/// * every quad of `removed` is in the parent.
///
/// A transaction is itself an [`UpdatableDataset`]: transactions can be nested.
///
/// ```
/// use oxdelta::model::*;
/// use oxdelta::{Dataset, ReadableDataset, UpdatableDataset};
///
/// let ex = NamedNodeRef::new("http://example.com")?;
/// let old = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
/// let new = QuadRef::new(ex, ex, LiteralRef::new_simple_literal("new"), GraphNameRef::DefaultGraph);
///
/// let mut dataset = Dataset::new();
/// dataset.insert(old);
///
/// let mut transaction = dataset.start_transaction();
/// transaction.insert(new)?;
/// transaction.remove(old)?;
/// assert!(transaction.contains(new));
/// assert!(!transaction.parent().contains(new));
/// transaction.commit()?;
///
/// assert!(dataset.contains(new));
/// assert!(!dataset.contains(old));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug)]
#[must_use]
pub struct Transaction<'a, P: UpdatableDataset> {
    parent: &'a mut P,
    added: Dataset,
    removed: Dataset,
    state: TransactionState,
}

impl<'a, P: UpdatableDataset> Transaction<'a, P> {
    pub(crate) fn new(parent: &'a mut P) -> Self {
        Self {
            parent,
            added: Dataset::new(),
            removed: Dataset::new(),
            state: TransactionState::Open,
        }
    }

    /// The staged `(added, removed)` sets while they are not yet written to the parent.
    fn overlay(&self) -> Option<(&Dataset, &Dataset)> {
        (self.state == TransactionState::Open).then_some((&self.added, &self.removed))
    }
}

impl<P: UpdatableDataset> Transaction<'_, P>
where
    TransactionError: From<P::Error>,
{
    /// The dataset the changes are staged against.
    #[inline]
    pub fn parent(&self) -> &P {
        self.parent
    }

    /// If [`commit`](Self::commit) succeeded. Stays `true` after a rollback.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.state != TransactionState::Open
    }

    /// A copy of the staged diff, before or after commit.
    pub fn changes(&self) -> DatasetChanges {
        DatasetChanges::new(self.added.clone(), self.removed.clone())
    }

    /// Writes the staged diff to the parent in a single [`bulk`](UpdatableDataset::bulk) call.
    ///
    /// The staged diff is kept, see [`changes`](Self::changes).
    /// Every later mutation of this transaction fails with [`TransactionError::AlreadyCommitted`].
    pub fn commit(&mut self) -> Result<(), TransactionError> {
        self.check_open()?;
        self.parent.bulk(&self.changes())?;
        self.state = TransactionState::Committed;
        debug!(
            added = self.added.len(),
            removed = self.removed.len(),
            "Transaction committed"
        );
        Ok(())
    }

    /// Reverts a committed transaction by applying the inverse diff to the parent.
    ///
    /// The parent is assumed not to have been modified by anyone else since the commit.
    pub fn rollback(&mut self) -> Result<(), TransactionError> {
        if self.state != TransactionState::Committed {
            return Err(TransactionError::NotCommitted);
        }
        self.parent
            .bulk(&DatasetChanges::new(self.removed.clone(), self.added.clone()))?;
        self.state = TransactionState::RolledBack;
        debug!(
            added = self.removed.len(),
            removed = self.added.len(),
            "Transaction rolled back"
        );
        Ok(())
    }

    fn check_open(&self) -> Result<(), TransactionError> {
        if self.state == TransactionState::Open {
            Ok(())
        } else {
            Err(TransactionError::AlreadyCommitted)
        }
    }
}

impl<P: UpdatableDataset> ReadableDataset for Transaction<'_, P> {
    type Iter<'b>
        = TransactionIter<'b, P>
    where
        Self: 'b;

    /// The parent quads that are not removed, then the added ones.
    ///
    /// Once committed, the parent already holds the changes and is read directly.
    fn iter(&self) -> TransactionIter<'_, P> {
        let overlay = self.overlay();
        TransactionIter {
            parent: self.parent.iter(),
            removed: overlay.map(|(_, removed)| removed),
            added: overlay.map(|(added, _)| added.iter()),
        }
    }

    fn len(&self) -> usize {
        match self.overlay() {
            Some((added, removed)) => self.parent.len() - removed.len() + added.len(),
            None => self.parent.len(),
        }
    }

    fn contains(&self, quad: QuadRef<'_>) -> bool {
        match self.overlay() {
            Some((added, removed)) => {
                added.contains(quad) || (!removed.contains(quad) && self.parent.contains(quad))
            }
            None => self.parent.contains(quad),
        }
    }

    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Dataset {
        let mut result = self.parent.quads_for_pattern(pattern);
        if let Some((added, removed)) = self.overlay() {
            for quad in removed {
                result.remove(quad);
            }
            result.extend(added.quads_for_pattern(pattern).iter());
        }
        result
    }
}

impl<P: UpdatableDataset> UpdatableDataset for Transaction<'_, P>
where
    TransactionError: From<P::Error>,
{
    type Error = TransactionError;

    fn insert(&mut self, quad: QuadRef<'_>) -> Result<bool, TransactionError> {
        self.check_open()?;
        if self.removed.remove(quad) {
            Ok(true)
        } else if self.parent.contains(quad) {
            Ok(false)
        } else {
            Ok(self.added.insert(quad))
        }
    }

    fn remove(&mut self, quad: QuadRef<'_>) -> Result<bool, TransactionError> {
        self.check_open()?;
        if self.added.remove(quad) {
            Ok(true)
        } else if self.parent.contains(quad) {
            Ok(self.removed.insert(quad))
        } else {
            Ok(false)
        }
    }

    fn bulk(&mut self, changes: &DatasetChanges) -> Result<DatasetChanges, TransactionError> {
        self.check_open()?;
        replay(self, changes)
    }
}

/// Iterator returned by [`Transaction::iter`](ReadableDataset::iter).
pub struct TransactionIter<'b, P: ReadableDataset + 'b> {
    parent: P::Iter<'b>,
    removed: Option<&'b Dataset>,
    added: Option<dataset::Iter<'b>>,
}

impl<'b, P: ReadableDataset + 'b> Iterator for TransactionIter<'b, P> {
    type Item = QuadRef<'b>;

    fn next(&mut self) -> Option<QuadRef<'b>> {
        for quad in self.parent.by_ref() {
            if !self.removed.is_some_and(|removed| removed.contains(quad)) {
                return Some(quad);
            }
        }
        self.added.as_mut()?.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(name: &str) -> Quad {
        let node = NamedNode::new_unchecked(format!("http://example.com/{name}"));
        Quad::new(node.clone(), node.clone(), node, GraphName::DefaultGraph)
    }

    fn parent() -> Dataset {
        [quad("a"), quad("b")].iter().collect()
    }

    #[test]
    fn isolation() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        assert!(transaction.insert(quad("c").as_ref())?);
        assert!(transaction.contains(quad("c").as_ref()));
        assert!(!transaction.parent().contains(&quad("c")));
        assert!(transaction.remove(quad("a").as_ref())?);
        assert!(!transaction.contains(quad("a").as_ref()));
        assert!(transaction.parent().contains(&quad("a")));
        assert_eq!(transaction.len(), 2);
        drop(transaction);
        assert_eq!(dataset, parent());
        Ok(())
    }

    #[test]
    fn overlay_invariants() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        // Already present through the parent.
        assert!(!transaction.insert(quad("a").as_ref())?);
        // Nothing to remove.
        assert!(!transaction.remove(quad("z").as_ref())?);
        assert!(transaction.changes().is_empty());

        transaction.insert(quad("c").as_ref())?;
        transaction.remove(quad("c").as_ref())?;
        assert!(transaction.changes().is_empty());

        transaction.remove(quad("a").as_ref())?;
        transaction.remove(quad("a").as_ref())?;
        assert_eq!(transaction.changes().removed.len(), 1);
        assert_eq!(transaction.len(), 1);
        assert!(transaction.changes().is_well_formed());
        Ok(())
    }

    #[test]
    fn cancel_out_is_invisible() -> Result<(), TransactionError> {
        let mut base = parent();
        let untouched = base.start_transaction();
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        transaction.remove(quad("a").as_ref())?;
        transaction.insert(quad("a").as_ref())?;
        assert!(transaction.contains(quad("a").as_ref()));
        assert_eq!(transaction.len(), untouched.len());
        assert!(transaction.equals(&untouched));
        assert!(transaction.changes().is_empty());
        Ok(())
    }

    #[test]
    fn iteration_and_pattern() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        transaction.remove(quad("a").as_ref())?;
        transaction.insert(quad("c").as_ref())?;
        let expected: Dataset = [quad("b"), quad("c")].iter().collect();
        assert_eq!(transaction.iter().count(), 2);
        assert_eq!(transaction.to_dataset(), expected);
        let c = NamedNode::new_unchecked("http://example.com/c");
        let a = NamedNode::new_unchecked("http://example.com/a");
        assert_eq!(
            transaction.quads_for_pattern(&QuadPattern::new().with_subject(c)),
            [quad("c")].iter().collect::<Dataset>()
        );
        assert!(
            transaction
                .quads_for_pattern(&QuadPattern::new().with_subject(a))
                .is_empty()
        );
        Ok(())
    }

    #[test]
    fn commit_and_rollback() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        transaction.insert(quad("c").as_ref())?;
        transaction.remove(quad("a").as_ref())?;
        assert_eq!(transaction.rollback(), Err(TransactionError::NotCommitted));
        transaction.commit()?;
        assert!(transaction.is_committed());
        assert_eq!(transaction.parent().len(), 2);
        assert!(transaction.parent().contains(&quad("c")));
        assert!(!transaction.parent().contains(&quad("a")));
        // The diff is still readable.
        assert_eq!(transaction.changes().added.len(), 1);
        assert_eq!(transaction.changes().removed.len(), 1);

        transaction.rollback()?;
        assert_eq!(transaction.rollback(), Err(TransactionError::NotCommitted));
        assert_eq!(
            transaction.insert(quad("d").as_ref()),
            Err(TransactionError::AlreadyCommitted)
        );
        drop(transaction);
        assert_eq!(dataset, parent());
        Ok(())
    }

    #[test]
    fn reads_after_commit_and_rollback() -> Result<(), TransactionError> {
        let mut dataset = [quad("a")].iter().collect::<Dataset>();
        let mut transaction = dataset.start_transaction();
        transaction.insert(quad("c").as_ref())?;
        transaction.commit()?;
        let expected = [quad("a"), quad("c")].iter().collect::<Dataset>();
        assert_eq!(transaction.len(), 2);
        assert_eq!(transaction.iter().count(), 2);
        assert_eq!(transaction.to_dataset(), expected);
        assert!(transaction.contains(quad("c").as_ref()));
        assert_eq!(
            transaction.quads_for_pattern(&QuadPattern::new()),
            expected
        );
        transaction.rollback()?;
        assert_eq!(transaction.len(), 1);
        assert_eq!(transaction.iter().count(), 1);
        assert_eq!(transaction.to_dataset(), [quad("a")].iter().collect::<Dataset>());
        assert!(!transaction.contains(quad("c").as_ref()));

        // Removing most of the parent.
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        transaction.remove(quad("a").as_ref())?;
        transaction.remove(quad("b").as_ref())?;
        transaction.commit()?;
        assert_eq!(transaction.len(), 0);
        assert_eq!(transaction.iter().count(), 0);
        assert!(transaction.to_dataset().is_empty());
        transaction.rollback()?;
        assert_eq!(transaction.len(), 2);
        assert_eq!(transaction.to_dataset(), parent());
        Ok(())
    }

    #[test]
    fn committed_transaction_rejects_every_mutation() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut transaction = dataset.start_transaction();
        transaction.commit()?;
        assert_eq!(transaction.commit(), Err(TransactionError::AlreadyCommitted));
        // Even no-ops fail.
        assert_eq!(
            transaction.remove(quad("z").as_ref()),
            Err(TransactionError::AlreadyCommitted)
        );
        assert_eq!(
            transaction.insert(quad("a").as_ref()),
            Err(TransactionError::AlreadyCommitted)
        );
        assert_eq!(
            transaction.insert_all(std::iter::empty::<QuadRef<'_>>()),
            Err(TransactionError::AlreadyCommitted)
        );
        assert_eq!(
            transaction.remove_matches(&QuadPattern::new()),
            Err(TransactionError::AlreadyCommitted)
        );
        assert_eq!(
            transaction.bulk(&DatasetChanges::default()),
            Err(TransactionError::AlreadyCommitted)
        );
        Ok(())
    }

    #[test]
    fn nested() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut outer = dataset.start_transaction();
        outer.insert(quad("c").as_ref())?;
        {
            let mut inner = outer.start_transaction();
            inner.remove(quad("c").as_ref())?;
            inner.remove(quad("a").as_ref())?;
            inner.insert(quad("d").as_ref())?;
            assert_eq!(inner.len(), 2);
            inner.commit()?;
        }
        assert_eq!(
            outer.to_dataset(),
            [quad("b"), quad("d")].iter().collect::<Dataset>()
        );
        // The outer diff is relative to the dataset: `c` was never written.
        let changes = outer.changes();
        assert_eq!(changes.added, [quad("d")].iter().collect::<Dataset>());
        assert_eq!(changes.removed, [quad("a")].iter().collect::<Dataset>());
        outer.commit()?;
        drop(outer);
        assert_eq!(dataset, [quad("b"), quad("d")].iter().collect::<Dataset>());
        Ok(())
    }

    #[test]
    fn inner_commit_fails_on_committed_outer() -> Result<(), TransactionError> {
        let mut dataset = parent();
        let mut outer = dataset.start_transaction();
        outer.commit()?;
        let mut inner = outer.start_transaction();
        inner.insert(quad("c").as_ref())?;
        assert_eq!(inner.commit(), Err(TransactionError::AlreadyCommitted));
        assert!(!inner.is_committed());
        Ok(())
    }
}
