//! The read and write surfaces shared by [`Dataset`], [`SubscribableDataset`](crate::SubscribableDataset)
//! and [`Transaction`].

use crate::changes::DatasetChanges;
use crate::dataset::Dataset;
use crate::error::EmptyReduceError;
use crate::loader::BulkLoader;
use crate::model::*;
use crate::pattern::QuadPattern;
use crate::transaction::Transaction;
use std::error::Error;

/// Read access to a set of quads, with set algebra and functional traversal.
///
/// Every operation building a new set returns an owned [`Dataset`].
pub trait ReadableDataset {
    type Iter<'a>: Iterator<Item = QuadRef<'a>>
    where
        Self: 'a;

    /// All the quads. The order is unspecified but stable while the dataset is not mutated.
    fn iter(&self) -> Self::Iter<'_>;

    /// Returns the number of quads in this dataset.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, quad: QuadRef<'_>) -> bool;

    /// The quads matching the pattern, copied into a new dataset.
    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Dataset {
        self.filter(|quad| pattern.matches(quad))
    }

    /// Copies the quads into a standalone dataset.
    fn to_dataset(&self) -> Dataset {
        self.iter().collect()
    }

    /// Copies the quads into a vector, in iteration order.
    fn to_vec(&self) -> Vec<Quad> {
        self.iter().map(QuadRef::into_owned).collect()
    }

    /// The quads contained in either `self` or `other`.
    fn union(&self, other: &impl ReadableDataset) -> Dataset {
        let mut result = self.to_dataset();
        result.extend(other.iter());
        result
    }

    /// The quads contained in both `self` and `other`.
    ///
    /// Iterates over the smaller of the two and probes the larger one.
    fn intersection(&self, other: &impl ReadableDataset) -> Dataset {
        if self.len() <= other.len() {
            self.iter().filter(|quad| other.contains(*quad)).collect()
        } else {
            other.iter().filter(|quad| self.contains(*quad)).collect()
        }
    }

    /// The quads of `self` that are not in `other`.
    fn difference(&self, other: &impl ReadableDataset) -> Dataset {
        self.iter().filter(|quad| !other.contains(*quad)).collect()
    }

    /// Checks if every quad of `other` is in `self`.
    fn is_superset(&self, other: &impl ReadableDataset) -> bool {
        other.len() <= self.len() && other.iter().all(|quad| self.contains(quad))
    }

    /// Set equality.
    fn equals(&self, other: &impl ReadableDataset) -> bool {
        self.len() == other.len() && self.iter().all(|quad| other.contains(quad))
    }

    /// Checks if all the quads satisfy the predicate. `true` on an empty dataset.
    fn every(&self, mut predicate: impl FnMut(QuadRef<'_>) -> bool) -> bool {
        self.iter().all(|quad| predicate(quad))
    }

    /// Checks if at least one quad satisfies the predicate.
    fn some(&self, mut predicate: impl FnMut(QuadRef<'_>) -> bool) -> bool {
        self.iter().any(|quad| predicate(quad))
    }

    /// The quads satisfying the predicate, copied into a new dataset.
    fn filter(&self, mut predicate: impl FnMut(QuadRef<'_>) -> bool) -> Dataset {
        self.iter().filter(|quad| predicate(*quad)).collect()
    }

    /// Applies `f` to every quad. Quads mapped to the same result are merged.
    fn map(&self, mut f: impl FnMut(QuadRef<'_>) -> Quad) -> Dataset {
        let mut result = Dataset::new();
        for quad in self.iter() {
            result.insert(&f(quad));
        }
        result
    }

    /// Calls `f` on every quad.
    fn for_each(&self, mut f: impl FnMut(QuadRef<'_>)) {
        for quad in self.iter() {
            f(quad);
        }
    }

    /// Folds the quads into an accumulator starting from `initial`.
    fn fold<A>(&self, initial: A, mut f: impl FnMut(A, QuadRef<'_>) -> A) -> A {
        self.iter().fold(initial, |accumulator, quad| f(accumulator, quad))
    }

    /// Folds the quads using the first one as initial accumulator.
    ///
    /// Fails if the dataset is empty.
    fn reduce(
        &self,
        mut f: impl FnMut(Quad, QuadRef<'_>) -> Quad,
    ) -> Result<Quad, EmptyReduceError> {
        let mut iter = self.iter();
        let first = iter.next().ok_or(EmptyReduceError)?.into_owned();
        Ok(iter.fold(first, |accumulator, quad| f(accumulator, quad)))
    }
}

/// Write access to a set of quads.
///
/// Every write returns its effective result: the quads that actually changed.
pub trait UpdatableDataset: ReadableDataset {
    type Error: Error + 'static;

    /// Adds a quad. Returns `true` if it was not already present.
    fn insert(&mut self, quad: QuadRef<'_>) -> Result<bool, Self::Error>;

    /// Removes a quad. Returns `true` if it was present.
    fn remove(&mut self, quad: QuadRef<'_>) -> Result<bool, Self::Error>;

    /// Applies a combined diff and returns the effective changes.
    ///
    /// Removals are applied first. A quad on both sides ends up present.
    /// This default implementation replays the diff one quad at a time;
    /// implementations with an atomic update path override it.
    fn bulk(&mut self, changes: &DatasetChanges) -> Result<DatasetChanges, Self::Error> {
        replay(self, changes)
    }

    /// Adds all the quads and returns the ones that were not already present.
    fn insert_all<'b>(
        &mut self,
        quads: impl IntoIterator<Item = impl Into<QuadRef<'b>>>,
    ) -> Result<DatasetChanges, Self::Error> {
        let added: Dataset = quads.into_iter().collect();
        self.bulk(&DatasetChanges::from_added(added))
    }

    /// Removes all the quads matching the pattern and returns them.
    fn remove_matches(&mut self, pattern: &QuadPattern) -> Result<DatasetChanges, Self::Error> {
        let removed = self.quads_for_pattern(pattern);
        self.bulk(&DatasetChanges::from_removed(removed))
    }

    /// Starts staging changes against this dataset.
    ///
    /// Nothing is written here until [`Transaction::commit`] is called.
    fn start_transaction(&mut self) -> Transaction<'_, Self>
    where
        Self: Sized,
    {
        Transaction::new(self)
    }

    /// Imports a stream of quads in batches.
    fn bulk_loader(&mut self) -> BulkLoader<'_, Self>
    where
        Self: Sized,
    {
        BulkLoader::new(self)
    }
}

/// Applies `changes` quad by quad, removals first.
pub(crate) fn replay<D: UpdatableDataset + ?Sized>(
    dataset: &mut D,
    changes: &DatasetChanges,
) -> Result<DatasetChanges, D::Error> {
    let mut applied = DatasetChanges::default();
    for quad in &changes.removed {
        if !changes.added.contains(quad) && dataset.remove(quad)? {
            applied.removed.insert(quad);
        }
    }
    for quad in &changes.added {
        if dataset.insert(quad)? {
            applied.added.insert(quad);
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(s: &str, o: &str) -> Quad {
        Quad::new(
            NamedNode::new_unchecked(format!("http://example.com/{s}")),
            NamedNode::new_unchecked("http://example.com/p"),
            NamedNode::new_unchecked(format!("http://example.com/{o}")),
            GraphName::DefaultGraph,
        )
    }

    fn dataset(quads: &[Quad]) -> Dataset {
        quads.iter().collect()
    }

    #[test]
    fn algebra_laws() {
        let a = dataset(&[quad("a", "1"), quad("a", "2"), quad("b", "1")]);
        let b = dataset(&[quad("a", "2"), quad("c", "1")]);

        let union = a.union(&b);
        assert_eq!(union.len(), 4);
        assert!(union.len() >= a.len().max(b.len()));
        assert!(union.is_superset(&a));
        assert!(union.is_superset(&b));

        assert_eq!(a.intersection(&b), b.intersection(&a));
        assert_eq!(a.intersection(&b), dataset(&[quad("a", "2")]));

        assert!(a.difference(&a).is_empty());
        assert_eq!(a.difference(&b), dataset(&[quad("a", "1"), quad("b", "1")]));

        assert!(a.equals(&a));
        assert!(!a.equals(&b));
        assert!(Dataset::new().equals(&Dataset::new()));
        assert!(a.is_superset(&Dataset::new()));
        assert!(!b.is_superset(&a));
    }

    #[test]
    fn functional_traversal() {
        let a = dataset(&[quad("a", "1"), quad("a", "2"), quad("b", "1")]);
        assert!(a.every(|q| q.predicate.as_str() == "http://example.com/p"));
        let subject = |name: &'static str| -> SubjectRef<'static> {
            SubjectRef::NamedNode(NamedNodeRef::new_unchecked(name))
        };
        assert!(a.some(|q| q.subject == subject("http://example.com/b")));
        assert!(!a.some(|q| q.subject == subject("http://example.com/z")));
        assert_eq!(
            a.filter(|q| q.subject == subject("http://example.com/a"))
                .len(),
            2
        );
        // Collapsing every object merges quads.
        let mapped = a.map(|q| {
            Quad::new(
                q.subject.into_owned(),
                q.predicate.into_owned(),
                NamedNode::new_unchecked("http://example.com/x"),
                q.graph_name.into_owned(),
            )
        });
        assert_eq!(mapped.len(), 2);
        let mut count = 0;
        a.for_each(|_| count += 1);
        assert_eq!(count, 3);
        assert_eq!(a.fold(0, |n, _| n + 1), 3);
        assert_eq!(a.to_vec().len(), 3);
    }

    #[test]
    fn reduce() {
        assert_eq!(Dataset::new().reduce(|a, _| a), Err(EmptyReduceError));
        let a = dataset(&[quad("a", "1")]);
        assert_eq!(a.reduce(|a, _| a), Ok(quad("a", "1")));
        let b = dataset(&[quad("a", "1"), quad("a", "2")]);
        let last = b.reduce(|_, q| q.into_owned());
        assert!(last.is_ok_and(|q| b.contains(&q)));
        assert_eq!(Dataset::new().fold(7, |n, _| n + 1), 7);
    }

    #[test]
    fn pattern_completeness() {
        let a = dataset(&[quad("a", "1"), quad("a", "2"), quad("b", "1")]);
        for quad in &a {
            for pattern in QuadPattern::fan_out(quad) {
                assert!(a.quads_for_pattern(&pattern).contains(quad));
            }
        }
        let other = NamedNode::new_unchecked("http://example.com/z");
        assert!(a
            .quads_for_pattern(&QuadPattern::new().with_subject(other.clone()))
            .is_empty());
        assert!(a
            .quads_for_pattern(&QuadPattern::new().with_predicate(other.clone()))
            .is_empty());
        assert!(a
            .quads_for_pattern(&QuadPattern::new().with_graph_name(other))
            .is_empty());
    }

    #[test]
    fn bulk_normalizes_both_sides() {
        let mut a = dataset(&[quad("a", "1"), quad("a", "2")]);
        let changes = DatasetChanges::new(
            dataset(&[quad("a", "1"), quad("b", "1"), quad("c", "1")]),
            dataset(&[quad("a", "1"), quad("a", "2"), quad("c", "1"), quad("z", "1")]),
        );
        let applied = UpdatableDataset::bulk(&mut a, &changes).unwrap();
        assert_eq!(a, dataset(&[quad("a", "1"), quad("b", "1"), quad("c", "1")]));
        assert_eq!(applied.added, dataset(&[quad("b", "1"), quad("c", "1")]));
        assert_eq!(applied.removed, dataset(&[quad("a", "2")]));
        assert!(applied.is_well_formed());
    }

    #[test]
    fn insert_all_and_remove_matches() {
        let mut a = dataset(&[quad("a", "1")]);
        let added = a.insert_all(&[quad("a", "1"), quad("a", "2"), quad("b", "1")]).unwrap();
        assert_eq!(added.added.len(), 2);
        assert!(added.removed.is_empty());
        let removed = a
            .remove_matches(
                &QuadPattern::new().with_subject(NamedNode::new_unchecked("http://example.com/a")),
            )
            .unwrap();
        assert_eq!(removed.removed.len(), 2);
        assert_eq!(a, dataset(&[quad("b", "1")]));
    }
}
