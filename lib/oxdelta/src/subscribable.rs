//! A dataset notifying pattern-scoped listeners of its changes.

use crate::changes::DatasetChanges;
use crate::dataset::{self, Dataset};
use crate::emitter::{EventRegistry, Listener, RegisteredListener};
use crate::error::InvalidPatternKeyError;
use crate::model::*;
use crate::pattern::QuadPattern;
use crate::updatable_dataset::{ReadableDataset, UpdatableDataset};
use rustc_hash::FxHashMap;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// The signature of the callbacks registered on a [`SubscribableDataset`].
///
/// They receive the changes matching the pattern, the identifier of the mutating call
/// and the pattern they were registered on.
pub type ChangeCallback = dyn Fn(&DatasetChanges, TransactionId, &QuadPattern);

/// A listener of [`SubscribableDataset`] changes.
pub type ChangeListener = Listener<ChangeCallback>;

impl Listener<ChangeCallback> {
    /// Wraps a change callback into a listener.
    pub fn new(callback: impl Fn(&DatasetChanges, TransactionId, &QuadPattern) + 'static) -> Self {
        Self::from_rc(Rc::new(callback) as Rc<ChangeCallback>)
    }
}

/// Identifier shared by all the notifications of a single mutating call.
///
/// Listeners registered on overlapping patterns may use it to handle a mutation only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u128);

impl TransactionId {
    fn new_random() -> Self {
        Self(rand::random())
    }

    #[inline]
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// A [`Dataset`] that notifies listeners subscribed to [quad patterns](QuadPattern).
///
/// Every mutating call (`insert`, `remove`, `insert_all`, `remove_matches`, `bulk`) computes
/// the quads it actually changed. For each pattern with listeners that matches at least one
/// of them, the listeners are called once with the matching subset of the changes.
/// All the notifications of a call share the same [`TransactionId`].
///
/// Listeners are called synchronously, after the mutation has been applied.
///
/// ```
/// use oxdelta::model::*;
/// use oxdelta::{ChangeListener, QuadPattern, SubscribableDataset, UpdatableDataset};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let tom = NamedNodeRef::new("http://example.com/Tom")?;
/// let grey = LiteralRef::new_simple_literal("grey");
/// let color = NamedNodeRef::new("http://example.com/color")?;
///
/// let mut dataset = SubscribableDataset::new();
/// let added = Rc::new(Cell::new(0));
/// dataset.on(
///     &QuadPattern::new().with_subject(tom.into_owned()),
///     ChangeListener::new({
///         let added = Rc::clone(&added);
///         move |changes, _, _| added.set(added.get() + changes.added.len())
///     }),
/// );
///
/// dataset.insert(QuadRef::new(tom, color, grey, GraphNameRef::DefaultGraph))?;
/// assert_eq!(added.get(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default)]
pub struct SubscribableDataset {
    dataset: Dataset,
    registry: EventRegistry<ChangeCallback>,
}

impl SubscribableDataset {
    /// Creates a new empty dataset without listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of listeners per pattern above which a warning is logged.
    ///
    /// The default value is 10. `0` disables the warning.
    #[must_use]
    pub fn with_max_listeners(mut self, max_listeners: usize) -> Self {
        self.registry.set_max_listeners(max_listeners);
        self
    }

    /// The underlying dataset.
    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Drops the listeners and returns the underlying dataset.
    #[inline]
    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    /// Appends a listener to the pattern.
    pub fn on(&mut self, pattern: &QuadPattern, listener: ChangeListener) {
        self.registry.on(pattern.to_key(), listener);
    }

    /// Alias of [`on`](Self::on).
    #[inline]
    pub fn add_listener(&mut self, pattern: &QuadPattern, listener: ChangeListener) {
        self.on(pattern, listener);
    }

    /// Appends a listener that is unregistered after its first notification.
    pub fn once(&mut self, pattern: &QuadPattern, listener: ChangeListener) {
        self.registry.once(pattern.to_key(), listener);
    }

    /// Inserts a listener in front of the ones already registered on the pattern.
    pub fn prepend_listener(&mut self, pattern: &QuadPattern, listener: ChangeListener) {
        self.registry.prepend(pattern.to_key(), listener);
    }

    /// Inserts in front a listener that is unregistered after its first notification.
    pub fn prepend_once_listener(&mut self, pattern: &QuadPattern, listener: ChangeListener) {
        self.registry.prepend_once(pattern.to_key(), listener);
    }

    /// Removes the most recent registration of the listener on the pattern.
    ///
    /// Returns `true` if there was one.
    pub fn off(&mut self, pattern: &QuadPattern, listener: &ChangeListener) -> bool {
        self.registry.off(&pattern.to_key(), listener)
    }

    /// Alias of [`off`](Self::off).
    #[inline]
    pub fn remove_listener(&mut self, pattern: &QuadPattern, listener: &ChangeListener) -> bool {
        self.off(pattern, listener)
    }

    /// Removes the listeners of the pattern, or all the listeners if `pattern` is `None`.
    pub fn remove_all_listeners(&mut self, pattern: Option<&QuadPattern>) {
        match pattern {
            Some(pattern) => self.registry.remove_all_listeners(Some(&pattern.to_key())),
            None => self.registry.remove_all_listeners(None),
        }
    }

    /// Unregisters the listener from every pattern and returns the number of removed registrations.
    pub fn remove_listener_from_all_events(&mut self, listener: &ChangeListener) -> usize {
        self.registry.remove_listener_from_all_events(listener)
    }

    pub fn listener_count(&self, pattern: &QuadPattern) -> usize {
        self.registry.listener_count(&pattern.to_key())
    }

    /// The listeners of the pattern in call order.
    pub fn listeners(&self, pattern: &QuadPattern) -> Vec<ChangeListener> {
        self.registry.listeners(&pattern.to_key())
    }

    /// The registrations of the pattern in call order, with their `once` flag.
    pub fn raw_listeners(&self, pattern: &QuadPattern) -> &[RegisteredListener<ChangeCallback>] {
        self.registry.raw_listeners(&pattern.to_key())
    }

    pub fn set_max_listeners(&mut self, max_listeners: usize) {
        self.registry.set_max_listeners(max_listeners);
    }

    pub fn max_listeners(&self) -> usize {
        self.registry.max_listeners()
    }

    /// The patterns with at least one listener, in no particular order.
    ///
    /// Fails if a listener was registered directly on the [`registry`](Self::registry_mut)
    /// with a name that is not a pattern key.
    pub fn event_names(&self) -> Result<Vec<QuadPattern>, InvalidPatternKeyError> {
        self.registry
            .event_names()
            .map(QuadPattern::from_key)
            .collect()
    }

    /// The listener registry, keyed by [`QuadPattern::to_key`].
    #[inline]
    pub fn registry(&self) -> &EventRegistry<ChangeCallback> {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut EventRegistry<ChangeCallback> {
        &mut self.registry
    }

    fn notify(&mut self, changes: &DatasetChanges) {
        if changes.is_empty() || self.registry.is_empty() {
            return;
        }
        // Patterns in order of first match, added quads first.
        let mut pending: Vec<(String, QuadPattern, DatasetChanges)> = Vec::new();
        let mut positions = FxHashMap::<String, usize>::default();
        for (quad, is_added) in changes
            .added
            .iter()
            .map(|quad| (quad, true))
            .chain(changes.removed.iter().map(|quad| (quad, false)))
        {
            for mask in 0..16 {
                let key = QuadPattern::masked_key(quad, mask);
                let position = if let Some(&position) = positions.get(&key) {
                    position
                } else {
                    if self.registry.listener_count(&key) == 0 {
                        continue;
                    }
                    positions.insert(key.clone(), pending.len());
                    pending.push((
                        key,
                        QuadPattern::masked(quad, mask),
                        DatasetChanges::default(),
                    ));
                    pending.len() - 1
                };
                let accumulated = &mut pending[position].2;
                if is_added {
                    accumulated.added.insert(quad);
                } else {
                    accumulated.removed.insert(quad);
                }
            }
        }
        if pending.is_empty() {
            return;
        }
        let transaction_id = TransactionId::new_random();
        trace!(
            %transaction_id,
            added = changes.added.len(),
            removed = changes.removed.len(),
            patterns = pending.len(),
            "Notifying change listeners"
        );
        for (key, pattern, pattern_changes) in &pending {
            self.registry.emit(key, |callback| {
                callback(pattern_changes, transaction_id, pattern);
            });
        }
    }
}

impl From<Dataset> for SubscribableDataset {
    #[inline]
    fn from(dataset: Dataset) -> Self {
        Self {
            dataset,
            registry: EventRegistry::new(),
        }
    }
}

impl ReadableDataset for SubscribableDataset {
    type Iter<'a> = dataset::Iter<'a>;

    #[inline]
    fn iter(&self) -> dataset::Iter<'_> {
        self.dataset.iter()
    }

    #[inline]
    fn len(&self) -> usize {
        self.dataset.len()
    }

    #[inline]
    fn contains(&self, quad: QuadRef<'_>) -> bool {
        self.dataset.contains(quad)
    }

    #[inline]
    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Dataset {
        self.dataset.quads_for_pattern(pattern)
    }
}

impl UpdatableDataset for SubscribableDataset {
    type Error = Infallible;

    fn insert(&mut self, quad: QuadRef<'_>) -> Result<bool, Infallible> {
        if !self.dataset.insert(quad) {
            return Ok(false);
        }
        if !self.registry.is_empty() {
            self.notify(&DatasetChanges::from_added([quad].into_iter().collect()));
        }
        Ok(true)
    }

    fn remove(&mut self, quad: QuadRef<'_>) -> Result<bool, Infallible> {
        if !self.dataset.remove(quad) {
            return Ok(false);
        }
        if !self.registry.is_empty() {
            self.notify(&DatasetChanges::from_removed(
                [quad].into_iter().collect(),
            ));
        }
        Ok(true)
    }

    /// Applies the diff then notifies the listeners in a single pass over both sides.
    fn bulk(&mut self, changes: &DatasetChanges) -> Result<DatasetChanges, Infallible> {
        let applied = self.dataset.bulk(changes)?;
        self.notify(&applied);
        Ok(applied)
    }
}
