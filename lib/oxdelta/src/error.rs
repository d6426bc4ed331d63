use std::convert::Infallible;
use thiserror::Error;

/// Returned by [`ReadableDataset::reduce`](crate::ReadableDataset::reduce) on an empty dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Reduce of an empty dataset with no initial value")]
pub struct EmptyReduceError;

/// A registered event name that is not the encoding of a [`QuadPattern`](crate::QuadPattern).
///
/// Pattern keys are only ever written by [`SubscribableDataset`](crate::SubscribableDataset),
/// so this error means that something registered listeners directly on its
/// [`EventRegistry`](crate::EventRegistry) with an arbitrary name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid pattern key '{key}': {reason}")]
pub struct InvalidPatternKeyError {
    key: String,
    reason: &'static str,
}

impl InvalidPatternKeyError {
    pub(crate) fn new(key: impl Into<String>, reason: &'static str) -> Self {
        Self {
            key: key.into(),
            reason,
        }
    }

    /// The key that failed to decode.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// An error related to the life cycle of a [`Transaction`](crate::Transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransactionError {
    /// A mutation or a commit was attempted on a finished transaction.
    #[error("The transaction has already been committed")]
    AlreadyCommitted,
    /// A rollback was attempted on a transaction that is not committed.
    #[error("The transaction has not been committed")]
    NotCommitted,
}

impl From<Infallible> for TransactionError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}
