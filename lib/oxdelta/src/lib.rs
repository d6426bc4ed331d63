#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod changes;
pub mod dataset;
mod emitter;
mod error;
mod loader;
pub mod model;
mod pattern;
mod subscribable;
mod transaction;
mod updatable_dataset;

pub use crate::changes::DatasetChanges;
pub use crate::dataset::Dataset;
pub use crate::emitter::{EventRegistry, Listener, RegisteredListener};
pub use crate::error::{EmptyReduceError, InvalidPatternKeyError, TransactionError};
pub use crate::loader::BulkLoader;
pub use crate::pattern::QuadPattern;
pub use crate::subscribable::{
    ChangeCallback, ChangeListener, SubscribableDataset, TransactionId,
};
pub use crate::transaction::{Transaction, TransactionIter};
pub use crate::updatable_dataset::{ReadableDataset, UpdatableDataset};
