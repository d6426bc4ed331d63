use crate::changes::DatasetChanges;
use crate::dataset::Dataset;
use crate::model::*;
use crate::updatable_dataset::UpdatableDataset;

const DEFAULT_BATCH_SIZE: usize = 100_000;

/// A loader applying a stream of quads to a dataset in batches.
///
/// Each batch goes through a single [`UpdatableDataset::bulk`] call,
/// so a [`SubscribableDataset`](crate::SubscribableDataset) notifies its listeners once per batch.
///
/// ```
/// use oxdelta::model::*;
/// use oxdelta::{Dataset, ReadableDataset, UpdatableDataset};
/// use std::convert::Infallible;
///
/// let ex = NamedNode::new("http://example.com")?;
/// let quads = (0..10).map(|i| {
///     Ok::<_, Infallible>(Quad::new(
///         ex.clone(),
///         ex.clone(),
///         Literal::from(i),
///         GraphName::DefaultGraph,
///     ))
/// });
///
/// let mut dataset = Dataset::new();
/// let count = dataset
///     .bulk_loader()
///     .with_batch_size(3)
///     .load_quads::<_, Infallible>(quads)?;
/// assert_eq!(count, 10);
/// assert_eq!(dataset.len(), 10);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[must_use]
pub struct BulkLoader<'a, D: UpdatableDataset> {
    target: &'a mut D,
    batch_size: usize,
    hooks: Vec<Box<dyn Fn(u64)>>,
}

impl<'a, D: UpdatableDataset> BulkLoader<'a, D> {
    pub(crate) fn new(target: &'a mut D) -> Self {
        Self {
            target,
            batch_size: DEFAULT_BATCH_SIZE,
            hooks: Vec::new(),
        }
    }

    /// Sets the number of quads applied per [`bulk`](UpdatableDataset::bulk) call.
    ///
    /// The default value is 100 000. A size of 0 is treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Adds a `callback` evaluated after each batch with the number of loaded quads.
    pub fn on_progress(mut self, callback: impl Fn(u64) + 'static) -> Self {
        self.hooks.push(Box::new(callback));
        self
    }

    /// Loads the quads and returns how many were read.
    ///
    /// On a source error the quads read so far are applied before the error is returned.
    pub fn load_quads<EI, EO: From<D::Error> + From<EI>>(
        self,
        quads: impl IntoIterator<Item = Result<Quad, EI>>,
    ) -> Result<u64, EO> {
        let Self {
            target,
            batch_size,
            hooks,
        } = self;
        let mut batch = Dataset::new();
        let mut done_counter = 0;
        let mut batch_counter = 0;
        for quad in quads {
            let quad = match quad {
                Ok(quad) => quad,
                Err(error) => {
                    if batch_counter > 0 {
                        target.bulk(&DatasetChanges::from_added(batch))?;
                        for hook in &hooks {
                            hook(done_counter);
                        }
                    }
                    return Err(error.into());
                }
            };
            batch.insert(&quad);
            done_counter += 1;
            batch_counter += 1;
            if batch_counter == batch_size {
                target.bulk(&DatasetChanges::from_added(std::mem::take(&mut batch)))?;
                batch_counter = 0;
                for hook in &hooks {
                    hook(done_counter);
                }
            }
        }
        if batch_counter > 0 {
            target.bulk(&DatasetChanges::from_added(batch))?;
            for hook in &hooks {
                hook(done_counter);
            }
        }
        Ok(done_counter)
    }
}
