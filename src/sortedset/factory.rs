//! Set factory
//!
//! Produces sets that spill into one `SpillDirectory`, share one metrics
//! registry, and use the configured verification sample.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{SortedSetError, SortedSetResult};
use super::handler::SharedHandler;
use super::order::{Comparator, Natural};
use super::set::SpillableSortedSet;
use crate::observability::SpillMetrics;
use crate::spill::{SpillConfig, SpillDirectory};

/// Creates sets backed by files in a spill directory.
pub struct SetFactory<E, C = Natural> {
    directory: SpillDirectory,
    verify_sample: usize,
    metrics: Arc<SpillMetrics>,
    kind: PhantomData<fn() -> (E, C)>,
}

impl<E, C> SetFactory<E, C>
where
    E: Serialize + DeserializeOwned + Clone + 'static,
    C: Comparator<E>,
{
    /// Open the configured spill directory.
    pub fn new(config: &SpillConfig) -> SortedSetResult<Self> {
        let directory = SpillDirectory::open(config)
            .map_err(|e| SortedSetError::io_error("Unable to open spill directory", e))?;

        Ok(Self {
            directory,
            verify_sample: config.verify_sample,
            metrics: Arc::new(SpillMetrics::new()),
            kind: PhantomData,
        })
    }

    /// Share an existing metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<SpillMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics shared by every set this factory creates
    pub fn metrics(&self) -> &Arc<SpillMetrics> {
        &self.metrics
    }

    /// The spill directory
    pub fn directory(&self) -> &SpillDirectory {
        &self.directory
    }

    /// Allocate a handler for a fresh spill file.
    pub fn handler(&self) -> SharedHandler<E> {
        Arc::new(self.directory.allocate::<E>())
    }

    /// Empty resident set with a fresh spill file attached.
    pub fn new_set(&self) -> SpillableSortedSet<E, C> {
        self.configure(SpillableSortedSet::with_handler(self.handler()))
    }

    /// Set built from ascending elements, optionally streamed straight to disk.
    pub fn from_sorted<I>(&self, elements: I, persist: bool) -> SortedSetResult<SpillableSortedSet<E, C>>
    where
        I: IntoIterator<Item = E>,
    {
        self.new_set().fill_sorted(elements, persist)
    }

    /// Wrap an existing spill file as a persisted set.
    pub fn open_persisted(&self, path: impl Into<PathBuf>) -> SpillableSortedSet<E, C> {
        let handler: SharedHandler<E> = Arc::new(self.directory.handler_for::<E>(path));
        self.configure(SpillableSortedSet::from_persisted(handler))
    }

    fn configure(&self, set: SpillableSortedSet<E, C>) -> SpillableSortedSet<E, C> {
        set.with_verify_sample(self.verify_sample)
            .with_metrics(self.metrics.clone())
    }
}
