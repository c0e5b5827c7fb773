//! Sorted set iteration
//!
//! Resident sets iterate their in-memory structure. Persisted sets iterate
//! through a `FileIter`, which keeps one element of look-ahead and releases
//! its stream as soon as the look-ahead comes back empty.

use std::collections::btree_set;
use std::iter::FusedIterator;

use super::bounded::open_bounded;
use super::errors::{SortedSetError, SortedSetResult};
use super::handler::{ElementReader, HandlerError, HandlerResult, ReaderScope, TypedFileHandler};
use super::order::{Comparator, KeyRange, Keyed};

/// Ordered iterator over a `SpillableSortedSet`.
///
/// Yields owned elements. For a persisted set a read failure is yielded
/// once as an error, after which the iterator is exhausted.
pub struct Iter<'a, E, C> {
    inner: Inner<'a, E, C>,
}

enum Inner<'a, E, C> {
    Resident(btree_set::Iter<'a, Keyed<E, C>>),
    Persisted(FileIter<E>),
}

impl<'a, E, C> Iter<'a, E, C> {
    pub(crate) fn resident(iter: btree_set::Iter<'a, Keyed<E, C>>) -> Self {
        Self {
            inner: Inner::Resident(iter),
        }
    }

    pub(crate) fn persisted(iter: FileIter<E>) -> Self {
        Self {
            inner: Inner::Persisted(iter),
        }
    }
}

impl<E: Clone, C> Iterator for Iter<'_, E, C> {
    type Item = SortedSetResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Resident(iter) => iter.next().map(|k| Ok(k.get().clone())),
            Inner::Persisted(iter) => iter.next(),
        }
    }
}

impl<E: Clone, C> FusedIterator for Iter<'_, E, C> {}

/// Look-ahead iterator over a persisted (sub)set.
pub struct FileIter<E> {
    reader: Option<ReaderScope<E>>,
    next: Option<E>,
    failed: Option<HandlerError>,
}

impl<E: Clone + 'static> FileIter<E> {
    /// Open a bounded stream and buffer the first element.
    pub(crate) fn open<C: Comparator<E>>(
        handler: &dyn TypedFileHandler<E>,
        range: Option<&KeyRange<E>>,
    ) -> HandlerResult<Self> {
        let mut reader = open_bounded::<E, C>(handler, range)?;
        let next = reader.read()?;

        let mut iter = Self {
            reader: Some(reader),
            next,
            failed: None,
        };
        if iter.next.is_none() {
            iter.release();
        }
        Ok(iter)
    }
}

impl<E> FileIter<E> {
    /// Returns whether another element is buffered.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Returns whether the underlying stream is still open.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn release(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
    }
}

impl<E> Iterator for FileIter<E> {
    type Item = SortedSetResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.failed.take() {
            return Some(Err(SortedSetError::io_error(
                "Unable to get next element from file",
                err,
            )));
        }

        let current = self.next.take()?;
        match self.reader.as_mut().map(|r| r.read()) {
            Some(Ok(Some(following))) => self.next = Some(following),
            Some(Ok(None)) | None => self.release(),
            Some(Err(err)) => {
                self.release();
                self.failed = Some(err);
            }
        }
        Some(Ok(current))
    }
}

impl<E> FusedIterator for FileIter<E> {}
