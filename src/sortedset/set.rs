//! SpillableSortedSet
//!
//! A sorted set of unique elements that is either resident in memory or
//! persisted to a file owned by a `TypedFileHandler`.
//!
//! # States
//!
//! - **Resident**: elements live in a `BTreeSet` ordered by the comparator.
//!   A handler may be attached for a later `persist`.
//! - **Persisted**: elements live only in the handler's file. The set keeps
//!   the handler and, for subset views, the key range it covers.
//!
//! # Persist protocol
//!
//! 1. Stream every element to the output stream, rejecting out-of-order input
//! 2. Write the element count and close the stream
//! 3. Verify: the file is non-empty, the first `verify_sample` elements read
//!    back equal, and the count read back matches the count written
//! 4. On any failure delete the file and detach the handler
//!
//! While persisted, reads stream from the file and mutations fail with
//! `SPILL_REQUIRES_LOAD`.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use super::bounded::open_bounded;
use super::errors::{ErrorCategory, SortedSetError, SortedSetResult};
use super::handler::{
    ElementReader, ElementWriter, HandlerError, HandlerResult, ReaderScope, SharedHandler,
    TypedFileHandler, WriterScope,
};
use super::iter::{FileIter, Iter};
use super::order::{Comparator, KeyRange, Keyed, Natural};
use crate::observability::{Logger, ObservationScope, SpillMetrics};
use crate::spill::TRAILER_LEN;

/// Default number of leading elements re-read after a persist
pub const DEFAULT_VERIFY_SAMPLE: usize = 100;

enum State<E, C> {
    Resident {
        elements: BTreeSet<Keyed<E, C>>,
        handler: Option<SharedHandler<E>>,
    },
    Persisted {
        handler: SharedHandler<E>,
        range: Option<KeyRange<E>>,
    },
}

/// A sorted set that can spill its contents to a file and reload them.
pub struct SpillableSortedSet<E, C = Natural> {
    state: State<E, C>,
    verify_sample: usize,
    metrics: Option<Arc<SpillMetrics>>,
}

impl<E, C> SpillableSortedSet<E, C>
where
    E: Clone + 'static,
    C: Comparator<E>,
{
    /// Empty resident set with no handler.
    pub fn new() -> Self {
        Self::resident(BTreeSet::new(), None)
    }

    /// Empty resident set that persists through `handler`.
    pub fn with_handler(handler: SharedHandler<E>) -> Self {
        Self::resident(BTreeSet::new(), Some(handler))
    }

    /// Wrap a file that already holds a persisted set.
    ///
    /// Nothing is read until the set is queried.
    pub fn from_persisted(handler: SharedHandler<E>) -> Self {
        Self {
            state: State::Persisted {
                handler,
                range: None,
            },
            verify_sample: DEFAULT_VERIFY_SAMPLE,
            metrics: None,
        }
    }

    /// Build a set from elements already in ascending order.
    ///
    /// With `persist` the elements are streamed straight to `handler` without
    /// being collected in memory; input that is not strictly ascending fails
    /// with `SPILL_INVALID_INPUT` and the partial file is deleted. Without
    /// `persist` the elements are collected into a resident set and order
    /// does not matter.
    pub fn from_sorted<I>(elements: I, handler: SharedHandler<E>, persist: bool) -> SortedSetResult<Self>
    where
        I: IntoIterator<Item = E>,
    {
        Self::with_handler(handler).fill_sorted(elements, persist)
    }

    /// Set how many leading elements are re-read to verify a persist.
    pub fn with_verify_sample(mut self, sample: usize) -> Self {
        self.verify_sample = sample.max(1);
        self
    }

    /// Record persist/load activity in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<SpillMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub(crate) fn fill_sorted<I>(mut self, elements: I, persist: bool) -> SortedSetResult<Self>
    where
        I: IntoIterator<Item = E>,
    {
        if !persist {
            self.insert_all(elements)?;
            return Ok(self);
        }

        let handler = match &self.state {
            State::Resident {
                handler: Some(handler),
                ..
            } => handler.clone(),
            _ => return Err(SortedSetError::no_handler()),
        };

        match persist_elements::<E, C, _, _>(&handler, elements, self.verify_sample, self.metrics.as_deref()) {
            Ok(_) => {
                self.state = State::Persisted {
                    handler,
                    range: None,
                };
                Ok(self)
            }
            Err(err) => {
                self.detach_handler();
                Err(err)
            }
        }
    }

    fn resident(elements: BTreeSet<Keyed<E, C>>, handler: Option<SharedHandler<E>>) -> Self {
        Self {
            state: State::Resident { elements, handler },
            verify_sample: DEFAULT_VERIFY_SAMPLE,
            metrics: None,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns whether the elements currently live in a file.
    pub fn is_persisted(&self) -> bool {
        matches!(self.state, State::Persisted { .. })
    }

    /// Returns whether this is a persisted view over part of a file.
    pub fn is_subset(&self) -> bool {
        matches!(self.state, State::Persisted { range: Some(_), .. })
    }

    /// The attached handler, if any.
    pub fn handler(&self) -> Option<&SharedHandler<E>> {
        match &self.state {
            State::Resident { handler, .. } => handler.as_ref(),
            State::Persisted { handler, .. } => Some(handler),
        }
    }

    /// Key range of a persisted subset view.
    pub fn range(&self) -> Option<&KeyRange<E>> {
        match &self.state {
            State::Persisted { range, .. } => range.as_ref(),
            State::Resident { .. } => None,
        }
    }

    /// Number of elements re-read to verify a persist.
    pub fn verify_sample(&self) -> usize {
        self.verify_sample
    }

    /// Persist through the attached handler.
    ///
    /// No-op when already persisted. Fails with `SPILL_NO_HANDLER` when no
    /// handler is attached. On failure the file is deleted, the handler is
    /// detached and the elements stay resident.
    pub fn persist(&mut self) -> SortedSetResult<()> {
        let handler = match &self.state {
            State::Persisted { .. } => return Ok(()),
            State::Resident { handler, .. } => handler.clone().ok_or_else(SortedSetError::no_handler)?,
        };
        self.persist_to(handler)
    }

    /// Persist through `handler`, replacing any attached handler.
    pub fn persist_to(&mut self, handler: SharedHandler<E>) -> SortedSetResult<()> {
        let elements = match &self.state {
            State::Persisted { .. } => return Ok(()),
            State::Resident { elements, .. } => elements,
        };

        let result = persist_elements::<E, C, _, _>(
            &handler,
            elements.iter().map(Keyed::get),
            self.verify_sample,
            self.metrics.as_deref(),
        );

        match result {
            Ok(_) => {
                self.state = State::Persisted {
                    handler,
                    range: None,
                };
                Ok(())
            }
            Err(err) => {
                self.detach_handler();
                Err(err)
            }
        }
    }

    /// Read the persisted elements back into memory.
    ///
    /// No-op when resident. A full set deletes its file afterwards and keeps
    /// the handler for a later persist. A subset view leaves the shared file
    /// alone and detaches from it. On a read failure the set stays persisted
    /// and the file is left untouched.
    pub fn load(&mut self) -> SortedSetResult<()> {
        let (handler, range) = match &self.state {
            State::Resident { .. } => return Ok(()),
            State::Persisted { handler, range } => (handler.clone(), range.clone()),
        };

        let describe = handler.describe();
        let scope = ObservationScope::with_fields("SORTEDSET_LOAD", &[("handler", describe.as_str())]);

        let mut elements = BTreeSet::new();
        let read = scan_persisted::<E, C>(&handler, range.as_ref(), |element| {
            elements.insert(Keyed::new(element));
            true
        });
        if let Err(err) = read {
            scope.fail(&err.to_string());
            return Err(SortedSetError::io_error("Unable to read file into a complete set", err));
        }

        let subset = range.is_some();
        if !subset {
            if let Err(err) = self.delete_file(&handler) {
                let reason = err.to_string();
                Logger::warn(
                    "SORTEDSET_FILE_DELETE_FAILED",
                    &[("handler", describe.as_str()), ("reason", reason.as_str())],
                );
            }
        }

        let loaded = elements.len() as u64;
        if let Some(metrics) = &self.metrics {
            metrics.record_load(loaded);
        }
        self.state = State::Resident {
            elements,
            handler: if subset { None } else { Some(handler) },
        };

        let loaded_str = loaded.to_string();
        scope.complete_with_fields(&[("elements", loaded_str.as_str())]);
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of elements.
    ///
    /// A persisted set answers from the file's count trailer. A persisted
    /// subset cannot answer without a scan and fails with
    /// `SPILL_INDETERMINATE_SIZE`; load it first.
    pub fn len(&self) -> SortedSetResult<usize> {
        match &self.state {
            State::Resident { elements, .. } => Ok(elements.len()),
            State::Persisted { range: Some(_), .. } => Err(SortedSetError::indeterminate_size()),
            State::Persisted { handler, range: None } => stored_count(handler)
                .map_err(|e| SortedSetError::io_error("Unable to read element count", e)),
        }
    }

    /// Returns whether the set holds no elements.
    pub fn is_empty(&self) -> SortedSetResult<bool> {
        match self.first() {
            Ok(_) => Ok(false),
            Err(err) if err.is_not_found() => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Returns whether `element` is in the set.
    pub fn contains(&self, element: &E) -> SortedSetResult<bool> {
        match &self.state {
            State::Resident { elements, .. } => Ok(elements.contains(&Keyed::new(element.clone()))),
            State::Persisted { handler, range } => {
                let mut found = false;
                scan_persisted::<E, C>(handler, range.as_ref(), |candidate| {
                    match C::compare(&candidate, element) {
                        Ordering::Less => true,
                        Ordering::Equal => {
                            found = true;
                            false
                        }
                        Ordering::Greater => false,
                    }
                })
                .map_err(|e| SortedSetError::io_error("Unable to read file", e))?;
                Ok(found)
            }
        }
    }

    /// Returns whether every element of `items` is in the set.
    ///
    /// A persisted set answers in a single pass over the file.
    pub fn contains_all<'a, I>(&self, items: I) -> SortedSetResult<bool>
    where
        I: IntoIterator<Item = &'a E>,
    {
        let mut wanted: BTreeSet<Keyed<E, C>> =
            items.into_iter().map(|e| Keyed::new(e.clone())).collect();
        if wanted.is_empty() {
            return Ok(true);
        }

        match &self.state {
            State::Resident { elements, .. } => Ok(wanted.iter().all(|k| elements.contains(k))),
            State::Persisted { handler, range } => {
                scan_persisted::<E, C>(handler, range.as_ref(), |candidate| {
                    wanted.remove(&Keyed::new(candidate));
                    !wanted.is_empty()
                })
                .map_err(|e| SortedSetError::io_error("Unable to read file", e))?;
                Ok(wanted.is_empty())
            }
        }
    }

    /// Smallest element.
    pub fn first(&self) -> SortedSetResult<E> {
        match &self.state {
            State::Resident { elements, .. } => elements
                .first()
                .map(|k| k.get().clone())
                .ok_or_else(|| SortedSetError::not_found("first")),
            State::Persisted { handler, range } => {
                let mut first = None;
                scan_persisted::<E, C>(handler, range.as_ref(), |candidate| {
                    first = Some(candidate);
                    false
                })
                .map_err(|e| SortedSetError::io_error("Unable to retrieve first element", e))?;
                first.ok_or_else(|| SortedSetError::not_found("first"))
            }
        }
    }

    /// Largest element.
    ///
    /// A persisted set reads the whole (sub)range to find it.
    pub fn last(&self) -> SortedSetResult<E> {
        match &self.state {
            State::Resident { elements, .. } => elements
                .last()
                .map(|k| k.get().clone())
                .ok_or_else(|| SortedSetError::not_found("last")),
            State::Persisted { handler, range } => {
                let mut last = None;
                scan_persisted::<E, C>(handler, range.as_ref(), |candidate| {
                    last = Some(candidate);
                    true
                })
                .map_err(|e| SortedSetError::io_error("Unable to retrieve last element", e))?;
                last.ok_or_else(|| SortedSetError::not_found("last"))
            }
        }
    }

    /// Iterate the elements in ascending order.
    ///
    /// For a persisted set this opens a stream that is released when the
    /// iterator is exhausted, fails, or is dropped.
    pub fn iter(&self) -> SortedSetResult<Iter<'_, E, C>> {
        match &self.state {
            State::Resident { elements, .. } => Ok(Iter::resident(elements.iter())),
            State::Persisted { handler, range } => FileIter::open::<C>(handler.as_ref(), range.as_ref())
                .map(Iter::persisted)
                .map_err(|e| SortedSetError::io_error("Unable to read file", e)),
        }
    }

    /// Collect the elements in ascending order.
    ///
    /// For a full persisted set the number of elements read must match the
    /// count trailer; a mismatch is reported as corruption.
    pub fn to_vec(&self) -> SortedSetResult<Vec<E>> {
        match &self.state {
            State::Resident { elements, .. } => Ok(elements.iter().map(|k| k.get().clone()).collect()),
            State::Persisted { handler, range } => {
                let mut out = Vec::new();
                scan_persisted::<E, C>(handler, range.as_ref(), |element| {
                    out.push(element);
                    true
                })
                .map_err(|e| SortedSetError::io_error("Unable to read file", e))?;

                if range.is_none() {
                    let expected = stored_count(handler)
                        .map_err(|e| SortedSetError::io_error("Unable to read element count", e))?;
                    if expected != out.len() {
                        let err = HandlerError::Corruption {
                            offset: trailer_offset(handler),
                            reason: format!(
                                "count trailer records {} elements, read {}",
                                expected,
                                out.len()
                            ),
                        };
                        return Err(SortedSetError::io_error("Element count mismatch", err));
                    }
                }
                Ok(out)
            }
        }
    }

    // ========================================================================
    // Mutations (resident only)
    // ========================================================================

    /// Insert `element`, returning whether it was absent.
    pub fn insert(&mut self, element: E) -> SortedSetResult<bool> {
        Ok(self.resident_mut("insert")?.insert(Keyed::new(element)))
    }

    /// Remove `element`, returning whether it was present.
    pub fn remove(&mut self, element: &E) -> SortedSetResult<bool> {
        Ok(self.resident_mut("remove")?.remove(&Keyed::new(element.clone())))
    }

    /// Insert every element, returning whether the set changed.
    pub fn insert_all<I>(&mut self, items: I) -> SortedSetResult<bool>
    where
        I: IntoIterator<Item = E>,
    {
        let elements = self.resident_mut("insert_all")?;
        let mut changed = false;
        for element in items {
            changed |= elements.insert(Keyed::new(element));
        }
        Ok(changed)
    }

    /// Remove every element of `items`, returning whether the set changed.
    pub fn remove_all<'a, I>(&mut self, items: I) -> SortedSetResult<bool>
    where
        I: IntoIterator<Item = &'a E>,
    {
        let elements = self.resident_mut("remove_all")?;
        let mut changed = false;
        for element in items {
            changed |= elements.remove(&Keyed::new(element.clone()));
        }
        Ok(changed)
    }

    /// Keep only elements also in `items`, returning whether the set changed.
    pub fn retain_all<'a, I>(&mut self, items: I) -> SortedSetResult<bool>
    where
        I: IntoIterator<Item = &'a E>,
    {
        let elements = self.resident_mut("retain_all")?;
        let keep: BTreeSet<Keyed<E, C>> = items.into_iter().map(|e| Keyed::new(e.clone())).collect();
        let before = elements.len();
        elements.retain(|k| keep.contains(k));
        Ok(elements.len() != before)
    }

    /// Remove every element.
    ///
    /// A persisted full set deletes its file and becomes resident with the
    /// handler still attached; if the delete fails the set stays persisted.
    /// A persisted subset view detaches without touching the shared file.
    pub fn clear(&mut self) -> SortedSetResult<()> {
        let (handler, subset) = match &mut self.state {
            State::Resident { elements, .. } => {
                elements.clear();
                return Ok(());
            }
            State::Persisted { handler, range } => (handler.clone(), range.is_some()),
        };

        if !subset {
            self.delete_file(&handler)
                .map_err(|e| SortedSetError::io_error("Unable to delete backing file", e))?;
        }
        self.state = State::Resident {
            elements: BTreeSet::new(),
            handler: if subset { None } else { Some(handler) },
        };
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Elements in `[from, to)`.
    ///
    /// A resident set returns an independent copy of the range. A persisted
    /// set returns a view sharing the same file, narrowed to the range.
    ///
    /// A resident copy keeps the same attached handler. If both the copy and
    /// this set call `persist`, the second write replaces the first one's
    /// file; give the copy its own handler through `persist_to`. The same
    /// applies to `head_set`, `tail_set` and `clone`.
    pub fn sub_set(&self, from: &E, to: &E) -> SortedSetResult<Self> {
        if C::compare(from, to) == Ordering::Greater {
            return Err(SortedSetError::invalid_range("from is greater than to"));
        }
        Ok(self.narrowed(Some(from), Some(to)))
    }

    /// Elements strictly less than `to`.
    pub fn head_set(&self, to: &E) -> Self {
        self.narrowed(None, Some(to))
    }

    /// Elements greater than or equal to `from`.
    pub fn tail_set(&self, from: &E) -> Self {
        self.narrowed(Some(from), None)
    }

    fn narrowed(&self, from: Option<&E>, to: Option<&E>) -> Self {
        let state = match &self.state {
            State::Resident { elements, handler } => {
                let lower = from.map_or(Bound::Unbounded, |f| Bound::Included(Keyed::new(f.clone())));
                let upper = to.map_or(Bound::Unbounded, |t| Bound::Excluded(Keyed::new(t.clone())));
                State::Resident {
                    elements: elements.range((lower, upper)).cloned().collect(),
                    handler: handler.clone(),
                }
            }
            State::Persisted { handler, range } => State::Persisted {
                handler: handler.clone(),
                range: Some(range.clone().unwrap_or_default().narrow::<C>(from, to)),
            },
        };

        Self {
            state,
            verify_sample: self.verify_sample,
            metrics: self.metrics.clone(),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn resident_mut(&mut self, operation: &str) -> SortedSetResult<&mut BTreeSet<Keyed<E, C>>> {
        match &mut self.state {
            State::Resident { elements, .. } => Ok(elements),
            State::Persisted { .. } => Err(SortedSetError::requires_load(operation)),
        }
    }

    fn detach_handler(&mut self) {
        if let State::Resident { handler, .. } = &mut self.state {
            *handler = None;
        }
    }

    fn delete_file(&self, handler: &SharedHandler<E>) -> HandlerResult<()> {
        handler.delete()?;
        if let Some(metrics) = &self.metrics {
            metrics.record_file_deleted();
        }
        Ok(())
    }
}

impl<E, C> Default for SpillableSortedSet<E, C>
where
    E: Clone + 'static,
    C: Comparator<E>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone, C> Clone for SpillableSortedSet<E, C> {
    /// Resident elements are copied; the handler and any range are shared.
    ///
    /// Persisting a resident clone and the original through the shared
    /// handler writes the same file twice, and the later write wins.
    fn clone(&self) -> Self {
        let state = match &self.state {
            State::Resident { elements, handler } => State::Resident {
                elements: elements.clone(),
                handler: handler.clone(),
            },
            State::Persisted { handler, range } => State::Persisted {
                handler: handler.clone(),
                range: range.clone(),
            },
        };

        Self {
            state,
            verify_sample: self.verify_sample,
            metrics: self.metrics.clone(),
        }
    }
}

impl<E: fmt::Debug, C> fmt::Debug for SpillableSortedSet<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Resident { elements, handler } => f
                .debug_struct("SpillableSortedSet")
                .field("elements", elements)
                .field("handler", &handler.as_ref().map(|h| h.describe()))
                .finish(),
            State::Persisted { handler, range } => f
                .debug_struct("SpillableSortedSet")
                .field("persisted", &handler.describe())
                .field("range", range)
                .finish(),
        }
    }
}

// ============================================================================
// Persisted access
// ============================================================================

/// Stream the persisted elements in `range` through `visit` until it
/// returns false. The stream is closed before returning.
fn scan_persisted<E, C>(
    handler: &SharedHandler<E>,
    range: Option<&KeyRange<E>>,
    mut visit: impl FnMut(E) -> bool,
) -> HandlerResult<()>
where
    E: Clone + 'static,
    C: Comparator<E>,
{
    let mut reader = open_bounded::<E, C>(handler.as_ref(), range)?;
    while let Some(element) = reader.read()? {
        if !visit(element) {
            break;
        }
    }
    Ok(())
}

/// Element count from the trailer, rejected when it cannot be addressed.
fn stored_count<E: 'static>(handler: &SharedHandler<E>) -> HandlerResult<usize> {
    let count = ReaderScope::open(handler.as_ref()).and_then(|mut reader| reader.read_count())?;
    usize::try_from(count).map_err(|_| HandlerError::Corruption {
        offset: trailer_offset(handler),
        reason: format!("element count {} exceeds addressable size", count),
    })
}

fn trailer_offset<E: 'static>(handler: &SharedHandler<E>) -> u64 {
    handler.size().map_or(0, |size| size.saturating_sub(TRAILER_LEN))
}

/// Write and verify `elements`, deleting the file on any failure.
fn persist_elements<E, C, I, B>(
    handler: &SharedHandler<E>,
    elements: I,
    verify_sample: usize,
    metrics: Option<&SpillMetrics>,
) -> SortedSetResult<u64>
where
    E: Clone + 'static,
    C: Comparator<E>,
    I: IntoIterator<Item = B>,
    B: Borrow<E>,
{
    let describe = handler.describe();
    let scope = ObservationScope::with_fields("SORTEDSET_PERSIST", &[("handler", describe.as_str())]);

    match write_verified::<E, C, I, B>(handler.as_ref(), elements, verify_sample) {
        Ok(written) => {
            if let Some(metrics) = metrics {
                metrics.record_persist(written);
            }
            let written_str = written.to_string();
            scope.complete_with_fields(&[("elements", written_str.as_str())]);
            Ok(written)
        }
        Err(err) => {
            match handler.delete() {
                Ok(()) => {
                    if let Some(metrics) = metrics {
                        metrics.record_file_deleted();
                    }
                }
                Err(delete_err) => {
                    let reason = delete_err.to_string();
                    Logger::error(
                        "SORTEDSET_FILE_DELETE_FAILED",
                        &[("handler", describe.as_str()), ("reason", reason.as_str())],
                    );
                }
            }
            if let Some(metrics) = metrics {
                metrics.record_persist_failure(err.category() == ErrorCategory::Verification);
            }
            scope.fail(&err.to_string());
            Err(err)
        }
    }
}

fn write_verified<E, C, I, B>(
    handler: &dyn TypedFileHandler<E>,
    elements: I,
    verify_sample: usize,
) -> SortedSetResult<u64>
where
    E: Clone + 'static,
    C: Comparator<E>,
    I: IntoIterator<Item = B>,
    B: Borrow<E>,
{
    let mut sample: Vec<E> = Vec::with_capacity(verify_sample.min(1024));

    let mut writer = WriterScope::open(handler)
        .map_err(|e| SortedSetError::io_error("Unable to open output stream", e))?;
    let mut written: u64 = 0;
    let mut previous: Option<B> = None;
    for item in elements {
        let element: &E = <B as Borrow<E>>::borrow(&item);
        if let Some(prev) = &previous {
            if C::compare(<B as Borrow<E>>::borrow(prev), element) != Ordering::Less {
                return Err(SortedSetError::invalid_input(written));
            }
        }
        writer
            .write(element)
            .map_err(|e| SortedSetError::io_error(format!("Unable to write element {}", written + 1), e))?;
        if sample.len() < verify_sample {
            sample.push(element.clone());
        }
        written += 1;
        previous = Some(item);
    }
    writer
        .write_count(written)
        .map_err(|e| SortedSetError::io_error("Unable to write element count", e))?;
    writer
        .close()
        .map_err(|e| SortedSetError::io_error("Unable to close output stream", e))?;
    drop(writer);

    verify::<E, C>(handler, &sample, written)?;
    Ok(written)
}

fn verify<E, C>(handler: &dyn TypedFileHandler<E>, sample: &[E], written: u64) -> SortedSetResult<()>
where
    E: 'static,
    C: Comparator<E>,
{
    let size = handler
        .size()
        .map_err(|e| SortedSetError::verify_failed_with("Failed to verify file existence", e))?;
    if size == 0 {
        return Err(SortedSetError::verify_failed("Failed to verify file existence"));
    }

    {
        let mut reader = ReaderScope::open(handler)
            .map_err(|e| SortedSetError::verify_failed_with("Failed to reopen file", e))?;
        for (index, expected) in sample.iter().enumerate() {
            let actual = reader.read().map_err(|e| {
                SortedSetError::verify_failed_with(format!("Failed to verify element {} was written", index + 1), e)
            })?;
            match actual {
                Some(actual) if C::equal(expected, &actual) => {}
                _ => {
                    return Err(SortedSetError::verify_failed(format!(
                        "Failed to verify element {} was written",
                        index + 1
                    )))
                }
            }
        }
    }

    let count = ReaderScope::open(handler)
        .and_then(|mut reader| reader.read_count())
        .map_err(|e| SortedSetError::verify_failed_with("Failed to verify file size was written", e))?;
    if count != written {
        return Err(SortedSetError::verify_failed(format!(
            "Failed to verify file size was written: expected {}, found {}",
            written, count
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sortedset::errors::SortedSetErrorCode;
    use crate::sortedset::order::Reversed;
    use crate::spill::MemoryHandler;

    fn memory(name: &str) -> (Arc<MemoryHandler<i32>>, SharedHandler<i32>) {
        let handler = Arc::new(MemoryHandler::new(name));
        let shared: SharedHandler<i32> = handler.clone();
        (handler, shared)
    }

    fn set_of(values: &[i32], handler: SharedHandler<i32>) -> SpillableSortedSet<i32> {
        let mut set = SpillableSortedSet::with_handler(handler);
        set.insert_all(values.iter().copied()).unwrap();
        set
    }

    #[test]
    fn test_resident_basics() {
        let mut set: SpillableSortedSet<i32> = SpillableSortedSet::new();
        assert!(set.is_empty().unwrap());
        assert!(set.insert(5).unwrap());
        assert!(set.insert(3).unwrap());
        assert!(!set.insert(5).unwrap());

        assert_eq!(set.len().unwrap(), 2);
        assert_eq!(set.first().unwrap(), 3);
        assert_eq!(set.last().unwrap(), 5);
        assert!(set.contains(&3).unwrap());
        assert!(!set.contains(&4).unwrap());
        assert!(set.remove(&3).unwrap());
        assert_eq!(set.to_vec().unwrap(), vec![5]);
    }

    #[test]
    fn test_persist_without_handler_fails() {
        let mut set: SpillableSortedSet<i32> = SpillableSortedSet::new();
        set.insert(1).unwrap();
        let err = set.persist().unwrap_err();
        assert_eq!(err.code(), SortedSetErrorCode::SpillNoHandler);
        assert!(!set.is_persisted());
    }

    #[test]
    fn test_persist_and_query() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[5, 3, 9, 1], handler);
        set.persist().unwrap();

        assert!(set.is_persisted());
        assert!(raw.exists());
        assert_eq!(set.len().unwrap(), 4);
        assert_eq!(set.first().unwrap(), 1);
        assert_eq!(set.last().unwrap(), 9);
        assert!(set.contains(&5).unwrap());
        assert!(!set.contains(&4).unwrap());
        assert!(set.contains_all(&[1, 9]).unwrap());
        assert!(!set.contains_all(&[1, 2]).unwrap());
        assert_eq!(set.to_vec().unwrap(), vec![1, 3, 5, 9]);
        assert_eq!(raw.stats().open_streams(), 0);
    }

    #[test]
    fn test_persist_twice_is_noop() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[1], handler);
        set.persist().unwrap();
        let writers = raw.stats().writers_opened();
        set.persist().unwrap();
        assert_eq!(raw.stats().writers_opened(), writers);
    }

    #[test]
    fn test_mutation_requires_load() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[1, 2], handler);
        set.persist().unwrap();
        let before = raw.bytes();

        let err = set.insert(3).unwrap_err();
        assert_eq!(err.code(), SortedSetErrorCode::SpillRequiresLoad);
        assert!(err.is_illegal_state());
        assert!(set.remove(&1).is_err());
        assert!(set.insert_all(vec![7]).is_err());
        assert!(set.remove_all(&[1]).is_err());
        assert!(set.retain_all(&[1]).is_err());
        assert_eq!(raw.bytes(), before);
    }

    #[test]
    fn test_load_restores_and_deletes_file() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[2, 1], handler);
        set.persist().unwrap();
        set.load().unwrap();

        assert!(!set.is_persisted());
        assert!(!raw.exists());
        assert!(set.handler().is_some());
        assert_eq!(set.to_vec().unwrap(), vec![1, 2]);
        set.insert(3).unwrap();

        set.persist().unwrap();
        assert_eq!(set.len().unwrap(), 3);
    }

    #[test]
    fn test_clear_persisted_deletes_file() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[1, 2], handler);
        set.persist().unwrap();
        set.clear().unwrap();

        assert!(!set.is_persisted());
        assert!(!raw.exists());
        assert!(set.is_empty().unwrap());
        assert!(set.handler().is_some());
    }

    #[test]
    fn test_resident_views_copy() {
        let set = set_of(&[1, 2, 3, 4, 5], memory("a").1);
        let sub = set.sub_set(&2, &4).unwrap();
        assert_eq!(sub.to_vec().unwrap(), vec![2, 3]);
        assert_eq!(set.head_set(&3).to_vec().unwrap(), vec![1, 2]);
        assert_eq!(set.tail_set(&4).to_vec().unwrap(), vec![4, 5]);
        assert!(sub.handler().is_some());

        let err = set.sub_set(&4, &2).unwrap_err();
        assert_eq!(err.code(), SortedSetErrorCode::SpillInvalidRange);
    }

    #[test]
    fn test_persisted_views_narrow() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[1, 2, 3, 4, 5], handler);
        set.persist().unwrap();

        let sub = set.sub_set(&2, &5).unwrap();
        assert!(sub.is_subset());
        assert_eq!(sub.to_vec().unwrap(), vec![2, 3, 4]);
        assert_eq!(sub.first().unwrap(), 2);
        assert_eq!(sub.last().unwrap(), 4);
        assert!(!sub.contains(&5).unwrap());

        let err = sub.len().unwrap_err();
        assert_eq!(err.code(), SortedSetErrorCode::SpillIndeterminateSize);

        let narrower = sub.head_set(&4).tail_set(&3);
        assert_eq!(narrower.to_vec().unwrap(), vec![3]);
        // Widening bounds never escape the parent range
        assert_eq!(sub.tail_set(&0).to_vec().unwrap(), vec![2, 3, 4]);
        assert_eq!(raw.stats().open_streams(), 0);
    }

    #[test]
    fn test_subset_load_keeps_parent_file() {
        let (raw, handler) = memory("a");
        let mut set = set_of(&[1, 2, 3], handler);
        set.persist().unwrap();

        let mut sub = set.tail_set(&2);
        sub.load().unwrap();
        assert!(raw.exists());
        assert!(sub.handler().is_none());
        assert_eq!(sub.to_vec().unwrap(), vec![2, 3]);
        assert_eq!(set.len().unwrap(), 3);
    }

    #[test]
    fn test_from_sorted_rejects_unsorted() {
        let (raw, handler) = memory("a");
        let err = SpillableSortedSet::<i32>::from_sorted(vec![1, 3, 2], handler, true).unwrap_err();
        assert_eq!(err.code(), SortedSetErrorCode::SpillInvalidInput);
        assert!(!raw.exists());

        let (_, handler) = memory("b");
        let err = SpillableSortedSet::<i32>::from_sorted(vec![1, 1], handler, true).unwrap_err();
        assert_eq!(err.code(), SortedSetErrorCode::SpillInvalidInput);
    }

    #[test]
    fn test_from_sorted_resident_accepts_any_order() {
        let (raw, handler) = memory("a");
        let set = SpillableSortedSet::<i32>::from_sorted(vec![3, 1, 2], handler, false).unwrap();
        assert!(!set.is_persisted());
        assert!(!raw.exists());
        assert_eq!(set.to_vec().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_reversed_order_persists() {
        let handler: SharedHandler<i32> = Arc::new(MemoryHandler::new("r"));
        let mut set: SpillableSortedSet<i32, Reversed> = SpillableSortedSet::with_handler(handler);
        set.insert_all(vec![1, 3, 2]).unwrap();
        set.persist().unwrap();

        assert_eq!(set.to_vec().unwrap(), vec![3, 2, 1]);
        assert_eq!(set.first().unwrap(), 3);
        assert_eq!(set.head_set(&1).to_vec().unwrap(), vec![3, 2]);
    }

    #[test]
    fn test_retain_all() {
        let mut set = set_of(&[1, 2, 3], memory("a").1);
        assert!(set.retain_all(&[2, 3, 4]).unwrap());
        assert!(!set.retain_all(&[2, 3]).unwrap());
        assert_eq!(set.to_vec().unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = Arc::new(SpillMetrics::new());
        let (_, handler) = memory("a");
        let mut set = set_of(&[1, 2], handler).with_metrics(metrics.clone());
        set.persist().unwrap();
        set.load().unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.persists, 1);
        assert_eq!(snapshot.elements_spilled, 2);
        assert_eq!(snapshot.loads, 1);
        assert_eq!(snapshot.files_deleted, 1);
    }
}
