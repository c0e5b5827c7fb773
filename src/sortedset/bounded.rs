//! Range-bounded element streams
//!
//! Handlers without native range support are wrapped in a `BoundedReader`,
//! which filters the sorted element stream down to `[start, end)`.

use std::cmp::Ordering;
use std::marker::PhantomData;

use super::handler::{ElementReader, HandlerResult, ReaderScope, TypedFileHandler};
use super::order::{Comparator, KeyRange};

/// Filters a sorted stream to `[start, end)` under comparator `C`.
///
/// Leading elements below `start` are discarded. The first element at or
/// beyond `end` ends the stream, and the stream stays ended afterwards.
pub struct BoundedReader<E, C> {
    inner: Box<dyn ElementReader<E>>,
    start: Option<E>,
    end: Option<E>,
    exhausted: bool,
    order: PhantomData<fn() -> C>,
}

impl<E, C: Comparator<E>> BoundedReader<E, C> {
    /// Wrap `inner`, bounding it to `[start, end)`.
    pub fn new(inner: Box<dyn ElementReader<E>>, start: Option<E>, end: Option<E>) -> Self {
        Self {
            inner,
            start,
            end,
            exhausted: false,
            order: PhantomData,
        }
    }
}

impl<E, C: Comparator<E>> ElementReader<E> for BoundedReader<E, C> {
    fn read(&mut self) -> HandlerResult<Option<E>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut next = self.inner.read()?;
        if let Some(ref start) = self.start {
            while matches!(next, Some(ref e) if C::compare(e, start) == Ordering::Less) {
                next = self.inner.read()?;
            }
        }

        match next {
            Some(e)
                if self
                    .end
                    .as_ref()
                    .map_or(true, |end| C::compare(&e, end) == Ordering::Less) =>
            {
                Ok(Some(e))
            }
            _ => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    fn read_count(&mut self) -> HandlerResult<u64> {
        self.inner.read_count()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Open an input stream over `handler` restricted to `range`.
///
/// Uses the handler's native bounded stream when it offers one and falls back
/// to `BoundedReader` otherwise. An absent or unbounded range yields the
/// plain input stream.
pub fn open_bounded<E, C>(
    handler: &dyn TypedFileHandler<E>,
    range: Option<&KeyRange<E>>,
) -> HandlerResult<ReaderScope<E>>
where
    E: Clone + 'static,
    C: Comparator<E>,
{
    let range = match range {
        Some(r) if !r.is_unbounded() => r,
        _ => return ReaderScope::open(handler),
    };

    if let Some(native) = handler.bounded_input_stream(range.start.as_ref(), range.end.as_ref())? {
        return Ok(ReaderScope::new(native));
    }

    let inner = handler.input_stream()?;
    Ok(ReaderScope::new(Box::new(BoundedReader::<E, C>::new(
        inner,
        range.start.clone(),
        range.end.clone(),
    ))))
}
