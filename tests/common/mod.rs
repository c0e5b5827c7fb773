//! Shared test utilities
//!
//! `FaultyHandler` wraps a `MemoryHandler` and injects failures into the
//! streams it hands out.

#![allow(dead_code)]

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use spillset::sortedset::{
    ElementReader, ElementWriter, HandlerError, HandlerResult, SharedHandler, TypedFileHandler,
};
use spillset::spill::MemoryHandler;

/// Handler whose streams misbehave on request.
pub struct FaultyHandler<E> {
    inner: MemoryHandler<E>,
    drop_count: AtomicBool,
    skip_first: AtomicBool,
    fail_delete: AtomicBool,
    reads_before_failure: AtomicU64,
}

impl<E> FaultyHandler<E> {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryHandler::new(name),
            drop_count: AtomicBool::new(false),
            skip_first: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            reads_before_failure: AtomicU64::new(u64::MAX),
        }
    }

    /// Writers silently discard the trailing count.
    pub fn drop_count(self) -> Self {
        self.drop_count.store(true, Ordering::SeqCst);
        self
    }

    /// Writers silently discard the first element.
    pub fn skip_first(self) -> Self {
        self.skip_first.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Readers opened from now on fail after `reads` successful reads.
    pub fn fail_reads_after(&self, reads: u64) {
        self.reads_before_failure.store(reads, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryHandler<E> {
        &self.inner
    }
}

impl<E> fmt::Debug for FaultyHandler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultyHandler").finish()
    }
}

impl<E> TypedFileHandler<E> for FaultyHandler<E>
where
    E: Serialize + DeserializeOwned + 'static,
{
    fn output_stream(&self) -> HandlerResult<Box<dyn ElementWriter<E>>> {
        Ok(Box::new(FaultyWriter {
            inner: self.inner.output_stream()?,
            drop_count: self.drop_count.load(Ordering::SeqCst),
            skip_first: self.skip_first.load(Ordering::SeqCst),
            written: 0,
        }))
    }

    fn input_stream(&self) -> HandlerResult<Box<dyn ElementReader<E>>> {
        Ok(Box::new(FaultyReader {
            inner: self.inner.input_stream()?,
            remaining: self.reads_before_failure.load(Ordering::SeqCst),
        }))
    }

    fn size(&self) -> HandlerResult<u64> {
        self.inner.size()
    }

    fn delete(&self) -> HandlerResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(HandlerError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected delete failure",
            )));
        }
        self.inner.delete()
    }
}

struct FaultyWriter<E> {
    inner: Box<dyn ElementWriter<E>>,
    drop_count: bool,
    skip_first: bool,
    written: u64,
}

impl<E> ElementWriter<E> for FaultyWriter<E> {
    fn write(&mut self, element: &E) -> HandlerResult<()> {
        self.written += 1;
        if self.skip_first && self.written == 1 {
            return Ok(());
        }
        self.inner.write(element)
    }

    fn write_count(&mut self, count: u64) -> HandlerResult<()> {
        if self.drop_count {
            return Ok(());
        }
        self.inner.write_count(count)
    }

    fn close(&mut self) -> HandlerResult<()> {
        self.inner.close()
    }
}

struct FaultyReader<E> {
    inner: Box<dyn ElementReader<E>>,
    remaining: u64,
}

impl<E> ElementReader<E> for FaultyReader<E> {
    fn read(&mut self) -> HandlerResult<Option<E>> {
        if self.remaining == 0 {
            return Err(HandlerError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "injected read failure",
            )));
        }
        self.remaining -= 1;
        self.inner.read()
    }

    fn read_count(&mut self) -> HandlerResult<u64> {
        self.inner.read_count()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// A memory handler plus its type-erased shared form.
pub fn memory_handler<E>(name: &str) -> (Arc<MemoryHandler<E>>, SharedHandler<E>)
where
    E: Serialize + DeserializeOwned + 'static,
{
    let handler = Arc::new(MemoryHandler::new(name));
    let shared: SharedHandler<E> = handler.clone();
    (handler, shared)
}

/// A faulty handler plus its type-erased shared form.
pub fn faulty_handler<E>(handler: FaultyHandler<E>) -> (Arc<FaultyHandler<E>>, SharedHandler<E>)
where
    E: Serialize + DeserializeOwned + 'static,
{
    let handler = Arc::new(handler);
    let shared: SharedHandler<E> = handler.clone();
    (handler, shared)
}
