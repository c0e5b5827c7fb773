//! Typed file handler capability
//!
//! A handler is bound to one backing file and hands out typed element
//! streams over it. Any durable byte store can implement it; the crate ships
//! a local-disk and an in-memory implementation in `crate::spill`.
//!
//! Streams opened by the sorted set are always wrapped in a `ReaderScope` or
//! `WriterScope`, which close the stream when dropped.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised by handlers and their streams
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Element codec error: {0}")]
    Codec(String),

    #[error("Corrupt spill file at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("Stream already closed")]
    Closed,

    #[error("Backing file does not exist: {0}")]
    Missing(String),
}

/// Result type for handler operations
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Sequential, write-once element output.
pub trait ElementWriter<E> {
    /// Append one element.
    fn write(&mut self, element: &E) -> HandlerResult<()>;

    /// Append the trailing element count. Must be the final write.
    fn write_count(&mut self, count: u64) -> HandlerResult<()>;

    /// Flush and release the stream. Calling it again is a no-op.
    fn close(&mut self) -> HandlerResult<()>;
}

/// Sequential element input.
pub trait ElementReader<E> {
    /// Read the next element; `None` at end of stream.
    fn read(&mut self) -> HandlerResult<Option<E>>;

    /// Read the trailing element count without disturbing the element position.
    fn read_count(&mut self) -> HandlerResult<u64>;

    /// Release the stream. Calling it again is a no-op.
    fn close(&mut self);
}

/// Capability bound to one backing file.
pub trait TypedFileHandler<E>: fmt::Debug + Send + Sync {
    /// Open a fresh output stream, truncating any previous content.
    fn output_stream(&self) -> HandlerResult<Box<dyn ElementWriter<E>>>;

    /// Open an input stream positioned at the first element.
    fn input_stream(&self) -> HandlerResult<Box<dyn ElementReader<E>>>;

    /// Open an input stream restricted to `[start, end)`.
    ///
    /// Returns `Ok(None)` when the handler has no native range support, in
    /// which case callers fall back to `BoundedReader`. Implementations that
    /// do support it must order elements the same way the owning set does.
    fn bounded_input_stream(
        &self,
        _start: Option<&E>,
        _end: Option<&E>,
    ) -> HandlerResult<Option<Box<dyn ElementReader<E>>>> {
        Ok(None)
    }

    /// Size of the backing file in bytes; 0 when it does not exist.
    fn size(&self) -> HandlerResult<u64>;

    /// Delete the backing file. Deleting an absent file succeeds.
    fn delete(&self) -> HandlerResult<()>;

    /// Short description used in logs.
    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

/// Shared handler reference
pub type SharedHandler<E> = Arc<dyn TypedFileHandler<E>>;

/// Owns an open reader and closes it on drop.
pub struct ReaderScope<E> {
    reader: Box<dyn ElementReader<E>>,
}

impl<E> ReaderScope<E> {
    /// Wrap an opened reader.
    pub fn new(reader: Box<dyn ElementReader<E>>) -> Self {
        Self { reader }
    }

    /// Open the handler's unbounded input stream.
    pub fn open(handler: &dyn TypedFileHandler<E>) -> HandlerResult<Self> {
        Ok(Self::new(handler.input_stream()?))
    }
}

impl<E> ElementReader<E> for ReaderScope<E> {
    fn read(&mut self) -> HandlerResult<Option<E>> {
        self.reader.read()
    }

    fn read_count(&mut self) -> HandlerResult<u64> {
        self.reader.read_count()
    }

    fn close(&mut self) {
        self.reader.close();
    }
}

impl<E> Drop for ReaderScope<E> {
    fn drop(&mut self) {
        self.reader.close();
    }
}

/// Owns an open writer and closes it on drop.
///
/// Errors from the implicit close in `Drop` are discarded; call `close()`
/// explicitly to observe them.
pub struct WriterScope<E> {
    writer: Box<dyn ElementWriter<E>>,
}

impl<E> WriterScope<E> {
    /// Open the handler's output stream.
    pub fn open(handler: &dyn TypedFileHandler<E>) -> HandlerResult<Self> {
        Ok(Self {
            writer: handler.output_stream()?,
        })
    }
}

impl<E> ElementWriter<E> for WriterScope<E> {
    fn write(&mut self, element: &E) -> HandlerResult<()> {
        self.writer.write(element)
    }

    fn write_count(&mut self, count: u64) -> HandlerResult<()> {
        self.writer.write_count(count)
    }

    fn close(&mut self) -> HandlerResult<()> {
        self.writer.close()
    }
}

impl<E> Drop for WriterScope<E> {
    fn drop(&mut self) {
        let _ = self.writer.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        items: Vec<u32>,
        closes: Arc<AtomicUsize>,
        closed: bool,
    }

    impl ElementReader<u32> for CountingReader {
        fn read(&mut self) -> HandlerResult<Option<u32>> {
            if self.closed {
                return Err(HandlerError::Closed);
            }
            Ok(if self.items.is_empty() {
                None
            } else {
                Some(self.items.remove(0))
            })
        }

        fn read_count(&mut self) -> HandlerResult<u64> {
            Ok(self.items.len() as u64)
        }

        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.closes.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_reader_scope_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut scope = ReaderScope::new(Box::new(CountingReader {
                items: vec![1, 2],
                closes: closes.clone(),
                closed: false,
            }));
            assert_eq!(scope.read().unwrap(), Some(1));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_close_is_not_repeated_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut scope = ReaderScope::new(Box::new(CountingReader {
                items: vec![],
                closes: closes.clone(),
                closed: false,
            }));
            scope.close();
            assert!(matches!(scope.read(), Err(HandlerError::Closed)));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::Corruption {
            offset: 64,
            reason: "checksum mismatch".into(),
        };
        let display = err.to_string();
        assert!(display.contains("64"));
        assert!(display.contains("checksum mismatch"));
    }
}
