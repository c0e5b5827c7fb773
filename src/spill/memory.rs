//! In-memory spill handler
//!
//! Stores the exact spill file layout in a byte buffer. Useful where a
//! durable medium is not needed and for asserting stream hygiene: every
//! stream opened and closed is counted in `StreamStats`.

use std::fmt;
use std::io::Cursor;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::record::{data_end, decode_trailer, encode_record, encode_trailer, read_record, TRAILER_LEN};
use crate::sortedset::{ElementReader, ElementWriter, HandlerError, HandlerResult, TypedFileHandler};

/// Open/close counters for a handler's streams
#[derive(Debug, Default)]
pub struct StreamStats {
    readers_opened: AtomicU64,
    readers_closed: AtomicU64,
    writers_opened: AtomicU64,
    writers_closed: AtomicU64,
}

impl StreamStats {
    /// Input streams opened so far
    pub fn readers_opened(&self) -> u64 {
        self.readers_opened.load(Ordering::SeqCst)
    }

    /// Input streams closed so far
    pub fn readers_closed(&self) -> u64 {
        self.readers_closed.load(Ordering::SeqCst)
    }

    /// Output streams opened so far
    pub fn writers_opened(&self) -> u64 {
        self.writers_opened.load(Ordering::SeqCst)
    }

    /// Output streams closed so far
    pub fn writers_closed(&self) -> u64 {
        self.writers_closed.load(Ordering::SeqCst)
    }

    /// Streams currently open
    pub fn open_streams(&self) -> u64 {
        (self.readers_opened() - self.readers_closed()) + (self.writers_opened() - self.writers_closed())
    }
}

/// Handler whose backing "file" is a byte buffer.
pub struct MemoryHandler<E> {
    name: String,
    bytes: Arc<Mutex<Option<Arc<[u8]>>>>,
    stats: Arc<StreamStats>,
    element: PhantomData<fn() -> E>,
}

impl<E> MemoryHandler<E> {
    /// Create an empty (absent) buffer labelled `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::new(Mutex::new(None)),
            stats: Arc::new(StreamStats::default()),
            element: PhantomData,
        }
    }

    /// Stream counters
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Returns whether content has been written and not deleted
    pub fn exists(&self) -> bool {
        self.lock().is_some()
    }

    /// Copy of the current content
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.lock().as_ref().map(|b| b.to_vec())
    }

    /// Replace the content with raw bytes
    pub fn set_bytes(&self, bytes: Vec<u8>) {
        *self.lock() = Some(bytes.into());
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<[u8]>>> {
        // A poisoned lock still guards a consistent Option; keep going.
        self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<E> fmt::Debug for MemoryHandler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHandler")
            .field("name", &self.name)
            .finish()
    }
}

impl<E> TypedFileHandler<E> for MemoryHandler<E>
where
    E: Serialize + DeserializeOwned + 'static,
{
    fn output_stream(&self) -> HandlerResult<Box<dyn ElementWriter<E>>> {
        self.stats.writers_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryWriter {
            buffer: Some(Vec::new()),
            target: self.bytes.clone(),
            stats: self.stats.clone(),
            element: PhantomData,
        }))
    }

    fn input_stream(&self) -> HandlerResult<Box<dyn ElementReader<E>>> {
        let snapshot = self
            .lock()
            .clone()
            .ok_or_else(|| HandlerError::Missing(self.name.clone()))?;
        let data_end = data_end(snapshot.len() as u64)?;

        self.stats.readers_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryReader {
            cursor: Some(Cursor::new(snapshot)),
            data_end,
            stats: self.stats.clone(),
            element: PhantomData,
        }))
    }

    fn size(&self) -> HandlerResult<u64> {
        Ok(self.lock().as_ref().map_or(0, |b| b.len() as u64))
    }

    fn delete(&self) -> HandlerResult<()> {
        *self.lock() = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}

struct MemoryWriter<E> {
    buffer: Option<Vec<u8>>,
    target: Arc<Mutex<Option<Arc<[u8]>>>>,
    stats: Arc<StreamStats>,
    element: PhantomData<fn(&E)>,
}

impl<E> MemoryWriter<E> {
    fn buffer(&mut self) -> HandlerResult<&mut Vec<u8>> {
        self.buffer.as_mut().ok_or(HandlerError::Closed)
    }

    fn commit(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            *self.target.lock().unwrap_or_else(|e| e.into_inner()) = Some(buffer.into());
            self.stats.writers_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl<E: Serialize> ElementWriter<E> for MemoryWriter<E> {
    fn write(&mut self, element: &E) -> HandlerResult<()> {
        let record = encode_record(element)?;
        self.buffer()?.extend_from_slice(&record);
        Ok(())
    }

    fn write_count(&mut self, count: u64) -> HandlerResult<()> {
        self.buffer()?.extend_from_slice(&encode_trailer(count));
        Ok(())
    }

    fn close(&mut self) -> HandlerResult<()> {
        self.commit();
        Ok(())
    }
}

impl<E> Drop for MemoryWriter<E> {
    fn drop(&mut self) {
        self.commit();
    }
}

struct MemoryReader<E> {
    cursor: Option<Cursor<Arc<[u8]>>>,
    data_end: u64,
    stats: Arc<StreamStats>,
    element: PhantomData<fn() -> E>,
}

impl<E: DeserializeOwned> ElementReader<E> for MemoryReader<E> {
    fn read(&mut self) -> HandlerResult<Option<E>> {
        let data_end = self.data_end;
        let cursor = self.cursor.as_mut().ok_or(HandlerError::Closed)?;
        let offset = cursor.position();
        if offset >= data_end {
            return Ok(None);
        }
        let (element, _) = read_record(cursor, offset, data_end - offset)?;
        Ok(Some(element))
    }

    fn read_count(&mut self) -> HandlerResult<u64> {
        let cursor = self.cursor.as_ref().ok_or(HandlerError::Closed)?;
        let bytes = cursor.get_ref();
        let start = self.data_end as usize;
        let mut trailer = [0u8; TRAILER_LEN as usize];
        trailer.copy_from_slice(&bytes[start..start + TRAILER_LEN as usize]);
        Ok(decode_trailer(trailer))
    }

    fn close(&mut self) {
        if self.cursor.take().is_some() {
            self.stats.readers_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl<E> Drop for MemoryReader<E> {
    fn drop(&mut self) {
        if self.cursor.take().is_some() {
            self.stats.readers_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_counts() {
        let handler: MemoryHandler<u32> = MemoryHandler::new("t");
        assert!(!handler.exists());

        {
            let mut out = handler.output_stream().unwrap();
            out.write(&1).unwrap();
            out.write(&2).unwrap();
            out.write_count(2).unwrap();
            out.close().unwrap();
        }
        assert!(handler.exists());

        let mut input = handler.input_stream().unwrap();
        assert_eq!(input.read_count().unwrap(), 2);
        assert_eq!(input.read().unwrap(), Some(1));
        assert_eq!(input.read().unwrap(), Some(2));
        assert_eq!(input.read().unwrap(), None);
        input.close();
        drop(input);

        assert_eq!(handler.stats().readers_opened(), 1);
        assert_eq!(handler.stats().readers_closed(), 1);
        assert_eq!(handler.stats().writers_closed(), 1);
        assert_eq!(handler.stats().open_streams(), 0);
    }

    #[test]
    fn test_dropped_reader_counts_as_closed() {
        let handler: MemoryHandler<u32> = MemoryHandler::new("t");
        {
            let mut out = handler.output_stream().unwrap();
            out.write_count(0).unwrap();
        }
        let input = handler.input_stream().unwrap();
        assert_eq!(handler.stats().open_streams(), 1);
        drop(input);
        assert_eq!(handler.stats().open_streams(), 0);
    }

    #[test]
    fn test_delete_and_missing() {
        let handler: MemoryHandler<u32> = MemoryHandler::new("t");
        handler.set_bytes(encode_trailer(0).to_vec());
        assert_eq!(handler.size().unwrap(), 8);

        handler.delete().unwrap();
        assert_eq!(handler.size().unwrap(), 0);
        assert!(matches!(handler.input_stream(), Err(HandlerError::Missing(_))));
    }
}
