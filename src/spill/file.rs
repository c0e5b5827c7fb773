//! Local disk spill file handler
//!
//! One handler per spill file. Output streams truncate the file and write
//! through a `BufWriter`; input streams verify every record checksum and stop
//! at the trailer.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::record::{data_end, decode_trailer, encode_record, encode_trailer, read_record, TRAILER_LEN};
use crate::sortedset::{ElementReader, ElementWriter, HandlerError, HandlerResult, TypedFileHandler};

/// Default write buffer capacity
pub const DEFAULT_WRITE_BUFFER: usize = 64 * 1024;

/// Handler bound to one spill file on local disk.
pub struct LocalFileHandler<E> {
    path: PathBuf,
    write_buffer: usize,
    sync_on_close: bool,
    element: PhantomData<fn() -> E>,
}

impl<E> LocalFileHandler<E> {
    /// Bind a handler to `path` with default buffering and fsync on close.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_buffer: DEFAULT_WRITE_BUFFER,
            sync_on_close: true,
            element: PhantomData,
        }
    }

    /// Set the write buffer capacity.
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer = bytes.max(1);
        self
    }

    /// Set whether output streams fsync when closed.
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Returns the spill file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether the spill file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl<E> fmt::Debug for LocalFileHandler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFileHandler")
            .field("path", &self.path)
            .finish()
    }
}

impl<E> TypedFileHandler<E> for LocalFileHandler<E>
where
    E: Serialize + DeserializeOwned + 'static,
{
    fn output_stream(&self) -> HandlerResult<Box<dyn ElementWriter<E>>> {
        let file = File::create(&self.path)?;
        Ok(Box::new(FileElementWriter {
            writer: Some(BufWriter::with_capacity(self.write_buffer, file)),
            sync_on_close: self.sync_on_close,
            element: PhantomData,
        }))
    }

    fn input_stream(&self) -> HandlerResult<Box<dyn ElementReader<E>>> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                HandlerError::Missing(self.path.display().to_string())
            } else {
                HandlerError::Io(e)
            }
        })?;
        let file_size = file.metadata()?.len();
        let data_end = data_end(file_size)?;

        Ok(Box::new(FileElementReader {
            reader: Some(BufReader::new(file)),
            offset: 0,
            data_end,
            element: PhantomData,
        }))
    }

    fn size(&self) -> HandlerResult<u64> {
        match fs::metadata(&self.path) {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self) -> HandlerResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

struct FileElementWriter<E> {
    writer: Option<BufWriter<File>>,
    sync_on_close: bool,
    element: PhantomData<fn(&E)>,
}

impl<E: Serialize> FileElementWriter<E> {
    fn writer(&mut self) -> HandlerResult<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or(HandlerError::Closed)
    }
}

impl<E: Serialize> ElementWriter<E> for FileElementWriter<E> {
    fn write(&mut self, element: &E) -> HandlerResult<()> {
        let record = encode_record(element)?;
        self.writer()?.write_all(&record)?;
        Ok(())
    }

    fn write_count(&mut self, count: u64) -> HandlerResult<()> {
        self.writer()?.write_all(&encode_trailer(count))?;
        Ok(())
    }

    fn close(&mut self) -> HandlerResult<()> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| HandlerError::Io(e.into_error()))?;
            if self.sync_on_close {
                file.sync_all()?;
            }
        }
        Ok(())
    }
}

impl<E> Drop for FileElementWriter<E> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

struct FileElementReader<E> {
    reader: Option<BufReader<File>>,
    offset: u64,
    data_end: u64,
    element: PhantomData<fn() -> E>,
}

impl<E: DeserializeOwned> ElementReader<E> for FileElementReader<E> {
    fn read(&mut self) -> HandlerResult<Option<E>> {
        let reader = self.reader.as_mut().ok_or(HandlerError::Closed)?;
        if self.offset >= self.data_end {
            return Ok(None);
        }
        let (element, consumed) = read_record(reader, self.offset, self.data_end - self.offset)?;
        self.offset += consumed;
        Ok(Some(element))
    }

    fn read_count(&mut self) -> HandlerResult<u64> {
        let reader = self.reader.as_mut().ok_or(HandlerError::Closed)?;
        reader.seek(SeekFrom::Start(self.data_end))?;
        let mut trailer = [0u8; TRAILER_LEN as usize];
        reader.read_exact(&mut trailer)?;
        reader.seek(SeekFrom::Start(self.offset))?;
        Ok(decode_trailer(trailer))
    }

    fn close(&mut self) {
        self.reader = None;
    }
}
